//! Line-oriented INI text format used inside the encrypted envelope.
//!
//! The config object never touches the text representation directly: it holds
//! a [`TextFormat`] engine and asks it to parse or render a [`Sections`]
//! model. [`IniFormat`] is the stock engine and follows the usual
//! `configparser` conventions (`[section]` headers, `key = value` lines,
//! indented continuation lines, `#`/`;` comments).

pub mod interpolation;
mod model;
mod parser;
mod writer;

use thiserror::Error;

pub use model::{Section, Sections};

pub const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IniError {
    #[error("no section: '{0}'")]
    NoSection(String),
    #[error("no option '{option}' in section '{section}'")]
    NoOption { section: String, option: String },
    #[error("section '{0}' already exists")]
    DuplicateSection(String),
    #[error("invalid section name: '{0}'")]
    InvalidSectionName(String),
    #[error("{source_name}: line {line}: option found before any section header")]
    MissingSectionHeader { source_name: String, line: usize },
    #[error("{source_name}: line {line}: section header repeats an earlier section")]
    DuplicateSectionHeader { source_name: String, line: usize },
    #[error("{source_name}: line {line}: option repeats an earlier option in the same section")]
    DuplicateOptionLine { source_name: String, line: usize },
    #[error("{source_name}: unparseable lines {lines:?}")]
    Parsing { source_name: String, lines: Vec<usize> },
    #[error("bad interpolation in option '{option}' of section '{section}': {reason}")]
    InterpolationSyntax {
        section: String,
        option: String,
        reason: String,
    },
    #[error("option '{option}' in section '{section}' references missing option '{reference}'")]
    InterpolationMissingOption {
        section: String,
        option: String,
        reference: String,
    },
    #[error("interpolation of option '{option}' in section '{section}' exceeds the maximum depth")]
    InterpolationDepth { section: String, option: String },
    #[error("option '{option}' in section '{section}' cannot be stored: {reason}")]
    Unrepresentable {
        section: String,
        option: String,
        reason: &'static str,
    },
    #[error("option '{option}' in section '{section}' is not a valid {expected}")]
    ValueConversion {
        section: String,
        option: String,
        expected: &'static str,
    },
}

impl IniError {
    /// True for errors describing the text itself rather than an API lookup.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            IniError::MissingSectionHeader { .. }
                | IniError::DuplicateSectionHeader { .. }
                | IniError::DuplicateOptionLine { .. }
                | IniError::Parsing { .. }
        )
    }
}

/// How `%` references in values are treated on lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// `%(name)s` expands to another option, `%%` is a literal percent sign.
    #[default]
    Basic,
    /// Values are returned exactly as stored.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniOptions {
    /// Key/value separators; the first one is used when rendering.
    pub delimiters: Vec<char>,
    /// Prefixes marking a whole line as a comment.
    pub comment_prefixes: Vec<String>,
    /// Keep option names as written instead of lower-casing them.
    pub preserve_key_case: bool,
    /// Section whose options act as fallbacks for every other section.
    pub default_section: String,
    /// Reject repeated sections or options within one source.
    pub strict: bool,
    /// Keep blank lines that sit inside multi-line values.
    pub empty_lines_in_values: bool,
    pub interpolation: Interpolation,
}

impl Default for IniOptions {
    fn default() -> Self {
        Self {
            delimiters: vec!['=', ':'],
            comment_prefixes: vec!["#".to_string(), ";".to_string()],
            preserve_key_case: true,
            default_section: DEFAULT_SECTION.to_string(),
            strict: true,
            empty_lines_in_values: true,
            interpolation: Interpolation::Basic,
        }
    }
}

impl IniOptions {
    /// Normalises an option name according to `preserve_key_case`.
    pub fn option_key(&self, name: &str) -> String {
        if self.preserve_key_case {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }
}

/// Text engine the config object delegates to.
pub trait TextFormat {
    fn options(&self) -> &IniOptions;

    /// Parses one source into a fresh model. `source_name` only labels errors.
    fn parse(&self, text: &str, source_name: &str) -> Result<Sections, IniError>;

    /// Renders the model; `space_around_delimiters` writes `key = value`
    /// instead of `key=value`.
    fn render(&self, sections: &Sections, space_around_delimiters: bool) -> String;

    /// Rejects an option that `render` could not write so that `parse`
    /// reads back the same name and value.
    fn check_entry(&self, section: &str, option: &str, value: &str) -> Result<(), IniError>;
}

#[derive(Debug, Clone, Default)]
pub struct IniFormat {
    options: IniOptions,
}

impl IniFormat {
    pub fn new(options: IniOptions) -> Self {
        Self { options }
    }
}

impl TextFormat for IniFormat {
    fn options(&self) -> &IniOptions {
        &self.options
    }

    fn parse(&self, text: &str, source_name: &str) -> Result<Sections, IniError> {
        parser::parse(&self.options, text, source_name)
    }

    fn render(&self, sections: &Sections, space_around_delimiters: bool) -> String {
        writer::render(&self.options, sections, space_around_delimiters)
    }

    fn check_entry(&self, section: &str, option: &str, value: &str) -> Result<(), IniError> {
        writer::check_entry(&self.options, section, option, value)
    }
}
