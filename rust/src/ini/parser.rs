//! Line-oriented INI parser. The rules match the common `configparser`
//! dialect so files written by other tools in that family read back the same.

use indexmap::IndexMap;

use super::model::{Section, Sections};
use super::{IniError, IniOptions};

/// Where option lines are currently being collected.
#[derive(Debug, Clone)]
enum Target {
    Defaults,
    Section(String),
}

/// Values keep their individual lines until the whole source is read.
type RawSection = IndexMap<String, Vec<String>>;

#[derive(Default)]
struct RawSections {
    defaults: RawSection,
    sections: IndexMap<String, RawSection>,
}

impl RawSections {
    fn target_mut(&mut self, target: &Target) -> &mut RawSection {
        match target {
            Target::Defaults => &mut self.defaults,
            Target::Section(name) => self.sections.entry(name.clone()).or_default(),
        }
    }

    fn finish(self) -> Sections {
        Sections {
            defaults: join_values(self.defaults),
            sections: self
                .sections
                .into_iter()
                .map(|(name, options)| (name, join_values(options)))
                .collect(),
        }
    }
}

fn join_values(raw: RawSection) -> Section {
    raw.into_iter()
        .map(|(key, lines)| (key, lines.join("\n").trim_end().to_string()))
        .collect()
}

/// `[name]` with the name running up to the last closing bracket.
fn section_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?;
    let close = inner.rfind(']')?;
    if close == 0 {
        return None;
    }
    Some(&inner[..close])
}

/// Splits at the first delimiter into `(key, value)`.
fn split_option<'a>(line: &'a str, delimiters: &[char]) -> Option<(&'a str, &'a str)> {
    let at = line.find(|c: char| delimiters.contains(&c))?;
    let delimiter_len = line[at..].chars().next().map(char::len_utf8).unwrap_or(1);
    Some((line[..at].trim_end(), line[at + delimiter_len..].trim()))
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

pub(crate) fn parse(options: &IniOptions, text: &str, source_name: &str) -> Result<Sections, IniError> {
    let mut raw = RawSections::default();
    let mut target: Option<Target> = None;
    let mut current_option: Option<String> = None;
    let mut indent_level = 0usize;
    let mut bad_lines = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        let line_number = index + 1;
        let stripped = line.trim();
        let is_comment = options
            .comment_prefixes
            .iter()
            .any(|prefix| stripped.starts_with(prefix.as_str()));
        let value = if is_comment { "" } else { stripped };

        if value.is_empty() {
            if options.empty_lines_in_values {
                // Blank lines may belong to a multi-line value; comments never do.
                if let (false, Some(t), Some(option)) = (is_comment, &target, &current_option) {
                    if let Some(lines) = raw.target_mut(t).get_mut(option) {
                        lines.push(String::new());
                    }
                }
            } else {
                indent_level = usize::MAX;
            }
            continue;
        }

        let indent = indent_of(line);
        if let (Some(t), Some(option), true) = (&target, &current_option, indent > indent_level) {
            if let Some(lines) = raw.target_mut(t).get_mut(option) {
                lines.push(value.to_string());
            }
            continue;
        }

        indent_level = indent;
        if let Some(name) = section_header(value) {
            target = if name == options.default_section {
                Some(Target::Defaults)
            } else if raw.sections.contains_key(name) {
                if options.strict {
                    return Err(IniError::DuplicateSectionHeader {
                        source_name: source_name.to_string(),
                        line: line_number,
                    });
                }
                Some(Target::Section(name.to_string()))
            } else {
                raw.sections.insert(name.to_string(), RawSection::new());
                Some(Target::Section(name.to_string()))
            };
            current_option = None;
            continue;
        }

        let Some(t) = &target else {
            return Err(IniError::MissingSectionHeader {
                source_name: source_name.to_string(),
                line: line_number,
            });
        };

        match split_option(value, &options.delimiters) {
            Some((key, option_value)) if !key.is_empty() => {
                let key = options.option_key(key);
                let section = raw.target_mut(t);
                if options.strict && section.contains_key(&key) {
                    return Err(IniError::DuplicateOptionLine {
                        source_name: source_name.to_string(),
                        line: line_number,
                    });
                }
                section.insert(key.clone(), vec![option_value.to_string()]);
                current_option = Some(key);
            }
            _ => {
                bad_lines.push(line_number);
                current_option = None;
            }
        }
    }

    if !bad_lines.is_empty() {
        return Err(IniError::Parsing {
            source_name: source_name.to_string(),
            lines: bad_lines,
        });
    }
    Ok(raw.finish())
}
