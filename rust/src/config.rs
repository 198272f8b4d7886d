//! The encrypted config object. It stores sections of options in memory like
//! any INI parser, but everything it persists goes through the encrypted
//! codec. Text handling is delegated to an injected [`TextFormat`] engine so
//! the envelope logic never depends on how the text is laid out.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::codec::EncryptedCodec;
use crate::crypto::keys::SymmetricKey;
use crate::crypto::padding::PaddingPolicy;
use crate::error::CryptError;
use crate::fileio;
use crate::ini::interpolation;
use crate::ini::{IniError, IniFormat, IniOptions, Interpolation, Section, Sections, TextFormat};

pub struct CryptConfig<F: TextFormat = IniFormat> {
    format: F,
    model: Sections,
    key: Option<SymmetricKey>,
    padding: PaddingPolicy,
}

impl CryptConfig<IniFormat> {
    /// Case-preserving INI config with basic interpolation and no key.
    pub fn new() -> Self {
        Self::with_format(IniFormat::default())
    }

    pub fn with_options(options: IniOptions) -> Self {
        Self::with_format(IniFormat::new(options))
    }
}

impl Default for CryptConfig<IniFormat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: TextFormat> fmt::Debug for CryptConfig<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptConfig")
            .field("sections", &self.model.sections.keys().collect::<Vec<_>>())
            .field("key", &self.key)
            .field("padding", &self.padding)
            .finish()
    }
}

impl<F: TextFormat> CryptConfig<F> {
    pub fn with_format(format: F) -> Self {
        Self {
            format,
            model: Sections::default(),
            key: None,
            padding: PaddingPolicy::default(),
        }
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn model(&self) -> &Sections {
        &self.model
    }

    fn ini_options(&self) -> &IniOptions {
        self.format.options()
    }

    fn is_default_section(&self, section: &str) -> bool {
        section.is_empty() || section == self.ini_options().default_section
    }

    // ----- key management -----

    pub fn key(&self) -> Option<&SymmetricKey> {
        self.key.as_ref()
    }

    /// Stores `key` for later reads and writes. Only 16 or 32 bytes are accepted.
    pub fn set_key(&mut self, key: &[u8]) -> Result<(), CryptError> {
        self.set_symmetric_key(SymmetricKey::from_bytes(key)?);
        Ok(())
    }

    pub fn set_symmetric_key(&mut self, key: SymmetricKey) {
        debug!(fingerprint = %key.fingerprint(), "config key set");
        self.key = Some(key);
    }

    /// Drops the stored key; its bytes are wiped.
    pub fn clear_key(&mut self) {
        self.key = None;
    }

    /// Generates a key, stores it and hands a copy back so the caller can keep
    /// it somewhere safe.
    pub fn generate_key(&mut self, size: usize) -> Result<SymmetricKey, CryptError> {
        let key = SymmetricKey::generate(size)?;
        self.set_symmetric_key(key.clone());
        Ok(key)
    }

    // ----- padding -----

    pub fn padding(&self) -> PaddingPolicy {
        self.padding
    }

    pub fn set_padding(&mut self, padding: PaddingPolicy) {
        self.padding = padding;
    }

    pub fn header_length(&self) -> usize {
        self.padding.header_length()
    }

    pub fn footer_length(&self) -> usize {
        self.padding.footer_length()
    }

    pub fn set_header_length<N>(&mut self, n: N) -> Result<(), CryptError>
    where
        N: TryInto<usize> + fmt::Display + Copy,
    {
        self.padding.set_header_length(n)
    }

    pub fn set_footer_length<N>(&mut self, n: N) -> Result<(), CryptError>
    where
        N: TryInto<usize> + fmt::Display + Copy,
    {
        self.padding.set_footer_length(n)
    }

    pub fn codec(&self) -> EncryptedCodec<'_> {
        EncryptedCodec::new(self.key.as_ref(), self.padding)
    }

    // ----- sections and options -----

    pub fn sections(&self) -> Vec<&str> {
        self.model.sections.keys().map(String::as_str).collect()
    }

    pub fn section(&self, section: &str) -> Option<&Section> {
        self.model.sections.get(section)
    }

    pub fn defaults(&self) -> &Section {
        &self.model.defaults
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.model.sections.contains_key(section)
    }

    pub fn add_section(&mut self, section: &str) -> Result<(), IniError> {
        if self.is_default_section(section) || section.contains('\n') {
            return Err(IniError::InvalidSectionName(section.to_string()));
        }
        if self.has_section(section) {
            return Err(IniError::DuplicateSection(section.to_string()));
        }
        self.model.sections.insert(section.to_string(), Section::new());
        Ok(())
    }

    pub fn remove_section(&mut self, section: &str) -> bool {
        self.model.sections.shift_remove(section).is_some()
    }

    /// Option names of `section` followed by inherited default names.
    pub fn options(&self, section: &str) -> Result<Vec<&str>, IniError> {
        let own = self
            .model
            .sections
            .get(section)
            .ok_or_else(|| IniError::NoSection(section.to_string()))?;
        let mut names: Vec<&str> = own.keys().map(String::as_str).collect();
        names.extend(
            self.model
                .defaults
                .keys()
                .filter(|name| !own.contains_key(name.as_str()))
                .map(String::as_str),
        );
        Ok(names)
    }

    pub fn has_option(&self, section: &str, option: &str) -> bool {
        let key = self.ini_options().option_key(option);
        if self.is_default_section(section) {
            return self.model.defaults.contains_key(&key);
        }
        match self.model.sections.get(section) {
            Some(own) => own.contains_key(&key) || self.model.defaults.contains_key(&key),
            None => false,
        }
    }

    /// `None` stands for the default section.
    fn lookup_section(&self, section: &str) -> Result<Option<&Section>, IniError> {
        if self.is_default_section(section) {
            return Ok(None);
        }
        self.model
            .sections
            .get(section)
            .map(Some)
            .ok_or_else(|| IniError::NoSection(section.to_string()))
    }

    /// Defaults overlaid with the section's own options.
    fn merged_vars(&self, own: Option<&Section>) -> Section {
        let mut vars = self.model.defaults.clone();
        if let Some(own) = own {
            vars.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        vars
    }

    /// Stored value without interpolation, falling back to the defaults.
    pub fn get_raw(&self, section: &str, option: &str) -> Result<&str, IniError> {
        let key = self.ini_options().option_key(option);
        let own = self.lookup_section(section)?;
        own.and_then(|s| s.get(&key))
            .or_else(|| self.model.defaults.get(&key))
            .map(String::as_str)
            .ok_or_else(|| IniError::NoOption {
                section: section.to_string(),
                option: key.clone(),
            })
    }

    pub fn get(&self, section: &str, option: &str) -> Result<String, IniError> {
        let raw = self.get_raw(section, option)?;
        match self.ini_options().interpolation {
            Interpolation::None => Ok(raw.to_string()),
            Interpolation::Basic => {
                let key = self.ini_options().option_key(option);
                let vars = self.merged_vars(self.lookup_section(section)?);
                interpolation::expand(self.ini_options(), section, &key, raw, &vars)
            }
        }
    }

    fn conversion_error(section: &str, option: &str, expected: &'static str) -> IniError {
        IniError::ValueConversion {
            section: section.to_string(),
            option: option.to_string(),
            expected,
        }
    }

    pub fn getint(&self, section: &str, option: &str) -> Result<i64, IniError> {
        self.get(section, option)?
            .trim()
            .parse()
            .map_err(|_| Self::conversion_error(section, option, "integer"))
    }

    pub fn getfloat(&self, section: &str, option: &str) -> Result<f64, IniError> {
        self.get(section, option)?
            .trim()
            .parse()
            .map_err(|_| Self::conversion_error(section, option, "float"))
    }

    /// Accepts `1/yes/true/on` and `0/no/false/off`, in any case.
    pub fn getboolean(&self, section: &str, option: &str) -> Result<bool, IniError> {
        match self.get(section, option)?.trim().to_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(true),
            "0" | "no" | "false" | "off" => Ok(false),
            _ => Err(Self::conversion_error(section, option, "boolean")),
        }
    }

    /// Stores `value`; an empty section name or the default section writes
    /// to the defaults. Names and values the text format could not write back
    /// unchanged are refused with [`IniError::Unrepresentable`].
    pub fn set(&mut self, section: &str, option: &str, value: impl Into<String>) -> Result<(), IniError> {
        let value = value.into();
        let key = self.ini_options().option_key(option);
        self.format.check_entry(section, &key, &value)?;
        if self.ini_options().interpolation == Interpolation::Basic {
            interpolation::validate(section, &key, &value)?;
        }
        let target = if self.is_default_section(section) {
            &mut self.model.defaults
        } else {
            self.model
                .sections
                .get_mut(section)
                .ok_or_else(|| IniError::NoSection(section.to_string()))?
        };
        target.insert(key, value);
        Ok(())
    }

    pub fn remove_option(&mut self, section: &str, option: &str) -> Result<bool, IniError> {
        let key = self.ini_options().option_key(option);
        let target = if self.is_default_section(section) {
            &mut self.model.defaults
        } else {
            self.model
                .sections
                .get_mut(section)
                .ok_or_else(|| IniError::NoSection(section.to_string()))?
        };
        Ok(target.shift_remove(&key).is_some())
    }

    /// Every option visible from `section` (defaults first), interpolated.
    pub fn items(&self, section: &str) -> Result<Vec<(String, String)>, IniError> {
        let vars = self.merged_vars(self.lookup_section(section)?);
        vars.iter()
            .map(|(key, raw)| {
                let value = match self.ini_options().interpolation {
                    Interpolation::None => raw.clone(),
                    Interpolation::Basic => {
                        interpolation::expand(self.ini_options(), section, key, raw, &vars)?
                    }
                };
                Ok::<_, IniError>((key.clone(), value))
            })
            .collect()
    }

    // ----- plaintext -----

    /// Parses plaintext INI and merges it into the current model. A source
    /// that fails to parse leaves the model untouched.
    pub fn read_string(&mut self, text: &str, source_name: &str) -> Result<(), CryptError> {
        let parsed = self
            .format
            .parse(text, source_name)
            .map_err(|e| CryptError::MalformedConfig(format!("{e}")))?;
        self.model.merge(parsed);
        Ok(())
    }

    pub fn to_plaintext_string(&self, space_around_delimiters: bool) -> Zeroizing<String> {
        Zeroizing::new(self.format.render(&self.model, space_around_delimiters))
    }

    // ----- encrypted -----

    /// Decrypts one blob and merges its sections. `key` overrides the stored key.
    pub fn read_encrypted_bytes(
        &mut self,
        blob: &[u8],
        source_name: &str,
        key: Option<&[u8]>,
    ) -> Result<(), CryptError> {
        let text = self.codec().decode(blob, key)?;
        self.read_string(&text, source_name)
    }

    /// Reads every candidate path in order. Paths that cannot be opened are
    /// skipped; a file that opens but fails to decrypt or parse aborts the
    /// call. Returns the paths that were merged.
    pub fn read_encrypted<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        key: Option<&[u8]>,
    ) -> Result<Vec<PathBuf>, CryptError> {
        fileio::read_all(paths, |path, blob| {
            let source_name = path.display().to_string();
            self.read_encrypted_bytes(&blob, &source_name, key)
                .map_err(|err| {
                    warn!(path = %source_name, error = %err, "encrypted config could not be loaded");
                    err
                })
        })
    }

    /// Single-path form of [`read_encrypted`](Self::read_encrypted). Returns
    /// false when the file could not be opened.
    pub fn read_encrypted_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        key: Option<&[u8]>,
    ) -> Result<bool, CryptError> {
        let read = self.read_encrypted(&[path.as_ref()], key)?;
        Ok(!read.is_empty())
    }

    /// Renders and encrypts the current model.
    pub fn to_encrypted_bytes(
        &self,
        space_around_delimiters: bool,
        key: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptError> {
        let plaintext = self.to_plaintext_string(space_around_delimiters);
        self.codec().encode(plaintext.as_bytes(), key)
    }

    /// Encrypts the current model and writes it to `writer` in one piece.
    pub fn write_encrypted<W: Write>(
        &self,
        writer: &mut W,
        space_around_delimiters: bool,
        key: Option<&[u8]>,
    ) -> Result<(), CryptError> {
        let blob = self.to_encrypted_bytes(space_around_delimiters, key)?;
        fileio::write_one(writer, &blob)
    }

    pub fn write_encrypted_file<P: AsRef<Path>>(
        &self,
        path: P,
        space_around_delimiters: bool,
        key: Option<&[u8]>,
    ) -> Result<(), CryptError> {
        let blob = self.to_encrypted_bytes(space_around_delimiters, key)?;
        fileio::write_path(path.as_ref(), &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CryptConfig {
        let mut config = CryptConfig::new();
        config.add_section("TEST").expect("add section");
        config.set("TEST", "spam", "eggs").expect("set");
        config.set("TEST", "Count", "42").expect("set");
        config.set("DEFAULT", "home", "/srv").expect("set default");
        config
    }

    #[test]
    fn section_management() {
        let mut config = sample();
        assert_eq!(config.sections(), vec!["TEST"]);
        assert!(config.has_section("TEST"));
        assert!(!config.has_section("DEFAULT"));
        assert_eq!(
            config.add_section("TEST"),
            Err(IniError::DuplicateSection("TEST".into()))
        );
        assert_eq!(
            config.add_section("DEFAULT"),
            Err(IniError::InvalidSectionName("DEFAULT".into()))
        );
        assert!(config.remove_section("TEST"));
        assert!(!config.remove_section("TEST"));
    }

    #[test]
    fn lookups_fall_back_to_defaults_and_keep_case() {
        let config = sample();
        assert_eq!(config.get("TEST", "Count").expect("get"), "42");
        assert!(matches!(config.get("TEST", "count"), Err(IniError::NoOption { .. })));
        assert_eq!(config.get("TEST", "home").expect("default"), "/srv");
        assert_eq!(config.get("DEFAULT", "home").expect("default"), "/srv");
        assert!(matches!(config.get("nope", "x"), Err(IniError::NoSection(_))));
        assert!(config.has_option("TEST", "home"));
        assert!(!config.has_option("missing", "home"));
        assert_eq!(config.options("TEST").expect("options"), vec!["spam", "Count", "home"]);
    }

    #[test]
    fn typed_getters() {
        let mut config = sample();
        config.set("TEST", "ratio", "0.5").expect("set");
        config.set("TEST", "enabled", "Yes").expect("set");
        assert_eq!(config.getint("TEST", "Count").expect("int"), 42);
        assert_eq!(config.getfloat("TEST", "ratio").expect("float"), 0.5);
        assert!(config.getboolean("TEST", "enabled").expect("bool"));
        assert!(matches!(
            config.getint("TEST", "spam"),
            Err(IniError::ValueConversion { expected: "integer", .. })
        ));
        assert!(config.getboolean("TEST", "spam").is_err());
    }

    #[test]
    fn interpolation_on_get_and_items() {
        let mut config = sample();
        config.set("TEST", "data", "%(home)s/data").expect("set");
        assert_eq!(config.get("TEST", "data").expect("get"), "/srv/data");
        assert_eq!(config.get_raw("TEST", "data").expect("raw"), "%(home)s/data");

        let items = config.items("TEST").expect("items");
        assert_eq!(items[0], ("home".to_string(), "/srv".to_string()));
        assert!(items.contains(&("data".to_string(), "/srv/data".to_string())));

        let err = config.set("TEST", "bad", "50% off").unwrap_err();
        assert!(matches!(err, IniError::InterpolationSyntax { .. }));
    }

    #[test]
    fn raw_mode_keeps_special_characters() {
        let mut config = CryptConfig::with_options(IniOptions {
            interpolation: Interpolation::None,
            ..IniOptions::default()
        });
        config.add_section("TEST").expect("add");
        config.set("TEST", "special", r#"+oy%#"Xd2EYKc9Gb@u"#).expect("set");
        assert_eq!(config.get("TEST", "special").expect("get"), r#"+oy%#"Xd2EYKc9Gb@u"#);
    }

    #[test]
    fn remove_option_and_missing_section() {
        let mut config = sample();
        assert!(config.remove_option("TEST", "spam").expect("remove"));
        assert!(!config.remove_option("TEST", "spam").expect("remove again"));
        assert!(config.remove_option("DEFAULT", "home").expect("remove default"));
        assert!(matches!(config.remove_option("nope", "x"), Err(IniError::NoSection(_))));
        assert!(matches!(config.set("nope", "x", "1"), Err(IniError::NoSection(_))));
    }

    #[test]
    fn refuses_entries_that_would_not_read_back() {
        let mut config = CryptConfig::with_options(IniOptions {
            interpolation: Interpolation::None,
            ..IniOptions::default()
        });
        config.add_section("TEST").expect("add");
        let cases = [
            ("a=b", "v"),
            ("#hidden", "v"),
            ("[x", "v"),
            ("", "v"),
            (" padded", "v"),
            ("two\nlines", "v"),
            ("spaced", "  spaced  "),
            ("tail", "value\n"),
            ("note", "first\n#second"),
            ("indent", "first\n  second"),
        ];
        for (key, value) in cases {
            let err = config.set("TEST", key, value).unwrap_err();
            assert!(
                matches!(err, IniError::Unrepresentable { .. }),
                "{key:?} -> {err:?}"
            );
        }
        assert!(config.options("TEST").expect("options").is_empty());

        let err = config.set("TEST", "secret", "hunter2 ").unwrap_err();
        assert!(!err.to_string().contains("hunter2"));

        assert_eq!(
            config.add_section("two\nlines"),
            Err(IniError::InvalidSectionName("two\nlines".into()))
        );
    }

    #[test]
    fn accepted_multiline_values_read_back() {
        let mut config = CryptConfig::with_options(IniOptions {
            interpolation: Interpolation::None,
            ..IniOptions::default()
        });
        config.add_section("TEST").expect("add");
        config.set("TEST", "gap", "a\n\nb").expect("blank inner line");
        config.set("TEST", "inline", "x # not a comment").expect("set");
        config.set("TEST", "header", "one\n[two]").expect("set");
        let text = config.to_plaintext_string(true);

        let mut read = CryptConfig::with_options(IniOptions {
            interpolation: Interpolation::None,
            ..IniOptions::default()
        });
        read.read_string(&text, "<rendered>").expect("parse");
        assert_eq!(read.model(), config.model());

        let mut compact = CryptConfig::with_options(IniOptions {
            empty_lines_in_values: false,
            ..IniOptions::default()
        });
        compact.add_section("TEST").expect("add");
        assert!(matches!(
            compact.set("TEST", "gap", "a\n\nb"),
            Err(IniError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn encrypted_round_trip_in_memory() {
        let mut config = sample();
        config.set("TEST", "multi", "line one\nline two").expect("set");
        let key = config.generate_key(32).expect("generate");
        config.set_header_length(64).expect("header");
        config.set_footer_length(16).expect("footer");
        let blob = config.to_encrypted_bytes(true, None).expect("encrypt");

        let mut reader = CryptConfig::new();
        reader.set_key(key.as_bytes()).expect("set key");
        reader.set_header_length(64).expect("header");
        reader.set_footer_length(16).expect("footer");
        reader.read_encrypted_bytes(&blob, "<memory>", None).expect("decrypt");
        assert_eq!(reader.model(), config.model());
        assert_eq!(reader.get("TEST", "multi").expect("get"), "line one\nline two");
    }

    #[test]
    fn reading_merges_into_existing_values() {
        let mut config = sample();
        config.generate_key(16).expect("generate");
        let blob = config.to_encrypted_bytes(true, None).expect("encrypt");
        config.set("TEST", "spam", "No").expect("set");
        config.add_section("local").expect("add");
        config.read_encrypted_bytes(&blob, "<memory>", None).expect("decrypt");
        assert_eq!(config.get("TEST", "spam").expect("get"), "eggs");
        assert!(config.has_section("local"));
    }

    #[test]
    fn failed_parse_leaves_model_untouched() {
        let mut config = sample();
        let before = config.model().clone();
        let err = config.read_string("[x]\nok = 1\nbroken line\n", "<text>").unwrap_err();
        assert!(matches!(err, CryptError::MalformedConfig(_)));
        assert_eq!(config.model(), &before);
    }

    #[test]
    fn missing_key_is_reported() {
        let config = sample();
        assert!(matches!(config.to_encrypted_bytes(true, None), Err(CryptError::MissingKey)));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("TEST"));
        assert!(!rendered.contains("eggs"));
    }
}
