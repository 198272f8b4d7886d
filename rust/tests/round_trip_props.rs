use configparser_crypt::{CryptConfig, CryptError, IniError, IniOptions, Interpolation, SymmetricKey};
use proptest::prelude::*;

type Entries = Vec<(String, Vec<(String, String)>)>;

fn raw_config() -> CryptConfig {
    CryptConfig::with_options(IniOptions {
        interpolation: Interpolation::None,
        ..IniOptions::default()
    })
}

fn build(entries: &Entries) -> CryptConfig {
    let mut config = raw_config();
    for (section, options) in entries {
        if !config.has_section(section) {
            config.add_section(section).expect("add section");
        }
        for (key, value) in options {
            config.set(section, key, value.as_str()).expect("set");
        }
    }
    config
}

fn entries() -> impl Strategy<Value = Entries> {
    let section = "[a-zA-Z][a-zA-Z0-9_ .-]{0,10}[a-zA-Z0-9]"
        .prop_filter("reserved name", |name| name != "DEFAULT");
    let key = "[a-zA-Z_][a-zA-Z0-9_.-]{0,12}";
    // no surrounding whitespace: values are stripped on parse
    let value = "([!-~]([ -~]{0,30}[!-~])?)?";
    prop::collection::vec(
        (section, prop::collection::vec((key, value), 0..6)),
        0..5,
    )
}

/// Names and values built from the characters the INI layout gives meaning to.
fn awkward_entries() -> impl Strategy<Value = Vec<(String, String)>> {
    let key = "[ab#;=:\\[\\] \t%\n]{0,6}";
    let value = "[ab#;=:\\[\\] \t%\n]{0,12}";
    prop::collection::vec((key, value), 0..8)
}

fn key_size() -> impl Strategy<Value = usize> {
    prop_oneof![Just(16usize), Just(32usize)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_round_trip_preserves_model(
        entries in entries(),
        size in key_size(),
        header in 0usize..512,
        footer in 0usize..512,
        spaced in any::<bool>(),
    ) {
        let mut written = build(&entries);
        let key = written.generate_key(size).expect("generate");
        written.set_header_length(header).expect("header");
        written.set_footer_length(footer).expect("footer");
        let mut blob = Vec::new();
        written.write_encrypted(&mut blob, spaced, None).expect("write");

        let mut read = raw_config();
        read.set_key(key.as_bytes()).expect("key");
        read.set_header_length(header).expect("header");
        read.set_footer_length(footer).expect("footer");
        read.read_encrypted_bytes(&blob, "<prop>", None).expect("read");

        prop_assert_eq!(read.model(), written.model());
        prop_assert_eq!(read.sections(), written.sections());
    }

    #[test]
    fn prop_accepted_entries_read_back_unchanged(
        entries in awkward_entries(),
        empty_lines_in_values in any::<bool>(),
        spaced in any::<bool>(),
    ) {
        let options = IniOptions {
            interpolation: Interpolation::None,
            empty_lines_in_values,
            ..IniOptions::default()
        };
        let mut written = CryptConfig::with_options(options.clone());
        written.add_section("s").expect("add section");
        for (key, value) in &entries {
            match written.set("s", key, value.as_str()) {
                Ok(()) | Err(IniError::Unrepresentable { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        let text = written.to_plaintext_string(spaced);
        let mut read = CryptConfig::with_options(options);
        read.read_string(&text, "<prop>").expect("accepted entries parse");
        prop_assert_eq!(read.model(), written.model());
    }

    #[test]
    fn prop_other_key_never_decrypts(
        entries in entries(),
        size in key_size(),
        other_size in key_size(),
    ) {
        let mut written = build(&entries);
        written.generate_key(size).expect("generate");
        let blob = written.to_encrypted_bytes(true, None).expect("encrypt");

        let other = SymmetricKey::generate(other_size).expect("generate");
        let mut read = raw_config();
        let result = read.read_encrypted_bytes(&blob, "<prop>", Some(other.as_bytes()));
        prop_assert!(matches!(result, Err(CryptError::Decryption)));
        prop_assert!(read.sections().is_empty());
    }
}
