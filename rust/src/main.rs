//! Small CLI around the library. The key and padding come from
//! `CryptSettings`, never from the command line, so they do not end up in
//! shell history.

use std::env;
use std::fs;
use std::process::ExitCode;

use configparser_crypt::crypto::keys::{validate_key_length, DEFAULT_KEY_SIZE};
use configparser_crypt::logging::init_logging;
use configparser_crypt::settings::CryptSettings;
use configparser_crypt::{to_typed_dict, CryptConfig, SymmetricKey};
use tracing::Level;

fn print_usage() {
    eprintln!("Commands:\n  keygen [16|32]\n  encrypt <plain.ini> <out>\n  decrypt <in>\n  get <in> <section> <option>\n  dump-json <in>\n\nKey and padding are read from the JSON file named by CONFIGPARSER_CRYPT_SETTINGS,\nor from a base64 key in CONFIGPARSER_CRYPT_KEY.");
}

/// Config with the key and padding from the settings installed.
fn configured() -> Result<CryptConfig, String> {
    let settings = CryptSettings::from_env().map_err(|e| format!("settings: {e}"))?;
    let mut config = CryptConfig::new();
    settings
        .apply(&mut config)
        .map_err(|e| format!("settings: {e}"))?;
    Ok(config)
}

fn load(path: &str) -> Result<CryptConfig, String> {
    let mut config = configured()?;
    let opened = config
        .read_encrypted_file(path, None)
        .map_err(|e| format!("{path}: {e}"))?;
    if !opened {
        return Err(format!("{path}: file could not be opened"));
    }
    Ok(config)
}

fn keygen(size: Option<&str>) -> Result<(), String> {
    let size = match size {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| format!("key size must be 16 or 32, got {raw}"))?,
        None => DEFAULT_KEY_SIZE,
    };
    validate_key_length(size).map_err(|e| format!("{e}"))?;
    let key = SymmetricKey::generate(size).map_err(|e| format!("{e}"))?;
    println!("{}", key.to_base64().as_str());
    Ok(())
}

fn encrypt(plain_path: &str, out_path: &str) -> Result<(), String> {
    let mut config = configured()?;
    let text = fs::read_to_string(plain_path).map_err(|e| format!("{plain_path}: {e}"))?;
    config
        .read_string(&text, plain_path)
        .map_err(|e| format!("{e}"))?;
    config
        .write_encrypted_file(out_path, true, None)
        .map_err(|e| format!("{out_path}: {e}"))
}

fn decrypt(path: &str) -> Result<(), String> {
    let config = load(path)?;
    print!("{}", config.to_plaintext_string(true).as_str());
    Ok(())
}

fn get(path: &str, section: &str, option: &str) -> Result<(), String> {
    let config = load(path)?;
    let value = config.get(section, option).map_err(|e| format!("{e}"))?;
    println!("{value}");
    Ok(())
}

fn dump_json(path: &str) -> Result<(), String> {
    let config = load(path)?;
    let typed = to_typed_dict(&config).map_err(|e| format!("{e}"))?;
    let json = serde_json::to_string_pretty(&typed).map_err(|e| format!("json: {e}"))?;
    println!("{json}");
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = init_logging(Level::WARN) {
        eprintln!("logging setup failed: {err}");
    }

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::from(2);
    }

    let result = match (args[1].as_str(), args.len()) {
        ("keygen", 2) => keygen(None),
        ("keygen", 3) => keygen(Some(&args[2])),
        ("encrypt", 4) => encrypt(&args[2], &args[3]),
        ("decrypt", 3) => decrypt(&args[2]),
        ("get", 5) => get(&args[2], &args[3], &args[4]),
        ("dump-json", 3) => dump_json(&args[2]),
        _ => {
            print_usage();
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
