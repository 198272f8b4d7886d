//! Settings for the command line tool: where the key comes from and which
//! padding lengths to use. Loaded from an optional JSON file so the key itself
//! never has to appear on the command line.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::CryptConfig;
use crate::crypto::keys::SymmetricKey;
use crate::crypto::padding::PaddingPolicy;
use crate::ini::TextFormat;

/// Names the JSON settings file.
pub const SETTINGS_ENV: &str = "CONFIGPARSER_CRYPT_SETTINGS";
/// Default variable holding a base64 key.
pub const DEFAULT_KEY_ENV: &str = "CONFIGPARSER_CRYPT_KEY";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file unreadable: {0}")]
    Io(String),
    #[error("settings parse failed: {0}")]
    Parse(String),
    #[error("key source failed: {0}")]
    Key(String),
    #[error("no usable key source configured")]
    MissingKeySource,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CryptSettings {
    /// Environment variable holding a base64-encoded 16 or 32 byte key.
    pub key_env: Option<String>,
    /// File holding a base64-encoded key.
    pub key_path: Option<PathBuf>,
    /// Environment variable holding a passphrase for Argon2id.
    pub passphrase_env: Option<String>,
    /// Base64 salt used with the passphrase.
    pub salt_b64: Option<String>,
    pub header_length: usize,
    pub footer_length: usize,
}

impl Default for CryptSettings {
    fn default() -> Self {
        Self {
            key_env: Some(DEFAULT_KEY_ENV.to_string()),
            key_path: None,
            passphrase_env: None,
            salt_b64: None,
            header_length: 0,
            footer_length: 0,
        }
    }
}

impl CryptSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(&path).map_err(|e| SettingsError::Io(format!("{e}")))?;
        serde_json::from_str(&raw).map_err(|e| SettingsError::Parse(format!("{e}")))
    }

    /// Reads the file named by `CONFIGPARSER_CRYPT_SETTINGS`, or falls back to
    /// the defaults when the variable is unset.
    pub fn from_env() -> Result<Self, SettingsError> {
        match env::var_os(SETTINGS_ENV) {
            Some(path) => {
                debug!(path = ?path, "loading settings file");
                Self::from_file(PathBuf::from(path))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn padding(&self) -> PaddingPolicy {
        PaddingPolicy::new(self.header_length, self.footer_length)
    }

    /// Tries `key_env` (when that variable is set), then `key_path`, then the
    /// passphrase.
    pub fn resolve_key(&self) -> Result<SymmetricKey, SettingsError> {
        if let Some(var) = self.key_env.as_deref().filter(|var| env::var_os(var).is_some()) {
            debug!(source = "env", var, "resolving key");
            return SymmetricKey::from_env_var(var).map_err(|e| SettingsError::Key(format!("{e}")));
        }
        if let Some(path) = &self.key_path {
            debug!(source = "file", path = %path.display(), "resolving key");
            return SymmetricKey::from_key_file(path).map_err(|e| SettingsError::Key(format!("{e}")));
        }
        if let (Some(pass_env), Some(salt_b64)) = (&self.passphrase_env, &self.salt_b64) {
            debug!(source = "passphrase", var = %pass_env, "resolving key");
            let passphrase = Zeroizing::new(
                env::var(pass_env).map_err(|e| SettingsError::Key(format!("{pass_env}: {e}")))?,
            );
            let salt = STANDARD_NO_PAD
                .decode(salt_b64.trim().trim_end_matches('=').as_bytes())
                .map_err(|e| SettingsError::Key(format!("salt: {e}")))?;
            return SymmetricKey::derive_from_passphrase(&passphrase, &salt)
                .map_err(|e| SettingsError::Key(format!("{e}")));
        }
        Err(SettingsError::MissingKeySource)
    }

    /// Installs the resolved key and the padding lengths on `config`.
    pub fn apply<F: TextFormat>(&self, config: &mut CryptConfig<F>) -> Result<(), SettingsError> {
        config.set_symmetric_key(self.resolve_key()?);
        config.set_padding(self.padding());
        Ok(())
    }
}
