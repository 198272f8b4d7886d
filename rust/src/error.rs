//! Error taxonomy for the encrypted config pipeline. Every variant names the
//! phase that failed; none of them carry key bytes or decrypted text.

use thiserror::Error;

use crate::ini::IniError;

#[derive(Debug, Error)]
pub enum CryptError {
    #[error("invalid key length; expected 16 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("no encryption key provided")]
    MissingKey,
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("key source unreadable: {0}")]
    KeySource(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed (wrong key, wrong padding lengths or corrupted data)")]
    Decryption,
    #[error("decrypted data is not valid utf-8: {0}")]
    Encoding(String),
    #[error("malformed config: {0}")]
    MalformedConfig(String),
    #[error("invalid padding length: {0}")]
    InvalidPaddingLength(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] IniError),
}
