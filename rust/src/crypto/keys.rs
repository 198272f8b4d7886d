//! Key manager for the symmetric key protecting config files.
//! Keys are AES-128 or AES-256 sized, are wiped from memory on drop and never
//! show up in `Debug` output; only a short SHA-256 fingerprint does.

use std::fmt;
use std::fs;
use std::path::Path;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::envelope::{self, SUPPORTED_KEY_SIZES};
use crate::error::CryptError;

/// AES-256 sized keys are generated unless a caller asks otherwise.
pub const DEFAULT_KEY_SIZE: usize = 32;

const DERIVED_KEY_LEN: usize = 32;
const FINGERPRINT_BYTES: usize = 8;

/// Rejects any length other than 16 or 32 bytes.
pub fn validate_key_length(len: usize) -> Result<(), CryptError> {
    if SUPPORTED_KEY_SIZES.contains(&len) {
        Ok(())
    } else {
        Err(CryptError::InvalidKeyLength(len))
    }
}

#[derive(Clone)]
pub struct SymmetricKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    /// Copies raw key bytes after checking their length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptError> {
        validate_key_length(bytes.len())?;
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Draws a fresh key from the operating system RNG.
    pub fn generate(size: usize) -> Result<Self, CryptError> {
        let bytes =
            envelope::random_key(size).map_err(|e| CryptError::KeyGeneration(format!("{e}")))?;
        Ok(Self { bytes })
    }

    /// Decodes a base64 key, padded or not. Decoder errors are not echoed
    /// since they can quote key characters.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptError> {
        let decoded = Zeroizing::new(
            STANDARD_NO_PAD
                .decode(encoded.trim().trim_end_matches('=').as_bytes())
                .map_err(|_| CryptError::KeySource("invalid base64 key encoding".to_string()))?,
        );
        Self::from_bytes(&decoded)
    }

    /// Reads a base64-encoded key from an environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, CryptError> {
        let encoded = Zeroizing::new(
            std::env::var(var).map_err(|e| CryptError::KeySource(format!("{var}: {e}")))?,
        );
        Self::from_base64(&encoded)
    }

    /// Reads a base64-encoded key from disk.
    pub fn from_key_file(path: &Path) -> Result<Self, CryptError> {
        let content = Zeroizing::new(
            fs::read_to_string(path)
                .map_err(|e| CryptError::KeySource(format!("{}: {e}", path.display())))?,
        );
        Self::from_base64(&content)
    }

    /// Derives a 32 byte key from a passphrase using Argon2id. The salt must be
    /// random per deployment and stored next to the encrypted files.
    pub fn derive_from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, CryptError> {
        let params = Params::new(19 * 1024, 3, 1, Some(DERIVED_KEY_LEN))
            .map_err(|e| CryptError::KeyGeneration(format!("{e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = [0u8; DERIVED_KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut output)
            .map_err(|e| CryptError::KeyGeneration(format!("{e}")))?;

        let key = Self::from_bytes(&output);
        output.zeroize();
        key
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 form for handing a generated key to a secret store.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.bytes.as_slice()))
    }

    /// Short hex id of the key, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.as_slice());
        digest[..FINGERPRINT_BYTES]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("len", &self.bytes.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
