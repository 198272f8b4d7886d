//! AES-GCM envelope with random header and footer padding.
//!
//! Layout: `[header random bytes][nonce][AEAD(timestamp || data) + tag][footer random bytes]`.
//! The padding lengths are not recorded anywhere in the blob; the reader must
//! be given the same lengths the writer used or authentication fails.

use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const TIMESTAMP_LEN: usize = 8;

/// Bytes added to every payload regardless of padding.
pub const ENVELOPE_OVERHEAD: usize = NONCE_LEN + TAG_LEN + TIMESTAMP_LEN;

/// Key sizes accepted by the envelope (AES-128 and AES-256).
pub const SUPPORTED_KEY_SIZES: [usize; 2] = [16, 32];

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unsupported key length {0}; expected 16 or 32 bytes")]
    InvalidKeyLength(usize),
    #[error("random source failed: {0}")]
    Random(String),
    #[error("cipher failure: {0}")]
    Cipher(String),
    #[error("authentication failed")]
    Authentication,
}

/// Data carried inside the ciphertext next to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeMetadata {
    /// UNIX time (seconds) at which the envelope was sealed.
    pub timestamp: u64,
}

enum Cipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self, EnvelopeError> {
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key)
                .map(Cipher::Aes128)
                .map_err(|_| EnvelopeError::InvalidKeyLength(key.len())),
            32 => Aes256Gcm::new_from_slice(key)
                .map(Cipher::Aes256)
                .map_err(|_| EnvelopeError::InvalidKeyLength(key.len())),
            other => Err(EnvelopeError::InvalidKeyLength(other)),
        }
    }

    fn seal(&self, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Cipher::Aes128(cipher) => cipher.encrypt(Nonce::from_slice(nonce), plaintext),
            Cipher::Aes256(cipher) => cipher.encrypt(Nonce::from_slice(nonce), plaintext),
        }
    }

    fn open(&self, nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Cipher::Aes128(cipher) => cipher.decrypt(Nonce::from_slice(nonce), sealed),
            Cipher::Aes256(cipher) => cipher.decrypt(Nonce::from_slice(nonce), sealed),
        }
    }
}

fn random_bytes(len: usize) -> Result<Vec<u8>, EnvelopeError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EnvelopeError::Random(format!("{e}")))?;
    Ok(bytes)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Generates a random key of `size` bytes. Only AES key sizes are allowed.
pub fn random_key(size: usize) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    if !SUPPORTED_KEY_SIZES.contains(&size) {
        return Err(EnvelopeError::InvalidKeyLength(size));
    }
    Ok(Zeroizing::new(random_bytes(size)?))
}

/// Seals `data` and surrounds the result with `header_len` and `footer_len`
/// random bytes.
pub fn encrypt_message_hf(
    data: &[u8],
    key: &[u8],
    header_len: usize,
    footer_len: usize,
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = Cipher::new(key)?;
    let nonce = random_bytes(NONCE_LEN)?;

    let mut payload = Zeroizing::new(Vec::with_capacity(TIMESTAMP_LEN + data.len()));
    payload.extend_from_slice(&unix_timestamp().to_be_bytes());
    payload.extend_from_slice(data);

    let sealed = cipher
        .seal(&nonce, &payload)
        .map_err(|e| EnvelopeError::Cipher(format!("{e}")))?;

    let mut blob = Vec::with_capacity(header_len + NONCE_LEN + sealed.len() + footer_len);
    blob.extend_from_slice(&random_bytes(header_len)?);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&sealed);
    blob.extend_from_slice(&random_bytes(footer_len)?);
    Ok(blob)
}

/// Strips the padding from `blob` and opens the sealed payload.
///
/// Every failure after the key check (short blob, padding mismatch, wrong
/// key, tampering) is reported as [`EnvelopeError::Authentication`].
pub fn decrypt_message_hf(
    blob: &[u8],
    key: &[u8],
    header_len: usize,
    footer_len: usize,
) -> Result<(EnvelopeMetadata, Zeroizing<Vec<u8>>), EnvelopeError> {
    let cipher = Cipher::new(key)?;

    let minimum = header_len
        .checked_add(footer_len)
        .and_then(|padding| padding.checked_add(ENVELOPE_OVERHEAD))
        .ok_or(EnvelopeError::Authentication)?;
    if blob.len() < minimum {
        return Err(EnvelopeError::Authentication);
    }

    let body = &blob[header_len..blob.len() - footer_len];
    let (nonce, sealed) = body.split_at(NONCE_LEN);
    let payload = Zeroizing::new(
        cipher
            .open(nonce, sealed)
            .map_err(|_| EnvelopeError::Authentication)?,
    );

    let (stamp, data) = payload.split_at(TIMESTAMP_LEN);
    let mut stamp_bytes = [0u8; TIMESTAMP_LEN];
    stamp_bytes.copy_from_slice(stamp);
    let metadata = EnvelopeMetadata {
        timestamp: u64::from_be_bytes(stamp_bytes),
    };
    Ok((metadata, Zeroizing::new(data.to_vec())))
}
