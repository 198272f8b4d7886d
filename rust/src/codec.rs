//! Encrypted codec: seals a rendered config buffer into an envelope and opens
//! it again. Each call resolves its key into a scoped, zeroizing copy that is
//! wiped when the call returns, on success and on every error path.

use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::envelope::{self, EnvelopeMetadata};
use crate::crypto::keys::SymmetricKey;
use crate::crypto::padding::PaddingPolicy;
use crate::error::CryptError;

/// Picks the per-call key over the stored one. The returned copy lives only
/// as long as the caller's scope.
pub fn resolve_key(
    explicit: Option<&[u8]>,
    stored: Option<&SymmetricKey>,
) -> Result<Zeroizing<Vec<u8>>, CryptError> {
    match (explicit, stored) {
        (Some(key), _) => Ok(Zeroizing::new(key.to_vec())),
        (None, Some(key)) => Ok(Zeroizing::new(key.as_bytes().to_vec())),
        (None, None) => Err(CryptError::MissingKey),
    }
}

/// Stateless view over a stored key and the padding lengths in effect.
#[derive(Debug, Clone, Copy)]
pub struct EncryptedCodec<'a> {
    stored: Option<&'a SymmetricKey>,
    padding: PaddingPolicy,
}

impl<'a> EncryptedCodec<'a> {
    pub fn new(stored: Option<&'a SymmetricKey>, padding: PaddingPolicy) -> Self {
        Self { stored, padding }
    }

    pub fn padding(&self) -> PaddingPolicy {
        self.padding
    }

    /// Encrypts `plaintext`. `key` takes precedence over the stored key.
    pub fn encode(&self, plaintext: &[u8], key: Option<&[u8]>) -> Result<Vec<u8>, CryptError> {
        let key = resolve_key(key, self.stored)?;
        let blob = envelope::encrypt_message_hf(
            plaintext,
            &key,
            self.padding.header_length(),
            self.padding.footer_length(),
        )
        .map_err(|e| CryptError::Encryption(format!("{e}")))?;
        debug!(
            plaintext_len = plaintext.len(),
            blob_len = blob.len(),
            header_length = self.padding.header_length(),
            footer_length = self.padding.footer_length(),
            "sealed config envelope"
        );
        Ok(blob)
    }

    /// Decrypts `blob` into UTF-8 text.
    pub fn decode(&self, blob: &[u8], key: Option<&[u8]>) -> Result<Zeroizing<String>, CryptError> {
        self.decode_with_metadata(blob, key).map(|(_, text)| text)
    }

    /// Like [`decode`](Self::decode), also returning the sealing metadata.
    ///
    /// Wrong key, corrupted data and mismatched padding all surface as the
    /// same [`CryptError::Decryption`].
    pub fn decode_with_metadata(
        &self,
        blob: &[u8],
        key: Option<&[u8]>,
    ) -> Result<(EnvelopeMetadata, Zeroizing<String>), CryptError> {
        let key = resolve_key(key, self.stored)?;
        let (metadata, mut raw) = envelope::decrypt_message_hf(
            blob,
            &key,
            self.padding.header_length(),
            self.padding.footer_length(),
        )
        .map_err(|e| {
            debug!(blob_len = blob.len(), reason = %e, "config envelope rejected");
            CryptError::Decryption
        })?;
        drop(key);

        let text = String::from_utf8(std::mem::take(&mut *raw)).map_err(|e| {
            let reason = e.utf8_error().to_string();
            e.into_bytes().zeroize();
            CryptError::Encoding(reason)
        })?;
        debug!(timestamp = metadata.timestamp, "opened config envelope");
        Ok((metadata, Zeroizing::new(text)))
    }
}
