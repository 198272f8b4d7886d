//! Encrypted INI configuration files.
//!
//! A [`CryptConfig`] behaves like a plain section/key/value config parser, but
//! everything it persists goes through an AES-GCM envelope with optional random
//! padding, so the file on disk is unreadable without the shared key. The
//! crate stays small so the key lifecycle can be audited in one sitting.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
mod fileio;
pub mod ini;
pub mod logging;
pub mod settings;
pub mod typed;

pub use codec::EncryptedCodec;
pub use config::CryptConfig;
pub use crypto::keys::SymmetricKey;
pub use crypto::padding::PaddingPolicy;
pub use error::CryptError;
pub use ini::{IniError, IniFormat, IniOptions, Interpolation, Sections, TextFormat};
pub use typed::{from_typed_dict, to_typed_dict, TypedConfigDict, TypedValue};
