//! Cryptographic building blocks: key handling, padding lengths and the
//! AES-GCM envelope. The codec and config layers only talk to these modules.

pub mod envelope;
pub mod keys;
pub mod padding;
