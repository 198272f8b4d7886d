//! Random header/footer lengths wrapped around every envelope.
//! The lengths are configuration, not metadata: they are never written to
//! the file, so reader and writer must be configured identically.

use std::fmt::Display;

use crate::error::CryptError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaddingPolicy {
    header_length: usize,
    footer_length: usize,
}

impl PaddingPolicy {
    /// No padding on either side.
    pub const NONE: PaddingPolicy = PaddingPolicy {
        header_length: 0,
        footer_length: 0,
    };

    pub fn new(header_length: usize, footer_length: usize) -> Self {
        Self {
            header_length,
            footer_length,
        }
    }

    pub fn header_length(&self) -> usize {
        self.header_length
    }

    pub fn footer_length(&self) -> usize {
        self.footer_length
    }

    /// Number of random bytes added to a blob.
    pub fn total(&self) -> usize {
        self.header_length.saturating_add(self.footer_length)
    }

    pub fn set_header_length<N>(&mut self, n: N) -> Result<(), CryptError>
    where
        N: TryInto<usize> + Display + Copy,
    {
        self.header_length = non_negative("header", n)?;
        Ok(())
    }

    pub fn set_footer_length<N>(&mut self, n: N) -> Result<(), CryptError>
    where
        N: TryInto<usize> + Display + Copy,
    {
        self.footer_length = non_negative("footer", n)?;
        Ok(())
    }
}

fn non_negative<N>(which: &str, n: N) -> Result<usize, CryptError>
where
    N: TryInto<usize> + Display + Copy,
{
    n.try_into().map_err(|_| {
        CryptError::InvalidPaddingLength(format!(
            "{which} length must be a non-negative integer, got {n}"
        ))
    })
}
