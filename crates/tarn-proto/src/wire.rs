//! Wire-format cursor.
//!
//! A bounds-checked reader over raw packet bytes, with the compressed-name
//! skipping the RR walkers need.

use crate::error::{Error, Result};
use crate::MAX_NAME_LENGTH;

/// A cursor for reading DNS wire format data.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    /// The underlying data.
    data: &'a [u8],
    /// Current position.
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a new wire reader.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Advances the position by the given amount.
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::unexpected_eof(self.pos + n));
        }
        self.pos += n;
        Ok(())
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(Error::unexpected_eof(self.pos));
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Reads a big-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        if self.remaining() < 2 {
            return Err(Error::unexpected_eof(self.pos + 2));
        }
        let value = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    /// Reads a big-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        if self.remaining() < 4 {
            return Err(Error::unexpected_eof(self.pos + 4));
        }
        let value = u32::from_be_bytes(
            self.data[self.pos..self.pos + 4]
                .try_into()
                .expect("length checked"),
        );
        self.pos += 4;
        Ok(value)
    }

    /// Skips one encoded domain name, compressed or not.
    ///
    /// A compression pointer terminates the name: its two bytes are
    /// consumed and the target is not followed, which is all the section
    /// walkers need.
    pub fn skip_name(&mut self) -> Result<()> {
        let mut walked = 0usize;
        loop {
            let len = self.read_u8()?;
            if len == 0 {
                return Ok(());
            }
            if len & 0xC0 == 0xC0 {
                // Second pointer byte.
                self.skip(1)?;
                return Ok(());
            }
            if len & 0xC0 != 0 {
                return Err(Error::invalid_data(self.pos - 1, "reserved label type"));
            }
            walked += 1 + len as usize;
            if walked > MAX_NAME_LENGTH {
                return Err(Error::NameTooLong { length: walked });
            }
            self.skip(len as usize)?;
        }
    }
}
