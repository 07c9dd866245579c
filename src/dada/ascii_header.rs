// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! PSRDADA-style ASCII metadata blocks.

use super::RingBufferError;

/// An ASCII metadata block. Each line holds a key followed by whitespace and a
/// value, e.g.
///
/// ```text
/// SOURCE        B0531+21
/// SCIENCE_CASE  3
/// ```
///
/// Only the first whitespace-delimited token after a key is its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiHeader {
    text: String,
}

impl AsciiHeader {
    pub fn new<S: Into<String>>(text: S) -> AsciiHeader {
        AsciiHeader { text: text.into() }
    }

    /// Interpret the raw bytes of a metadata block. Producers pad the block
    /// with NULs, so anything after the first NUL is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<AsciiHeader, RingBufferError> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text =
            std::str::from_utf8(&bytes[..end]).map_err(|_| RingBufferError::MetadataNotText)?;
        if !text.is_ascii() {
            return Err(RingBufferError::MetadataNotText);
        }
        Ok(AsciiHeader::new(text))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Get the value of `key`. If the key appears more than once, the first
    /// occurrence with a value wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.text.lines().find_map(|line| {
            let mut tokens = line.split_ascii_whitespace();
            match tokens.next() {
                Some(k) if k == key => tokens.next(),
                _ => None,
            }
        })
    }
}
