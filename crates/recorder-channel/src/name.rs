//! A bounded ASCII channel name, sized to fit the directory's `name[64]`
//! field (spec.md §6) with room for the trailing NUL.

use std::fmt;

pub const MAX_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidChannelName {
    TooLong { len: usize },
    NotAscii,
    Empty,
}

impl fmt::Display for InvalidChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { len } => {
                write!(f, "channel name is {len} bytes, longer than {MAX_NAME_LEN}")
            }
            Self::NotAscii => write!(f, "channel name must be ASCII"),
            Self::Empty => write!(f, "channel name must not be empty"),
        }
    }
}

impl std::error::Error for InvalidChannelName {}

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidChannelName> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidChannelName::Empty);
        }
        if !name.is_ascii() {
            return Err(InvalidChannelName::NotAscii);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(InvalidChannelName::TooLong { len: name.len() });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Null-padded bytes suitable for the directory's fixed-width field.
    pub fn to_padded_bytes<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        let bytes = self.0.as_bytes();
        out[..bytes.len()].copy_from_slice(bytes);
        out
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
