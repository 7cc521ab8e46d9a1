//! Error types for the codec layer.

use core::fmt;

/// A specialized [`Result`] type for codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// An error encountered while decoding a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The stream ended in the middle of an encoded unit.
    UnexpectedEof,
    /// A byte that is not a hexadecimal digit appeared in hex-encoded data.
    InvalidHexDigit(u8),
    /// A byte outside the encoding's alphabet appeared in the stream.
    InvalidCharacter(u8),
    /// The `z` zero-group shorthand appeared inside an ASCII85 group.
    MisplacedZeroGroup,
    /// An ASCII85 group decoded to a value that does not fit in 32 bits.
    GroupOverflow,
    /// The escape byte 128 was followed by an unknown sub-mode marker.
    InvalidSubMode(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => f.write_str("unexpected end of stream"),
            Self::InvalidHexDigit(b) => write!(f, "invalid hex digit 0x{b:02x}"),
            Self::InvalidCharacter(b) => write!(f, "invalid character 0x{b:02x}"),
            Self::MisplacedZeroGroup => f.write_str("'z' inside an ASCII85 group"),
            Self::GroupOverflow => f.write_str("ASCII85 group exceeds 32 bits"),
            Self::InvalidSubMode(b) => write!(f, "invalid eexec sub-mode marker {b}"),
        }
    }
}

impl core::error::Error for Error {}
