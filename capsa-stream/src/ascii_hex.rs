//! ASCII-Hex decoding and encoding.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::source::{ByteSource, is_whitespace};

pub(crate) fn decode_hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// A streaming ASCII-Hex decoder.
///
/// Two hex digits per byte, case-insensitive, with whitespace tolerated
/// between digits. The terminator is `'>'`; an odd trailing digit becomes
/// the high nibble of a final byte.
pub struct AsciiHexDecoder<S> {
    source: S,
    end_of_data: bool,
    pushback: Option<u8>,
}

impl<S: ByteSource> AsciiHexDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            end_of_data: false,
            pushback: None,
        }
    }

    fn next_digit(&mut self) -> Result<Option<u8>> {
        loop {
            let Some(b) = self.source.getchar()? else {
                // Missing terminator is tolerated.
                self.end_of_data = true;
                return Ok(None);
            };

            if is_whitespace(b) {
                continue;
            }

            if b == b'>' {
                self.end_of_data = true;
                return Ok(None);
            }

            let digit = decode_hex_digit(b).ok_or(Error::InvalidHexDigit(b))?;
            return Ok(Some(digit));
        }
    }
}

impl<S: ByteSource> ByteSource for AsciiHexDecoder<S> {
    fn getchar(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }

        if self.end_of_data {
            return Ok(None);
        }

        let Some(hi) = self.next_digit()? else {
            return Ok(None);
        };

        // The low nibble of an odd trailing digit defaults to zero.
        let lo = self.next_digit()?.unwrap_or(0);

        Ok(Some(hi << 4 | lo))
    }

    fn ungetchar(&mut self, byte: u8) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(byte);
    }
}

/// A streaming ASCII-Hex encoder.
///
/// Emits uppercase digit pairs wrapped at 16 output characters per line;
/// [`finish`](Self::finish) appends the `'>'` terminator.
pub struct AsciiHexEncoder {
    out: Vec<u8>,
    line: usize,
}

impl AsciiHexEncoder {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            line: 0,
        }
    }

    pub fn putchar(&mut self, byte: u8) {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

        if self.line == 16 {
            self.out.push(b'\n');
            self.line = 0;
        }

        self.out.push(DIGITS[(byte >> 4) as usize]);
        self.out.push(DIGITS[(byte & 0x0F) as usize]);
        self.line += 2;
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.out.push(b'>');
        self.out
    }
}

impl Default for AsciiHexEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::source::SliceSource;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = AsciiHexDecoder::new(SliceSource::new(input));
        let mut out = Vec::new();
        while let Some(b) = decoder.getchar()? {
            out.push(b);
        }
        Ok(out)
    }

    fn encode(input: &[u8]) -> Vec<u8> {
        let mut encoder = AsciiHexEncoder::new();
        for b in input {
            encoder.putchar(*b);
        }
        encoder.finish()
    }

    #[test]
    fn simple() {
        assert_eq!(decode(b"48656C6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn empty() {
        assert_eq!(decode(b">").unwrap(), b"");
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(decode(b"aB3e>").unwrap(), &[0xAB, 0x3E]);
    }

    #[test]
    fn whitespace_tolerated() {
        assert_eq!(decode(b"48 65 6C\n6C 6F>").unwrap(), b"Hello");
        assert_eq!(decode(b"4 8656C6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn odd_trailing_digit() {
        assert_eq!(decode(b"ABC>").unwrap(), &[0xAB, 0xC0]);
    }

    #[test]
    fn invalid_digit() {
        assert_eq!(decode(b"4G>"), Err(Error::InvalidHexDigit(b'G')));
    }

    #[test]
    fn missing_terminator() {
        assert_eq!(decode(b"4142").unwrap(), b"AB");
    }

    #[test]
    fn end_of_data_is_latched() {
        let mut decoder = AsciiHexDecoder::new(SliceSource::new(b"41>42>"));
        assert_eq!(decoder.getchar().unwrap(), Some(0x41));
        assert_eq!(decoder.getchar().unwrap(), None);
        assert_eq!(decoder.getchar().unwrap(), None);
    }

    #[test]
    fn encode_wraps_lines() {
        let out = encode(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(out, b"DEADBEEF00112233\n4455>");
    }

    #[test]
    fn round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }
}
