//! ASCII85 (base-85) decoding and encoding.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::source::{ByteSource, is_whitespace};

const POW_85: [u32; 5] = [52200625, 614125, 7225, 85, 1];

/// A streaming ASCII85 decoder.
///
/// Groups of five characters in `'!'..='u'` decode to four bytes. The
/// character `'z'` abbreviates an all-zero group and is only legal on a
/// group boundary. The terminator is the two-character sequence `~>`;
/// whitespace between characters is skipped and does not count toward the
/// group position.
pub struct Ascii85Decoder<S> {
    source: S,
    block: [u8; 4],
    filled: usize,
    pos: usize,
    end_of_data: bool,
    pushback: Option<u8>,
}

impl<S: ByteSource> Ascii85Decoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            block: [0; 4],
            filled: 0,
            pos: 0,
            end_of_data: false,
            pushback: None,
        }
    }

    /// Decode one full or trailing group into the block buffer.
    fn refill(&mut self) -> Result<()> {
        let mut group = [0_u8; 5];
        let mut len = 0;

        loop {
            let Some(b) = self.next_char()? else {
                // Missing terminator. EOF on a group boundary is accepted,
                // EOF inside a group is not.
                if len == 0 {
                    self.end_of_data = true;
                    return Ok(());
                }
                return Err(Error::UnexpectedEof);
            };

            match b {
                b'!'..=b'u' => {
                    group[len] = b;
                    len += 1;

                    if len == 5 {
                        self.flush_group(&group, 4)?;
                        return Ok(());
                    }
                }
                b'z' => {
                    if len != 0 {
                        return Err(Error::MisplacedZeroGroup);
                    }

                    self.block = [0; 4];
                    self.filled = 4;
                    self.pos = 0;
                    return Ok(());
                }
                b'~' => {
                    if let Some(next) = self.next_char()? {
                        if next != b'>' {
                            return Err(Error::InvalidCharacter(next));
                        }
                    }

                    self.end_of_data = true;

                    match len {
                        0 => return Ok(()),
                        1 => return Err(Error::UnexpectedEof),
                        n => {
                            // Zero-pad the trailing group; it yields one
                            // byte less than its character count.
                            group[n..].fill(b'u');
                            self.flush_group(&group, n - 1)?;
                            return Ok(());
                        }
                    }
                }
                _ => return Err(Error::InvalidCharacter(b)),
            }
        }
    }

    fn flush_group(&mut self, group: &[u8; 5], output_len: usize) -> Result<()> {
        let digits = group.map(|b| (b - b'!') as u32);

        let value = digits[0]
            .checked_mul(POW_85[0])
            .and_then(|v| v.checked_add(digits[1] * POW_85[1]))
            .and_then(|v| v.checked_add(digits[2] * POW_85[2]))
            .and_then(|v| v.checked_add(digits[3] * POW_85[3]))
            .and_then(|v| v.checked_add(digits[4]))
            .ok_or(Error::GroupOverflow)?;

        let bytes = value.to_be_bytes();
        self.block[..output_len].copy_from_slice(&bytes[..output_len]);
        self.filled = output_len;
        self.pos = 0;

        Ok(())
    }

    fn next_char(&mut self) -> Result<Option<u8>> {
        loop {
            match self.source.getchar()? {
                Some(b) if is_whitespace(b) => {}
                other => return Ok(other),
            }
        }
    }
}

impl<S: ByteSource> ByteSource for Ascii85Decoder<S> {
    fn getchar(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }

        if self.pos == self.filled {
            if self.end_of_data {
                return Ok(None);
            }

            self.filled = 0;
            self.pos = 0;
            self.refill()?;

            if self.filled == 0 {
                return Ok(None);
            }
        }

        let b = self.block[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    fn ungetchar(&mut self, byte: u8) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(byte);
    }
}

/// A streaming ASCII85 encoder.
///
/// Buffers four raw bytes at a time; an all-zero group collapses to `'z'`.
/// [`finish`](Self::finish) flushes a short trailing group zero-padded and
/// appends the `~>` terminator.
pub struct Ascii85Encoder {
    out: Vec<u8>,
    block: [u8; 4],
    len: usize,
}

impl Ascii85Encoder {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            block: [0; 4],
            len: 0,
        }
    }

    pub fn putchar(&mut self, byte: u8) {
        self.block[self.len] = byte;
        self.len += 1;

        if self.len == 4 {
            let value = u32::from_be_bytes(self.block);

            if value == 0 {
                self.out.push(b'z');
            } else {
                self.push_digits(value, 5);
            }

            self.len = 0;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.len > 0 {
            self.block[self.len..].fill(0);
            let value = u32::from_be_bytes(self.block);
            let count = self.len + 1;
            self.push_digits(value, count);
        }

        self.out.extend_from_slice(b"~>");
        self.out
    }

    fn push_digits(&mut self, value: u32, count: usize) {
        let mut value = value;
        let mut digits = [0_u8; 5];

        for d in digits.iter_mut().rev() {
            *d = (value % 85) as u8 + b'!';
            value /= 85;
        }

        self.out.extend_from_slice(&digits[..count]);
    }
}

impl Default for Ascii85Encoder {
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
        let mut decoder = Ascii85Decoder::new(SliceSource::new(input));
        let mut out = Vec::new();
        while let Some(b) = decoder.getchar()? {
            out.push(b);
        }
        Ok(out)
    }

    fn encode(input: &[u8]) -> Vec<u8> {
        let mut encoder = Ascii85Encoder::new();
        for b in input {
            encoder.putchar(*b);
        }
        encoder.finish()
    }

    #[test]
    fn simple() {
        // "Hello" in ASCII85 is "87cURDZ".
        assert_eq!(decode(b"87cURDZ~>").unwrap(), b"Hello");
    }

    #[test]
    fn empty() {
        assert_eq!(decode(b"~>").unwrap(), b"");
    }

    #[test]
    fn zero_group_shorthand() {
        assert_eq!(decode(b"z~>").unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn zero_inside_group_is_an_error() {
        assert_eq!(decode(b"87zcUR~>"), Err(Error::MisplacedZeroGroup));
    }

    #[test]
    fn whitespace_does_not_count_toward_groups() {
        assert_eq!(decode(b"87cU RDZ~>").unwrap(), b"Hello");
        assert_eq!(decode(b"8 7 c U R D Z ~>").unwrap(), b"Hello");
    }

    #[test]
    fn group_overflow() {
        // "uuuuu" decodes to a value above 2^32.
        assert_eq!(decode(b"uuuuu~>"), Err(Error::GroupOverflow));
    }

    #[test]
    fn single_trailing_character() {
        assert_eq!(decode(b"87cUR8~>"), Err(Error::UnexpectedEof));
    }

    #[test]
    fn invalid_character() {
        assert_eq!(decode(b"87c\x7fUR~>"), Err(Error::InvalidCharacter(0x7f)));
    }

    #[test]
    fn missing_terminator_on_group_boundary() {
        assert_eq!(decode(b"87cUR").unwrap(), b"Hell");
    }

    #[test]
    fn eof_inside_group() {
        assert_eq!(decode(b"87cURDZ"), Err(Error::UnexpectedEof));
    }

    #[test]
    fn end_of_data_is_latched() {
        let mut decoder = Ascii85Decoder::new(SliceSource::new(b"~>z~>"));
        assert_eq!(decoder.getchar().unwrap(), None);
        // Data after the terminator stays invisible.
        assert_eq!(decoder.getchar().unwrap(), None);
    }

    #[test]
    fn round_trip() {
        let cases: &[&[u8]] = &[
            b"",
            b"H",
            b"He",
            b"Hel",
            b"Hell",
            b"Hello",
            b"Hello world, this is a longer buffer.",
            &[0, 0, 0, 0],
            &[0, 0, 0, 0, 1],
            &[255, 255, 255, 255],
        ];

        for case in cases {
            assert_eq!(&decode(&encode(case)).unwrap(), case);
        }
    }

    #[test]
    fn encode_zero_group() {
        assert_eq!(encode(&[0, 0, 0, 0]), b"z~>");
    }

    #[test]
    fn encode_appends_terminator() {
        assert_eq!(encode(b""), b"~>");
    }
}
