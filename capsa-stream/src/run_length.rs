//! PackBits-style run-length decoding.

use log::warn;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::source::ByteSource;

/// A streaming run-length decoder.
///
/// Control byte `n` in `0..=127` copies the next `n + 1` literal bytes;
/// `129..=255` repeats the next byte `257 - n` times; `128` terminates the
/// stream. After refilling its block the decoder looks ahead one byte and,
/// if that byte is another `128`, consumes it and latches end-of-data, so
/// filters that emit a doubled terminator are handled.
///
/// There is no encoder for this transform.
pub struct RunLengthDecoder<S> {
    source: S,
    block: SmallVec<[u8; 128]>,
    pos: usize,
    end_of_data: bool,
    pushback: Option<u8>,
}

impl<S: ByteSource> RunLengthDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            block: SmallVec::new(),
            pos: 0,
            end_of_data: false,
            pushback: None,
        }
    }

    fn refill(&mut self) -> Result<()> {
        self.block.clear();
        self.pos = 0;

        let Some(control) = self.source.getchar()? else {
            warn!("run-length stream ended without its terminator");
            self.end_of_data = true;
            return Ok(());
        };

        match control {
            128 => {
                self.end_of_data = true;
                return Ok(());
            }
            0..=127 => {
                for _ in 0..=control {
                    let b = self.source.getchar()?.ok_or(Error::UnexpectedEof)?;
                    self.block.push(b);
                }
            }
            _ => {
                let b = self.source.getchar()?.ok_or(Error::UnexpectedEof)?;
                for _ in 0..257 - control as usize {
                    self.block.push(b);
                }
            }
        }

        // Look ahead for a doubled terminator.
        match self.source.getchar()? {
            Some(128) => self.end_of_data = true,
            Some(b) => self.source.ungetchar(b),
            None => {}
        }

        Ok(())
    }
}

impl<S: ByteSource> ByteSource for RunLengthDecoder<S> {
    fn getchar(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }

        if self.pos == self.block.len() {
            if self.end_of_data {
                return Ok(None);
            }

            self.refill()?;

            if self.block.is_empty() {
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

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::source::SliceSource;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = RunLengthDecoder::new(SliceSource::new(input));
        let mut out = Vec::new();
        while let Some(b) = decoder.getchar()? {
            out.push(b);
        }
        Ok(out)
    }

    #[test]
    fn literal_and_repeat_runs() {
        let input = [4, 10, 11, 12, 13, 14, 253, 3, 128];
        assert_eq!(decode(&input).unwrap(), &[10, 11, 12, 13, 14, 3, 3, 3, 3]);
    }

    #[test]
    fn single_literal_byte() {
        assert_eq!(decode(&[0, 42, 128]).unwrap(), &[42]);
    }

    #[test]
    fn longest_literal_run() {
        let mut input = alloc::vec![127];
        input.extend(0..128);
        input.push(128);
        assert_eq!(decode(&input).unwrap(), (0..128).collect::<Vec<u8>>());
    }

    #[test]
    fn longest_repeat_run() {
        // Control 129 repeats the next byte 128 times.
        assert_eq!(decode(&[129, 7, 128]).unwrap(), [7; 128]);
    }

    #[test]
    fn terminator_alone() {
        assert_eq!(decode(&[128]).unwrap(), b"");
    }

    #[test]
    fn doubled_terminator() {
        let mut decoder = RunLengthDecoder::new(SliceSource::new(&[254, 9, 128, 128, 1, 2][..]));
        let mut out = Vec::new();
        while let Some(b) = decoder.getchar().unwrap() {
            out.push(b);
        }

        assert_eq!(out, &[9, 9, 9]);
        // The terminator seen during lookahead latched end-of-data; the
        // bytes after it stay invisible.
        assert_eq!(decoder.getchar().unwrap(), None);
    }

    #[test]
    fn data_after_terminator_is_invisible() {
        assert_eq!(decode(&[128, 0, 99]).unwrap(), b"");
    }

    #[test]
    fn eof_mid_literal_run() {
        assert_eq!(decode(&[4, 10, 11]), Err(Error::UnexpectedEof));
    }

    #[test]
    fn eof_before_repeated_byte() {
        assert_eq!(decode(&[253]), Err(Error::UnexpectedEof));
    }

    #[test]
    fn missing_terminator() {
        assert_eq!(decode(&[2, 1, 2, 3]).unwrap(), &[1, 2, 3]);
    }
}
