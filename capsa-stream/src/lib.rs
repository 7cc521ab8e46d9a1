/*!
Layered byte-stream codecs for EPS and PostScript data.

This crate provides the pull-based byte source abstraction and the stream
transforms used when reading embedded PostScript programs: ASCII85 and
ASCII-Hex text encodings, PackBits-style run-length compression, the
`eexec` stream cipher used by Type 1 font data, and a sub-file decoder
that bounds a stream at a marker sequence.

Every decoder wraps a [`ByteSource`] and implements [`ByteSource`] itself,
so transforms compose by chaining. A decoder pulls one byte at a time and
reports end-of-data as `Ok(None)`; malformed input is a hard [`Error`].

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![no_std]
#![forbid(unsafe_code)]
#![allow(missing_docs)]

extern crate alloc;

mod ascii_85;
mod ascii_hex;
mod eexec;
mod error;
mod run_length;
mod source;
mod sub_file;

pub use ascii_85::{Ascii85Decoder, Ascii85Encoder};
pub use ascii_hex::{AsciiHexDecoder, AsciiHexEncoder};
pub use eexec::{CHARSTRING_SEED, EEXEC_SEED, EexecDecoder, decrypt_byte};
pub use error::{Error, Result};
pub use run_length::RunLengthDecoder;
pub use source::{ByteSource, SliceSource};
pub use sub_file::SubFileDecoder;

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn drain(mut source: impl ByteSource) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(b) = source.getchar()? {
            out.push(b);
        }
        Ok(out)
    }

    #[test]
    fn chained_hex_over_ascii85() {
        // "48656C6C6F>" (hex for "Hello") encoded as ASCII85.
        let mut enc = Ascii85Encoder::new();
        for b in b"48656C6C6F>" {
            enc.putchar(*b);
        }
        let outer = enc.finish();

        let mut source = SliceSource::new(&outer);
        let inner = Ascii85Decoder::new(&mut source);
        let decoder = AsciiHexDecoder::new(inner);

        assert_eq!(drain(decoder).unwrap(), b"Hello");
    }

    #[test]
    fn chained_run_length_over_hex() {
        // Control 253 repeats the next byte 4 times, 128 terminates.
        let mut enc = AsciiHexEncoder::new();
        for b in [253, 0x61, 128] {
            enc.putchar(b);
        }
        let outer = enc.finish();

        let mut source = SliceSource::new(&outer);
        let inner = AsciiHexDecoder::new(&mut source);
        let decoder = RunLengthDecoder::new(inner);

        assert_eq!(drain(decoder).unwrap(), b"aaaa");
    }

    #[test]
    fn decoder_borrows_its_source() {
        let data = b"z~>rest";
        let mut source = SliceSource::new(data);

        {
            let decoder = Ascii85Decoder::new(&mut source);
            assert_eq!(drain(decoder).unwrap(), &[0, 0, 0, 0]);
        }

        // The wrapped source is still usable after the decoder is dropped.
        assert_eq!(source.getchar().unwrap(), Some(b'r'));
    }
}
