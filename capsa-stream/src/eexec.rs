//! The `eexec` stream cipher used by Type 1 font and program data.

use crate::error::{Error, Result};
use crate::source::{ByteSource, is_whitespace};

/// Cipher seed for the outer `eexec` envelope.
pub const EEXEC_SEED: u16 = 55665;

/// Cipher seed for embedded charstrings.
pub const CHARSTRING_SEED: u16 = 4330;

/// Decrypt one cipher byte and advance the 16-bit cipher state.
#[inline]
pub fn decrypt_byte(cipher: u8, state: &mut u16) -> u8 {
    let c = u32::from(cipher);
    let r = u32::from(*state);
    let plain = c ^ (r >> 8);
    *state = ((c + r).wrapping_mul(52845).wrapping_add(22719) & 0xFFFF) as u16;
    (plain & 0xFF) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Form {
    /// Escape byte 128 followed by sub-mode 1: unencrypted passthrough.
    Text,
    /// Escape byte 128 followed by sub-mode 2: raw encrypted bytes.
    Binary,
    /// No escape byte: hex-encoded encrypted bytes.
    Hex,
}

/// A streaming `eexec` decoder.
///
/// The input form is detected on the first read: the escape byte `128`
/// followed by a sub-mode marker selects plain text (`1`) or raw binary
/// (`2`); without the escape byte the data is hex pairs, whitespace
/// tolerated. All three forms discard four lead-in bytes before real data
/// begins, following the Type 1 `eexec` convention.
pub struct EexecDecoder<S> {
    source: S,
    state: u16,
    form: Option<Form>,
    end_of_data: bool,
    pushback: Option<u8>,
}

impl<S: ByteSource> EexecDecoder<S> {
    /// Create a decoder seeded for the outer `eexec` envelope.
    pub fn new(source: S) -> Self {
        Self::with_seed(source, EEXEC_SEED)
    }

    /// Create a decoder with an explicit cipher seed.
    pub fn with_seed(source: S, seed: u16) -> Self {
        Self {
            source,
            state: seed,
            form: None,
            end_of_data: false,
            pushback: None,
        }
    }

    /// Detect the input form and discard the four lead-in bytes.
    fn start(&mut self) -> Result<Form> {
        // Whitespace between the `eexec` token and its data is not part of
        // the encrypted stream.
        let first = loop {
            match self.source.getchar()? {
                Some(b) if is_whitespace(b) => {}
                Some(b) => break b,
                None => {
                    self.end_of_data = true;
                    return Ok(Form::Binary);
                }
            }
        };

        let form = if first == 128 {
            let sub = self.source.getchar()?.ok_or(Error::UnexpectedEof)?;
            match sub {
                1 => Form::Text,
                2 => Form::Binary,
                other => return Err(Error::InvalidSubMode(other)),
            }
        } else {
            self.source.ungetchar(first);
            Form::Hex
        };

        self.form = Some(form);

        for _ in 0..4 {
            if self.next_plain(form)?.is_none() {
                return Err(Error::UnexpectedEof);
            }
        }

        Ok(form)
    }

    /// Produce the next decoded byte for the given form.
    fn next_plain(&mut self, form: Form) -> Result<Option<u8>> {
        match form {
            Form::Text => self.source.getchar(),
            Form::Binary => Ok(self
                .source
                .getchar()?
                .map(|c| decrypt_byte(c, &mut self.state))),
            Form::Hex => {
                let Some(hi) = self.next_hex_digit()? else {
                    return Ok(None);
                };
                // An odd trailing digit becomes the high nibble.
                let lo = self.next_hex_digit()?.unwrap_or(0);
                Ok(Some(decrypt_byte(hi << 4 | lo, &mut self.state)))
            }
        }
    }

    fn next_hex_digit(&mut self) -> Result<Option<u8>> {
        loop {
            let Some(b) = self.source.getchar()? else {
                return Ok(None);
            };

            if is_whitespace(b) {
                continue;
            }

            match b {
                b'0'..=b'9' => return Ok(Some(b - b'0')),
                b'a'..=b'f' => return Ok(Some(b - b'a' + 10)),
                b'A'..=b'F' => return Ok(Some(b - b'A' + 10)),
                _ => return Err(Error::InvalidHexDigit(b)),
            }
        }
    }
}

impl<S: ByteSource> ByteSource for EexecDecoder<S> {
    fn getchar(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }

        if self.end_of_data {
            return Ok(None);
        }

        let form = match self.form {
            Some(form) => form,
            None => {
                let form = self.start()?;
                if self.end_of_data {
                    return Ok(None);
                }
                form
            }
        };

        let b = self.next_plain(form)?;
        if b.is_none() {
            self.end_of_data = true;
        }

        Ok(b)
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

    /// Encrypt with the inverse cipher, prepending a 4-byte lead-in.
    fn encrypt(plain: &[u8], seed: u16) -> Vec<u8> {
        let mut state = seed;
        let mut out = Vec::new();

        for p in [0_u8, 0, 0, 0].iter().chain(plain) {
            let c = u32::from(*p) ^ (u32::from(state) >> 8);
            let c = (c & 0xFF) as u8;
            state = ((u32::from(c) + u32::from(state))
                .wrapping_mul(52845)
                .wrapping_add(22719)
                & 0xFFFF) as u16;
            out.push(c);
        }

        out
    }

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = EexecDecoder::new(SliceSource::new(input));
        let mut out = Vec::new();
        while let Some(b) = decoder.getchar()? {
            out.push(b);
        }
        Ok(out)
    }

    #[test]
    fn binary_form() {
        let mut input = alloc::vec![128, 2];
        input.extend(encrypt(b"/secret 42 def", EEXEC_SEED));

        assert_eq!(decode(&input).unwrap(), b"/secret 42 def");
    }

    #[test]
    fn text_form_skips_lead_in() {
        assert_eq!(decode(&[128, 1, b'X', b'X', b'X', b'X', b'a', b'b']).unwrap(), b"ab");
    }

    #[test]
    fn hex_form() {
        let cipher = encrypt(b"hello", EEXEC_SEED);
        let mut input = Vec::new();
        for (i, c) in cipher.iter().enumerate() {
            if i == 3 {
                // Whitespace between digits does not disturb decoding.
                input.push(b'\n');
            }
            let push_digit = |d: u8, out: &mut Vec<u8>| {
                out.push(if d < 10 { b'0' + d } else { b'a' + d - 10 });
            };
            push_digit(c >> 4, &mut input);
            push_digit(c & 0x0F, &mut input);
        }

        assert_eq!(decode(&input).unwrap(), b"hello");
    }

    #[test]
    fn leading_whitespace_is_skipped() {
        let mut input = alloc::vec![b'\r', b'\n', 128, 2];
        input.extend(encrypt(b"x", EEXEC_SEED));

        assert_eq!(decode(&input).unwrap(), b"x");
    }

    #[test]
    fn invalid_sub_mode() {
        assert_eq!(decode(&[128, 3, 0, 0]), Err(Error::InvalidSubMode(3)));
    }

    #[test]
    fn truncated_lead_in() {
        assert_eq!(decode(&[128, 2, 0, 0]), Err(Error::UnexpectedEof));
    }

    #[test]
    fn empty_input() {
        assert_eq!(decode(b"").unwrap(), b"");
        assert_eq!(decode(b"  \n").unwrap(), b"");
    }

    #[test]
    fn decryption_is_deterministic() {
        let mut input = alloc::vec![128, 2];
        input.extend(encrypt(b"same plaintext every time", EEXEC_SEED));

        assert_eq!(decode(&input).unwrap(), decode(&input).unwrap());
    }

    #[test]
    fn charstring_seed_round_trip() {
        let cipher = encrypt(&[1, 2, 3, 255], CHARSTRING_SEED);

        let mut state = CHARSTRING_SEED;
        let plain: Vec<u8> = cipher.iter().map(|c| decrypt_byte(*c, &mut state)).collect();

        assert_eq!(&plain[4..], &[1, 2, 3, 255]);
    }

    #[test]
    fn known_cipher_state_progression() {
        // Decrypting zeros with the eexec seed must always produce the
        // same byte sequence.
        let mut state = EEXEC_SEED;
        let first: Vec<u8> = (0..4).map(|_| decrypt_byte(0, &mut state)).collect();

        let mut state = EEXEC_SEED;
        let second: Vec<u8> = (0..4).map(|_| decrypt_byte(0, &mut state)).collect();

        assert_eq!(first, second);
        assert_eq!(first[0], (EEXEC_SEED >> 8) as u8);
    }
}
