//! The tokenizer: converts a byte source into PostScript objects.

use capsa_stream::ByteSource;

use crate::error::{Error, Result};
use crate::name::Name;
use crate::object::Object;

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline]
fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline]
fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

enum Token {
    Object(Object),
    Close(u8),
}

/// A scanner that reads complete [`Object`]s from a byte source.
///
/// Numbers, names, strings, and comments follow the PostScript lexical
/// rules; `{...}` bodies become executable procedures and `[...]` literals
/// become arrays, both built recursively. The `<<`/`>>` dictionary literal
/// syntax is not supported and is reported as an error.
pub struct Scanner<S> {
    source: S,
}

impl<S: ByteSource> Scanner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Read the next object, or `None` at end of input.
    pub fn next_object(&mut self) -> Result<Option<Object>> {
        match self.next_token()? {
            None => Ok(None),
            Some(Token::Object(object)) => Ok(Some(object)),
            Some(Token::Close(b)) => Err(Error::StrayDelimiter(b)),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        let Some(b) = self.skip_separators()? else {
            return Ok(None);
        };

        let object = match b {
            b'/' => self.parse_literal_name()?,
            b'(' => Object::string(self.parse_string()?),
            b'<' => self.parse_angle()?,
            b'{' => Object::procedure(self.parse_body(b'}')?),
            b'[' => Object::array(self.parse_body(b']')?),
            b'}' | b']' => return Ok(Some(Token::Close(b))),
            b')' => return Err(Error::StrayDelimiter(b)),
            b'>' => {
                return match self.source.getchar()? {
                    Some(b'>') => Err(Error::DictSyntax),
                    _ => Err(Error::StrayDelimiter(b'>')),
                };
            }
            first => self.parse_regular(first)?,
        };

        Ok(Some(Token::Object(object)))
    }

    /// Skip whitespace and `%` comments.
    fn skip_separators(&mut self) -> Result<Option<u8>> {
        loop {
            let Some(b) = self.source.getchar()? else {
                return Ok(None);
            };

            if is_whitespace(b) {
                continue;
            }

            if b == b'%' {
                loop {
                    match self.source.getchar()? {
                        None => return Ok(None),
                        Some(b'\n' | b'\r' | b'\x0c') => break,
                        Some(_) => {}
                    }
                }
                continue;
            }

            return Ok(Some(b));
        }
    }

    fn parse_literal_name(&mut self) -> Result<Object> {
        let mut token = Vec::new();

        loop {
            match self.source.getchar()? {
                Some(b) if is_regular(b) => token.push(b),
                Some(b) => {
                    self.source.ungetchar(b);
                    break;
                }
                None => break,
            }
        }

        Ok(Object::literal_name(Name::from_bytes(&token)))
    }

    /// A regular-character run is a number if it parses as one, otherwise
    /// an executable name.
    fn parse_regular(&mut self, first: u8) -> Result<Object> {
        let mut token = vec![first];

        loop {
            match self.source.getchar()? {
                Some(b) if is_regular(b) => token.push(b),
                Some(b) => {
                    self.source.ungetchar(b);
                    break;
                }
                None => break,
            }
        }

        if let Some(number) = parse_number(&token) {
            return Ok(number);
        }

        Ok(Object::executable_name(Name::from_bytes(&token)))
    }

    /// A `(...)` string literal with balanced nested parentheses and
    /// backslash escapes.
    fn parse_string(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut depth = 1_u32;

        loop {
            let Some(b) = self.source.getchar()? else {
                return Err(Error::UnterminatedString);
            };

            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => self.parse_escape(&mut out)?,
                b'\r' => {
                    // Bare line ends are normalized to a newline.
                    if let Some(next) = self.source.getchar()? {
                        if next != b'\n' {
                            self.source.ungetchar(next);
                        }
                    }
                    out.push(b'\n');
                }
                _ => out.push(b),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(b) = self.source.getchar()? else {
            return Err(Error::UnterminatedString);
        };

        match b {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            // A backslash-newline is elided entirely.
            b'\n' => {}
            b'\r' => {
                if let Some(next) = self.source.getchar()? {
                    if next != b'\n' {
                        self.source.ungetchar(next);
                    }
                }
            }
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.source.getchar()? {
                        Some(d @ b'0'..=b'7') => value = value * 8 + u32::from(d - b'0'),
                        Some(other) => {
                            self.source.ungetchar(other);
                            break;
                        }
                        None => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            // Unknown escapes drop the backslash, covering \( \) and \\.
            other => out.push(other),
        }

        Ok(())
    }

    /// Dispatch after `<`: a hex string, or the unsupported `<<`.
    fn parse_angle(&mut self) -> Result<Object> {
        match self.source.getchar()? {
            None => Err(Error::UnterminatedString),
            Some(b'<') => Err(Error::DictSyntax),
            Some(b) => {
                self.source.ungetchar(b);
                Ok(Object::string(self.parse_hex_string()?))
            }
        }
    }

    fn parse_hex_string(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let Some(b) = self.source.getchar()? else {
                return Err(Error::UnterminatedString);
            };

            if is_whitespace(b) {
                continue;
            }

            if b == b'>' {
                // An odd trailing digit becomes the high nibble.
                if let Some(hi) = pending {
                    out.push(hi << 4);
                }
                return Ok(out);
            }

            let digit = hex_digit(b).ok_or(Error::InvalidHexString(b))?;
            match pending.take() {
                Some(hi) => out.push(hi << 4 | digit),
                None => pending = Some(digit),
            }
        }
    }

    /// Recursively collect the elements of a `{...}` or `[...]` body.
    fn parse_body(&mut self, closer: u8) -> Result<Vec<Object>> {
        let mut items = Vec::new();

        loop {
            match self.next_token()? {
                None => {
                    return Err(if closer == b'}' {
                        Error::UnterminatedProcedure
                    } else {
                        Error::UnterminatedArray
                    });
                }
                Some(Token::Close(b)) if b == closer => return Ok(items),
                Some(Token::Close(b)) => return Err(Error::StrayDelimiter(b)),
                Some(Token::Object(object)) => items.push(object),
            }
        }
    }
}

impl<S: ByteSource> Iterator for Scanner<S> {
    type Item = Result<Object>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_object().transpose()
    }
}

/// Parse a complete token as a number, or `None` if it is not one.
fn parse_number(token: &[u8]) -> Option<Object> {
    let s = core::str::from_utf8(token).ok()?;

    // Radix form: `base#digits`.
    if let Some((base, digits)) = s.split_once('#') {
        let base: u32 = base.parse().ok()?;
        if !(2..=36).contains(&base) || digits.is_empty() {
            return None;
        }
        let value = i64::from_str_radix(digits, base).ok()?;
        return Some(Object::integer(value as f64));
    }

    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while matches!(bytes.get(i), Some(b'0'..=b'9')) {
        i += 1;
    }
    let has_int = i > int_start;

    let mut has_frac = false;
    let has_dot = bytes.get(i) == Some(&b'.');
    if has_dot {
        i += 1;
        let frac_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        has_frac = i > frac_start;
    }

    if !has_int && !has_frac {
        return None;
    }

    let has_exponent = matches!(bytes.get(i), Some(b'e' | b'E'));
    if has_exponent {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != bytes.len() {
        return None;
    }

    let value: f64 = s.parse().ok()?;
    Some(if has_dot || has_exponent {
        Object::real(value)
    } else {
        Object::integer(value)
    })
}

#[cfg(test)]
mod tests {
    use capsa_stream::SliceSource;

    use super::*;
    use crate::object::{Flag, Value};

    fn scan(input: &[u8]) -> Result<Vec<Object>> {
        Scanner::new(SliceSource::new(input)).collect()
    }

    fn scan_one(input: &[u8]) -> Object {
        let objects = scan(input).unwrap();
        assert_eq!(objects.len(), 1);
        objects.into_iter().next().unwrap()
    }

    #[test]
    fn integers() {
        assert_eq!(scan_one(b"123"), Object::integer(123.0));
        assert_eq!(scan_one(b"-98"), Object::integer(-98.0));
        assert_eq!(scan_one(b"+17"), Object::integer(17.0));
        assert_eq!(scan_one(b"0"), Object::integer(0.0));
    }

    #[test]
    fn reals() {
        assert_eq!(scan_one(b"34.5"), Object::real(34.5));
        assert_eq!(scan_one(b"-.002"), Object::real(-0.002));
        assert_eq!(scan_one(b"-1."), Object::real(-1.0));
        assert_eq!(scan_one(b"123.6e10"), Object::real(123.6e10));
        assert_eq!(scan_one(b"1E6"), Object::real(1e6));
        assert_eq!(scan_one(b"1.0E-5"), Object::real(1.0e-5));
    }

    #[test]
    fn radix_numbers() {
        assert_eq!(scan_one(b"8#1777"), Object::integer(1023.0));
        assert_eq!(scan_one(b"16#FFFE"), Object::integer(65534.0));
        assert_eq!(scan_one(b"2#1000"), Object::integer(8.0));
    }

    #[test]
    fn number_lookalikes_are_names() {
        for token in [&b"1a"[..], b"1e", b"37#1", b".", b"-", b"+"] {
            let object = scan_one(token);
            assert!(
                matches!(object.value(), Value::ExecutableName(_)),
                "{}",
                core::str::from_utf8(token).unwrap()
            );
        }
    }

    #[test]
    fn names() {
        let objects = scan(b"/Name1 moveto /").unwrap();
        assert_eq!(objects[0], Object::literal_name(Name::new("Name1")));
        assert_eq!(objects[1], Object::executable_name(Name::new("moveto")));
        assert_eq!(objects[2], Object::literal_name(Name::new("")));
    }

    #[test]
    fn strings() {
        assert_eq!(scan_one(b"(Hello)"), Object::string(b"Hello".to_vec()));
        assert_eq!(scan_one(b"()"), Object::string(Vec::new()));
        assert_eq!(
            scan_one(b"(Hi (()) there)"),
            Object::string(b"Hi (()) there".to_vec())
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(scan_one(br"(a\nb)"), Object::string(b"a\nb".to_vec()));
        assert_eq!(scan_one(br"(a\tb)"), Object::string(b"a\tb".to_vec()));
        assert_eq!(scan_one(br"(a\\b)"), Object::string(b"a\\b".to_vec()));
        assert_eq!(scan_one(br"(a\)b)"), Object::string(b"a)b".to_vec()));
        assert_eq!(scan_one(br"(\053)"), Object::string(b"+".to_vec()));
        assert_eq!(scan_one(br"(\36)"), Object::string(b"\x1e".to_vec()));
        assert_eq!(scan_one(br"(\3)"), Object::string(b"\x03".to_vec()));
        assert_eq!(scan_one(b"(a\\\nb)"), Object::string(b"ab".to_vec()));
        assert_eq!(scan_one(b"(a\\\r\nb)"), Object::string(b"ab".to_vec()));
        assert_eq!(scan_one(b"(a\rb)"), Object::string(b"a\nb".to_vec()));
    }

    #[test]
    fn hex_strings() {
        assert_eq!(
            scan_one(b"<48656C6C6F>"),
            Object::string(b"Hello".to_vec())
        );
        assert_eq!(
            scan_one(b"<48 65 6c 6C 6F>"),
            Object::string(b"Hello".to_vec())
        );
        assert_eq!(scan_one(b"<ABC>"), Object::string(vec![0xAB, 0xC0]));
        assert_eq!(scan_one(b"<>"), Object::string(Vec::new()));
    }

    #[test]
    fn procedures_are_executable() {
        let object = scan_one(b"{1 2 add}");
        assert_eq!(object.flag(), Flag::Executable);

        let Value::Procedure(body) = object.value() else {
            panic!("expected a procedure");
        };
        let body = body.borrow();
        assert_eq!(body[0], Object::integer(1.0));
        assert_eq!(body[1], Object::integer(2.0));
        assert_eq!(body[2], Object::executable_name(Name::new("add")));
    }

    #[test]
    fn nested_procedures_stay_nested() {
        let object = scan_one(b"{ {1} {2} ifelse }");

        let Value::Procedure(body) = object.value() else {
            panic!("expected a procedure");
        };
        let body = body.borrow();
        assert_eq!(body.len(), 3);
        assert!(matches!(body[0].value(), Value::Procedure(_)));
        assert!(matches!(body[1].value(), Value::Procedure(_)));
    }

    #[test]
    fn arrays_are_literal() {
        let object = scan_one(b"[123 /abc (xyz)]");
        assert_eq!(object.flag(), Flag::Literal);

        let Value::Array(items) = object.value() else {
            panic!("expected an array");
        };
        let items = items.borrow();
        assert_eq!(items[0], Object::integer(123.0));
        assert_eq!(items[1], Object::literal_name(Name::new("abc")));
        assert_eq!(items[2], Object::string(b"xyz".to_vec()));
    }

    #[test]
    fn comments_are_separators() {
        let objects = scan(b"% comment\n42 % another\n/Name").unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0], Object::integer(42.0));
        assert_eq!(objects[1], Object::literal_name(Name::new("Name")));
    }

    #[test]
    fn unterminated_literals() {
        assert_eq!(scan(b"(abc"), Err(Error::UnterminatedString));
        assert_eq!(scan(b"(a(b)"), Err(Error::UnterminatedString));
        assert_eq!(scan(b"<414"), Err(Error::UnterminatedString));
        assert_eq!(scan(b"{1 2"), Err(Error::UnterminatedProcedure));
        assert_eq!(scan(b"[1 {2}"), Err(Error::UnterminatedArray));
    }

    #[test]
    fn stray_delimiters() {
        assert_eq!(scan(b"1 }"), Err(Error::StrayDelimiter(b'}')));
        assert_eq!(scan(b"]"), Err(Error::StrayDelimiter(b']')));
        assert_eq!(scan(b")"), Err(Error::StrayDelimiter(b')')));
        assert_eq!(scan(b"{1]}"), Err(Error::StrayDelimiter(b']')));
    }

    #[test]
    fn dict_literals_are_unsupported() {
        assert_eq!(scan(b"<< /a 1 >>"), Err(Error::DictSyntax));
        assert_eq!(scan(b"1 >>"), Err(Error::DictSyntax));
    }

    #[test]
    fn invalid_hex_string() {
        assert_eq!(scan(b"<4G>"), Err(Error::InvalidHexString(b'G')));
    }
}
