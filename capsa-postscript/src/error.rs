//! Error types for the scanner and the interpreter engine.

use core::fmt;

use crate::name::Name;
use crate::stack::StackKind;

/// A specialized [`Result`] type for scanner and interpreter operations.
pub type Result<T> = core::result::Result<T, Error>;

/// An error encountered while scanning or executing a PostScript program.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A filtered stream contained malformed data.
    Codec(capsa_stream::Error),
    /// A string literal was not terminated before end of input.
    UnterminatedString,
    /// A procedure body was not terminated before end of input.
    UnterminatedProcedure,
    /// An array literal was not terminated before end of input.
    UnterminatedArray,
    /// A byte that is not a hexadecimal digit appeared in a hex string.
    InvalidHexString(u8),
    /// A closing delimiter appeared without a matching opener.
    StrayDelimiter(u8),
    /// The `<<`/`>>` dictionary literal syntax is not supported.
    DictSyntax,
    /// `pop` or `top` was called on an empty stack.
    StackUnderflow(StackKind),
    /// An operator received an operand of the wrong type.
    TypeMismatch {
        operator: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    /// An executable name was not found in any dictionary on the stack.
    Undefined(Name),
    /// An operand's access level forbids the attempted operation.
    InvalidAccess(&'static str),
    /// A numeric operand was outside the range an operator accepts.
    RangeCheck(&'static str),
    /// An arithmetic operation has no representable result.
    UndefinedResult(&'static str),
    /// `exit` was executed outside of any looping context.
    InvalidExit,
    /// Interpretation was cancelled through a [`CancelToken`](crate::CancelToken).
    Interrupted,
    /// Control-flow signal raised by `exit`; consumed by the looping
    /// operators and converted to [`InvalidExit`](Self::InvalidExit) if it
    /// escapes them all.
    Exit,
    /// Control-flow signal raised by `quit`; ends the program normally.
    Quit,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "ioerror: {e}"),
            Self::UnterminatedString => f.write_str("syntaxerror: unterminated string"),
            Self::UnterminatedProcedure => f.write_str("syntaxerror: unterminated procedure"),
            Self::UnterminatedArray => f.write_str("syntaxerror: unterminated array"),
            Self::InvalidHexString(b) => {
                write!(f, "syntaxerror: invalid hex string byte 0x{b:02x}")
            }
            Self::StrayDelimiter(b) => {
                write!(f, "syntaxerror: unmatched '{}'", char::from(*b))
            }
            Self::DictSyntax => f.write_str("syntaxerror: dictionary literals are not supported"),
            Self::StackUnderflow(kind) => write!(f, "stackunderflow: {kind} stack"),
            Self::TypeMismatch {
                operator,
                expected,
                found,
            } => write!(f, "typecheck: {operator} expected {expected}, found {found}"),
            Self::Undefined(name) => write!(f, "undefined: {name}"),
            Self::InvalidAccess(operator) => write!(f, "invalidaccess: {operator}"),
            Self::RangeCheck(operator) => write!(f, "rangecheck: {operator}"),
            Self::UndefinedResult(operator) => write!(f, "undefinedresult: {operator}"),
            Self::InvalidExit => f.write_str("invalidexit"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Exit => f.write_str("exit"),
            Self::Quit => f.write_str("quit"),
        }
    }
}

impl core::error::Error for Error {}

impl From<capsa_stream::Error> for Error {
    fn from(e: capsa_stream::Error) -> Self {
        Self::Codec(e)
    }
}
