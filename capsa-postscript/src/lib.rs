/*!
A PostScript object scanner and stack-machine interpreter.

This crate tokenizes PostScript program text into typed objects and
executes them on a small stack machine: an operand stack for data, an
execution stack for pending procedure bodies, and a dictionary stack for
name resolution. The built-in operator set covers the arithmetic, stack,
dictionary, control-flow, and conversion operators that page-description
prologues and embedded font programs rely on; rendering operators are
bound from outside through [`Interpreter::register`].

The interpreter reads its programs through the byte sources of
[`capsa_stream`], so `eexec`-protected sections decrypt transparently
through the same machinery used for standalone filtered streams.

```
use capsa_postscript::{Interpreter, Object};

let mut interp = Interpreter::new();
interp.load(b"25 25 add").unwrap();

assert_eq!(interp.operands(), &[Object::integer(50.0)]);
```

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![allow(missing_docs)]

mod error;
mod interp;
mod name;
mod object;
mod operator;
mod scanner;
mod stack;

pub use error::{Error, Result};
pub use interp::{CancelToken, Interpreter};
pub use name::Name;
pub use object::{Access, ArrayRef, Dict, Flag, Object, StringRef, Value};
pub use operator::{Operator, OperatorFn};
pub use scanner::Scanner;
pub use stack::StackKind;

#[cfg(test)]
mod tests {
    use super::*;

    fn run(program: &[u8]) -> Interpreter {
        let mut interp = Interpreter::new();
        interp.load(program).unwrap();
        interp
    }

    #[test]
    fn addition_leaves_one_result() {
        let mut interp = run(b"25 25 add");

        assert_eq!(interp.operands().len(), 1);
        let result = interp.pop_operand().unwrap();
        assert_eq!(result.number(), Some(50.0));
    }

    #[test]
    fn multiplication_composition() {
        let mut interp = run(b"2 5 5 mul mul");

        assert_eq!(interp.operands().len(), 1);
        assert_eq!(interp.pop_operand().unwrap().number(), Some(50.0));
    }

    #[test]
    fn subtraction_and_division() {
        let mut interp = run(b"25 5 sub 2 div");

        assert_eq!(interp.operands().len(), 1);
        assert_eq!(interp.pop_operand().unwrap().number(), Some(10.0));
    }

    #[test]
    fn noop_procedure_leaves_nothing() {
        let interp = run(b"/nothing {} def nothing");
        assert_eq!(interp.operands().len(), 0);
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.pop_operand(),
            Err(Error::StackUnderflow(StackKind::Operand))
        );
    }

    #[test]
    fn push_pop_is_identity() {
        let mut interp = Interpreter::new();
        let object = Object::string(b"payload".to_vec());

        interp.push_operand(object.clone());
        assert_eq!(interp.pop_operand().unwrap(), object);
        assert_eq!(interp.operands().len(), 0);
    }

    #[test]
    fn scanner_feeds_the_interpreter() {
        use capsa_stream::SliceSource;

        let program = b"3 4";
        let objects: Vec<_> = Scanner::new(SliceSource::new(program))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(objects, [Object::integer(3.0), Object::integer(4.0)]);
    }
}
