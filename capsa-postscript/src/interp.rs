//! The stack-machine interpreter engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use capsa_stream::{ByteSource, EexecDecoder, SliceSource};
use log::debug;

use crate::error::{Error, Result};
use crate::name::Name;
use crate::object::{Access, ArrayRef, Dict, Flag, Object, Value};
use crate::operator::{Operator, OperatorFn, system_dictionary};
use crate::scanner::Scanner;
use crate::stack::{Stack, StackKind};

/// A cooperative cancellation token.
///
/// Cancellation is checked once per engine step, between object
/// executions. It is coarse-grained by design: an in-flight codec decode
/// is never interrupted mid-block. Once cancelled, a token stays
/// cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A PostScript interpreter: three stacks and a token source.
///
/// Each instance owns its stacks and dictionaries exclusively; nothing is
/// shared between interpreters, so one may be created per program.
pub struct Interpreter {
    operand: Stack,
    execution: Stack,
    dictionaries: Stack,
    cancel: CancelToken,
    eexec_pending: bool,
}

impl Interpreter {
    /// Create an interpreter with the system and user dictionaries in
    /// place.
    pub fn new() -> Self {
        let mut dictionaries = Stack::new(StackKind::Dictionary);
        dictionaries
            .push(Object::dictionary(system_dictionary()).with_access(Access::ReadOnly));
        dictionaries.push(Object::dictionary(Dict::new()));

        Self {
            operand: Stack::new(StackKind::Operand),
            execution: Stack::new(StackKind::Execution),
            dictionaries,
            cancel: CancelToken::new(),
            eexec_pending: false,
        }
    }

    /// The token used to cancel this interpreter from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Bind a native operator in the system dictionary.
    ///
    /// This is the extension point through which page-description
    /// collaborators register `moveto`-class operators without the engine
    /// knowing their types.
    pub fn register(&mut self, name: &'static str, func: OperatorFn) {
        if let Some(entry) = self.dictionaries.items().first() {
            if let Value::Dictionary(dict) = entry.value() {
                dict.insert(Name::new(name), Object::operator(Operator::new(name, func)));
            }
        }
    }

    /// Tokenize and execute a PostScript program.
    ///
    /// On an error the operand stack keeps everything accumulated up to
    /// the fault, so partial results stay inspectable.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        let result = self.interpret(program);
        self.execution.clear();

        match result {
            Err(Error::Quit) => Ok(()),
            Err(Error::Exit) => Err(Error::InvalidExit),
            other => other,
        }
    }

    /// The operand stack, bottom first.
    pub fn operands(&self) -> &[Object] {
        self.operand.items()
    }

    pub fn push_operand(&mut self, object: Object) {
        self.operand.push(object);
    }

    pub fn pop_operand(&mut self) -> Result<Object> {
        self.operand.pop()
    }

    pub fn peek_operand(&self) -> Option<&Object> {
        self.operand.last()
    }

    pub(crate) fn interpret(&mut self, program: &[u8]) -> Result<()> {
        let mut source = SliceSource::new(program);
        let mut scanner = Scanner::new(&mut source);

        loop {
            let Some(object) = scanner.next_object()? else {
                return Ok(());
            };

            self.check_cancel()?;
            self.execute(object)?;
            self.drain()?;

            if self.eexec_pending {
                break;
            }
        }

        // The rest of the source is encrypted program text.
        self.eexec_pending = false;
        let plain = decrypt_stream(&program[source.offset()..])?;
        debug!("eexec produced {} bytes of program text", plain.len());
        self.interpret(&plain)
    }

    /// Execute one object pulled from the token source or the execution
    /// stack.
    fn execute(&mut self, object: Object) -> Result<()> {
        if object.flag() == Flag::Literal {
            self.operand.push(object);
            return Ok(());
        }

        match object.value() {
            Value::ExecutableName(name) => {
                let name = name.clone();
                let bound = self.lookup(&name)?;
                self.exec_object(bound)
            }
            Value::Operand(op) => {
                let op = *op;
                op.call(self)
            }
            // A procedure in token position is data; it only runs through
            // `exec`, name resolution, or a control operator.
            _ => {
                self.operand.push(object);
                Ok(())
            }
        }
    }

    /// Execute an object on behalf of `exec` or a name binding.
    pub(crate) fn exec_object(&mut self, object: Object) -> Result<()> {
        if object.flag() == Flag::Literal {
            self.operand.push(object);
            return Ok(());
        }

        if !object.access().executable() {
            return Err(Error::InvalidAccess("exec"));
        }

        match object.value() {
            Value::Procedure(body) => {
                let body = body.clone();
                self.schedule_body(&body);
                Ok(())
            }
            Value::Operand(op) => {
                let op = *op;
                op.call(self)
            }
            Value::ExecutableName(_) => {
                self.execution.push(object);
                Ok(())
            }
            _ => {
                self.operand.push(object);
                Ok(())
            }
        }
    }

    /// Run the execution stack down to empty.
    fn drain(&mut self) -> Result<()> {
        while let Some(object) = self.execution.try_pop() {
            self.check_cancel()?;
            self.execute(object)?;
        }
        Ok(())
    }

    /// Push a procedure's elements for sequential execution. Expanding the
    /// body instead of recursing keeps call depth flat for tail-position
    /// invocations.
    pub(crate) fn schedule_body(&mut self, body: &ArrayRef) {
        let items = body.borrow();
        for item in items.iter().rev() {
            self.execution.push(item.clone());
        }
    }

    /// Run a procedure to completion, bounded to its own execution-stack
    /// region. Used by the looping operators, which catch `exit` here.
    pub(crate) fn run_nested(&mut self, body: &ArrayRef) -> Result<()> {
        let base = self.execution.len();
        self.schedule_body(body);

        while self.execution.len() > base {
            if let Err(e) = self.check_cancel() {
                self.execution.truncate(base);
                return Err(e);
            }

            let Some(object) = self.execution.try_pop() else {
                break;
            };

            if let Err(e) = self.execute(object) {
                self.execution.truncate(base);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Resolve a name through the dictionary stack, innermost scope first.
    pub(crate) fn lookup(&self, name: &Name) -> Result<Object> {
        for entry in self.dictionaries.items().iter().rev() {
            if let Value::Dictionary(dict) = entry.value() {
                if let Some(object) = dict.get(name) {
                    return Ok(object);
                }
            }
        }

        Err(Error::Undefined(name.clone()))
    }

    /// The topmost dictionary defining `name`, for `where`.
    pub(crate) fn find_defining(&self, name: &Name) -> Option<Object> {
        self.dictionaries
            .items()
            .iter()
            .rev()
            .find(|entry| matches!(entry.value(), Value::Dictionary(dict) if dict.contains(name)))
            .cloned()
    }

    /// Define `name` in the current (topmost) dictionary.
    pub(crate) fn define(&mut self, name: Name, value: Object) -> Result<()> {
        let top = self.dictionaries.top()?;

        if !top.access().writable() {
            return Err(Error::InvalidAccess("def"));
        }

        if let Value::Dictionary(dict) = top.value() {
            dict.insert(name, value);
        }

        Ok(())
    }

    pub(crate) fn push_dictionary(&mut self, object: Object) {
        self.dictionaries.push(object);
    }

    pub(crate) fn pop_dictionary(&mut self) -> Result<()> {
        // The system and user dictionaries are permanent.
        if self.dictionaries.len() <= 2 {
            return Err(Error::StackUnderflow(StackKind::Dictionary));
        }

        self.dictionaries.try_pop();
        Ok(())
    }

    pub(crate) fn top_operand(&self) -> Result<&Object> {
        self.operand.top()
    }

    pub(crate) fn operands_mut(&mut self) -> &mut [Object] {
        self.operand.items_mut()
    }

    pub(crate) fn clear_operands(&mut self) {
        self.operand.clear();
    }

    pub(crate) fn pop_number(&mut self, operator: &'static str) -> Result<(f64, bool)> {
        let object = self.operand.pop()?;
        match object.value() {
            Value::Integer(v) => Ok((*v, true)),
            Value::Real(v) => Ok((*v, false)),
            found => Err(Error::TypeMismatch {
                operator,
                expected: "number",
                found: found.type_name(),
            }),
        }
    }

    pub(crate) fn pop_integer(&mut self, operator: &'static str) -> Result<i64> {
        let object = self.operand.pop()?;
        match object.value() {
            Value::Integer(v) => Ok(*v as i64),
            found => Err(Error::TypeMismatch {
                operator,
                expected: "integer",
                found: found.type_name(),
            }),
        }
    }

    pub(crate) fn pop_boolean(&mut self, operator: &'static str) -> Result<bool> {
        let object = self.operand.pop()?;
        match object.value() {
            Value::Boolean(v) => Ok(*v),
            found => Err(Error::TypeMismatch {
                operator,
                expected: "boolean",
                found: found.type_name(),
            }),
        }
    }

    pub(crate) fn pop_procedure(&mut self, operator: &'static str) -> Result<ArrayRef> {
        let object = self.operand.pop()?;

        if !object.access().executable() {
            return Err(Error::InvalidAccess(operator));
        }

        match object.value() {
            Value::Procedure(body) if object.flag() == Flag::Executable => Ok(body.clone()),
            found => Err(Error::TypeMismatch {
                operator,
                expected: "procedure",
                found: found.type_name(),
            }),
        }
    }

    pub(crate) fn pop_name(&mut self, operator: &'static str) -> Result<Name> {
        let object = self.operand.pop()?;
        match object.value() {
            Value::LiteralName(name) | Value::ExecutableName(name) => Ok(name.clone()),
            found => Err(Error::TypeMismatch {
                operator,
                expected: "name",
                found: found.type_name(),
            }),
        }
    }

    pub(crate) fn request_eexec(&mut self) {
        self.eexec_pending = true;
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrypt an `eexec`-protected block to plaintext program bytes.
pub(crate) fn decrypt_stream(data: &[u8]) -> Result<Vec<u8>> {
    let mut source = SliceSource::new(data);
    let mut decoder = EexecDecoder::new(&mut source);
    let mut out = Vec::new();

    while let Some(b) = decoder.getchar()? {
        out.push(b);
    }

    Ok(out)
}
