//! The system dictionary of built-in operators.

use core::cmp::Ordering;
use core::fmt;

use crate::error::{Error, Result};
use crate::interp::{Interpreter, decrypt_stream};
use crate::name::Name;
use crate::object::{Access, ArrayRef, Dict, Object, Value};
use crate::stack::StackKind;

/// The native function type behind a built-in operator.
pub type OperatorFn = fn(&mut Interpreter) -> Result<()>;

/// A native operator bound to a name in the system dictionary.
#[derive(Clone, Copy)]
pub struct Operator {
    name: &'static str,
    func: OperatorFn,
}

impl Operator {
    pub(crate) fn new(name: &'static str, func: OperatorFn) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(&self, interp: &mut Interpreter) -> Result<()> {
        (self.func)(interp)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operator").field(&self.name).finish()
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Build the system dictionary with every built-in operator bound.
pub(crate) fn system_dictionary() -> Dict {
    let dict = Dict::with_capacity(OPERATORS.len());

    for (name, func) in OPERATORS {
        dict.insert(Name::new(name), Object::operator(Operator::new(name, *func)));
    }

    dict
}

#[rustfmt::skip]
const OPERATORS: &[(&str, OperatorFn)] = &[
    // Operand stack manipulation.
    ("pop", pop), ("dup", dup), ("exch", exch), ("copy", copy),
    ("index", index), ("roll", roll), ("clear", clear), ("count", count),
    // Arithmetic.
    ("add", add), ("sub", sub), ("mul", mul), ("div", div), ("idiv", idiv),
    ("mod", mod_), ("neg", neg), ("abs", abs), ("ceiling", ceiling),
    ("floor", floor), ("round", round), ("truncate", truncate),
    ("sqrt", sqrt), ("sin", sin), ("cos", cos), ("atan", atan),
    ("exp", exp), ("ln", ln), ("log", log),
    // Relational, boolean, and bitwise.
    ("eq", eq), ("ne", ne), ("gt", gt), ("ge", ge), ("lt", lt), ("le", le),
    ("and", and), ("or", or), ("xor", xor), ("not", not),
    ("bitshift", bitshift), ("true", true_), ("false", false_),
    // Control.
    ("exec", exec), ("if", if_), ("ifelse", ifelse), ("for", for_),
    ("repeat", repeat), ("loop", loop_), ("exit", exit), ("quit", quit),
    // Dictionaries.
    ("dict", dict), ("def", def), ("begin", begin), ("end", end),
    ("load", load), ("known", known), ("where", where_),
    // Composite object access.
    ("get", get), ("put", put), ("length", length), ("string", string),
    // Type and attribute conversion.
    ("cvi", cvi), ("cvr", cvr), ("cvx", cvx), ("cvlit", cvlit),
    ("readonly", readonly), ("executeonly", executeonly),
    ("noaccess", noaccess), ("bind", bind),
    // Filtered streams.
    ("eexec", eexec), ("currentfile", currentfile),
];

fn numeric(value: f64, integer: bool) -> Object {
    if integer {
        Object::integer(value)
    } else {
        Object::real(value)
    }
}

/// Reject value inspection of a shielded composite.
fn inspectable(object: &Object, operator: &'static str) -> Result<()> {
    match object.value() {
        Value::String(_) | Value::Array(_) | Value::Procedure(_) | Value::Dictionary(_)
            if !object.access().readable() =>
        {
            Err(Error::InvalidAccess(operator))
        }
        _ => Ok(()),
    }
}

fn name_key(object: &Object, operator: &'static str) -> Result<Name> {
    match object.value() {
        Value::LiteralName(name) | Value::ExecutableName(name) => Ok(name.clone()),
        found => Err(Error::TypeMismatch {
            operator,
            expected: "name",
            found: found.type_name(),
        }),
    }
}

fn element_index(object: &Object, len: usize, operator: &'static str) -> Result<usize> {
    let index = match object.value() {
        Value::Integer(v) => *v as i64,
        found => {
            return Err(Error::TypeMismatch {
                operator,
                expected: "integer",
                found: found.type_name(),
            });
        }
    };

    if index < 0 || index as usize >= len {
        return Err(Error::RangeCheck(operator));
    }

    Ok(index as usize)
}

// Operand stack manipulation.

fn pop(interp: &mut Interpreter) -> Result<()> {
    interp.pop_operand()?;
    Ok(())
}

fn dup(interp: &mut Interpreter) -> Result<()> {
    let object = interp.top_operand()?.clone();
    interp.push_operand(object);
    Ok(())
}

fn exch(interp: &mut Interpreter) -> Result<()> {
    let b = interp.pop_operand()?;
    let a = interp.pop_operand()?;
    interp.push_operand(b);
    interp.push_operand(a);
    Ok(())
}

fn copy(interp: &mut Interpreter) -> Result<()> {
    let n = interp.pop_integer("copy")?;
    if n < 0 {
        return Err(Error::RangeCheck("copy"));
    }

    let n = n as usize;
    let len = interp.operands().len();
    if len < n {
        return Err(Error::StackUnderflow(StackKind::Operand));
    }

    let copies = interp.operands()[len - n..].to_vec();
    for object in copies {
        interp.push_operand(object);
    }

    Ok(())
}

fn index(interp: &mut Interpreter) -> Result<()> {
    let n = interp.pop_integer("index")?;
    if n < 0 {
        return Err(Error::RangeCheck("index"));
    }

    let len = interp.operands().len();
    if len <= n as usize {
        return Err(Error::StackUnderflow(StackKind::Operand));
    }

    let object = interp.operands()[len - 1 - n as usize].clone();
    interp.push_operand(object);
    Ok(())
}

fn roll(interp: &mut Interpreter) -> Result<()> {
    let j = interp.pop_integer("roll")?;
    let n = interp.pop_integer("roll")?;
    if n < 0 {
        return Err(Error::RangeCheck("roll"));
    }

    let n = n as usize;
    let len = interp.operands().len();
    if len < n {
        return Err(Error::StackUnderflow(StackKind::Operand));
    }

    let target = &mut interp.operands_mut()[len - n..];
    if target.is_empty() || j == 0 {
        return Ok(());
    }

    let shift = j.unsigned_abs() as usize % target.len();
    if j > 0 {
        target.rotate_right(shift);
    } else {
        target.rotate_left(shift);
    }

    Ok(())
}

fn clear(interp: &mut Interpreter) -> Result<()> {
    interp.clear_operands();
    Ok(())
}

fn count(interp: &mut Interpreter) -> Result<()> {
    let len = interp.operands().len();
    interp.push_operand(Object::integer(len as f64));
    Ok(())
}

// Arithmetic.

fn add(interp: &mut Interpreter) -> Result<()> {
    let (b, bi) = interp.pop_number("add")?;
    let (a, ai) = interp.pop_number("add")?;
    interp.push_operand(numeric(a + b, ai && bi));
    Ok(())
}

fn sub(interp: &mut Interpreter) -> Result<()> {
    let (b, bi) = interp.pop_number("sub")?;
    let (a, ai) = interp.pop_number("sub")?;
    interp.push_operand(numeric(a - b, ai && bi));
    Ok(())
}

fn mul(interp: &mut Interpreter) -> Result<()> {
    let (b, bi) = interp.pop_number("mul")?;
    let (a, ai) = interp.pop_number("mul")?;
    interp.push_operand(numeric(a * b, ai && bi));
    Ok(())
}

fn div(interp: &mut Interpreter) -> Result<()> {
    let (b, _) = interp.pop_number("div")?;
    let (a, _) = interp.pop_number("div")?;
    if b == 0.0 {
        return Err(Error::UndefinedResult("div"));
    }

    interp.push_operand(Object::real(a / b));
    Ok(())
}

fn idiv(interp: &mut Interpreter) -> Result<()> {
    let b = interp.pop_integer("idiv")?;
    let a = interp.pop_integer("idiv")?;
    if b == 0 {
        return Err(Error::UndefinedResult("idiv"));
    }

    interp.push_operand(Object::integer((a / b) as f64));
    Ok(())
}

fn mod_(interp: &mut Interpreter) -> Result<()> {
    let b = interp.pop_integer("mod")?;
    let a = interp.pop_integer("mod")?;
    if b == 0 {
        return Err(Error::UndefinedResult("mod"));
    }

    interp.push_operand(Object::integer((a % b) as f64));
    Ok(())
}

fn neg(interp: &mut Interpreter) -> Result<()> {
    let (a, ai) = interp.pop_number("neg")?;
    interp.push_operand(numeric(-a, ai));
    Ok(())
}

fn abs(interp: &mut Interpreter) -> Result<()> {
    let (a, ai) = interp.pop_number("abs")?;
    interp.push_operand(numeric(a.abs(), ai));
    Ok(())
}

fn ceiling(interp: &mut Interpreter) -> Result<()> {
    let (a, ai) = interp.pop_number("ceiling")?;
    interp.push_operand(numeric(a.ceil(), ai));
    Ok(())
}

fn floor(interp: &mut Interpreter) -> Result<()> {
    let (a, ai) = interp.pop_number("floor")?;
    interp.push_operand(numeric(a.floor(), ai));
    Ok(())
}

fn round(interp: &mut Interpreter) -> Result<()> {
    let (a, ai) = interp.pop_number("round")?;
    interp.push_operand(numeric(a.round(), ai));
    Ok(())
}

fn truncate(interp: &mut Interpreter) -> Result<()> {
    let (a, ai) = interp.pop_number("truncate")?;
    interp.push_operand(numeric(a.trunc(), ai));
    Ok(())
}

fn sqrt(interp: &mut Interpreter) -> Result<()> {
    let (a, _) = interp.pop_number("sqrt")?;
    if a < 0.0 {
        return Err(Error::RangeCheck("sqrt"));
    }

    interp.push_operand(Object::real(a.sqrt()));
    Ok(())
}

fn sin(interp: &mut Interpreter) -> Result<()> {
    let (a, _) = interp.pop_number("sin")?;
    interp.push_operand(Object::real(a.to_radians().sin()));
    Ok(())
}

fn cos(interp: &mut Interpreter) -> Result<()> {
    let (a, _) = interp.pop_number("cos")?;
    interp.push_operand(Object::real(a.to_radians().cos()));
    Ok(())
}

fn atan(interp: &mut Interpreter) -> Result<()> {
    let (den, _) = interp.pop_number("atan")?;
    let (num, _) = interp.pop_number("atan")?;
    if num == 0.0 && den == 0.0 {
        return Err(Error::UndefinedResult("atan"));
    }

    let mut degrees = num.atan2(den).to_degrees() % 360.0;
    if degrees < 0.0 {
        degrees += 360.0;
    }

    interp.push_operand(Object::real(degrees));
    Ok(())
}

fn exp(interp: &mut Interpreter) -> Result<()> {
    let (exponent, _) = interp.pop_number("exp")?;
    let (base, _) = interp.pop_number("exp")?;
    interp.push_operand(Object::real(base.powf(exponent)));
    Ok(())
}

fn ln(interp: &mut Interpreter) -> Result<()> {
    let (a, _) = interp.pop_number("ln")?;
    if a <= 0.0 {
        return Err(Error::RangeCheck("ln"));
    }

    interp.push_operand(Object::real(a.ln()));
    Ok(())
}

fn log(interp: &mut Interpreter) -> Result<()> {
    let (a, _) = interp.pop_number("log")?;
    if a <= 0.0 {
        return Err(Error::RangeCheck("log"));
    }

    interp.push_operand(Object::real(a.log10()));
    Ok(())
}

// Relational, boolean, and bitwise.

fn eq(interp: &mut Interpreter) -> Result<()> {
    let b = interp.pop_operand()?;
    let a = interp.pop_operand()?;
    inspectable(&a, "eq")?;
    inspectable(&b, "eq")?;

    interp.push_operand(Object::boolean(a.value() == b.value()));
    Ok(())
}

fn ne(interp: &mut Interpreter) -> Result<()> {
    let b = interp.pop_operand()?;
    let a = interp.pop_operand()?;
    inspectable(&a, "ne")?;
    inspectable(&b, "ne")?;

    interp.push_operand(Object::boolean(a.value() != b.value()));
    Ok(())
}

/// Order two numbers or two strings for `gt`/`ge`/`lt`/`le`.
fn compare(interp: &mut Interpreter, operator: &'static str) -> Result<Ordering> {
    let b = interp.pop_operand()?;
    let a = interp.pop_operand()?;

    match (a.value(), b.value()) {
        (Value::Integer(x) | Value::Real(x), Value::Integer(y) | Value::Real(y)) => {
            Ok(x.partial_cmp(y).unwrap_or(Ordering::Equal))
        }
        (Value::String(x), Value::String(y)) => {
            if !a.access().readable() || !b.access().readable() {
                return Err(Error::InvalidAccess(operator));
            }
            Ok(x.borrow().as_slice().cmp(y.borrow().as_slice()))
        }
        (x, y) => {
            let found = if matches!(x, Value::Integer(_) | Value::Real(_) | Value::String(_)) {
                y.type_name()
            } else {
                x.type_name()
            };
            Err(Error::TypeMismatch {
                operator,
                expected: "number or string",
                found,
            })
        }
    }
}

fn gt(interp: &mut Interpreter) -> Result<()> {
    let ordering = compare(interp, "gt")?;
    interp.push_operand(Object::boolean(ordering == Ordering::Greater));
    Ok(())
}

fn ge(interp: &mut Interpreter) -> Result<()> {
    let ordering = compare(interp, "ge")?;
    interp.push_operand(Object::boolean(ordering != Ordering::Less));
    Ok(())
}

fn lt(interp: &mut Interpreter) -> Result<()> {
    let ordering = compare(interp, "lt")?;
    interp.push_operand(Object::boolean(ordering == Ordering::Less));
    Ok(())
}

fn le(interp: &mut Interpreter) -> Result<()> {
    let ordering = compare(interp, "le")?;
    interp.push_operand(Object::boolean(ordering != Ordering::Greater));
    Ok(())
}

/// Boolean or bitwise binary operation, by operand type.
fn logical(
    interp: &mut Interpreter,
    operator: &'static str,
    int_op: fn(i32, i32) -> i32,
    bool_op: fn(bool, bool) -> bool,
) -> Result<()> {
    let b = interp.pop_operand()?;
    let a = interp.pop_operand()?;

    let result = match (a.value(), b.value()) {
        (Value::Boolean(x), Value::Boolean(y)) => Object::boolean(bool_op(*x, *y)),
        (Value::Integer(x), Value::Integer(y)) => {
            Object::integer(f64::from(int_op(*x as i32, *y as i32)))
        }
        (x, y) => {
            let found = if matches!(x, Value::Boolean(_) | Value::Integer(_)) {
                y.type_name()
            } else {
                x.type_name()
            };
            return Err(Error::TypeMismatch {
                operator,
                expected: "boolean or integer",
                found,
            });
        }
    };

    interp.push_operand(result);
    Ok(())
}

fn and(interp: &mut Interpreter) -> Result<()> {
    logical(interp, "and", |x, y| x & y, |x, y| x && y)
}

fn or(interp: &mut Interpreter) -> Result<()> {
    logical(interp, "or", |x, y| x | y, |x, y| x || y)
}

fn xor(interp: &mut Interpreter) -> Result<()> {
    logical(interp, "xor", |x, y| x ^ y, |x, y| x ^ y)
}

fn not(interp: &mut Interpreter) -> Result<()> {
    let object = interp.pop_operand()?;

    let result = match object.value() {
        Value::Boolean(b) => Object::boolean(!b),
        Value::Integer(v) => Object::integer(f64::from(!(*v as i32))),
        found => {
            return Err(Error::TypeMismatch {
                operator: "not",
                expected: "boolean or integer",
                found: found.type_name(),
            });
        }
    };

    interp.push_operand(result);
    Ok(())
}

fn bitshift(interp: &mut Interpreter) -> Result<()> {
    let shift = interp.pop_integer("bitshift")?.clamp(-32, 32);
    let value = interp.pop_integer("bitshift")? as i32;

    let result = if shift >= 0 {
        (value as u32).checked_shl(shift as u32).unwrap_or(0) as i32
    } else {
        (value as u32)
            .checked_shr(shift.unsigned_abs() as u32)
            .unwrap_or(0) as i32
    };

    interp.push_operand(Object::integer(f64::from(result)));
    Ok(())
}

fn true_(interp: &mut Interpreter) -> Result<()> {
    interp.push_operand(Object::boolean(true));
    Ok(())
}

fn false_(interp: &mut Interpreter) -> Result<()> {
    interp.push_operand(Object::boolean(false));
    Ok(())
}

// Control.

fn exec(interp: &mut Interpreter) -> Result<()> {
    let object = interp.pop_operand()?;
    interp.exec_object(object)
}

fn if_(interp: &mut Interpreter) -> Result<()> {
    let body = interp.pop_procedure("if")?;
    let condition = interp.pop_boolean("if")?;

    if condition {
        interp.schedule_body(&body);
    }

    Ok(())
}

fn ifelse(interp: &mut Interpreter) -> Result<()> {
    let alternative = interp.pop_procedure("ifelse")?;
    let consequent = interp.pop_procedure("ifelse")?;
    let condition = interp.pop_boolean("ifelse")?;

    interp.schedule_body(if condition { &consequent } else { &alternative });
    Ok(())
}

fn for_(interp: &mut Interpreter) -> Result<()> {
    let body = interp.pop_procedure("for")?;
    let (limit, li) = interp.pop_number("for")?;
    let (increment, ii) = interp.pop_number("for")?;
    let (initial, ni) = interp.pop_number("for")?;
    let integer = li && ii && ni;

    let mut control = initial;
    loop {
        if increment >= 0.0 {
            if control > limit {
                break;
            }
        } else if control < limit {
            break;
        }

        interp.push_operand(numeric(control, integer));
        match interp.run_nested(&body) {
            Err(Error::Exit) => return Ok(()),
            other => other?,
        }

        control += increment;
    }

    Ok(())
}

fn repeat(interp: &mut Interpreter) -> Result<()> {
    let body = interp.pop_procedure("repeat")?;
    let n = interp.pop_integer("repeat")?;
    if n < 0 {
        return Err(Error::RangeCheck("repeat"));
    }

    for _ in 0..n {
        match interp.run_nested(&body) {
            Err(Error::Exit) => return Ok(()),
            other => other?,
        }
    }

    Ok(())
}

fn loop_(interp: &mut Interpreter) -> Result<()> {
    let body = interp.pop_procedure("loop")?;

    loop {
        match interp.run_nested(&body) {
            Err(Error::Exit) => return Ok(()),
            other => other?,
        }
    }
}

fn exit(_interp: &mut Interpreter) -> Result<()> {
    Err(Error::Exit)
}

fn quit(_interp: &mut Interpreter) -> Result<()> {
    Err(Error::Quit)
}

// Dictionaries.

fn dict(interp: &mut Interpreter) -> Result<()> {
    let n = interp.pop_integer("dict")?;
    if n < 0 {
        return Err(Error::RangeCheck("dict"));
    }

    interp.push_operand(Object::dictionary(Dict::with_capacity(n as usize)));
    Ok(())
}

fn def(interp: &mut Interpreter) -> Result<()> {
    let value = interp.pop_operand()?;
    let key = interp.pop_name("def")?;
    interp.define(key, value)
}

fn begin(interp: &mut Interpreter) -> Result<()> {
    let object = interp.pop_operand()?;

    match object.value() {
        Value::Dictionary(_) => {
            if object.access() == Access::None {
                return Err(Error::InvalidAccess("begin"));
            }
            interp.push_dictionary(object);
            Ok(())
        }
        found => Err(Error::TypeMismatch {
            operator: "begin",
            expected: "dictionary",
            found: found.type_name(),
        }),
    }
}

fn end(interp: &mut Interpreter) -> Result<()> {
    interp.pop_dictionary()
}

fn load(interp: &mut Interpreter) -> Result<()> {
    let name = interp.pop_name("load")?;
    let object = interp.lookup(&name)?;
    interp.push_operand(object);
    Ok(())
}

fn known(interp: &mut Interpreter) -> Result<()> {
    let name = interp.pop_name("known")?;
    let object = interp.pop_operand()?;

    if !object.access().readable() {
        return Err(Error::InvalidAccess("known"));
    }

    match object.value() {
        Value::Dictionary(dict) => {
            interp.push_operand(Object::boolean(dict.contains(&name)));
            Ok(())
        }
        found => Err(Error::TypeMismatch {
            operator: "known",
            expected: "dictionary",
            found: found.type_name(),
        }),
    }
}

fn where_(interp: &mut Interpreter) -> Result<()> {
    let name = interp.pop_name("where")?;

    match interp.find_defining(&name) {
        Some(dictionary) => {
            interp.push_operand(dictionary);
            interp.push_operand(Object::boolean(true));
        }
        None => interp.push_operand(Object::boolean(false)),
    }

    Ok(())
}

// Composite object access.

fn get(interp: &mut Interpreter) -> Result<()> {
    let key = interp.pop_operand()?;
    let container = interp.pop_operand()?;

    if !container.access().readable() {
        return Err(Error::InvalidAccess("get"));
    }

    let result = match container.value() {
        Value::Dictionary(dict) => {
            let name = name_key(&key, "get")?;
            dict.get(&name).ok_or(Error::Undefined(name))?
        }
        Value::Array(items) | Value::Procedure(items) => {
            let items = items.borrow();
            let index = element_index(&key, items.len(), "get")?;
            items[index].clone()
        }
        Value::String(bytes) => {
            let bytes = bytes.borrow();
            let index = element_index(&key, bytes.len(), "get")?;
            Object::integer(f64::from(bytes[index]))
        }
        found => {
            return Err(Error::TypeMismatch {
                operator: "get",
                expected: "array, dictionary, or string",
                found: found.type_name(),
            });
        }
    };

    interp.push_operand(result);
    Ok(())
}

fn put(interp: &mut Interpreter) -> Result<()> {
    let value = interp.pop_operand()?;
    let key = interp.pop_operand()?;
    let container = interp.pop_operand()?;

    if !container.access().writable() {
        return Err(Error::InvalidAccess("put"));
    }

    match container.value() {
        Value::Dictionary(dict) => {
            dict.insert(name_key(&key, "put")?, value);
        }
        Value::Array(items) | Value::Procedure(items) => {
            let mut items = items.borrow_mut();
            let index = element_index(&key, items.len(), "put")?;
            items[index] = value;
        }
        Value::String(bytes) => {
            let mut bytes = bytes.borrow_mut();
            let index = element_index(&key, bytes.len(), "put")?;
            let byte = match value.value() {
                Value::Integer(v) => *v as i64,
                found => {
                    return Err(Error::TypeMismatch {
                        operator: "put",
                        expected: "integer",
                        found: found.type_name(),
                    });
                }
            };
            if !(0..=255).contains(&byte) {
                return Err(Error::RangeCheck("put"));
            }
            bytes[index] = byte as u8;
        }
        found => {
            return Err(Error::TypeMismatch {
                operator: "put",
                expected: "array, dictionary, or string",
                found: found.type_name(),
            });
        }
    }

    Ok(())
}

fn length(interp: &mut Interpreter) -> Result<()> {
    let container = interp.pop_operand()?;

    if !container.access().readable() {
        return Err(Error::InvalidAccess("length"));
    }

    let len = match container.value() {
        Value::Dictionary(dict) => dict.len(),
        Value::Array(items) | Value::Procedure(items) => items.borrow().len(),
        Value::String(bytes) => bytes.borrow().len(),
        Value::LiteralName(name) | Value::ExecutableName(name) => name.as_str().len(),
        found => {
            return Err(Error::TypeMismatch {
                operator: "length",
                expected: "composite object",
                found: found.type_name(),
            });
        }
    };

    interp.push_operand(Object::integer(len as f64));
    Ok(())
}

fn string(interp: &mut Interpreter) -> Result<()> {
    let n = interp.pop_integer("string")?;
    if n < 0 {
        return Err(Error::RangeCheck("string"));
    }

    interp.push_operand(Object::string(vec![0; n as usize]));
    Ok(())
}

// Type and attribute conversion.

fn cvi(interp: &mut Interpreter) -> Result<()> {
    let (v, _) = interp.pop_number("cvi")?;
    interp.push_operand(Object::integer(v.trunc()));
    Ok(())
}

fn cvr(interp: &mut Interpreter) -> Result<()> {
    let (v, _) = interp.pop_number("cvr")?;
    interp.push_operand(Object::real(v));
    Ok(())
}

fn cvx(interp: &mut Interpreter) -> Result<()> {
    let object = interp.pop_operand()?;
    interp.push_operand(object.into_executable());
    Ok(())
}

fn cvlit(interp: &mut Interpreter) -> Result<()> {
    let object = interp.pop_operand()?;
    interp.push_operand(object.into_literal());
    Ok(())
}

/// Restrict an object's access level; granting access back is an error.
fn restrict(interp: &mut Interpreter, operator: &'static str, access: Access) -> Result<()> {
    let mut object = interp.pop_operand()?;

    if access.rank() > object.access().rank() {
        return Err(Error::InvalidAccess(operator));
    }

    object.set_access(access);
    interp.push_operand(object);
    Ok(())
}

fn readonly(interp: &mut Interpreter) -> Result<()> {
    restrict(interp, "readonly", Access::ReadOnly)
}

fn executeonly(interp: &mut Interpreter) -> Result<()> {
    restrict(interp, "executeonly", Access::ExecuteOnly)
}

fn noaccess(interp: &mut Interpreter) -> Result<()> {
    restrict(interp, "noaccess", Access::None)
}

fn bind(interp: &mut Interpreter) -> Result<()> {
    let object = interp.top_operand()?.clone();

    match object.value() {
        Value::Procedure(body) => {
            bind_body(interp, body);
            Ok(())
        }
        found => Err(Error::TypeMismatch {
            operator: "bind",
            expected: "procedure",
            found: found.type_name(),
        }),
    }
}

/// Replace executable names bound to operators with the operators
/// themselves, recursing into nested procedures. Unresolved names stay.
fn bind_body(interp: &Interpreter, body: &ArrayRef) {
    for item in body.borrow_mut().iter_mut() {
        let replacement = match item.value() {
            Value::ExecutableName(name) => match interp.lookup(name) {
                Ok(bound) if matches!(bound.value(), Value::Operand(_)) => Some(bound),
                _ => None,
            },
            Value::Procedure(inner) => {
                bind_body(interp, inner);
                None
            }
            _ => None,
        };

        if let Some(replacement) = replacement {
            *item = replacement;
        }
    }
}

// Filtered streams.

/// Decrypt either a string operand or, following the `currentfile eexec`
/// idiom, the remainder of the current token source, then execute the
/// plaintext.
fn eexec(interp: &mut Interpreter) -> Result<()> {
    let is_string = matches!(
        interp.peek_operand().map(Object::value),
        Some(Value::String(_))
    );

    if !is_string {
        interp.request_eexec();
        return Ok(());
    }

    let object = interp.pop_operand()?;
    if !object.access().readable() {
        return Err(Error::InvalidAccess("eexec"));
    }

    if let Value::String(bytes) = object.value() {
        let cipher = bytes.borrow().clone();
        let plain = decrypt_stream(&cipher)?;
        interp.interpret(&plain)?;
    }

    Ok(())
}

/// Placeholder so the `currentfile eexec` idiom executes; `eexec` itself
/// takes over the remainder of the source.
fn currentfile(_interp: &mut Interpreter) -> Result<()> {
    Ok(())
}
