//! The tagged PostScript object model.

use core::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::name::Name;
use crate::operator::Operator;

/// Whether an object is pushed as data or executed when encountered.
///
/// The flag is fixed at construction, determined by the lexical form of
/// the token (`/foo` vs `foo`, `{...}` bodies are always executable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Literal,
    Executable,
}

/// The access level of an object.
///
/// `ReadOnly` rejects mutation, `ExecuteOnly` rejects value inspection,
/// `None` rejects everything. Access can only ever be restricted, never
/// granted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Unlimited,
    ReadOnly,
    ExecuteOnly,
    None,
}

impl Access {
    /// Whether the value may be inspected (`get`, `length`, comparison).
    pub fn readable(self) -> bool {
        matches!(self, Self::Unlimited | Self::ReadOnly)
    }

    /// Whether the value may be mutated (`put`, `def` into a dictionary).
    pub fn writable(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Whether the object may be executed.
    pub fn executable(self) -> bool {
        !matches!(self, Self::None)
    }

    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::ExecuteOnly => 1,
            Self::ReadOnly => 2,
            Self::Unlimited => 3,
        }
    }
}

/// A shared, mutable PostScript string buffer.
pub type StringRef = Rc<RefCell<Vec<u8>>>;

/// A shared, mutable sequence of objects backing arrays and procedures.
pub type ArrayRef = Rc<RefCell<Vec<Object>>>;

/// A PostScript dictionary: a shared mapping from names to objects.
#[derive(Clone, Debug, Default)]
pub struct Dict(Rc<RefCell<FxHashMap<Name, Object>>>);

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Rc::new(RefCell::new(FxHashMap::with_capacity_and_hasher(
            capacity,
            FxBuildHasher,
        ))))
    }

    pub fn get(&self, name: &Name) -> Option<Object> {
        self.0.borrow().get(name).cloned()
    }

    pub fn insert(&self, name: Name, value: Object) {
        self.0.borrow_mut().insert(name, value);
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.0.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl PartialEq for Dict {
    /// Dictionaries are equal only if they are the same object.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// The variant payload of a PostScript object.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    /// An integer-kinded number. The value is stored as a 64-bit float and
    /// truncated on integer reads, so integers beyond 2^53 lose precision.
    Integer(f64),
    Real(f64),
    String(StringRef),
    LiteralName(Name),
    ExecutableName(Name),
    Array(ArrayRef),
    Procedure(ArrayRef),
    Dictionary(Dict),
    /// A built-in operator bound to a name.
    Operand(Operator),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::LiteralName(_) | Self::ExecutableName(_) => "name",
            Self::Array(_) => "array",
            Self::Procedure(_) => "procedure",
            Self::Dictionary(_) => "dictionary",
            Self::Operand(_) => "operator",
        }
    }
}

impl PartialEq for Value {
    /// Value equality as the `eq` operator sees it: numbers compare by
    /// value across kinds, strings by content, names by spelling, and
    /// composites by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a) | Self::Real(a), Self::Integer(b) | Self::Real(b)) => a == b,
            (Self::String(a), Self::String(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (
                Self::LiteralName(a) | Self::ExecutableName(a),
                Self::LiteralName(b) | Self::ExecutableName(b),
            ) => a == b,
            (Self::Array(a) | Self::Procedure(a), Self::Array(b) | Self::Procedure(b)) => {
                Rc::ptr_eq(a, b)
            }
            (Self::Dictionary(a), Self::Dictionary(b)) => a == b,
            (Self::Operand(a), Self::Operand(b)) => a == b,
            _ => false,
        }
    }
}

/// A PostScript object: a [`Value`] tagged with its execution flag and
/// access level.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    flag: Flag,
    access: Access,
    value: Value,
}

impl Object {
    fn literal(value: Value) -> Self {
        Self {
            flag: Flag::Literal,
            access: Access::Unlimited,
            value,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::literal(Value::Boolean(value))
    }

    /// An integer-kinded number; the payload stays a 64-bit float.
    pub fn integer(value: f64) -> Self {
        Self::literal(Value::Integer(value))
    }

    pub fn real(value: f64) -> Self {
        Self::literal(Value::Real(value))
    }

    pub fn string(bytes: Vec<u8>) -> Self {
        Self::literal(Value::String(Rc::new(RefCell::new(bytes))))
    }

    pub fn literal_name(name: Name) -> Self {
        Self::literal(Value::LiteralName(name))
    }

    pub fn executable_name(name: Name) -> Self {
        Self {
            flag: Flag::Executable,
            access: Access::Unlimited,
            value: Value::ExecutableName(name),
        }
    }

    pub fn array(items: Vec<Object>) -> Self {
        Self::literal(Value::Array(Rc::new(RefCell::new(items))))
    }

    /// A procedure body; always executable.
    pub fn procedure(items: Vec<Object>) -> Self {
        Self {
            flag: Flag::Executable,
            access: Access::Unlimited,
            value: Value::Procedure(Rc::new(RefCell::new(items))),
        }
    }

    pub fn dictionary(dict: Dict) -> Self {
        Self::literal(Value::Dictionary(dict))
    }

    pub(crate) fn operator(operator: Operator) -> Self {
        Self {
            flag: Flag::Executable,
            access: Access::ExecuteOnly,
            value: Value::Operand(operator),
        }
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Return the numeric payload of either number kind.
    pub fn number(&self) -> Option<f64> {
        match self.value {
            Value::Integer(v) | Value::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Return an integer-kinded payload, truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Integer(v) => Some(v as i64),
            _ => None,
        }
    }

    pub(crate) fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    /// The `cvx` conversion: mark executable, turning literal names into
    /// executable names and arrays into procedures.
    pub(crate) fn into_executable(mut self) -> Self {
        self.flag = Flag::Executable;
        self.value = match self.value {
            Value::LiteralName(name) => Value::ExecutableName(name),
            Value::Array(items) => Value::Procedure(items),
            value => value,
        };
        self
    }

    /// The `cvlit` conversion: mark literal, turning executable names into
    /// literal names and procedures into arrays.
    pub(crate) fn into_literal(mut self) -> Self {
        self.flag = Flag::Literal;
        self.value = match self.value {
            Value::ExecutableName(name) => Value::LiteralName(name),
            Value::Procedure(items) => Value::Array(items),
            value => value,
        };
        self
    }

    pub(crate) fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}
