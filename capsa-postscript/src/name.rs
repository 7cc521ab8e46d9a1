use core::borrow::Borrow;
use core::fmt;
use std::rc::Rc;

/// A PostScript name.
///
/// Names are cheap to clone and compare; the same name spelled in literal
/// (`/foo`) and executable (`foo`) form carries the same `Name` value, with
/// the distinction kept on the object.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name(Rc<str>);

impl Name {
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    /// Build a name from raw token bytes; non-UTF-8 bytes are replaced.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(&String::from_utf8_lossy(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
