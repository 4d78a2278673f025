//! Dynamic Object Representation
//!
//! The uniform value type of the guest runtime, as seen by the bridge.
//!
//! ## Type Hierarchy
//!
//! - `PyValue`: Enum covering every guest value
//! - `PyList`: shared, mutable list
//! - `PyDict`: shared, mutable mapping with text keys
//!
//! Functions, properties, bridged native instances and classes are
//! reference objects: clones share the same underlying object and compare
//! by identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::call::PyFunction;
use crate::class::{PyClass, PyInstance};
use crate::native::NativeRef;
use crate::property::Property;

// ============================================================================
// PyValue Enum - The main guest value representation
// ============================================================================

/// Represents any value of the dynamic runtime.
#[derive(Debug, Clone, Default)]
pub enum PyValue {
    /// The `None` singleton
    #[default]
    None,

    /// `bool` (True/False)
    Bool(bool),

    /// `int`, the canonical integer representation
    Int(i64),

    /// `float` (IEEE 754 double)
    Float(f64),

    /// `str`
    Str(SmolStr),

    /// `bytes`
    Bytes(Vec<u8>),

    /// `list`
    List(PyList),

    /// `tuple` (immutable)
    Tuple(Vec<PyValue>),

    /// `dict`
    Dict(PyDict),

    /// Callable object
    Function(PyFunction),

    /// Descriptor object for computed attributes
    Property(Property),

    /// Bridged host instance
    Native(NativeRef),

    /// Class object
    Class(PyClass),

    /// Instance of a class object
    Instance(PyInstance),
}

impl PyValue {
    /// Get the guest type name for this value
    pub fn type_name(&self) -> &str {
        match self {
            PyValue::None => "NoneType",
            PyValue::Bool(_) => "bool",
            PyValue::Int(_) => "int",
            PyValue::Float(_) => "float",
            PyValue::Str(_) => "str",
            PyValue::Bytes(_) => "bytes",
            PyValue::List(_) => "list",
            PyValue::Tuple(_) => "tuple",
            PyValue::Dict(_) => "dict",
            PyValue::Function(_) => "function",
            PyValue::Property(_) => "property",
            PyValue::Native(native) => native.type_name(),
            PyValue::Class(_) => "type",
            PyValue::Instance(instance) => instance.class().name(),
        }
    }

    /// Check if this value is None
    pub fn is_none(&self) -> bool {
        matches!(self, PyValue::None)
    }

    /// Check if this value can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, PyValue::Function(_) | PyValue::Class(_))
    }

    /// Check if this value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            PyValue::None => false,
            PyValue::Bool(b) => *b,
            PyValue::Int(n) => *n != 0,
            PyValue::Float(f) => *f != 0.0 && !f.is_nan(),
            PyValue::Str(s) => !s.is_empty(),
            PyValue::Bytes(b) => !b.is_empty(),
            PyValue::List(list) => !list.is_empty(),
            PyValue::Tuple(t) => !t.is_empty(),
            PyValue::Dict(dict) => !dict.is_empty(),
            PyValue::Function(_)
            | PyValue::Property(_)
            | PyValue::Native(_)
            | PyValue::Class(_)
            | PyValue::Instance(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&PyList> {
        match self {
            PyValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PyDict> {
        match self {
            PyValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeRef> {
        match self {
            PyValue::Native(native) => Some(native),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&Property> {
        match self {
            PyValue::Property(property) => Some(property),
            _ => None,
        }
    }
}

impl PartialEq for PyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PyValue::None, PyValue::None) => true,
            (PyValue::Bool(a), PyValue::Bool(b)) => a == b,
            (PyValue::Int(a), PyValue::Int(b)) => a == b,
            (PyValue::Float(a), PyValue::Float(b)) => a == b,
            (PyValue::Str(a), PyValue::Str(b)) => a == b,
            (PyValue::Bytes(a), PyValue::Bytes(b)) => a == b,
            (PyValue::List(a), PyValue::List(b)) => a == b,
            (PyValue::Tuple(a), PyValue::Tuple(b)) => a == b,
            (PyValue::Dict(a), PyValue::Dict(b)) => a == b,
            (PyValue::Function(a), PyValue::Function(b)) => a == b,
            (PyValue::Property(a), PyValue::Property(b)) => a == b,
            (PyValue::Native(a), PyValue::Native(b)) => a == b,
            (PyValue::Class(a), PyValue::Class(b)) => a == b,
            (PyValue::Instance(a), PyValue::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyValue::None => write!(f, "None"),
            PyValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            PyValue::Int(n) => write!(f, "{}", n),
            PyValue::Float(n) => write!(f, "{}", n),
            PyValue::Str(s) => write!(f, "'{}'", s),
            PyValue::Bytes(b) => write!(f, "b'{}'", b.escape_ascii()),
            PyValue::List(list) => write!(f, "{}", list),
            PyValue::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            PyValue::Dict(dict) => write!(f, "{}", dict),
            PyValue::Function(func) => write!(f, "<function {}>", func.name()),
            PyValue::Property(_) => write!(f, "<property object>"),
            PyValue::Native(native) => write!(f, "<{} object>", native.type_name()),
            PyValue::Class(class) => write!(f, "<class '{}'>", class.name()),
            PyValue::Instance(instance) => write!(f, "<{} object>", instance.class().name()),
        }
    }
}

impl From<bool> for PyValue {
    fn from(b: bool) -> Self {
        PyValue::Bool(b)
    }
}

impl From<i64> for PyValue {
    fn from(n: i64) -> Self {
        PyValue::Int(n)
    }
}

impl From<f64> for PyValue {
    fn from(f: f64) -> Self {
        PyValue::Float(f)
    }
}

impl From<&str> for PyValue {
    fn from(s: &str) -> Self {
        PyValue::Str(SmolStr::new(s))
    }
}

// ============================================================================
// PyList - shared list
// ============================================================================

/// A mutable, ordered collection shared between clones.
#[derive(Debug, Clone, Default)]
pub struct PyList {
    items: Rc<RefCell<Vec<PyValue>>>,
}

impl PyList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty list with room for `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    /// Create a list from a vector
    pub fn from_vec(items: Vec<PyValue>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Current allocated capacity
    pub fn capacity(&self) -> usize {
        self.items.borrow().capacity()
    }

    /// Get an item by index
    pub fn get(&self, index: usize) -> Option<PyValue> {
        self.items.borrow().get(index).cloned()
    }

    /// Set an item by index; returns false when the index is out of range
    pub fn set(&self, index: usize, value: PyValue) -> bool {
        match self.items.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append an item to the end
    pub fn append(&self, value: PyValue) {
        self.items.borrow_mut().push(value);
    }

    /// Iterate over a snapshot of the items
    pub fn iter(&self) -> impl Iterator<Item = PyValue> {
        self.items.borrow().clone().into_iter()
    }

    pub fn to_vec(&self) -> Vec<PyValue> {
        self.items.borrow().clone()
    }
}

impl PartialEq for PyList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items) || *self.items.borrow() == *other.items.borrow()
    }
}

impl fmt::Display for PyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let items = self.items.borrow();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }
}

impl FromIterator<PyValue> for PyList {
    fn from_iter<I: IntoIterator<Item = PyValue>>(iter: I) -> Self {
        PyList::from_vec(iter.into_iter().collect())
    }
}

// ============================================================================
// PyDict - shared mapping with text keys
// ============================================================================

/// A mutable mapping from text keys to values, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct PyDict {
    items: Rc<RefCell<IndexMap<SmolStr, PyValue>>>,
}

impl PyDict {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty dictionary with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Rc::new(RefCell::new(IndexMap::with_capacity(capacity))),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<PyValue> {
        self.items.borrow().get(key).cloned()
    }

    /// Set a key-value pair
    pub fn set(&self, key: impl Into<SmolStr>, value: PyValue) {
        self.items.borrow_mut().insert(key.into(), value);
    }

    /// Remove a key and return its value
    pub fn remove(&self, key: &str) -> Option<PyValue> {
        self.items.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.borrow().contains_key(key)
    }

    /// Get all keys
    pub fn keys(&self) -> Vec<SmolStr> {
        self.items.borrow().keys().cloned().collect()
    }

    /// Iterate over a snapshot of the key-value pairs
    pub fn iter(&self) -> impl Iterator<Item = (SmolStr, PyValue)> {
        self.items.borrow().clone().into_iter()
    }
}

impl PartialEq for PyDict {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items) || *self.items.borrow() == *other.items.borrow()
    }
}

impl fmt::Display for PyDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let items = self.items.borrow();
        for (i, (k, v)) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}': {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(SmolStr, PyValue)> for PyDict {
    fn from_iter<I: IntoIterator<Item = (SmolStr, PyValue)>>(iter: I) -> Self {
        Self {
            items: Rc::new(RefCell::new(iter.into_iter().collect())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pyvalue_type_names() {
        assert_eq!(PyValue::None.type_name(), "NoneType");
        assert_eq!(PyValue::Bool(true).type_name(), "bool");
        assert_eq!(PyValue::Int(42).type_name(), "int");
        assert_eq!(PyValue::Float(3.25).type_name(), "float");
        assert_eq!(PyValue::from("hello").type_name(), "str");
        assert_eq!(PyValue::Bytes(vec![1]).type_name(), "bytes");
    }

    #[test]
    fn test_pyvalue_truthiness() {
        assert!(!PyValue::None.is_truthy());
        assert!(!PyValue::Bool(false).is_truthy());
        assert!(PyValue::Bool(true).is_truthy());
        assert!(!PyValue::Int(0).is_truthy());
        assert!(PyValue::Int(-1).is_truthy());
        assert!(!PyValue::from("").is_truthy());
        assert!(PyValue::List(PyList::from_vec(vec![PyValue::None])).is_truthy());
    }

    #[test]
    fn test_no_cross_type_equality() {
        assert_ne!(PyValue::Int(1), PyValue::Float(1.0));
        assert_ne!(PyValue::Int(1), PyValue::Bool(true));
        assert_eq!(PyValue::Tuple(vec![PyValue::Int(1)]), PyValue::Tuple(vec![PyValue::Int(1)]));
    }

    #[test]
    fn test_pylist_shares_storage() {
        let list = PyList::with_capacity(4);
        assert!(list.capacity() >= 4);
        let alias = list.clone();
        alias.append(PyValue::Int(1));
        alias.append(PyValue::Int(2));
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1), Some(PyValue::Int(2)));

        assert!(list.set(0, PyValue::Int(42)));
        assert_eq!(alias.get(0), Some(PyValue::Int(42)));
        assert!(!list.set(9, PyValue::None));
    }

    #[test]
    fn test_pydict_equality_ignores_order() {
        let a = PyDict::new();
        a.set("x", PyValue::Int(1));
        a.set("y", PyValue::Int(2));

        let b = PyDict::new();
        b.set("y", PyValue::Int(2));
        b.set("x", PyValue::Int(1));
        assert_eq!(a, b);

        assert_eq!(b.remove("x"), Some(PyValue::Int(1)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_pyvalue_display() {
        assert_eq!(format!("{}", PyValue::None), "None");
        assert_eq!(format!("{}", PyValue::Bool(true)), "True");
        assert_eq!(format!("{}", PyValue::Int(42)), "42");
        assert_eq!(format!("{}", PyValue::from("hello")), "'hello'");
        assert_eq!(format!("{}", PyValue::Bytes(b"ab".to_vec())), "b'ab'");
        assert_eq!(format!("{}", PyValue::Tuple(vec![PyValue::Int(1)])), "(1,)");

        let list = PyList::from_vec(vec![PyValue::Int(1), PyValue::Int(2)]);
        assert_eq!(format!("{}", PyValue::List(list)), "[1, 2]");

        let dict = PyDict::new();
        dict.set("x", PyValue::Int(1));
        assert_eq!(format!("{}", PyValue::Dict(dict)), "{'x': 1}");
    }
}
