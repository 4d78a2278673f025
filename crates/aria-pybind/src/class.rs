//! Minimal class objects.
//!
//! Enough of the guest class model for descriptors to be looked up as
//! class attributes. There is no inheritance and no method resolution order.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::object::{PyDict, PyValue};

#[derive(Debug)]
struct ClassInner {
    name: SmolStr,
    attrs: RefCell<IndexMap<SmolStr, PyValue>>,
}

/// A class object with its own attribute namespace
#[derive(Debug, Clone)]
pub struct PyClass {
    inner: Rc<ClassInner>,
}

impl PyClass {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            inner: Rc::new(ClassInner {
                name: name.into(),
                attrs: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Look up a class attribute
    pub fn attr(&self, name: &str) -> Option<PyValue> {
        self.inner.attrs.borrow().get(name).cloned()
    }

    /// Define or replace a class attribute
    pub fn set_attr(&self, name: impl Into<SmolStr>, value: PyValue) {
        self.inner.attrs.borrow_mut().insert(name.into(), value);
    }

    pub fn remove_attr(&self, name: &str) -> Option<PyValue> {
        self.inner.attrs.borrow_mut().shift_remove(name)
    }
}

impl PartialEq for PyClass {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug)]
struct InstanceInner {
    class: PyClass,
    dict: PyDict,
}

/// An instance of a [`PyClass`] with its own attribute dictionary
#[derive(Debug, Clone)]
pub struct PyInstance {
    inner: Rc<InstanceInner>,
}

impl PyInstance {
    pub fn new(class: PyClass) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                class,
                dict: PyDict::new(),
            }),
        }
    }

    pub fn class(&self) -> &PyClass {
        &self.inner.class
    }

    /// The instance's `__dict__`
    pub fn dict(&self) -> &PyDict {
        &self.inner.dict
    }
}

impl PartialEq for PyInstance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
