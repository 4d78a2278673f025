//! Callables and the positional calling convention.

use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::class::PyInstance;
use crate::error::{BridgeError, BridgeResult};
use crate::object::PyValue;

type NativeFn = dyn Fn(&[PyValue]) -> BridgeResult<PyValue>;

/// A callable backed by a Rust closure.
///
/// Clones share the closure and compare equal only to each other.
#[derive(Clone)]
pub struct PyFunction {
    name: SmolStr,
    doc: Option<SmolStr>,
    func: Rc<NativeFn>,
}

impl PyFunction {
    pub fn new(
        name: impl Into<SmolStr>,
        func: impl Fn(&[PyValue]) -> BridgeResult<PyValue> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            doc: None,
            func: Rc::new(func),
        }
    }

    /// Attach documentation text
    pub fn with_doc(mut self, doc: impl Into<SmolStr>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Invoke with positional arguments
    pub fn call(&self, args: &[PyValue]) -> BridgeResult<PyValue> {
        (self.func)(args)
    }
}

impl PartialEq for PyFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.func) as *const u8 == Rc::as_ptr(&other.func) as *const u8
    }
}

impl fmt::Debug for PyFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyFunction")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Call `callee` with a positional argument tuple and no keyword arguments.
///
/// Calling a class creates a bare instance of it.
pub fn call(callee: &PyValue, args: &[PyValue]) -> BridgeResult<PyValue> {
    match callee {
        PyValue::Function(func) => func.call(args),
        PyValue::Class(class) => {
            if !args.is_empty() {
                return Err(BridgeError::arity(class.name(), args.len(), 0));
            }
            Ok(PyValue::Instance(PyInstance::new(class.clone())))
        }
        other => Err(BridgeError::not_callable(other.type_name())),
    }
}
