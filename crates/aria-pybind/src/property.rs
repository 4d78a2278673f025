//! Property Descriptor
//!
//! A computed attribute: up to three callables bound to the get, set and
//! delete slots. Each slot is independent; accessing an unbound slot is an
//! attribute error, never a silent no-op.
//!
//! Reconfiguration is an immutable update: `with_getter`, `with_setter` and
//! `with_deleter` return a new descriptor with one slot replaced, so a
//! descriptor already stored as a class attribute never changes under it.

use smol_str::SmolStr;

use crate::call::call;
use crate::error::{BridgeError, BridgeResult, SlotAction};
use crate::object::PyValue;

/// A getter/setter/deleter triple plus documentation text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    fget: Option<Box<PyValue>>,
    fset: Option<Box<PyValue>>,
    fdel: Option<Box<PyValue>>,
    doc: Option<SmolStr>,
}

impl Property {
    /// Construct from the arguments of `property(fget)`: exactly one
    /// callable, bound as the getter.
    pub fn new(args: &[PyValue]) -> BridgeResult<Self> {
        match args {
            [getter] => Self::from_getter(getter.clone()),
            _ => Err(BridgeError::arity("property", args.len(), 1)),
        }
    }

    /// Bind `getter` and take the documentation from it
    pub fn from_getter(getter: PyValue) -> BridgeResult<Self> {
        let getter = ensure_callable(getter)?;
        let doc = doc_of(&getter);
        Ok(Self {
            fget: Some(Box::new(getter)),
            doc,
            ..Default::default()
        })
    }

    /// Copy with the getter replaced
    pub fn with_getter(&self, getter: PyValue) -> BridgeResult<Self> {
        let getter = ensure_callable(getter)?;
        Ok(Self {
            doc: doc_of(&getter).or_else(|| self.doc.clone()),
            fget: Some(Box::new(getter)),
            ..self.clone()
        })
    }

    /// Copy with the setter replaced
    pub fn with_setter(&self, setter: PyValue) -> BridgeResult<Self> {
        Ok(Self {
            fset: Some(Box::new(ensure_callable(setter)?)),
            ..self.clone()
        })
    }

    /// Copy with the deleter replaced
    pub fn with_deleter(&self, deleter: PyValue) -> BridgeResult<Self> {
        Ok(Self {
            fdel: Some(Box::new(ensure_callable(deleter)?)),
            ..self.clone()
        })
    }

    /// Replace the documentation text
    pub fn with_doc(mut self, doc: impl Into<SmolStr>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// `__get__`: invoke the getter with `instance`
    pub fn read(&self, instance: &PyValue) -> BridgeResult<PyValue> {
        let getter = self
            .fget
            .as_deref()
            .ok_or(BridgeError::unbound_slot(SlotAction::Get))?;
        call(getter, std::slice::from_ref(instance))
    }

    /// `__set__`: invoke the setter with `(instance, value)`, discarding its result
    pub fn write(&self, instance: &PyValue, value: PyValue) -> BridgeResult<PyValue> {
        let setter = self
            .fset
            .as_deref()
            .ok_or(BridgeError::unbound_slot(SlotAction::Set))?;
        call(setter, &[instance.clone(), value])?;
        Ok(PyValue::None)
    }

    /// `__delete__`: invoke the deleter with `instance`
    pub fn delete(&self, instance: &PyValue) -> BridgeResult<PyValue> {
        let deleter = self
            .fdel
            .as_deref()
            .ok_or(BridgeError::unbound_slot(SlotAction::Delete))?;
        call(deleter, std::slice::from_ref(instance))?;
        Ok(PyValue::None)
    }

    pub fn fget(&self) -> Option<&PyValue> {
        self.fget.as_deref()
    }

    pub fn fset(&self) -> Option<&PyValue> {
        self.fset.as_deref()
    }

    pub fn fdel(&self) -> Option<&PyValue> {
        self.fdel.as_deref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

fn ensure_callable(value: PyValue) -> BridgeResult<PyValue> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(BridgeError::not_callable(value.type_name()))
    }
}

fn doc_of(value: &PyValue) -> Option<SmolStr> {
    match value {
        PyValue::Function(func) => func.doc().map(SmolStr::new),
        _ => None,
    }
}
