//! Native Object Wrapper
//!
//! [`NativeObject`] owns a shared, mutable view of one host instance plus
//! its cached [`TypeTable`], and exposes the dynamic object capability set
//! against it: get an attribute, set an attribute, call a method.
//!
//! Every failure is detected before anything is touched: assignments check
//! settability and type first, calls check arity and argument types first,
//! so a failed operation never mutates the instance or runs the method.
//!
//! [`NativeRef`] is the type-erased handle stored in [`PyValue::Native`].
//! It speaks in dynamic values and applies the method classification:
//! computed-property methods are invoked on attribute read, plain methods
//! are returned as bound callables.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::call::PyFunction;
use crate::config::MethodKind;
use crate::error::{BridgeError, BridgeResult};
use crate::extract::{HostObject, StructCache, StructInfo, TypeTable};
use crate::host::HostValue;
use crate::marshal::Marshaller;
use crate::object::PyValue;

/// Name of the field used as the object's documentation
pub const DOC_ATTRIBUTE: &str = "__doc__";

// ============================================================================
// NativeObject - typed wrapper
// ============================================================================

/// One bridged host instance
pub struct NativeObject<T> {
    table: Arc<TypeTable<T>>,
    instance: Rc<RefCell<T>>,
    marshaller: Marshaller,
}

impl<T: HostObject> NativeObject<T> {
    /// Wrap `value` using the global structural cache
    pub fn new(value: T) -> Self {
        Self::from_shared(Rc::new(RefCell::new(value)))
    }

    /// Wrap an instance that is also held elsewhere
    pub fn from_shared(instance: Rc<RefCell<T>>) -> Self {
        Self::with_cache(instance, StructCache::global())
    }

    /// Wrap an optional value; a null reference has no wrapper
    pub fn from_option(value: Option<T>) -> Option<Self> {
        value.map(Self::new)
    }

    /// Wrap an instance using a specific cache and its configuration
    pub fn with_cache(instance: Rc<RefCell<T>>, cache: &StructCache) -> Self {
        Self {
            table: cache.table::<T>(),
            instance,
            marshaller: Marshaller::from_config(cache.config()),
        }
    }

    /// The shared instance
    pub fn shared(&self) -> Rc<RefCell<T>> {
        self.instance.clone()
    }

    /// Erase the type and expose the wrapper as a dynamic value
    pub fn into_object(self) -> PyValue {
        PyValue::Native(NativeRef::new(self))
    }
}

impl<T> NativeObject<T> {
    pub fn info(&self) -> &StructInfo {
        self.table.info()
    }

    pub fn type_name(&self) -> &str {
        self.info().name()
    }

    fn no_attribute(&self, name: &str) -> BridgeError {
        BridgeError::no_attribute(self.type_name(), name)
    }

    /// Read an exposed field
    pub fn get(&self, name: &str) -> BridgeResult<HostValue> {
        let field = self.info().field(name).ok_or_else(|| self.no_attribute(name))?;
        self.table
            .read_field(&self.instance.borrow(), field)
            .ok_or_else(|| self.no_attribute(name))
    }

    /// Read an exposed field as a dynamic value
    pub fn get_object(&self, name: &str) -> BridgeResult<PyValue> {
        self.marshaller.to_object(&self.get(name)?)
    }

    /// Assign an exposed field.
    ///
    /// The value's runtime type must be directly assignable to the field's
    /// declared type; nothing is written otherwise.
    pub fn set(&self, name: &str, value: HostValue) -> BridgeResult<()> {
        let field = self.info().field(name).ok_or_else(|| self.no_attribute(name))?;
        if !field.settable {
            return Err(BridgeError::not_settable(name));
        }

        let source = value.host_type();
        if !field.ty.accepts(&source) {
            return Err(BridgeError::not_assignable(source.name(), field.ty.name()));
        }

        if self.table.write_field(&mut self.instance.borrow_mut(), field, value) {
            Ok(())
        } else {
            Err(BridgeError::conversion_failed(field.ty.name()))
        }
    }

    /// Call an exposed method with positional arguments and marshal its
    /// results in declaration order.
    pub fn call(&self, name: &str, args: Vec<HostValue>) -> BridgeResult<Vec<PyValue>> {
        let method = self.info().method(name).ok_or_else(|| self.no_attribute(name))?;
        if args.len() != method.arity() {
            return Err(BridgeError::arity(name, args.len(), method.arity()));
        }
        for (arg, param) in args.iter().zip(&method.params) {
            let source = arg.host_type();
            if !param.accepts(&source) {
                return Err(BridgeError::not_assignable(source.name(), param.name()));
            }
        }

        trace!(type_name = %self.type_name(), method = name, args = args.len(), "calling bridged method");
        let results = self
            .table
            .invoke(&mut self.instance.borrow_mut(), method, args)
            .ok_or_else(|| BridgeError::conversion_failed(self.type_name()))?;

        results
            .iter()
            .map(|result| self.marshaller.to_object(result))
            .collect()
    }

    /// Text of the `__doc__` field, empty when there is none
    pub fn doc(&self) -> String {
        match self.get(DOC_ATTRIBUTE) {
            Ok(HostValue::Str(doc)) => doc.to_string(),
            _ => String::new(),
        }
    }

    /// The whole instance as a struct snapshot
    pub fn snapshot(&self) -> HostValue {
        HostValue::Struct(self.table.record(&self.instance.borrow()))
    }
}

impl<T> fmt::Debug for NativeObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("type", &self.type_name())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NativeRef - type-erased handle
// ============================================================================

/// Object-safe view of a [`NativeObject`]
pub trait NativeInstance {
    fn info(&self) -> &StructInfo;
    fn marshaller(&self) -> Marshaller;
    fn get_field(&self, name: &str) -> BridgeResult<HostValue>;
    fn set_field(&self, name: &str, value: HostValue) -> BridgeResult<()>;
    fn call_method(&self, name: &str, args: Vec<HostValue>) -> BridgeResult<Vec<PyValue>>;
    fn snapshot(&self) -> HostValue;
    fn doc(&self) -> String;
}

impl<T> NativeInstance for NativeObject<T> {
    fn info(&self) -> &StructInfo {
        NativeObject::info(self)
    }

    fn marshaller(&self) -> Marshaller {
        self.marshaller
    }

    fn get_field(&self, name: &str) -> BridgeResult<HostValue> {
        self.get(name)
    }

    fn set_field(&self, name: &str, value: HostValue) -> BridgeResult<()> {
        self.set(name, value)
    }

    fn call_method(&self, name: &str, args: Vec<HostValue>) -> BridgeResult<Vec<PyValue>> {
        self.call(name, args)
    }

    fn snapshot(&self) -> HostValue {
        NativeObject::snapshot(self)
    }

    fn doc(&self) -> String {
        NativeObject::doc(self)
    }
}

/// Shared handle to a bridged instance; clones compare equal
#[derive(Clone)]
pub struct NativeRef(Rc<dyn NativeInstance>);

impl NativeRef {
    pub fn new(instance: impl NativeInstance + 'static) -> Self {
        NativeRef(Rc::new(instance))
    }

    pub fn info(&self) -> &StructInfo {
        self.0.info()
    }

    pub fn type_name(&self) -> &str {
        self.0.info().name()
    }

    pub fn doc(&self) -> String {
        self.0.doc()
    }

    pub fn snapshot(&self) -> HostValue {
        self.0.snapshot()
    }

    /// Attribute read.
    ///
    /// Fields are returned marshalled. A computed-property method is called
    /// with no arguments and its result returned; a plain method is returned
    /// as a callable bound to this instance.
    pub fn getattr(&self, name: &str) -> BridgeResult<PyValue> {
        let info = self.0.info();
        if info.field(name).is_some() {
            let value = self.0.get_field(name)?;
            return self.0.marshaller().to_object(&value);
        }
        if let Some(method) = info.method(name) {
            return match method.kind {
                MethodKind::Property => self.callattr(name, &[]),
                MethodKind::Plain => Ok(PyValue::Function(self.bound_method(name))),
            };
        }
        if name == DOC_ATTRIBUTE {
            return Ok(PyValue::from(self.doc().as_str()));
        }
        Err(BridgeError::no_attribute(self.type_name(), name))
    }

    /// Attribute write; the value is converted to the field's declared type
    pub fn setattr(&self, name: &str, value: &PyValue) -> BridgeResult<()> {
        let field = self
            .0
            .info()
            .field(name)
            .ok_or_else(|| BridgeError::no_attribute(self.type_name(), name))?;
        if !field.settable {
            return Err(BridgeError::not_settable(name));
        }
        let host = self.0.marshaller().from_object(value, &field.ty)?;
        self.0.set_field(name, host)
    }

    /// Method call with dynamic arguments. No result gives `None`, one
    /// result is returned as is, several are packed into a tuple.
    pub fn callattr(&self, name: &str, args: &[PyValue]) -> BridgeResult<PyValue> {
        let method = self
            .0
            .info()
            .method(name)
            .ok_or_else(|| BridgeError::no_attribute(self.type_name(), name))?;
        if args.len() != method.arity() {
            return Err(BridgeError::arity(name, args.len(), method.arity()));
        }

        let marshaller = self.0.marshaller();
        let host_args = args
            .iter()
            .zip(&method.params)
            .map(|(arg, param)| marshaller.from_object(arg, param))
            .collect::<BridgeResult<Vec<_>>>()?;

        let mut results = self.0.call_method(name, host_args)?;
        Ok(match results.len() {
            0 => PyValue::None,
            1 => results.remove(0),
            _ => PyValue::Tuple(results),
        })
    }

    fn bound_method(&self, name: &str) -> PyFunction {
        let this = self.clone();
        let method = name.to_string();
        PyFunction::new(name, move |args| this.callattr(&method, args))
    }
}

impl PartialEq for NativeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.0) as *const u8 == Rc::as_ptr(&other.0) as *const u8
    }
}

impl fmt::Debug for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeRef").field(&self.type_name()).finish()
    }
}
