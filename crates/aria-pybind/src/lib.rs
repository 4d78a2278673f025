//! # Aria Native Bridge
//!
//! Attribute resolution and value bridging between native Rust data and a
//! dynamically typed object runtime.
//!
//! ## Overview
//!
//! This crate lets plain Rust structs be exposed as dynamic objects without
//! hand-written bindings, and implements the property descriptor used by
//! the runtime's generic attribute lookup:
//! - Structural extraction of a struct's fields and methods, once per type
//! - A wrapper exposing get / set / call against one live instance
//! - Recursive marshalling of host values into dynamic values and back
//! - Property descriptors with getter / setter / deleter slots
//!
//! ## Design Goals
//!
//! 1. **No reflection**: types register their members once; the result is
//!    an immutable table shared through a process-wide cache
//! 2. **Check before acting**: failed assignments never write, failed calls
//!    never run the method
//! 3. **Closed value model**: every host value is one of a fixed set of
//!    tagged shapes, so marshalling is total and testable
//! 4. **Typed failures**: every error is a value carrying the guest
//!    exception category
//!
//! ## Example
//!
//! ```ignore
//! use aria_pybind::{host_object, NativeObject, PyValue};
//!
//! #[derive(Debug, Default)]
//! struct Sensor {
//!     label: String,
//!     reading: f64,
//! }
//!
//! impl Sensor {
//!     fn method_scale(&self, factor: f64) -> f64 {
//!         self.reading * factor
//!     }
//! }
//!
//! host_object! {
//!     Sensor {
//!         fields { label: String, reading: f64 }
//!         methods { fn method_scale(factor: f64) -> f64; }
//!     }
//! }
//!
//! let sensor = NativeObject::new(Sensor::default()).into_object();
//! let native = sensor.as_native().unwrap();
//! native.setattr("reading", &PyValue::Float(2.0))?;
//! assert_eq!(native.callattr("scale", &[PyValue::Float(3.0)])?, PyValue::Float(6.0));
//! ```
//!
//! ## Module Structure
//!
//! - [`host`]: Host value model and the `HostData` conversion trait
//! - [`extract`]: Registration, structural descriptions and their cache
//! - [`native`]: Wrapper around one bridged instance
//! - [`marshal`]: Host to dynamic value conversion and back
//! - [`property`]: Property descriptor
//! - [`attr`]: Generic attribute access over dynamic values
//! - [`object`]: Dynamic value representation
//! - [`call`]: Callables and the positional calling convention
//! - [`class`]: Minimal class objects
//! - [`config`]: Bridge configuration
//! - [`error`]: Error types

pub mod attr;
pub mod call;
pub mod class;
pub mod config;
pub mod error;
pub mod extract;
pub mod host;
mod macros;
pub mod marshal;
pub mod native;
pub mod object;
pub mod property;

// Re-export main types for convenience
pub use attr::{call_attribute, delete_attribute, get_attribute, set_attribute};
pub use call::{call, PyFunction};
pub use class::{PyClass, PyInstance};
pub use config::{BridgeConfig, MethodKind, MethodPrefix};
pub use error::{BridgeError, BridgeResult, ErrorKind, SlotAction};
pub use extract::{
    extract, from_record, layout_of, record_of, FieldEntry, FieldInfo, HostObject, MethodInfo, Registration,
    StructCache, StructInfo, TypeTable,
};
pub use host::{
    ByteBuf, FloatWidth, HostData, HostFloat, HostInt, HostKind, HostRecord, HostType, HostValue,
    IntWidth, IntoReturns, LayoutField, LayoutFn, RecordField, RecordLayout,
};
pub use marshal::{from_object, from_object_as, struct_to_object, to_object, Marshaller};
pub use native::{NativeInstance, NativeObject, NativeRef, DOC_ATTRIBUTE};
pub use object::{PyDict, PyList, PyValue};
pub use property::Property;
