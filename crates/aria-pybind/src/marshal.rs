//! Value Marshalling
//!
//! Converts host values into dynamic values and back.
//!
//! ## Host to dynamic
//!
//! Dispatch order:
//!
//! 1. null (and null references) become `None`
//! 2. builtin scalars widen to `int` / `float`, text and bytes wrap directly
//! 3. text-keyed maps become a `dict`, values marshalled recursively
//! 4. everything else goes by kind: derived numeric and text types become
//!    their underlying scalar, sequences become a `list`, structs become a
//!    `dict` keyed by each field's external name, references are followed
//! 5. anything left is unsupported
//!
//! ## Dynamic to host
//!
//! Only direct compatibility is accepted: no bool to int or int to float
//! coercion. Integers are range-checked against the target width. A
//! registered struct is rebuilt from a `dict` keyed the way it marshals.
//!
//! Both directions stop at the configured depth limit instead of recursing
//! without bound.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::extract::StructCache;
use crate::host::{
    FloatWidth, HostData, HostFloat, HostInt, HostKind, HostRecord, HostType, HostValue,
    RecordField, RecordLayout,
};
use crate::object::{PyDict, PyList, PyValue};

/// Converter between host and dynamic values with a nesting limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marshaller {
    max_depth: usize,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

impl Marshaller {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.max_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Convert any host value
    pub fn to_object(&self, value: &HostValue) -> BridgeResult<PyValue> {
        self.marshal(value, 0)
    }

    /// Convert a struct, or a reference to one, into a `dict`
    pub fn struct_to_object(&self, value: &HostValue) -> BridgeResult<PyValue> {
        self.marshal_struct(value, 0)
    }

    /// Convert a dynamic value into a host value of type `ty`
    pub fn from_object(&self, value: &PyValue, ty: &HostType) -> BridgeResult<HostValue> {
        self.unmarshal(value, ty, 0)
    }

    fn check_depth(&self, depth: usize, type_name: impl FnOnce() -> String) -> BridgeResult<()> {
        if depth > self.max_depth {
            return Err(BridgeError::recursion_limit(type_name(), self.max_depth));
        }
        Ok(())
    }

    fn marshal(&self, value: &HostValue, depth: usize) -> BridgeResult<PyValue> {
        self.check_depth(depth, || value.host_type().name().to_string())?;

        match value {
            HostValue::Nil | HostValue::Ref { target: None, .. } => Ok(PyValue::None),
            HostValue::Bool(b) => Ok(PyValue::Bool(*b)),
            HostValue::Int(n) => int_object(*n),
            HostValue::Float(f) => Ok(PyValue::Float(f.to_f64())),
            HostValue::Str(s) => Ok(PyValue::Str(s.clone())),
            HostValue::Bytes(bytes) => Ok(PyValue::Bytes(bytes.clone())),
            HostValue::Map { entries, .. } => {
                let dict = PyDict::with_capacity(entries.len());
                for (key, entry) in entries {
                    dict.set(key.clone(), self.marshal(entry, depth + 1)?);
                }
                Ok(PyValue::Dict(dict))
            }
            HostValue::Named { ty, inner } => self.marshal_derived(ty, inner, depth),
            HostValue::Seq { items, .. } => {
                let list = PyList::with_capacity(items.len());
                for item in items {
                    list.append(self.marshal(item, depth + 1)?);
                }
                Ok(PyValue::List(list))
            }
            HostValue::Struct(record) => self.marshal_record(record, depth),
            HostValue::Ref {
                target: Some(target),
                ..
            } => self.marshal(target, depth + 1),
            HostValue::Opaque(ty) => Err(BridgeError::unsupported(ty.name())),
        }
    }

    /// Values of derived types, dispatched on the underlying kind
    fn marshal_derived(&self, ty: &HostType, inner: &HostValue, depth: usize) -> BridgeResult<PyValue> {
        match ty.kind() {
            HostKind::Int(_)
            | HostKind::Float(_)
            | HostKind::Str
            | HostKind::Seq(_)
            | HostKind::Struct
            | HostKind::Ref(_) => self.marshal(inner, depth + 1),
            // a derived byte sequence is a plain sequence of small ints
            HostKind::Bytes => match inner {
                HostValue::Bytes(bytes) => Ok(PyValue::List(
                    bytes.iter().map(|&b| PyValue::Int(i64::from(b))).collect(),
                )),
                other => self.marshal(other, depth + 1),
            },
            HostKind::Any | HostKind::Nil | HostKind::Bool | HostKind::Map(_) | HostKind::Opaque => {
                Err(BridgeError::unsupported(ty.name()))
            }
        }
    }

    fn marshal_struct(&self, value: &HostValue, depth: usize) -> BridgeResult<PyValue> {
        self.check_depth(depth, || value.host_type().name().to_string())?;

        match value {
            HostValue::Nil | HostValue::Ref { target: None, .. } => Ok(PyValue::None),
            HostValue::Ref {
                target: Some(target),
                ..
            } => self.marshal_struct(target, depth + 1),
            HostValue::Struct(record) => self.marshal_record(record, depth),
            HostValue::Named { ty, inner } if matches!(ty.kind(), HostKind::Struct) => {
                self.marshal_struct(inner, depth + 1)
            }
            other => Err(BridgeError::unsupported(other.host_type().name())),
        }
    }

    fn marshal_record(&self, record: &HostRecord, depth: usize) -> BridgeResult<PyValue> {
        let dict = PyDict::with_capacity(record.fields.len());
        for field in &record.fields {
            dict.set(field.external_name(), self.marshal(&field.value, depth + 1)?);
        }
        Ok(PyValue::Dict(dict))
    }

    fn unmarshal(&self, value: &PyValue, ty: &HostType, depth: usize) -> BridgeResult<HostValue> {
        self.check_depth(depth, || ty.name().to_string())?;

        if ty.is_derived() && !matches!(ty.kind(), HostKind::Struct | HostKind::Opaque) {
            let inner = self.unmarshal(value, &ty.underlying(), depth + 1)?;
            return Ok(HostValue::named(ty.clone(), inner));
        }

        let mismatch = || BridgeError::not_assignable(value.type_name(), ty.name());

        match (ty.kind(), value) {
            (HostKind::Any, _) => self.infer(value, depth),
            (HostKind::Nil, PyValue::None) => Ok(HostValue::Nil),
            (HostKind::Bool, PyValue::Bool(b)) => Ok(HostValue::Bool(*b)),
            (HostKind::Int(width), PyValue::Int(n)) => HostInt::from_i64(*n, *width)
                .map(HostValue::Int)
                .ok_or_else(|| BridgeError::overflow(n, ty.name())),
            (HostKind::Float(FloatWidth::F32), PyValue::Float(f)) => {
                Ok(HostValue::Float(HostFloat::F32(*f as f32)))
            }
            (HostKind::Float(FloatWidth::F64), PyValue::Float(f)) => {
                Ok(HostValue::Float(HostFloat::F64(*f)))
            }
            (HostKind::Str, PyValue::Str(s)) => Ok(HostValue::Str(s.clone())),
            (HostKind::Bytes, PyValue::Bytes(bytes)) => Ok(HostValue::Bytes(bytes.clone())),
            (HostKind::Seq(elem), PyValue::List(list)) => self.unmarshal_seq(list.iter(), elem, depth),
            (HostKind::Seq(elem), PyValue::Tuple(items)) => {
                self.unmarshal_seq(items.iter().cloned(), elem, depth)
            }
            (HostKind::Map(value_type), PyValue::Dict(dict)) => {
                let entries = dict
                    .iter()
                    .map(|(key, entry)| Ok((key, self.unmarshal(&entry, value_type, depth + 1)?)))
                    .collect::<BridgeResult<_>>()?;
                Ok(HostValue::Map {
                    ty: ty.clone(),
                    entries,
                })
            }
            (HostKind::Ref(target_type), PyValue::None) => Ok(HostValue::Ref {
                target_type: (**target_type).clone(),
                target: None,
            }),
            (HostKind::Ref(target_type), _) => Ok(HostValue::Ref {
                target_type: (**target_type).clone(),
                target: Some(Box::new(self.unmarshal(value, target_type, depth + 1)?)),
            }),
            (HostKind::Struct, PyValue::Dict(dict)) => match ty.layout() {
                Some(layout) => self.unmarshal_record(dict, &layout, depth),
                None => Err(mismatch()),
            },
            (HostKind::Struct, PyValue::Native(native)) => {
                let snapshot = native.snapshot();
                if snapshot.host_type() == *ty {
                    Ok(snapshot)
                } else {
                    Err(mismatch())
                }
            }
            (HostKind::Opaque, _) => Err(BridgeError::unsupported(ty.name())),
            _ => Err(mismatch()),
        }
    }

    /// Rebuild a struct snapshot from a `dict` keyed by external field names.
    /// Unknown keys are rejected; fields without a key are left out of the
    /// record and keep their default when it is applied.
    fn unmarshal_record(
        &self,
        dict: &PyDict,
        layout: &RecordLayout,
        depth: usize,
    ) -> BridgeResult<HostValue> {
        let mut record = HostRecord::new(layout.ty.clone());
        for (key, entry) in dict.iter() {
            let field = layout
                .field(&key)
                .ok_or_else(|| BridgeError::no_attribute(layout.ty.name(), key.clone()))?;
            record.fields.push(RecordField {
                ident: field.ident.clone(),
                serial: field.serial.clone(),
                value: self.unmarshal(&entry, &field.ty, depth + 1)?,
            });
        }
        Ok(HostValue::Struct(record))
    }

    fn unmarshal_seq(
        &self,
        items: impl Iterator<Item = PyValue>,
        elem: &HostType,
        depth: usize,
    ) -> BridgeResult<HostValue> {
        let items = items
            .map(|item| self.unmarshal(&item, elem, depth + 1))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(HostValue::Seq {
            elem: elem.clone(),
            items,
        })
    }

    /// Natural host shape of a dynamic value, for `Any` targets
    fn infer(&self, value: &PyValue, depth: usize) -> BridgeResult<HostValue> {
        let any = HostType::any();
        match value {
            PyValue::None => Ok(HostValue::Nil),
            PyValue::Bool(b) => Ok(HostValue::Bool(*b)),
            PyValue::Int(n) => Ok(HostValue::Int(HostInt::I64(*n))),
            PyValue::Float(f) => Ok(HostValue::Float(HostFloat::F64(*f))),
            PyValue::Str(s) => Ok(HostValue::Str(s.clone())),
            PyValue::Bytes(bytes) => Ok(HostValue::Bytes(bytes.clone())),
            PyValue::List(list) => self.unmarshal_seq(list.iter(), &any, depth),
            PyValue::Tuple(items) => self.unmarshal_seq(items.iter().cloned(), &any, depth),
            PyValue::Dict(dict) => {
                let entries = dict
                    .iter()
                    .map(|(key, entry)| Ok((key, self.unmarshal(&entry, &any, depth + 1)?)))
                    .collect::<BridgeResult<_>>()?;
                Ok(HostValue::Map {
                    ty: HostType::map("HashMap", any),
                    entries,
                })
            }
            PyValue::Native(native) => Ok(native.snapshot()),
            PyValue::Function(_) | PyValue::Property(_) | PyValue::Class(_) | PyValue::Instance(_) => {
                Err(BridgeError::not_assignable(value.type_name(), any.name()))
            }
        }
    }
}

fn int_object(n: HostInt) -> BridgeResult<PyValue> {
    n.to_i64()
        .map(PyValue::Int)
        .ok_or_else(|| BridgeError::overflow(n, "int"))
}

fn marshaller() -> Marshaller {
    Marshaller::from_config(StructCache::global().config())
}

/// Convert a host value into a dynamic value
pub fn to_object<T: HostData>(value: &T) -> BridgeResult<PyValue> {
    marshaller().to_object(&value.to_host())
}

/// Convert a struct, or a reference to one, into a `dict`
pub fn struct_to_object<T: HostData>(value: &T) -> BridgeResult<PyValue> {
    marshaller().struct_to_object(&value.to_host())
}

/// Convert a dynamic value into a host value of type `ty`
pub fn from_object(value: &PyValue, ty: &HostType) -> BridgeResult<HostValue> {
    marshaller().from_object(value, ty)
}

/// Convert a dynamic value into a `T`
pub fn from_object_as<T: HostData>(value: &PyValue) -> BridgeResult<T> {
    let ty = T::host_type();
    let host = from_object(value, &ty)?;
    T::from_host(host).ok_or_else(|| BridgeError::conversion_failed(ty.name()))
}
