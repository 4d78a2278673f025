//! Host Value Model
//!
//! Native Rust values cross into the dynamic runtime through a closed,
//! tagged representation instead of runtime reflection.
//!
//! ## Types
//!
//! - `HostType`: name and structural kind of a host type
//! - `HostValue`: a host value snapshot carrying its runtime type
//! - `HostData`: conversion between a Rust type and `HostValue`
//! - `IntoReturns`: conversion of method return values into result lists
//!
//! Derived types (a newtype over an integer, float or string) keep the
//! kind of their underlying type under their own name; see
//! [`host_newtype!`](crate::host_newtype).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

// ============================================================================
// HostType - name and kind of a host type
// ============================================================================

/// Width of a host integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
}

impl IntWidth {
    /// Rust spelling of the builtin type
    pub fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::Isize => "isize",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
            IntWidth::Usize => "usize",
        }
    }
}

/// Width of a host floating point type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    /// Rust spelling of the builtin type
    pub fn name(self) -> &'static str {
        match self {
            FloatWidth::F32 => "f32",
            FloatWidth::F64 => "f64",
        }
    }
}

/// Structural kind of a host type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// Accepts any host value
    Any,
    /// Untyped null
    Nil,
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Str,
    Bytes,
    /// Ordered sequence with the element type
    Seq(Box<HostType>),
    /// Text-keyed map with the value type
    Map(Box<HostType>),
    /// Aggregate with registered fields
    Struct,
    /// Nullable reference to the target type
    Ref(Box<HostType>),
    /// No dynamic representation
    Opaque,
}

/// Looks up the record layout of a registered struct
pub type LayoutFn = fn() -> Arc<RecordLayout>;

/// A host type: its name, structural kind, and whether it is derived
/// from a builtin type under a new name.
///
/// Registered structs also carry a layout lookup, used to rebuild them
/// from a mapping. It takes no part in equality.
#[derive(Clone)]
pub struct HostType {
    name: SmolStr,
    kind: HostKind,
    derived: bool,
    layout: Option<LayoutFn>,
}

impl HostType {
    fn builtin(name: impl Into<SmolStr>, kind: HostKind) -> Self {
        Self {
            name: name.into(),
            kind,
            derived: false,
            layout: None,
        }
    }

    /// The type that accepts any value
    pub fn any() -> Self {
        Self::builtin("HostValue", HostKind::Any)
    }

    /// Type of the untyped null
    pub fn nil() -> Self {
        Self::builtin("nil", HostKind::Nil)
    }

    pub fn bool() -> Self {
        Self::builtin("bool", HostKind::Bool)
    }

    pub fn int(width: IntWidth) -> Self {
        Self::builtin(width.name(), HostKind::Int(width))
    }

    pub fn float(width: FloatWidth) -> Self {
        Self::builtin(width.name(), HostKind::Float(width))
    }

    pub fn string() -> Self {
        Self::builtin("String", HostKind::Str)
    }

    pub fn bytes() -> Self {
        Self::builtin("ByteBuf", HostKind::Bytes)
    }

    /// `Vec<elem>`
    pub fn seq(elem: HostType) -> Self {
        Self::builtin(format!("Vec<{}>", elem.name), HostKind::Seq(Box::new(elem)))
    }

    /// A text-keyed map container named `container<String, value>`
    pub fn map(container: &str, value: HostType) -> Self {
        Self::builtin(
            format!("{}<String, {}>", container, value.name),
            HostKind::Map(Box::new(value)),
        )
    }

    /// An aggregate with no known layout
    pub fn structure(name: impl Into<SmolStr>) -> Self {
        Self::builtin(name, HostKind::Struct)
    }

    /// A registered aggregate whose field layout is found through `layout`
    pub fn record(name: impl Into<SmolStr>, layout: LayoutFn) -> Self {
        Self {
            layout: Some(layout),
            ..Self::builtin(name, HostKind::Struct)
        }
    }

    /// `Option<target>`
    pub fn reference(target: HostType) -> Self {
        Self::builtin(format!("Option<{}>", target.name), HostKind::Ref(Box::new(target)))
    }

    /// A type with no dynamic representation
    pub fn opaque(name: impl Into<SmolStr>) -> Self {
        Self::builtin(name, HostKind::Opaque)
    }

    /// A user-defined type with the same kind as `underlying`
    pub fn named(name: impl Into<SmolStr>, underlying: HostType) -> Self {
        Self {
            name: name.into(),
            kind: underlying.kind,
            derived: true,
            layout: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &HostKind {
        &self.kind
    }

    /// Field layout of a registered struct
    pub fn layout(&self) -> Option<Arc<RecordLayout>> {
        self.layout.map(|layout| layout())
    }

    /// Whether this type was declared over a builtin under a new name
    pub fn is_derived(&self) -> bool {
        self.derived
    }

    /// The builtin type sharing this type's kind
    pub fn underlying(&self) -> HostType {
        match &self.kind {
            HostKind::Any => HostType::any(),
            HostKind::Nil => HostType::nil(),
            HostKind::Bool => HostType::bool(),
            HostKind::Int(w) => HostType::int(*w),
            HostKind::Float(w) => HostType::float(*w),
            HostKind::Str => HostType::string(),
            HostKind::Bytes => HostType::bytes(),
            HostKind::Seq(elem) => HostType::seq((**elem).clone()),
            HostKind::Map(value) => HostType::map("HashMap", (**value).clone()),
            HostKind::Ref(target) => HostType::reference((**target).clone()),
            HostKind::Struct | HostKind::Opaque => self.clone(),
        }
    }

    /// Whether a value of type `source` may be stored in a slot of this type.
    ///
    /// Only direct compatibility is accepted: identical types, any value
    /// into `Any`, and the untyped null into a nullable reference.
    pub fn accepts(&self, source: &HostType) -> bool {
        match (&self.kind, &source.kind) {
            (HostKind::Any, _) => true,
            (HostKind::Ref(_), HostKind::Nil) => true,
            _ => self == source,
        }
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind && self.derived == other.derived
    }
}

impl Eq for HostType {}

impl Hash for HostType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
        self.derived.hash(state);
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("derived", &self.derived)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// HostValue - tagged host value snapshot
// ============================================================================

/// A host integer of a specific width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostInt {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
}

impl HostInt {
    pub fn width(self) -> IntWidth {
        match self {
            HostInt::I8(_) => IntWidth::I8,
            HostInt::I16(_) => IntWidth::I16,
            HostInt::I32(_) => IntWidth::I32,
            HostInt::I64(_) => IntWidth::I64,
            HostInt::Isize(_) => IntWidth::Isize,
            HostInt::U8(_) => IntWidth::U8,
            HostInt::U16(_) => IntWidth::U16,
            HostInt::U32(_) => IntWidth::U32,
            HostInt::U64(_) => IntWidth::U64,
            HostInt::Usize(_) => IntWidth::Usize,
        }
    }

    /// Widen to i128, which holds every width losslessly
    pub fn to_i128(self) -> i128 {
        match self {
            HostInt::I8(n) => n.into(),
            HostInt::I16(n) => n.into(),
            HostInt::I32(n) => n.into(),
            HostInt::I64(n) => n.into(),
            HostInt::Isize(n) => n as i128,
            HostInt::U8(n) => n.into(),
            HostInt::U16(n) => n.into(),
            HostInt::U32(n) => n.into(),
            HostInt::U64(n) => n.into(),
            HostInt::Usize(n) => n as i128,
        }
    }

    /// Narrow to i64, failing for unsigned values above `i64::MAX`
    pub fn to_i64(self) -> Option<i64> {
        i64::try_from(self.to_i128()).ok()
    }

    /// Build an integer of the given width, failing when out of range
    pub fn from_i64(value: i64, width: IntWidth) -> Option<HostInt> {
        Some(match width {
            IntWidth::I8 => HostInt::I8(value.try_into().ok()?),
            IntWidth::I16 => HostInt::I16(value.try_into().ok()?),
            IntWidth::I32 => HostInt::I32(value.try_into().ok()?),
            IntWidth::I64 => HostInt::I64(value),
            IntWidth::Isize => HostInt::Isize(value.try_into().ok()?),
            IntWidth::U8 => HostInt::U8(value.try_into().ok()?),
            IntWidth::U16 => HostInt::U16(value.try_into().ok()?),
            IntWidth::U32 => HostInt::U32(value.try_into().ok()?),
            IntWidth::U64 => HostInt::U64(value.try_into().ok()?),
            IntWidth::Usize => HostInt::Usize(value.try_into().ok()?),
        })
    }
}

impl fmt::Display for HostInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_i128())
    }
}

/// A host float of a specific width
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostFloat {
    F32(f32),
    F64(f64),
}

impl HostFloat {
    pub fn width(self) -> FloatWidth {
        match self {
            HostFloat::F32(_) => FloatWidth::F32,
            HostFloat::F64(_) => FloatWidth::F64,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            HostFloat::F32(f) => f64::from(f),
            HostFloat::F64(f) => f,
        }
    }
}

/// One field of a struct snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// Rust field identifier
    pub ident: SmolStr,
    /// Serialization name, when tagged
    pub serial: Option<SmolStr>,
    pub value: HostValue,
}

impl RecordField {
    /// Key used when the struct is exposed as a mapping
    pub fn external_name(&self) -> &str {
        self.serial.as_deref().unwrap_or(&self.ident)
    }
}

/// One field of a registered struct's layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutField {
    pub ident: SmolStr,
    pub serial: Option<SmolStr>,
    /// Declared type
    pub ty: HostType,
}

impl LayoutField {
    /// Key used when the struct is exposed as a mapping
    pub fn external_name(&self) -> &str {
        self.serial.as_deref().unwrap_or(&self.ident)
    }
}

/// Every field a record of a registered struct carries, in record order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub ty: HostType,
    pub fields: Vec<LayoutField>,
}

impl RecordLayout {
    /// Look up a field by external name
    pub fn field(&self, external_name: &str) -> Option<&LayoutField> {
        self.fields.iter().find(|f| f.external_name() == external_name)
    }
}

/// Snapshot of a registered struct's fields, in registration order
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecord {
    pub ty: HostType,
    pub fields: Vec<RecordField>,
}

impl HostRecord {
    pub fn new(ty: HostType) -> Self {
        Self {
            ty,
            fields: Vec::new(),
        }
    }

    /// Look up a field by Rust identifier
    pub fn field(&self, ident: &str) -> Option<&HostValue> {
        self.fields.iter().find(|f| f.ident == ident).map(|f| &f.value)
    }
}

/// A host value together with enough type information to report its
/// runtime type.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Untyped null
    Nil,
    Bool(bool),
    Int(HostInt),
    Float(HostFloat),
    Str(SmolStr),
    Bytes(Vec<u8>),
    Seq {
        elem: HostType,
        items: Vec<HostValue>,
    },
    Map {
        ty: HostType,
        entries: FxHashMap<SmolStr, HostValue>,
    },
    Struct(HostRecord),
    /// Nullable reference; `None` target is a null reference
    Ref {
        target_type: HostType,
        target: Option<Box<HostValue>>,
    },
    /// Value of a derived type wrapping its underlying representation
    Named {
        ty: HostType,
        inner: Box<HostValue>,
    },
    /// Value with no dynamic representation
    Opaque(HostType),
}

impl HostValue {
    /// Runtime type of this value
    pub fn host_type(&self) -> HostType {
        match self {
            HostValue::Nil => HostType::nil(),
            HostValue::Bool(_) => HostType::bool(),
            HostValue::Int(n) => HostType::int(n.width()),
            HostValue::Float(f) => HostType::float(f.width()),
            HostValue::Str(_) => HostType::string(),
            HostValue::Bytes(_) => HostType::bytes(),
            HostValue::Seq { elem, .. } => HostType::seq(elem.clone()),
            HostValue::Map { ty, .. } => ty.clone(),
            HostValue::Struct(record) => record.ty.clone(),
            HostValue::Ref { target_type, .. } => HostType::reference(target_type.clone()),
            HostValue::Named { ty, .. } => ty.clone(),
            HostValue::Opaque(ty) => ty.clone(),
        }
    }

    /// Wrap `inner` as a value of the derived type `ty`
    pub fn named(ty: HostType, inner: HostValue) -> Self {
        HostValue::Named {
            ty,
            inner: Box::new(inner),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil | HostValue::Ref { target: None, .. })
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(n) => n.to_i64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(SmolStr::new(value))
    }
}

// ============================================================================
// HostData - Rust types that cross the bridge
// ============================================================================

/// A Rust type with a host representation.
///
/// `from_host` returns `None` when the value is not of this type; callers
/// check [`HostType::accepts`] first to report a typed error.
pub trait HostData: Sized + 'static {
    /// Declared type
    fn host_type() -> HostType;

    /// Snapshot this value
    fn to_host(&self) -> HostValue;

    /// Rebuild a value of this type
    fn from_host(value: HostValue) -> Option<Self>;
}

/// Return values of a bridged method, in declaration order.
pub trait IntoReturns {
    fn return_types() -> Vec<HostType>;
    fn into_returns(self) -> Vec<HostValue>;
}

impl<T: HostData> IntoReturns for T {
    fn return_types() -> Vec<HostType> {
        vec![T::host_type()]
    }

    fn into_returns(self) -> Vec<HostValue> {
        vec![self.to_host()]
    }
}

impl<A: HostData, B: HostData> IntoReturns for (A, B) {
    fn return_types() -> Vec<HostType> {
        vec![A::host_type(), B::host_type()]
    }

    fn into_returns(self) -> Vec<HostValue> {
        vec![self.0.to_host(), self.1.to_host()]
    }
}

impl<A: HostData, B: HostData, C: HostData> IntoReturns for (A, B, C) {
    fn return_types() -> Vec<HostType> {
        vec![A::host_type(), B::host_type(), C::host_type()]
    }

    fn into_returns(self) -> Vec<HostValue> {
        vec![self.0.to_host(), self.1.to_host(), self.2.to_host()]
    }
}

impl HostData for HostValue {
    fn host_type() -> HostType {
        HostType::any()
    }

    fn to_host(&self) -> HostValue {
        self.clone()
    }

    fn from_host(value: HostValue) -> Option<Self> {
        Some(value)
    }
}

impl HostData for bool {
    fn host_type() -> HostType {
        HostType::bool()
    }

    fn to_host(&self) -> HostValue {
        HostValue::Bool(*self)
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_host_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl HostData for $ty {
                fn host_type() -> HostType {
                    HostType::int(IntWidth::$variant)
                }

                fn to_host(&self) -> HostValue {
                    HostValue::Int(HostInt::$variant(*self))
                }

                fn from_host(value: HostValue) -> Option<Self> {
                    match value {
                        HostValue::Int(HostInt::$variant(n)) => Some(n),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_host_int! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

impl HostData for f32 {
    fn host_type() -> HostType {
        HostType::float(FloatWidth::F32)
    }

    fn to_host(&self) -> HostValue {
        HostValue::Float(HostFloat::F32(*self))
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Float(HostFloat::F32(f)) => Some(f),
            _ => None,
        }
    }
}

impl HostData for f64 {
    fn host_type() -> HostType {
        HostType::float(FloatWidth::F64)
    }

    fn to_host(&self) -> HostValue {
        HostValue::Float(HostFloat::F64(*self))
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Float(HostFloat::F64(f)) => Some(f),
            _ => None,
        }
    }
}

impl HostData for String {
    fn host_type() -> HostType {
        HostType::string()
    }

    fn to_host(&self) -> HostValue {
        HostValue::Str(SmolStr::new(self))
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

/// Owned byte sequence, exposed as `bytes` rather than a list of ints
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteBuf(pub Vec<u8>);

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        ByteBuf(bytes)
    }
}

impl HostData for ByteBuf {
    fn host_type() -> HostType {
        HostType::bytes()
    }

    fn to_host(&self) -> HostValue {
        HostValue::Bytes(self.0.clone())
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Bytes(b) => Some(ByteBuf(b)),
            _ => None,
        }
    }
}

impl<T: HostData> HostData for Vec<T> {
    fn host_type() -> HostType {
        HostType::seq(T::host_type())
    }

    fn to_host(&self) -> HostValue {
        HostValue::Seq {
            elem: T::host_type(),
            items: self.iter().map(HostData::to_host).collect(),
        }
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Seq { items, .. } => items.into_iter().map(T::from_host).collect(),
            _ => None,
        }
    }
}

impl<T: HostData> HostData for Option<T> {
    fn host_type() -> HostType {
        HostType::reference(T::host_type())
    }

    fn to_host(&self) -> HostValue {
        HostValue::Ref {
            target_type: T::host_type(),
            target: self.as_ref().map(|v| Box::new(v.to_host())),
        }
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Nil | HostValue::Ref { target: None, .. } => Some(None),
            HostValue::Ref {
                target: Some(target),
                ..
            } => T::from_host(*target).map(Some),
            _ => None,
        }
    }
}

impl<T: HostData> HostData for Box<T> {
    fn host_type() -> HostType {
        T::host_type()
    }

    fn to_host(&self) -> HostValue {
        (**self).to_host()
    }

    fn from_host(value: HostValue) -> Option<Self> {
        T::from_host(value).map(Box::new)
    }
}

impl<V: HostData> HostData for HashMap<String, V> {
    fn host_type() -> HostType {
        HostType::map("HashMap", V::host_type())
    }

    fn to_host(&self) -> HostValue {
        HostValue::Map {
            ty: Self::host_type(),
            entries: self
                .iter()
                .map(|(k, v)| (SmolStr::new(k), v.to_host()))
                .collect(),
        }
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Map { entries, .. } => entries
                .into_iter()
                .map(|(k, v)| V::from_host(v).map(|v| (k.to_string(), v)))
                .collect(),
            _ => None,
        }
    }
}

impl<V: HostData> HostData for BTreeMap<String, V> {
    fn host_type() -> HostType {
        HostType::map("BTreeMap", V::host_type())
    }

    fn to_host(&self) -> HostValue {
        HostValue::Map {
            ty: Self::host_type(),
            entries: self
                .iter()
                .map(|(k, v)| (SmolStr::new(k), v.to_host()))
                .collect(),
        }
    }

    fn from_host(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Map { entries, .. } => entries
                .into_iter()
                .map(|(k, v)| V::from_host(v).map(|v| (k.to_string(), v)))
                .collect(),
            _ => None,
        }
    }
}

/// Implement [`HostData`] for a tuple struct wrapping a builtin type.
///
/// The wrapper becomes a derived type: it keeps the kind of the wrapped
/// type, so the marshaller treats it like its underlying value, but
/// assignment checks see it as a distinct type.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Celsius(i32);
/// aria_pybind::host_newtype!(Celsius(i32));
/// ```
#[macro_export]
macro_rules! host_newtype {
    ($name:ident($inner:ty)) => {
        impl $crate::HostData for $name {
            fn host_type() -> $crate::HostType {
                $crate::HostType::named(
                    stringify!($name),
                    <$inner as $crate::HostData>::host_type(),
                )
            }

            fn to_host(&self) -> $crate::HostValue {
                $crate::HostValue::named(
                    <Self as $crate::HostData>::host_type(),
                    <$inner as $crate::HostData>::to_host(&self.0),
                )
            }

            fn from_host(value: $crate::HostValue) -> Option<Self> {
                match value {
                    $crate::HostValue::Named { ty, inner }
                        if ty == <Self as $crate::HostData>::host_type() =>
                    {
                        <$inner as $crate::HostData>::from_host(*inner).map($name)
                    }
                    _ => None,
                }
            }
        }
    };
}
