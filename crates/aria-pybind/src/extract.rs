//! Structural Extraction
//!
//! A bridged type lists its fields and methods once through
//! [`HostObject::register`]. The registration is turned into an immutable
//! [`TypeTable`]: the exposed-name description ([`StructInfo`]) plus the
//! accessor and invoker functions used by the native wrapper. Tables are
//! cached per type in a [`StructCache`].
//!
//! Extraction is metadata-only: it never reads a field value and never
//! invokes a method.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::config::{BridgeConfig, MethodKind};
use crate::host::{
    HostData, HostRecord, HostType, HostValue, LayoutField, RecordField, RecordLayout,
};

type FieldGetter<T> = Box<dyn Fn(&T) -> HostValue + Send + Sync>;
type FieldSetter<T> = Box<dyn Fn(&mut T, HostValue) -> bool + Send + Sync>;
type MethodInvoker<T> = Box<dyn Fn(&mut T, Vec<HostValue>) -> Option<Vec<HostValue>> + Send + Sync>;

// ============================================================================
// Registration
// ============================================================================

/// A Rust type whose fields and methods are exposed to the dynamic runtime.
///
/// Usually implemented through [`host_object!`](crate::host_object).
pub trait HostObject: HostData {
    /// List the exposed fields and methods
    fn register(registry: &mut Registration<Self>);
}

/// One registered field
pub struct FieldEntry<T> {
    ident: SmolStr,
    rename: Option<SmolStr>,
    serial: Option<SmolStr>,
    settable: bool,
    ty: HostType,
    get: FieldGetter<T>,
    set: FieldSetter<T>,
}

impl<T> FieldEntry<T> {
    /// Expose the field under `name` instead of its identifier
    pub fn rename(&mut self, name: &str) -> &mut Self {
        self.rename = Some(SmolStr::new(name));
        self
    }

    /// Key used for this field when the struct is marshalled to a mapping
    pub fn serial(&mut self, name: &str) -> &mut Self {
        self.serial = Some(SmolStr::new(name));
        self
    }

    /// Reject assignments through the native wrapper
    pub fn readonly(&mut self) -> &mut Self {
        self.settable = false;
        self
    }
}

struct MethodEntry<T> {
    ident: SmolStr,
    params: Vec<HostType>,
    returns: Vec<HostType>,
    invoke: MethodInvoker<T>,
}

/// Collects the members of a bridged type during extraction
pub struct Registration<T> {
    fields: Vec<FieldEntry<T>>,
    methods: Vec<MethodEntry<T>>,
}

impl<T: 'static> Registration<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Register a field through a pair of projections
    pub fn field<F: HostData>(
        &mut self,
        ident: &str,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> &mut FieldEntry<T> {
        let index = self.fields.len();
        self.fields.push(FieldEntry {
            ident: SmolStr::new(ident),
            rename: None,
            serial: None,
            settable: true,
            ty: F::host_type(),
            get: Box::new(move |this| get(this).to_host()),
            set: Box::new(move |this, value| match F::from_host(value) {
                Some(value) => {
                    *set(this) = value;
                    true
                }
                None => false,
            }),
        });
        &mut self.fields[index]
    }

    /// Register a method.
    ///
    /// `invoke` receives the arguments in declaration order, already checked
    /// against `params`, and returns `None` if one cannot be rebuilt.
    pub fn method(
        &mut self,
        ident: &str,
        params: Vec<HostType>,
        returns: Vec<HostType>,
        invoke: impl Fn(&mut T, Vec<HostValue>) -> Option<Vec<HostValue>> + Send + Sync + 'static,
    ) {
        self.methods.push(MethodEntry {
            ident: SmolStr::new(ident),
            params,
            returns,
            invoke: Box::new(invoke),
        });
    }
}

// ============================================================================
// StructInfo - the exposed-name description
// ============================================================================

/// An exposed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust identifier of the field
    pub ident: SmolStr,
    /// Declared type
    pub ty: HostType,
    pub settable: bool,
    slot: usize,
}

/// An exposed method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Rust identifier of the method
    pub ident: SmolStr,
    pub kind: MethodKind,
    /// Parameter types, receiver excluded
    pub params: Vec<HostType>,
    pub returns: Vec<HostType>,
    slot: usize,
}

impl MethodInfo {
    /// Number of positional arguments the method takes
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Exposed fields and methods of a bridged type, keyed by exposed name.
///
/// An exposed name denotes either a field or a method, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructInfo {
    ty: HostType,
    fields: IndexMap<SmolStr, FieldInfo>,
    methods: IndexMap<SmolStr, MethodInfo>,
}

impl StructInfo {
    /// Type name
    pub fn name(&self) -> &str {
        self.ty.name()
    }

    pub fn host_type(&self) -> &HostType {
        &self.ty
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.get(name)
    }

    /// Check if `name` is exposed as a field or a method
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.methods.contains_key(name)
    }

    /// Exposed fields in registration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldInfo)> {
        self.fields.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Exposed methods in registration order
    pub fn methods(&self) -> impl Iterator<Item = (&str, &MethodInfo)> {
        self.methods.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn field_names(&self) -> Vec<SmolStr> {
        self.fields.keys().cloned().collect()
    }

    pub fn method_names(&self) -> Vec<SmolStr> {
        self.methods.keys().cloned().collect()
    }
}

impl fmt::Display for StructInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.ty)?;
        for (name, field) in &self.fields {
            write!(f, "{}: {}, ", name, field.ty)?;
        }
        for (name, method) in &self.methods {
            write!(f, "fn {}/{}, ", name, method.arity())?;
        }
        write!(f, "}}")
    }
}

// ============================================================================
// TypeTable - description plus accessors
// ============================================================================

struct FieldSlot<T> {
    ident: SmolStr,
    serial: Option<SmolStr>,
    ty: HostType,
    get: FieldGetter<T>,
    set: FieldSetter<T>,
}

/// The extracted form of a bridged type
pub struct TypeTable<T> {
    info: Arc<StructInfo>,
    layout: Arc<RecordLayout>,
    fields: Vec<FieldSlot<T>>,
    methods: Vec<MethodInvoker<T>>,
}

impl<T: HostObject> TypeTable<T> {
    /// Run the registration pass for `T`
    pub fn extract(config: &BridgeConfig) -> Self {
        let mut registry = Registration::new();
        T::register(&mut registry);

        let ty = T::host_type();
        let mut fields = IndexMap::with_capacity(registry.fields.len());
        let mut field_slots = Vec::with_capacity(registry.fields.len());
        for (slot, entry) in registry.fields.into_iter().enumerate() {
            let exposed = entry.rename.clone().unwrap_or_else(|| entry.ident.clone());
            if fields.contains_key(&exposed) {
                warn!(
                    type_name = %ty,
                    name = %exposed,
                    field = %entry.ident,
                    "exposed name already taken, field skipped"
                );
            } else {
                fields.insert(
                    exposed,
                    FieldInfo {
                        ident: entry.ident.clone(),
                        ty: entry.ty.clone(),
                        settable: entry.settable,
                        slot,
                    },
                );
            }
            // Skipped fields still take part in records
            field_slots.push(FieldSlot {
                ident: entry.ident,
                serial: entry.serial,
                ty: entry.ty,
                get: entry.get,
                set: entry.set,
            });
        }

        let mut methods = IndexMap::with_capacity(registry.methods.len());
        let mut invokers = Vec::with_capacity(registry.methods.len());
        for entry in registry.methods {
            let (exposed, kind) = config.classify_method(&entry.ident);
            if fields.contains_key(exposed) || methods.contains_key(exposed) {
                warn!(
                    type_name = %ty,
                    name = exposed,
                    method = %entry.ident,
                    "exposed name already taken, method skipped"
                );
                continue;
            }
            let exposed = SmolStr::new(exposed);
            methods.insert(
                exposed,
                MethodInfo {
                    ident: entry.ident,
                    kind,
                    params: entry.params,
                    returns: entry.returns,
                    slot: invokers.len(),
                },
            );
            invokers.push(entry.invoke);
        }

        debug!(
            type_name = %ty,
            fields = fields.len(),
            methods = methods.len(),
            "extracted structural description"
        );

        let layout = RecordLayout {
            ty: ty.clone(),
            fields: field_slots
                .iter()
                .map(|slot| LayoutField {
                    ident: slot.ident.clone(),
                    serial: slot.serial.clone(),
                    ty: slot.ty.clone(),
                })
                .collect(),
        };

        Self {
            info: Arc::new(StructInfo { ty, fields, methods }),
            layout: Arc::new(layout),
            fields: field_slots,
            methods: invokers,
        }
    }
}

impl<T> TypeTable<T> {
    pub fn info(&self) -> &Arc<StructInfo> {
        &self.info
    }

    /// Fields carried by records of this type, skipped ones included
    pub fn layout(&self) -> &Arc<RecordLayout> {
        &self.layout
    }

    /// Read the field at `field`'s slot; `None` if `field` is not from this table
    pub(crate) fn read_field(&self, this: &T, field: &FieldInfo) -> Option<HostValue> {
        self.fields.get(field.slot).map(|slot| (slot.get)(this))
    }

    /// Store `value` into the field; false if it is not of the field's type
    pub(crate) fn write_field(&self, this: &mut T, field: &FieldInfo, value: HostValue) -> bool {
        self.fields
            .get(field.slot)
            .is_some_and(|slot| (slot.set)(this, value))
    }

    pub(crate) fn invoke(
        &self,
        this: &mut T,
        method: &MethodInfo,
        args: Vec<HostValue>,
    ) -> Option<Vec<HostValue>> {
        let invoke = self.methods.get(method.slot)?;
        invoke(this, args)
    }

    /// Snapshot every registered field, renamed or not
    pub fn record(&self, this: &T) -> HostRecord {
        let mut record = HostRecord::new(self.info.ty.clone());
        record.fields = self
            .fields
            .iter()
            .map(|slot| RecordField {
                ident: slot.ident.clone(),
                serial: slot.serial.clone(),
                value: (slot.get)(this),
            })
            .collect();
        record
    }

    /// Write a record back field by field; false if any field is rejected.
    /// Fields missing from the record keep their current value.
    pub fn apply_record(&self, this: &mut T, record: HostRecord) -> bool {
        let mut ok = true;
        for field in record.fields {
            match self.fields.iter().find(|slot| slot.ident == field.ident) {
                Some(slot) => ok &= (slot.set)(this, field.value),
                None => ok = false,
            }
        }
        ok
    }
}

impl<T> fmt::Debug for TypeTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTable").field("info", &self.info).finish()
    }
}

// ============================================================================
// StructCache - per-type tables
// ============================================================================

/// Cache of extracted tables keyed by type identity.
///
/// Entries are built on first use and never change afterwards. Racing
/// first uses may each build a table, but only the first inserted one is
/// ever handed out.
pub struct StructCache {
    config: BridgeConfig,
    tables: RwLock<FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl StructCache {
    /// Create an empty cache with the default configuration
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            config,
            tables: RwLock::new(FxHashMap::default()),
        }
    }

    /// The process-wide cache used by the free functions of this crate
    pub fn global() -> &'static StructCache {
        static GLOBAL_CACHE: OnceLock<StructCache> = OnceLock::new();
        GLOBAL_CACHE.get_or_init(StructCache::new)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Table for `T`, extracted on first use
    pub fn table<T: HostObject>(&self) -> Arc<TypeTable<T>> {
        let key = TypeId::of::<T>();
        let cached = self.tables.read().get(&key).cloned();
        if let Some(table) = cached.and_then(|entry| entry.downcast::<TypeTable<T>>().ok()) {
            return table;
        }

        // Extraction runs registration code, so it stays outside the lock
        let built = Arc::new(TypeTable::<T>::extract(&self.config));
        let entry = self
            .tables
            .write()
            .entry(key)
            .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        entry.downcast::<TypeTable<T>>().unwrap_or(built)
    }

    /// Description of `T`, extracted on first use
    pub fn describe<T: HostObject>(&self) -> Arc<StructInfo> {
        self.table::<T>().info().clone()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.tables.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached types
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Drop every cached table. Wrappers created earlier keep theirs.
    pub fn clear(&self) {
        self.tables.write().clear();
    }
}

impl Default for StructCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StructCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructCache")
            .field("config", &self.config)
            .field("types", &self.len())
            .finish()
    }
}

/// Describe the type of `value` through the global cache, returning the
/// description together with the instance. A null reference has no
/// description.
pub fn extract<T: HostObject>(value: Option<&T>) -> Option<(Arc<StructInfo>, &T)> {
    let value = value?;
    Some((StructCache::global().describe::<T>(), value))
}

/// Snapshot a registered struct as a host value
pub fn record_of<T: HostObject>(value: &T) -> HostValue {
    HostValue::Struct(StructCache::global().table::<T>().record(value))
}

/// Record layout of a registered struct through the global cache
pub fn layout_of<T: HostObject>() -> Arc<RecordLayout> {
    StructCache::global().table::<T>().layout().clone()
}

/// Rebuild a registered struct from a snapshot of the same type, starting
/// from its default value
pub fn from_record<T: HostObject + Default>(value: HostValue) -> Option<T> {
    match value {
        HostValue::Struct(record) if record.ty == T::host_type() => {
            let mut this = T::default();
            StructCache::global()
                .table::<T>()
                .apply_record(&mut this, record)
                .then_some(this)
        }
        _ => None,
    }
}
