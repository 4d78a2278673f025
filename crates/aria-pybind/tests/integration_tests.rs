//! Integration tests for the native bridge.
//!
//! These tests drive bridged structs through the public surface: the
//! instance wrapper, marshalling, property descriptors and the structural
//! cache.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Barrier};
use std::thread;

use aria_pybind::{
    call, extract, from_object_as, get_attribute, host_newtype, host_object, set_attribute,
    struct_to_object, to_object, BridgeConfig, HostData, HostValue, MethodKind, NativeObject,
    Property, PyClass, PyDict, PyFunction, PyValue, StructCache,
};

#[derive(Debug, Default, Clone)]
struct MyStruct {
    doc: String,
    field1: i64,
    field2: String,
    calls: Rc<Cell<usize>>,
}

impl MyStruct {
    fn method1(&self, a: i64, b: String) {
        self.calls.set(self.calls.get() + 1);
        let _ = (a, b);
    }

    fn method_plus(&self, a: i64, b: i64) -> i64 {
        self.calls.set(self.calls.get() + 1);
        a + b
    }

    fn method_method(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn property_value(&self) -> String {
        "TestProperty".to_string()
    }
}

host_object! {
    MyStruct {
        fields {
            #[rename = "__doc__"] doc: String,
            field1: i64,
            field2: String,
        }
        methods {
            fn method1(a: i64, b: String);
            fn method_plus(a: i64, b: i64) -> i64;
            fn method_method();
            fn property_value() -> String;
        }
    }
}

fn my_struct() -> MyStruct {
    MyStruct {
        doc: "this is a doc".into(),
        field1: 666,
        field2: "test".into(),
        calls: Rc::default(),
    }
}

// ============================================================================
// Native Object Wrapper
// ============================================================================

mod wrapper {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_fields() {
        let obj = NativeObject::new(my_struct());
        assert_eq!(obj.get_object("__doc__").unwrap(), PyValue::from("this is a doc"));
        assert_eq!(obj.get_object("field1").unwrap(), PyValue::Int(666));
        assert_eq!(obj.get_object("field2").unwrap(), PyValue::from("test"));
        assert_eq!(obj.doc(), "this is a doc");
    }

    #[test]
    fn test_missing_attribute() {
        let obj = NativeObject::new(my_struct());
        let err = obj.get("calls").unwrap_err();
        assert!(err.is_attribute_error());
        assert_eq!(err.to_string(), "'MyStruct' object has no attribute 'calls'");
        assert!(obj.call("missing", vec![]).unwrap_err().is_attribute_error());
    }

    #[test]
    fn test_set_round_trip() {
        let obj = NativeObject::new(my_struct());
        let value = obj.get("field1").unwrap();
        obj.set("field1", value.clone()).unwrap();
        assert_eq!(obj.get("field1").unwrap(), value);

        obj.set("field1", 999i64.to_host()).unwrap();
        assert_eq!(obj.get_object("field1").unwrap(), PyValue::Int(999));
        assert_eq!(obj.shared().borrow().field1, 999);
    }

    #[test]
    fn test_incompatible_set_does_not_mutate() {
        let obj = NativeObject::new(my_struct());

        let err = obj.set("field1", HostValue::from("999")).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(err.to_string(), "'String' type is not assignable to 'i64' type");

        let err = obj.set("field1", 999i32.to_host()).unwrap_err();
        assert!(err.is_type_error());

        assert_eq!(obj.get_object("field1").unwrap(), PyValue::Int(666));
    }

    #[test]
    fn test_call_methods() {
        let obj = NativeObject::new(my_struct());
        assert_eq!(
            obj.call("plus", vec![100i64.to_host(), 666i64.to_host()]).unwrap(),
            vec![PyValue::Int(766)]
        );
        assert_eq!(obj.call("method", vec![]).unwrap(), Vec::<PyValue>::new());
        assert_eq!(obj.call("value", vec![]).unwrap(), vec![PyValue::from("TestProperty")]);
        assert_eq!(
            obj.call("method1", vec![1i64.to_host(), HostValue::from("b")]).unwrap(),
            Vec::<PyValue>::new()
        );
    }

    #[test]
    fn test_failed_call_never_invokes() {
        let instance = my_struct();
        let calls = instance.calls.clone();
        let obj = NativeObject::new(instance);

        let err = obj.call("plus", vec![1i64.to_host()]).unwrap_err();
        assert!(err.is_arity_error());
        assert_eq!(err.to_string(), "plus() takes exactly 2 arguments (1 given)");

        let err = obj
            .call("plus", vec![1i64.to_host(), HostValue::from("x")])
            .unwrap_err();
        assert!(err.is_type_error());

        assert!(obj.call("method", vec![HostValue::Nil]).is_err());
        assert_eq!(calls.get(), 0);

        obj.call("plus", vec![1i64.to_host(), 2i64.to_host()]).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_method_classification() {
        let obj = NativeObject::new(my_struct());
        let info = obj.info();
        assert_eq!(info.method("value").unwrap().kind, MethodKind::Property);
        assert_eq!(info.method("plus").unwrap().kind, MethodKind::Plain);
        assert_eq!(info.method("method1").unwrap().kind, MethodKind::Plain);
        assert_eq!(info.method("plus").unwrap().ident, "method_plus");
    }

    #[test]
    fn test_private_cache_without_prefixes() {
        let cache = StructCache::with_config(BridgeConfig::unprefixed());
        let obj = NativeObject::with_cache(Rc::new(RefCell::new(my_struct())), &cache);
        assert!(obj.call("plus", vec![]).unwrap_err().is_attribute_error());
        assert_eq!(
            obj.call("method_plus", vec![2i64.to_host(), 3i64.to_host()]).unwrap(),
            vec![PyValue::Int(5)]
        );
        assert!(cache.contains::<MyStruct>());
    }
}

// ============================================================================
// Dynamic Access Through NativeRef
// ============================================================================

mod dynamic_access {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_getattr_applies_classification() {
        let value = NativeObject::new(my_struct()).into_object();
        assert_eq!(get_attribute(&value, "value").unwrap(), PyValue::from("TestProperty"));

        let plus = get_attribute(&value, "plus").unwrap();
        assert_eq!(call(&plus, &[PyValue::Int(1), PyValue::Int(2)]).unwrap(), PyValue::Int(3));
        assert_eq!(
            get_attribute(&value, "__doc__").unwrap(),
            PyValue::from("this is a doc")
        );
    }

    #[test]
    fn test_setattr_converts_dynamic_values() {
        let value = NativeObject::new(my_struct()).into_object();
        set_attribute(&value, "field1", PyValue::Int(5)).unwrap();
        assert_eq!(get_attribute(&value, "field1").unwrap(), PyValue::Int(5));

        let err = set_attribute(&value, "field1", PyValue::Float(5.0)).unwrap_err();
        assert_eq!(err.to_string(), "'float' type is not assignable to 'i64' type");
        assert_eq!(get_attribute(&value, "field1").unwrap(), PyValue::Int(5));
    }

    #[test]
    fn test_property_reads_native_instance() {
        let getter = PyValue::Function(PyFunction::new("field1", |args| match args {
            [instance] => get_attribute(instance, "field1"),
            _ => Ok(PyValue::None),
        }));
        let property = Property::new(&[getter]).unwrap();
        let value = NativeObject::new(my_struct()).into_object();
        assert_eq!(property.read(&value).unwrap(), PyValue::Int(666));
        assert!(property.write(&value, PyValue::Int(1)).unwrap_err().is_attribute_error());
    }
}

// ============================================================================
// Marshalling
// ============================================================================

#[allow(non_snake_case)]
#[derive(Debug, Default, Clone, PartialEq)]
struct Inner {
    Field1: i64,
    Field2: String,
}

host_object! {
    Inner {
        fields {
            #[serial = "field1"] Field1: i64,
            Field2: String,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Outer {
    doc: String,
    inner: Inner,
    next: Option<Box<Inner>>,
}

host_object! {
    Outer {
        fields {
            #[rename = "__doc__"] doc: String,
            inner: Inner,
            next: Option<Box<Inner>>,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Offset(i32);
host_newtype!(Offset(i32));

mod marshalling {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inner() -> Inner {
        Inner {
            Field1: 666,
            Field2: "test".into(),
        }
    }

    fn expected_inner() -> PyValue {
        let dict = PyDict::new();
        dict.set("field1", PyValue::Int(666));
        dict.set("Field2", PyValue::from("test"));
        PyValue::Dict(dict)
    }

    #[test]
    fn test_struct_keys_use_serial_names() {
        let value = struct_to_object(&inner()).unwrap();
        assert_eq!(value, expected_inner());
        assert_eq!(value.as_dict().unwrap().keys(), vec!["field1", "Field2"]);
    }

    #[test]
    fn test_nested_structs_expand() {
        let outer = Outer {
            doc: "outer".into(),
            inner: inner(),
            next: None,
        };
        let value = to_object(&outer).unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.keys(), vec!["doc", "inner", "next"]);
        assert_eq!(dict.get("inner"), Some(expected_inner()));
        assert_eq!(dict.get("next"), Some(PyValue::None));

        let outer = Outer {
            next: Some(Box::new(inner())),
            ..outer
        };
        let value = to_object(&outer).unwrap();
        assert_eq!(value.as_dict().unwrap().get("next"), Some(expected_inner()));
    }

    #[test]
    fn test_null_reference_struct() {
        assert_eq!(struct_to_object(&None::<Inner>).unwrap(), PyValue::None);
        assert_eq!(struct_to_object(&Some(inner())).unwrap(), expected_inner());
    }

    #[test]
    fn test_derived_integer() {
        assert_eq!(to_object(&Offset(-5)).unwrap(), PyValue::Int(-5));
        assert_eq!(to_object(&vec![Offset(1), Offset(2)]).unwrap().to_string(), "[1, 2]");
    }

    #[test]
    fn test_marshalling_does_not_mutate() {
        let outer = Outer {
            inner: inner(),
            ..Default::default()
        };
        let before = outer.clone();
        to_object(&outer).unwrap();
        assert_eq!(outer, before);
    }

    #[test]
    fn test_struct_fields_write_back() {
        let outer = Outer {
            doc: "outer".into(),
            inner: inner(),
            next: Some(Box::new(inner())),
        };
        let object = NativeObject::new(outer.clone());
        let shared = object.shared();
        let value = object.into_object();

        for name in ["inner", "next"] {
            let read = get_attribute(&value, name).unwrap();
            set_attribute(&value, name, read).unwrap();
        }
        assert_eq!(*shared.borrow(), outer);

        let replacement = expected_inner();
        replacement.as_dict().unwrap().set("field1", PyValue::Int(1));
        set_attribute(&value, "inner", replacement).unwrap();
        assert_eq!(shared.borrow().inner.Field1, 1);

        set_attribute(&value, "next", PyValue::None).unwrap();
        assert_eq!(shared.borrow().next, None);
    }

    #[test]
    fn test_native_value_back_to_struct() {
        let value = NativeObject::new(inner()).into_object();
        assert_eq!(from_object_as::<Inner>(&value).unwrap(), inner());
        let err = from_object_as::<Outer>(&value).unwrap_err();
        assert!(err.is_type_error());
    }
}

// ============================================================================
// Property Descriptor
// ============================================================================

mod descriptor {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_property_flow() {
        let class = PyClass::new("A");
        class.set_attr("_value", PyValue::Int(123));
        let getter = PyValue::Function(PyFunction::new("value", |args| match args {
            [instance] => get_attribute(instance, "_value"),
            _ => Ok(PyValue::None),
        }));
        let property = call(&PyValue::Function(PyFunction::new("property", |args| {
            Property::new(args).map(PyValue::Property)
        })), &[getter])
        .unwrap();
        class.set_attr("value", property);

        let a = call(&PyValue::Class(class), &[]).unwrap();
        assert_eq!(get_attribute(&a, "value").unwrap(), PyValue::Int(123));

        set_attribute(&a, "_value", PyValue::Int(456)).unwrap();
        assert_eq!(get_attribute(&a, "value").unwrap(), PyValue::Int(456));

        let err = set_attribute(&a, "value", PyValue::Int(666)).unwrap_err();
        assert!(err.is_attribute_error());
        assert_eq!(err.to_string(), "can't set attribute");

        let value = get_attribute(&a, "value").unwrap();
        assert!(call(&value, &[]).unwrap_err().is_type_error());
    }

    #[test]
    fn test_with_setter_yields_none() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let setter = PyValue::Function(PyFunction::new("set", move |args| {
            log.borrow_mut().extend_from_slice(args);
            Ok(PyValue::Int(1))
        }));
        let getter = PyValue::Function(PyFunction::new("get", |_| Ok(PyValue::None)));

        let property = Property::new(&[getter]).unwrap();
        let configured = property.with_setter(setter).unwrap();
        assert!(property.write(&PyValue::Int(0), PyValue::Int(1)).is_err());
        assert_eq!(
            configured.write(&PyValue::Int(0), PyValue::Int(1)).unwrap(),
            PyValue::None
        );
        assert_eq!(*seen.borrow(), vec![PyValue::Int(0), PyValue::Int(1)]);
    }
}

// ============================================================================
// Structural Cache
// ============================================================================

#[derive(Debug, Default, Clone)]
struct Wide {
    a: i64,
    b: String,
    c: Vec<u8>,
    d: Option<f64>,
}

impl Wide {
    fn method_total(&self) -> i64 {
        self.a + self.c.len() as i64
    }
}

host_object! {
    Wide {
        fields { a: i64, b: String, c: Vec<u8>, d: Option<f64> }
        methods { fn method_total() -> i64; }
    }
}

mod cache {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extraction_is_idempotent() {
        let first = StructCache::new().describe::<MyStruct>();
        let second = StructCache::new().describe::<MyStruct>();
        assert_eq!(first, second);
        assert_eq!(first.field_names(), vec!["__doc__", "field1", "field2"]);
        assert_eq!(first.method_names(), vec!["method1", "plus", "method", "value"]);

        let instance = my_struct();
        let (info, _) = extract(Some(&instance)).unwrap();
        assert_eq!(info.field_names(), first.field_names());
        assert!(extract::<MyStruct>(None).is_none());
    }

    #[test]
    fn test_concurrent_first_population() {
        let cache = StructCache::new();
        let barrier = Barrier::new(8);

        let tables: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.table::<Wide>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        for table in &tables {
            assert!(Arc::ptr_eq(table, &tables[0]));
            assert_eq!(table.info().field_names(), vec!["a", "b", "c", "d"]);
            assert_eq!(table.info().method_names(), vec!["total"]);
        }
    }
}
