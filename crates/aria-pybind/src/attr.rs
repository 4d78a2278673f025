//! Generic Attribute Access
//!
//! `getattr` / `setattr` / `delattr` over every dynamic value.
//!
//! ## Lookup order on instances
//!
//! 1. A class attribute that is a property descriptor handles the access
//! 2. The instance dictionary
//! 3. Other class attributes; functions are bound to the instance
//!
//! Bridged native values delegate to their [`NativeRef`](crate::NativeRef).

use crate::call::{call, PyFunction};
use crate::class::{PyClass, PyInstance};
use crate::error::{BridgeError, BridgeResult, SlotAction};
use crate::object::PyValue;
use crate::property::Property;

/// Read attribute `name` of `object`
pub fn get_attribute(object: &PyValue, name: &str) -> BridgeResult<PyValue> {
    match object {
        PyValue::Instance(instance) => instance_get(object, instance, name),
        PyValue::Class(class) => class_get(class, name),
        PyValue::Native(native) => native.getattr(name),
        PyValue::Property(property) => property_get(property, name),
        PyValue::Function(func) => match name {
            "__name__" => Ok(PyValue::from(func.name())),
            "__doc__" => Ok(func.doc().map(PyValue::from).unwrap_or_default()),
            _ => Err(BridgeError::no_attribute(object.type_name(), name)),
        },
        _ => Err(BridgeError::no_attribute(object.type_name(), name)),
    }
}

/// Assign attribute `name` of `object`
pub fn set_attribute(object: &PyValue, name: &str, value: PyValue) -> BridgeResult<()> {
    match object {
        PyValue::Instance(instance) => {
            if let Some(PyValue::Property(property)) = instance.class().attr(name) {
                property.write(object, value)?;
            } else {
                instance.dict().set(name, value);
            }
            Ok(())
        }
        PyValue::Class(class) => {
            class.set_attr(name, value);
            Ok(())
        }
        PyValue::Native(native) => native.setattr(name, &value),
        PyValue::Property(_) if is_property_attribute(name) => Err(BridgeError::not_settable(name)),
        _ => Err(BridgeError::no_attribute(object.type_name(), name)),
    }
}

/// Delete attribute `name` of `object`
pub fn delete_attribute(object: &PyValue, name: &str) -> BridgeResult<()> {
    match object {
        PyValue::Instance(instance) => {
            if let Some(PyValue::Property(property)) = instance.class().attr(name) {
                property.delete(object)?;
                return Ok(());
            }
            instance
                .dict()
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| BridgeError::no_attribute(instance.class().name(), name))
        }
        PyValue::Class(class) => class
            .remove_attr(name)
            .map(|_| ())
            .ok_or_else(|| BridgeError::no_attribute(class.name(), name)),
        // bridged fields always exist
        PyValue::Native(native) if native.info().contains(name) => {
            Err(BridgeError::unbound_slot(SlotAction::Delete))
        }
        _ => Err(BridgeError::no_attribute(object.type_name(), name)),
    }
}

fn instance_get(object: &PyValue, instance: &PyInstance, name: &str) -> BridgeResult<PyValue> {
    let class_attr = instance.class().attr(name);
    if let Some(PyValue::Property(property)) = &class_attr {
        return property.read(object);
    }
    if let Some(value) = instance.dict().get(name) {
        return Ok(value);
    }
    match class_attr {
        Some(PyValue::Function(func)) => Ok(PyValue::Function(bind(func, object.clone()))),
        Some(value) => Ok(value),
        None => match name {
            "__dict__" => Ok(PyValue::Dict(instance.dict().clone())),
            "__class__" => Ok(PyValue::Class(instance.class().clone())),
            _ => Err(BridgeError::no_attribute(instance.class().name(), name)),
        },
    }
}

fn class_get(class: &PyClass, name: &str) -> BridgeResult<PyValue> {
    match class.attr(name) {
        Some(value) => Ok(value),
        None if name == "__name__" => Ok(PyValue::from(class.name())),
        None => Err(BridgeError::no_attribute(class.name(), name)),
    }
}

fn is_property_attribute(name: &str) -> bool {
    matches!(
        name,
        "getter" | "setter" | "deleter" | "fget" | "fset" | "fdel" | "__doc__"
    )
}

fn property_get(property: &Property, name: &str) -> BridgeResult<PyValue> {
    let slot = |value: Option<&PyValue>| value.cloned().unwrap_or_default();
    match name {
        "fget" => Ok(slot(property.fget())),
        "fset" => Ok(slot(property.fset())),
        "fdel" => Ok(slot(property.fdel())),
        "__doc__" => Ok(property.doc().map(PyValue::from).unwrap_or_default()),
        "getter" => Ok(reconfigure(property, "getter", Property::with_getter)),
        "setter" => Ok(reconfigure(property, "setter", Property::with_setter)),
        "deleter" => Ok(reconfigure(property, "deleter", Property::with_deleter)),
        _ => Err(BridgeError::no_attribute("property", name)),
    }
}

/// Decorator-style reconfiguration: `prop.setter(fn)` returns a new property
fn reconfigure(
    property: &Property,
    name: &'static str,
    update: fn(&Property, PyValue) -> BridgeResult<Property>,
) -> PyValue {
    let property = property.clone();
    let func = PyFunction::new(name, move |args| match args {
        [callable] => Ok(PyValue::Property(update(&property, callable.clone())?)),
        _ => Err(BridgeError::arity(name, args.len(), 1)),
    });
    PyValue::Function(func)
}

/// Bind `func` to `receiver`, passing it as the first argument
fn bind(func: PyFunction, receiver: PyValue) -> PyFunction {
    let name = func.name().to_string();
    PyFunction::new(name, move |args| {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver.clone());
        full.extend_from_slice(args);
        func.call(&full)
    })
}

/// `callable(object.name)(*args)`
pub fn call_attribute(object: &PyValue, name: &str, args: &[PyValue]) -> BridgeResult<PyValue> {
    match object {
        PyValue::Native(native) if native.info().method(name).is_some() => native.callattr(name, args),
        _ => call(&get_attribute(object, name)?, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value_getter() -> PyValue {
        PyValue::Function(PyFunction::new("value", |args| match args {
            [instance] => get_attribute(instance, "_value"),
            _ => Err(BridgeError::arity("value", args.len(), 1)),
        }))
    }

    fn class_with_property() -> PyClass {
        let class = PyClass::new("A");
        class.set_attr("_value", PyValue::Int(123));
        let property = Property::new(&[value_getter()]).unwrap();
        class.set_attr("value", PyValue::Property(property));
        class
    }

    #[test]
    fn test_property_on_instance() {
        let class = class_with_property();
        let a = call(&PyValue::Class(class), &[]).unwrap();
        assert_eq!(get_attribute(&a, "value").unwrap(), PyValue::Int(123));

        set_attribute(&a, "_value", PyValue::Int(456)).unwrap();
        assert_eq!(get_attribute(&a, "value").unwrap(), PyValue::Int(456));

        let err = set_attribute(&a, "value", PyValue::Int(666)).unwrap_err();
        assert!(err.is_attribute_error());

        let value = get_attribute(&a, "value").unwrap();
        assert!(call(&value, &[]).unwrap_err().is_type_error());
    }

    #[test]
    fn test_decorator_chain() {
        let class = class_with_property();
        let property = get_attribute(&PyValue::Class(class.clone()), "value").unwrap();

        let setter = PyValue::Function(PyFunction::new("value", |args| match args {
            [instance, value] => set_attribute(instance, "_value", value.clone()).map(|_| PyValue::Int(0)),
            _ => Err(BridgeError::arity("value", args.len(), 2)),
        }));
        let with_setter = call(&get_attribute(&property, "setter").unwrap(), &[setter]).unwrap();
        assert_ne!(with_setter, property);
        assert!(get_attribute(&property, "fset").unwrap().is_none());
        assert!(!get_attribute(&with_setter, "fset").unwrap().is_none());
        class.set_attr("value", with_setter);

        let a = call(&PyValue::Class(class), &[]).unwrap();
        set_attribute(&a, "value", PyValue::Int(7)).unwrap();
        assert_eq!(get_attribute(&a, "value").unwrap(), PyValue::Int(7));

        let err = delete_attribute(&a, "value").unwrap_err();
        assert_eq!(err.to_string(), "can't delete attribute");
    }

    #[test]
    fn test_instance_dict_and_methods() {
        let class = PyClass::new("B");
        class.set_attr(
            "echo",
            PyValue::Function(PyFunction::new("echo", |args| Ok(PyValue::Int(args.len() as i64)))),
        );
        let b = call(&PyValue::Class(class), &[]).unwrap();
        // bound: receiver plus one argument
        assert_eq!(call_attribute(&b, "echo", &[PyValue::None]).unwrap(), PyValue::Int(2));

        set_attribute(&b, "x", PyValue::Int(1)).unwrap();
        assert_eq!(get_attribute(&b, "x").unwrap(), PyValue::Int(1));
        delete_attribute(&b, "x").unwrap();
        let err = get_attribute(&b, "x").unwrap_err();
        assert_eq!(err.to_string(), "'B' object has no attribute 'x'");
        assert!(delete_attribute(&b, "x").is_err());
    }

    #[test]
    fn test_property_attributes() {
        let property = PyValue::Property(Property::new(&[value_getter()]).unwrap());
        assert_eq!(get_attribute(&property, "fget").unwrap(), value_getter_of(&property));
        assert!(get_attribute(&property, "fdel").unwrap().is_none());
        assert!(get_attribute(&property, "__doc__").unwrap().is_none());
        assert!(set_attribute(&property, "fget", PyValue::None).is_err());
        assert!(get_attribute(&property, "nope").unwrap_err().is_attribute_error());
    }

    fn value_getter_of(property: &PyValue) -> PyValue {
        property
            .as_property()
            .and_then(|p| p.fget().cloned())
            .unwrap_or_default()
    }
}
