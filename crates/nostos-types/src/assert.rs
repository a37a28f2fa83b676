//! Structural assertion of values against types.

use crate::{ObjectType, Type, Value};

/// A type-assertion failure, carrying the path from the root of the asserted
/// value to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{message}", path_prefix(.path))]
pub struct AssertError {
    pub path: String,
    pub message: String,
}

fn path_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}: ")
    }
}

/// Validate that `value` conforms to `ty`.
///
/// The check is deterministic and local: it depends only on the two
/// arguments.
pub fn assert_value(value: &Value, ty: &Type) -> Result<(), AssertError> {
    check(value, ty, String::new())
}

fn check(value: &Value, ty: &Type, path: String) -> Result<(), AssertError> {
    match ty {
        Type::Primitive(name) => check_primitive(value, name, path),
        Type::List(elem) => {
            let items = match value {
                Value::List(items) => items,
                _ => return Err(fail(path, "expected list")),
            };
            for (i, item) in items.iter().enumerate() {
                check(item, elem, join_index(&path, i))?;
            }
            Ok(())
        }
        Type::Object(obj) => check_object(value, obj, path),
        Type::Function { .. } => Err(fail(path, "cannot assert function types")),
    }
}

fn check_object(value: &Value, obj: &ObjectType, path: String) -> Result<(), AssertError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(fail(path, "expected object")),
    };
    for (name, field) in &obj.fields {
        match map.get(name) {
            Some(v) => check(v, &field.ty, join(&path, name))?,
            None if field.required => {
                return Err(fail(path, &format!("missing field {name}")));
            }
            None => {}
        }
    }
    if !obj.open {
        for name in map.keys() {
            if !obj.fields.contains_key(name) {
                return Err(fail(path, &format!("unexpected field {name}")));
            }
        }
    }
    Ok(())
}

fn check_primitive(value: &Value, name: &str, path: String) -> Result<(), AssertError> {
    let ok = match name {
        "string" => matches!(value, Value::String(_)),
        "number" => matches!(value, Value::Number(_)),
        "bool" | "boolean" => matches!(value, Value::Bool(_)),
        // Unknown primitive names accept any value.
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(fail(path, &format!("expected {name}")))
    }
}

fn fail(path: String, message: &str) -> AssertError {
    AssertError {
        path,
        message: message.to_string(),
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

fn join_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}
