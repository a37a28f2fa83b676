//! Structural type system for Nostos.
//!
//! Types describe the shape of evaluated values: primitives, lists, objects
//! (Kubernetes resources and user-defined shapes) and functions. Object types
//! live in a [`Registry`] keyed by group/version/kind and can be merged with
//! [`ObjectType::extend`], which is what the `<<` operator elaborates to in
//! schema position.
//!
//! The evaluator's generic value tree ([`Value`]) also lives here so the
//! assertion walk ([`assert_value`]) and the YAML-like renderer
//! ([`inspect::render`]) stay free of evaluator internals.

pub mod assert;
pub mod inspect;
pub mod kubespec;
pub mod registry;
pub mod value;

mod builtin;

pub use assert::{assert_value, AssertError};
pub use builtin::default_registry;
pub use kubespec::{kubespec_enabled, kubespec_registry, KubespecError};
pub use registry::Registry;
pub use value::Value;

use indexmap::IndexMap;

/// A type in the system.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Built-in scalar such as `string`, `number` or `boolean`. Unknown
    /// primitive names accept any value.
    Primitive(String),
    /// Homogeneous list.
    List(Box<Type>),
    /// Structured object with named fields.
    Object(ObjectType),
    /// Function type. Not assertable at runtime.
    Function {
        params: Vec<Type>,
        result: Box<Type>,
    },
}

impl Type {
    /// Human readable name, used when comparing fields during extension and
    /// in error messages.
    pub fn name(&self) -> String {
        match self {
            Type::Primitive(n) => n.clone(),
            Type::List(elem) => format!("[]{}", elem.name()),
            Type::Object(o) => o.kind.clone(),
            Type::Function { .. } => "func".to_string(),
        }
    }
}

/// A named field of an [`ObjectType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub description: String,
    pub required: bool,
    /// Earliest Kubernetes version in which this field was observed in the
    /// embedded OpenAPI snapshots. Empty for user-defined types.
    pub since: String,
}

impl Field {
    pub fn new(name: &str, ty: Type) -> Field {
        Field {
            name: name.to_string(),
            ty,
            description: String::new(),
            required: false,
            since: String::new(),
        }
    }

    pub fn required(mut self) -> Field {
        self.required = true;
        self
    }
}

/// A structured object type, typically a Kubernetes resource.
///
/// When `open` is true, values may carry fields beyond the declared set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// "Namespaced", "Cluster", or empty when unknown.
    pub scope: String,
    pub description: String,
    pub fields: IndexMap<String, Field>,
    pub open: bool,
}

impl ObjectType {
    /// `apiVersion` string for this type (`group/version`, or bare `version`
    /// for the core group).
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Merge fields from `other` into this object.
    ///
    /// Fields sharing a name keep the existing type when the type names
    /// disagree. Required flags are OR-ed. The result is open if either
    /// input is open.
    pub fn extend(&mut self, other: &ObjectType) {
        for (name, field) in &other.fields {
            match self.fields.get_mut(name) {
                Some(existing) => {
                    if existing.ty.name() != field.ty.name() {
                        continue;
                    }
                    existing.required = existing.required || field.required;
                }
                None => {
                    self.fields.insert(name.clone(), field.clone());
                }
            }
        }
        if other.open {
            self.open = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(fields: Vec<Field>, open: bool) -> ObjectType {
        ObjectType {
            kind: "Test".to_string(),
            fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            open,
            ..ObjectType::default()
        }
    }

    #[test]
    fn extend_adds_new_fields() {
        let mut a = obj(
            vec![Field::new("one", Type::Primitive("string".into()))],
            false,
        );
        let b = obj(
            vec![Field::new("two", Type::Primitive("number".into()))],
            false,
        );
        a.extend(&b);
        assert_eq!(a.fields.len(), 2);
        assert!(a.fields.contains_key("two"));
    }

    #[test]
    fn extend_keeps_existing_on_type_mismatch() {
        let mut a = obj(
            vec![Field::new("x", Type::Primitive("string".into()))],
            false,
        );
        let b = obj(
            vec![Field::new("x", Type::Primitive("number".into()))],
            false,
        );
        a.extend(&b);
        assert_eq!(a.fields["x"].ty.name(), "string");
    }

    #[test]
    fn extend_ors_required_and_open() {
        let mut a = obj(
            vec![Field::new("x", Type::Primitive("string".into()))],
            false,
        );
        let b = obj(
            vec![Field::new("x", Type::Primitive("string".into())).required()],
            true,
        );
        a.extend(&b);
        assert!(a.fields["x"].required);
        assert!(a.open);
    }

    #[test]
    fn type_names() {
        assert_eq!(Type::Primitive("string".into()).name(), "string");
        assert_eq!(
            Type::List(Box::new(Type::Primitive("number".into()))).name(),
            "[]number"
        );
    }
}
