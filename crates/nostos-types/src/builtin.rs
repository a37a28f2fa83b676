//! Minimal built-in type set.

use crate::{Field, ObjectType, Registry, Type};
use indexmap::IndexMap;

/// A registry populated with a minimal set of built-in Kubernetes types.
///
/// Intentionally small: it lets the language server offer basic completions
/// and lets the planner classify common kinds even when the full kubespec
/// dataset is not loaded.
pub fn default_registry() -> Registry {
    let registry = Registry::new();

    let mut metadata_fields = IndexMap::new();
    metadata_fields.insert(
        "name".to_string(),
        Field::new("name", Type::Primitive("string".to_string())).required(),
    );
    let metadata = ObjectType {
        kind: "metadata".to_string(),
        fields: metadata_fields,
        open: true,
        ..ObjectType::default()
    };

    let mut spec_fields = IndexMap::new();
    spec_fields.insert(
        "type".to_string(),
        Field::new("type", Type::Primitive("string".to_string())),
    );
    spec_fields.insert(
        "selector".to_string(),
        Field::new("selector", Type::Primitive("object".to_string())),
    );
    spec_fields.insert(
        "ports".to_string(),
        Field::new(
            "ports",
            Type::List(Box::new(Type::Primitive("object".to_string()))),
        ),
    );
    let spec = ObjectType {
        kind: "spec".to_string(),
        fields: spec_fields,
        open: true,
        ..ObjectType::default()
    };

    let mut fields = IndexMap::new();
    fields.insert(
        "apiVersion".to_string(),
        Field::new("apiVersion", Type::Primitive("string".to_string())).required(),
    );
    fields.insert(
        "kind".to_string(),
        Field::new("kind", Type::Primitive("string".to_string())).required(),
    );
    fields.insert(
        "metadata".to_string(),
        Field::new("metadata", Type::Object(metadata)).required(),
    );
    fields.insert("spec".to_string(), Field::new("spec", Type::Object(spec)));

    registry.add_type(ObjectType {
        group: String::new(),
        version: "v1".to_string(),
        kind: "Service".to_string(),
        scope: "Namespaced".to_string(),
        description: "Service exposes a set of Pods as a network service.".to_string(),
        fields,
        open: false,
    });

    registry
}
