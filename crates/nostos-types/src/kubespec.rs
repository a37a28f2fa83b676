//! Registry population from embedded Kubernetes OpenAPI snapshots.
//!
//! The `kubespec_data` directory carries one gzipped OpenAPI document per
//! Kubernetes version. Snapshots are processed in ascending version order;
//! every definition carrying an `x-kubernetes-group-version-kind` marker is
//! converted to an [`ObjectType`] with one level of nested sub-fields. The
//! first version in which a field is observed is recorded as its `since`
//! attribute and never overwritten by later versions.
//!
//! Loading the full dataset is opt-in via the `NOSTOS_KUBESPEC` environment
//! flag; without it callers fall back to [`crate::default_registry`].

use crate::{Field, ObjectType, Registry, Type};
use flate2::read::GzDecoder;
use indexmap::IndexMap;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Embedded snapshots, ascending by Kubernetes version.
static KUBESPEC_DATA: &[(&str, &[u8])] = &[
    ("v1.29", include_bytes!("../kubespec_data/v1.29.json.gz")),
    ("v1.31", include_bytes!("../kubespec_data/v1.31.json.gz")),
    ("v1.33", include_bytes!("../kubespec_data/v1.33.json.gz")),
];

#[derive(Debug, thiserror::Error)]
pub enum KubespecError {
    #[error("failed to decompress kubespec snapshot {version}")]
    Decompress {
        version: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode kubespec snapshot {version}")]
    Decode {
        version: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Whether the full kubespec dataset should be loaded.
pub fn kubespec_enabled() -> bool {
    matches!(
        std::env::var("NOSTOS_KUBESPEC").ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

/// Build a registry from the embedded snapshots.
pub fn kubespec_registry() -> Result<Registry, KubespecError> {
    let registry = Registry::new();
    // (group, kind) -> field path -> first version observed
    let mut since: HashMap<(String, String), HashMap<String, String>> = HashMap::new();

    let mut snapshots = KUBESPEC_DATA.to_vec();
    snapshots.sort_by(|a, b| a.0.cmp(b.0));

    for (version, blob) in snapshots {
        let mut decoder = GzDecoder::new(blob);
        let mut data = String::new();
        decoder
            .read_to_string(&mut data)
            .map_err(|source| KubespecError::Decompress {
                version: version.to_string(),
                source,
            })?;
        let spec: Json =
            serde_json::from_str(&data).map_err(|source| KubespecError::Decode {
                version: version.to_string(),
                source,
            })?;

        let Some(definitions) = extract_definitions(&spec) else {
            continue;
        };
        for schema in definitions.values() {
            let Some(gvks) = schema.get("x-kubernetes-group-version-kind").and_then(Json::as_array)
            else {
                continue;
            };
            for gvk in gvks {
                let group = str_field(gvk, "group");
                let ver = str_field(gvk, "version");
                let kind = str_field(gvk, "kind");
                let mut ty = convert_schema(&group, &ver, &kind, schema);
                record_since(&mut ty, version, &mut since);
                registry.add_type(ty);
            }
        }
        debug!(version, types = registry.len(), "loaded kubespec snapshot");
    }
    Ok(registry)
}

/// OpenAPI v2 keeps schemas under `definitions`; v3 under
/// `components.schemas`.
fn extract_definitions(spec: &Json) -> Option<&serde_json::Map<String, Json>> {
    if let Some(defs) = spec.get("definitions").and_then(Json::as_object) {
        return Some(defs);
    }
    spec.get("components")?.get("schemas")?.as_object()
}

fn convert_schema(group: &str, version: &str, kind: &str, schema: &Json) -> ObjectType {
    let mut fields = IndexMap::new();
    if let Some(properties) = schema.get("properties").and_then(Json::as_object) {
        for (name, prop) in properties {
            fields.insert(name.clone(), convert_field(name, prop));
        }
    }
    ObjectType {
        group: group.to_string(),
        version: version.to_string(),
        kind: kind.to_string(),
        scope: String::new(),
        description: str_field(schema, "description"),
        fields,
        open: false,
    }
}

fn convert_field(name: &str, prop: &Json) -> Field {
    let mut field = Field::new(name, schema_type(name, prop));
    field.description = str_field(prop, "description");
    field
}

fn schema_type(name: &str, prop: &Json) -> Type {
    let type_name = declared_type(prop);
    match type_name.as_str() {
        "object" => {
            // One level of nested sub-fields by name.
            let mut sub = IndexMap::new();
            if let Some(properties) = prop.get("properties").and_then(Json::as_object) {
                for (sub_name, sub_prop) in properties {
                    let mut f = Field::new(sub_name, scalar_type(sub_prop));
                    f.description = str_field(sub_prop, "description");
                    sub.insert(sub_name.clone(), f);
                }
            }
            Type::Object(ObjectType {
                kind: name.to_string(),
                fields: sub,
                open: true,
                ..ObjectType::default()
            })
        }
        "array" => Type::List(Box::new(Type::Primitive(array_elem(prop)))),
        "" => Type::Primitive("any".to_string()),
        other => Type::Primitive(other.to_string()),
    }
}

/// Non-nesting conversion used for sub-fields: arrays keep their element
/// type, everything else is the declared type name.
fn scalar_type(prop: &Json) -> Type {
    match declared_type(prop).as_str() {
        "array" => Type::List(Box::new(Type::Primitive(array_elem(prop)))),
        "" => Type::Primitive("any".to_string()),
        other => Type::Primitive(other.to_string()),
    }
}

fn array_elem(prop: &Json) -> String {
    prop.get("items")
        .map(|items| {
            let n = declared_type(items);
            if n.is_empty() {
                "object".to_string()
            } else {
                n
            }
        })
        .unwrap_or_else(|| "any".to_string())
}

/// The declared `type` of a schema, resolving `$ref` to the final segment of
/// the referenced name.
fn declared_type(prop: &Json) -> String {
    let explicit = str_field(prop, "type");
    if !explicit.is_empty() {
        return explicit;
    }
    if let Some(reference) = prop.get("$ref").and_then(Json::as_str) {
        return ref_type_name(reference);
    }
    String::new()
}

fn ref_type_name(reference: &str) -> String {
    let tail = reference.rsplit('/').next().unwrap_or(reference);
    tail.rsplit('.').next().unwrap_or(tail).to_string()
}

fn record_since(
    ty: &mut ObjectType,
    version: &str,
    since: &mut HashMap<(String, String), HashMap<String, String>>,
) {
    let key = (ty.group.clone(), ty.kind.clone());
    let paths = since.entry(key).or_default();
    for (name, field) in ty.fields.iter_mut() {
        let first = paths
            .entry(name.clone())
            .or_insert_with(|| version.to_string());
        field.since = first.clone();
        if let Type::Object(sub) = &mut field.ty {
            for (sub_name, sub_field) in sub.fields.iter_mut() {
                let path = format!("{name}.{sub_name}");
                let first = paths.entry(path).or_insert_with(|| version.to_string());
                sub_field.since = first.clone();
            }
        }
    }
}

fn str_field(v: &Json, key: &str) -> String {
    v.get(key)
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}
