//! Normalised resource identity and filtering.

use indexmap::IndexMap;
use nostos_types::{Registry, Value};

/// Kinds treated as cluster-scoped when the registry carries no scope
/// metadata for them.
const FALLBACK_CLUSTER_SCOPED: &[&str] = &[
    "Namespace",
    "Node",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "PersistentVolume",
    "PriorityClass",
    "StorageClass",
];

/// A normalised Kubernetes resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    pub api_version: String,
    pub kind: String,
    pub metadata: IndexMap<String, Value>,
    pub spec: IndexMap<String, Value>,
    /// IDs of resources that must be applied before this one.
    pub dependencies: Vec<String>,
}

impl Resource {
    /// Recognise an evaluated mapping as a resource.
    ///
    /// Requires `apiVersion` and `kind` string keys; `metadata` and `spec`
    /// sub-maps are copied, absent `spec` becomes empty. Dependencies are
    /// supplied externally, not read from the value.
    pub fn from_value(value: &Value) -> Option<Resource> {
        let map = value.as_map()?;
        let api_version = map.get("apiVersion")?.as_str()?.to_string();
        let kind = map.get("kind")?.as_str()?.to_string();
        let metadata = map
            .get("metadata")
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();
        let spec = map
            .get("spec")
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();
        Some(Resource {
            api_version,
            kind,
            metadata,
            spec,
            dependencies: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        self.metadata
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn namespace(&self) -> &str {
        self.metadata
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Canonical identity: `apiVersion:kind:namespace:name`, with an empty
    /// namespace for cluster-scoped resources.
    pub fn id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.api_version,
            self.kind,
            self.namespace(),
            self.name()
        )
    }

    /// The resource as a value with the canonical section order:
    /// apiVersion, kind, metadata, spec.
    pub fn to_value(&self) -> Value {
        let mut map = IndexMap::new();
        map.insert(
            "apiVersion".to_string(),
            Value::String(self.api_version.clone()),
        );
        map.insert("kind".to_string(), Value::String(self.kind.clone()));
        map.insert("metadata".to_string(), Value::Map(self.metadata.clone()));
        map.insert("spec".to_string(), Value::Map(self.spec.clone()));
        Value::Map(map)
    }
}

/// Drop resources living in system namespaces (`kube-` prefix).
pub fn filter_system_namespace(resources: Vec<Resource>) -> Vec<Resource> {
    resources
        .into_iter()
        .filter(|r| !r.namespace().starts_with("kube-"))
        .collect()
}

/// Drop cluster-scoped resources.
///
/// The registry's scope metadata decides when present; otherwise a built-in
/// kind list applies.
pub fn filter_cluster_scoped(resources: Vec<Resource>, registry: &Registry) -> Vec<Resource> {
    resources
        .into_iter()
        .filter(|r| !is_cluster_scoped(r, registry))
        .collect()
}

fn is_cluster_scoped(resource: &Resource, registry: &Registry) -> bool {
    match registry.scope_for_kind(&resource.kind) {
        Some(scope) => scope == "Cluster",
        None => FALLBACK_CLUSTER_SCOPED.contains(&resource.kind.as_str()),
    }
}
