//! Conversions between planner resources and dynamic Kubernetes objects.

use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use nostos_planner::Resource;
use nostos_types::Value;
use serde_json::json;

/// A parsed canonical resource ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Split `apiVersion:kind:namespace:name`.
pub fn parse_resource_id(id: &str) -> Option<ResourceId> {
    let mut parts = id.splitn(4, ':');
    let api_version = parts.next()?.to_string();
    let kind = parts.next()?.to_string();
    let namespace = parts.next()?.to_string();
    let name = parts.next()?.to_string();
    Some(ResourceId {
        api_version,
        kind,
        namespace,
        name,
    })
}

/// Group and version halves of an `apiVersion` string.
pub fn split_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// The JSON body submitted for server-side apply.
pub fn resource_to_json(resource: &Resource) -> serde_json::Value {
    json!({
        "apiVersion": resource.api_version,
        "kind": resource.kind,
        "metadata": Value::Map(resource.metadata.clone()).to_json(),
        "spec": Value::Map(resource.spec.clone()).to_json(),
    })
}

/// Normalise a fetched dynamic object.
pub fn dynamic_to_resource(obj: &DynamicObject) -> Option<Resource> {
    let types = obj.types.as_ref()?;
    let mut metadata = indexmap::IndexMap::new();
    if let Some(name) = &obj.metadata.name {
        metadata.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(namespace) = &obj.metadata.namespace {
        metadata.insert("namespace".to_string(), Value::String(namespace.clone()));
    }
    let spec = obj
        .data
        .get("spec")
        .map(Value::from_json)
        .and_then(|v| v.as_map().cloned())
        .unwrap_or_default();
    Some(Resource {
        api_version: types.api_version.clone(),
        kind: types.kind.clone(),
        metadata,
        spec,
        dependencies: Vec::new(),
    })
}

/// Reinterpret a fetched dynamic object as a typed Pod.
pub fn as_pod(obj: &DynamicObject) -> Option<Pod> {
    serde_json::to_value(obj)
        .ok()
        .and_then(|v| serde_json::from_value(v).ok())
}

/// Container readiness counts from a Pod's status.
pub fn pod_container_readiness(pod: &Pod) -> (usize, usize) {
    match pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
    {
        Some(statuses) => (
            statuses.iter().filter(|c| c.ready).count(),
            statuses.len(),
        ),
        None => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip() {
        let parsed = parse_resource_id("apps/v1:Deployment:prod:web").unwrap();
        assert_eq!(parsed.api_version, "apps/v1");
        assert_eq!(parsed.kind, "Deployment");
        assert_eq!(parsed.namespace, "prod");
        assert_eq!(parsed.name, "web");

        let cluster_scoped = parse_resource_id("v1:Namespace::prod").unwrap();
        assert_eq!(cluster_scoped.namespace, "");
        assert_eq!(cluster_scoped.name, "prod");
    }

    #[test]
    fn api_version_split() {
        assert_eq!(
            split_api_version("apps/v1"),
            ("apps".to_string(), "v1".to_string())
        );
        assert_eq!(split_api_version("v1"), (String::new(), "v1".to_string()));
    }

    #[test]
    fn apply_body_has_canonical_sections() {
        let mut resource = Resource {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            ..Resource::default()
        };
        resource
            .metadata
            .insert("name".to_string(), Value::String("redis".into()));
        resource
            .spec
            .insert("port".to_string(), Value::Number(6379.0));
        let body = resource_to_json(&resource);
        assert_eq!(body["apiVersion"], "v1");
        assert_eq!(body["kind"], "Service");
        assert_eq!(body["metadata"]["name"], "redis");
        assert_eq!(body["spec"]["port"], 6379.0);
    }

    #[test]
    fn pod_readiness_counts() {
        use k8s_openapi::api::core::v1::{ContainerStatus, PodStatus};
        let pod = Pod {
            status: Some(PodStatus {
                container_statuses: Some(vec![
                    ContainerStatus {
                        name: "app".to_string(),
                        ready: true,
                        ..ContainerStatus::default()
                    },
                    ContainerStatus {
                        name: "sidecar".to_string(),
                        ready: false,
                        ..ContainerStatus::default()
                    },
                ]),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        assert_eq!(pod_container_readiness(&pod), (1, 2));
        assert_eq!(pod_container_readiness(&Pod::default()), (0, 0));
    }

    #[test]
    fn dynamic_pods_deserialize_to_typed_pods() {
        let obj = DynamicObject {
            types: Some(kube::core::TypeMeta {
                api_version: "v1".to_string(),
                kind: "Pod".to_string(),
            }),
            metadata: Default::default(),
            data: serde_json::json!({
                "status": {
                    "containerStatuses": [
                        {
                            "name": "app",
                            "ready": true,
                            "restartCount": 0,
                            "image": "redis:7.2",
                            "imageID": ""
                        }
                    ]
                }
            }),
        };
        let pod = as_pod(&obj).expect("pod should deserialize");
        assert_eq!(pod_container_readiness(&pod), (1, 1));
    }

    #[test]
    fn dynamic_to_resource_requires_type_meta() {
        let mut obj = DynamicObject {
            types: None,
            metadata: Default::default(),
            data: serde_json::json!({}),
        };
        assert!(dynamic_to_resource(&obj).is_none());
        obj.types = Some(kube::core::TypeMeta {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
        });
        obj.metadata.name = Some("redis".to_string());
        obj.data = serde_json::json!({"spec": {"port": 80}});
        let r = dynamic_to_resource(&obj).unwrap();
        assert_eq!(r.id(), "v1:Service::redis");
        assert_eq!(r.spec.get("port"), Some(&Value::Number(80.0)));
    }
}
