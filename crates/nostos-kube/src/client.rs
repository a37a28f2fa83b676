//! The live cluster client.

use crate::convert::{
    as_pod, dynamic_to_resource, parse_resource_id, pod_container_readiness, resource_to_json,
    split_api_version,
};
use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Api, ListParams, Patch, PatchParams, WatchEvent, WatchParams};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::discovery::{verbs, ApiCapabilities, ApiResource, Discovery, Scope};
use kube::Client;
use nostos_planner::{ClusterClient, ClusterError, Readiness, Resource, ResourceEvent};
use std::time::Duration;
use tracing::{debug, warn};

/// Resources known to trigger deprecation warnings from the API server;
/// skipped when listing to keep output clean.
const DEPRECATED: &[(&str, &str, &str)] = &[
    ("", "v1", "componentstatuses"),
    ("", "v1", "endpoints"),
    ("cilium.io", "v2alpha1", "ciliumnodeconfigs"),
];

/// [`ClusterClient`] backed by a live Kubernetes API server.
pub struct KubeCluster {
    client: Client,
    /// Discovery is expensive; run it once per client and reuse.
    discovery: tokio::sync::OnceCell<Discovery>,
}

impl KubeCluster {
    pub fn new(client: Client) -> KubeCluster {
        KubeCluster {
            client,
            discovery: tokio::sync::OnceCell::new(),
        }
    }

    async fn discovery(&self) -> Result<&Discovery, ClusterError> {
        self.discovery
            .get_or_try_init(|| async {
                Discovery::new(self.client.clone())
                    .run()
                    .await
                    .map_err(|e| ClusterError::Api(format!("discovery failed: {e}")))
            })
            .await
    }

    async fn api_for(&self, resource: &Resource) -> Result<Api<DynamicObject>, ClusterError> {
        let (group, version) = split_api_version(&resource.api_version);
        let gvk = GroupVersionKind::gvk(&group, &version, &resource.kind);
        let Some((ar, caps)) = self.discovery().await?.resolve_gvk(&gvk) else {
            return Err(ClusterError::Api(format!(
                "unknown kind {}/{}",
                resource.api_version, resource.kind
            )));
        };
        Ok(self.scoped_api(&ar, &caps, resource.namespace()))
    }

    fn scoped_api(
        &self,
        ar: &ApiResource,
        caps: &ApiCapabilities,
        namespace: &str,
    ) -> Api<DynamicObject> {
        if matches!(caps.scope, Scope::Namespaced) && !namespace.is_empty() {
            Api::namespaced_with(self.client.clone(), namespace, ar)
        } else {
            Api::all_with(self.client.clone(), ar)
        }
    }

    async fn fetch_object(
        &self,
        resource: &Resource,
    ) -> Result<Option<DynamicObject>, ClusterError> {
        let api = self.api_for(resource).await?;
        api.get_opt(resource.name())
            .await
            .map_err(|e| ClusterError::Api(e.to_string()))
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_resources(&self) -> Result<Vec<Resource>, ClusterError> {
        let discovery = self.discovery().await?;

        let mut resources = Vec::new();
        for group in discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                if !caps.supports_operation(verbs::LIST) {
                    continue;
                }
                // Subresources never carry standalone state.
                if ar.plural.contains('/') {
                    continue;
                }
                if DEPRECATED.contains(&(
                    ar.group.as_str(),
                    ar.version.as_str(),
                    ar.plural.as_str(),
                )) {
                    continue;
                }
                let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &ar);
                let list = match api.list(&ListParams::default()).await {
                    Ok(list) => list,
                    Err(e) => {
                        warn!(gvr = %format!("{}/{}/{}", ar.group, ar.version, ar.plural),
                              error = %e, "failed to list resource");
                        continue;
                    }
                };
                for obj in list.items {
                    if let Some(resource) = dynamic_to_resource(&obj) {
                        resources.push(resource);
                    }
                }
            }
        }
        debug!(count = resources.len(), "fetched cluster snapshot");
        Ok(resources)
    }

    async fn apply(&self, resource: &Resource) -> Result<(), ClusterError> {
        let api = self.api_for(resource).await?;
        let body = resource_to_json(resource);
        let params = PatchParams::apply("nostos").force();
        api.patch(resource.name(), &params, &Patch::Apply(&body))
            .await
            .map_err(|e| ClusterError::Api(format!("apply {} failed: {e}", resource.id())))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Resource>, ClusterError> {
        let Some(parsed) = parse_resource_id(id) else {
            return Err(ClusterError::Api(format!("malformed resource id {id:?}")));
        };
        let mut probe = Resource {
            api_version: parsed.api_version,
            kind: parsed.kind,
            ..Resource::default()
        };
        probe.metadata.insert(
            "name".to_string(),
            nostos_types::Value::String(parsed.name),
        );
        if !parsed.namespace.is_empty() {
            probe.metadata.insert(
                "namespace".to_string(),
                nostos_types::Value::String(parsed.namespace),
            );
        }
        Ok(self
            .fetch_object(&probe)
            .await?
            .as_ref()
            .and_then(dynamic_to_resource))
    }

    async fn watch(
        &self,
        resource: &Resource,
        timeout: Duration,
    ) -> Result<Vec<ResourceEvent>, ClusterError> {
        let api = self.api_for(resource).await?;
        let params = WatchParams::default()
            .fields(&format!("metadata.name={}", resource.name()))
            .timeout(timeout.as_secs().max(1) as u32);
        let mut stream = api
            .watch(&params, "0")
            .await
            .map_err(|e| ClusterError::Api(e.to_string()))?
            .boxed();

        let mut events = Vec::new();
        while let Ok(Some(item)) = tokio::time::timeout(timeout, stream.next()).await {
            match item {
                Ok(WatchEvent::Added(obj)) | Ok(WatchEvent::Modified(obj)) => {
                    if let Some(r) = dynamic_to_resource(&obj) {
                        events.push(ResourceEvent::Applied(r));
                    }
                }
                Ok(WatchEvent::Deleted(obj)) => {
                    if let Some(r) = dynamic_to_resource(&obj) {
                        events.push(ResourceEvent::Deleted(r));
                    }
                }
                Ok(WatchEvent::Bookmark(_)) => {}
                Ok(WatchEvent::Error(e)) => {
                    return Err(ClusterError::Api(e.message));
                }
                Err(e) => {
                    return Err(ClusterError::Api(e.to_string()));
                }
            }
        }
        Ok(events)
    }

    async fn check(&self, resource: &Resource) -> Result<Readiness, ClusterError> {
        let Some(obj) = self.fetch_object(resource).await? else {
            return Ok(Readiness::pending("waiting for resource"));
        };
        // Pods gate on container readiness; everything else is ready once
        // it exists.
        if resource.kind == "Pod" {
            let (ready, total) = as_pod(&obj)
                .map(|pod| pod_container_readiness(&pod))
                .unwrap_or((0, 0));
            let detail = format!("containers {ready}/{total}");
            if total > 0 && ready == total {
                Ok(Readiness::ready(detail))
            } else {
                Ok(Readiness::pending(detail))
            }
        } else {
            Ok(Readiness::ready("exists"))
        }
    }
}
