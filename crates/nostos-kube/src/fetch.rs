//! Registry population from a live cluster.

use anyhow::{Context as _, Result};
use kube::discovery::{Discovery, Scope};
use kube::Client;
use nostos_types::{ObjectType, Registry};
use tracing::info;

/// Discover the kinds a cluster serves and register them with their scope
/// metadata.
///
/// Discovery carries no field schemas, so the resulting object types are
/// open; the embedded kubespec dataset supplies field-level detail.
pub async fn fetch_types(client: Client) -> Result<Registry> {
    let discovery = Discovery::new(client)
        .run()
        .await
        .context("running API discovery")?;

    let registry = Registry::new();
    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            registry.add_type(ObjectType {
                group: ar.group.clone(),
                version: ar.version.clone(),
                kind: ar.kind.clone(),
                scope: match caps.scope {
                    Scope::Cluster => "Cluster".to_string(),
                    Scope::Namespaced => "Namespaced".to_string(),
                },
                description: String::new(),
                fields: Default::default(),
                open: true,
            });
        }
    }
    info!(types = registry.len(), "registered cluster types");
    Ok(registry)
}
