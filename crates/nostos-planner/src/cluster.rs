//! Abstract cluster interface consumed by the planner and reconciler.
//!
//! The core treats the cluster as an opaque collaborator with a narrow
//! surface: list, apply, fetch, watch and a readiness check. The Kubernetes
//! adapter implements this trait; tests substitute doubles freely.

use crate::resource::Resource;
use async_trait::async_trait;
use std::time::Duration;

/// Readiness of one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub ready: bool,
    pub detail: String,
}

impl Readiness {
    pub fn ready(detail: impl Into<String>) -> Readiness {
        Readiness {
            ready: true,
            detail: detail.into(),
        }
    }

    pub fn pending(detail: impl Into<String>) -> Readiness {
        Readiness {
            ready: false,
            detail: detail.into(),
        }
    }
}

/// A change observed while watching a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    Applied(Resource),
    Deleted(Resource),
}

/// Cluster-side failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("api error: {0}")]
    Api(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("i/o error: {0}")]
    Io(String),
}

/// The four cluster operations plus the readiness check driven by the
/// reconciler.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Snapshot of all live resources the adapter can list.
    async fn list_resources(&self) -> Result<Vec<Resource>, ClusterError>;

    /// Server-side apply of one resource.
    async fn apply(&self, resource: &Resource) -> Result<(), ClusterError>;

    /// Fetch one resource by canonical ID.
    async fn get(&self, id: &str) -> Result<Option<Resource>, ClusterError>;

    /// Watch events for one resource with a short timeout, returning
    /// whatever arrived before the deadline.
    async fn watch(
        &self,
        resource: &Resource,
        timeout: Duration,
    ) -> Result<Vec<ResourceEvent>, ClusterError>;

    /// Readiness of one resource.
    async fn check(&self, resource: &Resource) -> Result<Readiness, ClusterError>;
}
