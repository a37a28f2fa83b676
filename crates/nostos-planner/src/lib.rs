//! Planning engine: resource normalisation, diffing, dependency ordering
//! and the reconciler harness.
//!
//! Evaluated values become [`Resource`]s, the desired set is diffed against
//! the live cluster snapshot, the result is ordered by a topological sort
//! over declared dependencies, and the [`reconcile::Reconciler`] drives the
//! ordered apply against the abstract [`cluster::ClusterClient`] interface.

pub mod cluster;
pub mod dag;
pub mod diff;
pub mod graph;
pub mod odyssey;
pub mod reconcile;
pub mod render;
pub mod resource;

pub use cluster::{ClusterClient, ClusterError, Readiness, ResourceEvent};
pub use dag::{Dag, DagNode};
pub use diff::{diff_resources, DiffResult, ResourceUpdate};
pub use graph::topological_sort;
pub use odyssey::{build_desired, PlanOptions, Workspace};
pub use reconcile::{NodeStatus, Phase, Reconciler};
pub use resource::{filter_cluster_scoped, filter_system_namespace, Resource};

/// Planning failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("dependency cycle detected")]
    DependencyCycle,
}
