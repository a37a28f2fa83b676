//! Kubernetes adapter for Nostos.
//!
//! Implements the planner's abstract cluster interface on top of `kube`:
//! dynamic discovery, list/fetch, server-side apply with the `nostos` field
//! manager, short-timeout watches and Pod readiness from container status
//! counts. Everything here is replaceable by test doubles in the core.

mod client;
mod config;
mod convert;
mod fetch;

pub use client::KubeCluster;
pub use config::{current_context, load_client, ClientOptions};
pub use convert::{parse_resource_id, resource_to_json};
pub use fetch::fetch_types;
