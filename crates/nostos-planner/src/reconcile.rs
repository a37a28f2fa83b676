//! Ordered apply with per-node readiness polling.

use crate::cluster::{ClusterClient, ClusterError};
use crate::dag::Dag;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifecycle of one node during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Applying,
    Applied,
    Failed,
}

/// Aggregated status of one node, fed to UIs.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub phase: Phase,
    pub ready: bool,
    pub detail: String,
    pub error: Option<String>,
}

impl NodeStatus {
    fn pending() -> NodeStatus {
        NodeStatus {
            phase: Phase::Pending,
            ready: false,
            detail: "pending".to_string(),
            error: None,
        }
    }
}

type StatusMap = Arc<Mutex<IndexMap<String, NodeStatus>>>;

/// Drives a DAG against the cluster: applies nodes in topological order and
/// polls each node's readiness concurrently.
pub struct Reconciler {
    client: Arc<dyn ClusterClient>,
    poll_interval: Duration,
    statuses: StatusMap,
}

impl Reconciler {
    pub fn new(client: Arc<dyn ClusterClient>) -> Reconciler {
        Reconciler {
            client,
            poll_interval: Duration::from_secs(2),
            statuses: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Reconciler {
        self.poll_interval = interval;
        self
    }

    /// Current per-node status snapshot.
    pub fn snapshot(&self) -> IndexMap<String, NodeStatus> {
        self.statuses.lock().expect("status lock poisoned").clone()
    }

    /// Apply the DAG.
    ///
    /// Nodes apply strictly in topological order, so every parent completes
    /// before its children start. Readiness pollers run independently of
    /// apply ordering. The first apply error aborts the walk and is
    /// returned; in-flight pollers terminate on their next wake.
    /// Cancellation stops applying at the next node boundary.
    pub async fn run(&self, dag: &Dag, cancel: CancellationToken) -> Result<(), ClusterError> {
        {
            let mut statuses = self.statuses.lock().expect("status lock poisoned");
            statuses.clear();
            for id in &dag.order {
                statuses.insert(id.clone(), NodeStatus::pending());
            }
        }

        let mut pollers = Vec::new();
        for id in &dag.order {
            let Some(resource) = dag.nodes[id].resource.clone() else {
                continue;
            };
            pollers.push(tokio::spawn(poll_readiness(
                Arc::clone(&self.client),
                id.clone(),
                resource,
                Arc::clone(&self.statuses),
                self.poll_interval,
                cancel.clone(),
            )));
        }

        let mut result = Ok(());
        for id in &dag.order {
            if cancel.is_cancelled() {
                info!("reconcile cancelled");
                break;
            }
            let Some(resource) = &dag.nodes[id].resource else {
                continue;
            };
            self.set_phase(id, Phase::Applying, None);
            match self.client.apply(resource).await {
                Ok(()) => {
                    info!(id, "applied");
                    self.set_phase(id, Phase::Applied, None);
                }
                Err(e) => {
                    warn!(id, error = %e, "apply failed");
                    self.set_phase(id, Phase::Failed, Some(e.to_string()));
                    result = Err(e);
                    break;
                }
            }
        }

        if result.is_err() || cancel.is_cancelled() {
            // Pollers notice cancellation on their next wake.
            cancel.cancel();
            for poller in pollers {
                poller.abort();
            }
        }
        result
    }

    fn set_phase(&self, id: &str, phase: Phase, error: Option<String>) {
        let mut statuses = self.statuses.lock().expect("status lock poisoned");
        if let Some(status) = statuses.get_mut(id) {
            status.phase = phase;
            if phase == Phase::Applying {
                status.detail = "applying".to_string();
            }
            if let Some(e) = error {
                status.error = Some(e);
            }
        }
    }
}

async fn poll_readiness(
    client: Arc<dyn ClusterClient>,
    id: String,
    resource: crate::resource::Resource,
    statuses: StatusMap,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match client.check(&resource).await {
            Ok(readiness) => {
                let done = readiness.ready;
                {
                    let mut statuses = statuses.lock().expect("status lock poisoned");
                    if let Some(status) = statuses.get_mut(&id) {
                        status.ready = readiness.ready;
                        status.detail = readiness.detail;
                    }
                }
                if done {
                    return;
                }
            }
            Err(e) => {
                let mut statuses = statuses.lock().expect("status lock poisoned");
                if let Some(status) = statuses.get_mut(&id) {
                    status.error = Some(e.to_string());
                }
                return;
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Readiness, ResourceEvent};
    use crate::resource::Resource;
    use async_trait::async_trait;
    use nostos_types::Value;

    /// In-memory cluster double: applied resources become ready on the next
    /// check.
    #[derive(Default)]
    struct FakeCluster {
        state: Mutex<IndexMap<String, Resource>>,
        applied_order: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl ClusterClient for FakeCluster {
        async fn list_resources(&self) -> Result<Vec<Resource>, ClusterError> {
            Ok(self.state.lock().unwrap().values().cloned().collect())
        }

        async fn apply(&self, resource: &Resource) -> Result<(), ClusterError> {
            let id = resource.id();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(ClusterError::Api(format!("apply {id} rejected")));
            }
            self.applied_order.lock().unwrap().push(id.clone());
            self.state.lock().unwrap().insert(id, resource.clone());
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<Resource>, ClusterError> {
            Ok(self.state.lock().unwrap().get(id).cloned())
        }

        async fn watch(
            &self,
            resource: &Resource,
            _timeout: Duration,
        ) -> Result<Vec<ResourceEvent>, ClusterError> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .get(&resource.id())
                .map(|r| vec![ResourceEvent::Applied(r.clone())])
                .unwrap_or_default())
        }

        async fn check(&self, resource: &Resource) -> Result<Readiness, ClusterError> {
            if self.state.lock().unwrap().contains_key(&resource.id()) {
                Ok(Readiness::ready("exists"))
            } else {
                Ok(Readiness::pending("waiting"))
            }
        }
    }

    fn resource(kind: &str, name: &str, deps: Vec<&str>) -> Resource {
        let mut r = Resource {
            api_version: "v1".to_string(),
            kind: kind.to_string(),
            dependencies: deps.into_iter().map(String::from).collect(),
            ..Resource::default()
        };
        r.metadata
            .insert("name".to_string(), Value::String(name.to_string()));
        r
    }

    fn fast(client: Arc<FakeCluster>) -> Reconciler {
        Reconciler::new(client).with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn applies_in_topological_order() {
        let a = resource("A", "a", vec!["v1:B::b"]);
        let b = resource("B", "b", vec![]);
        let dag = Dag::build(&[a, b]).unwrap();
        let cluster = Arc::new(FakeCluster::default());
        let reconciler = fast(Arc::clone(&cluster));

        reconciler.run(&dag, CancellationToken::new()).await.unwrap();

        let order = cluster.applied_order.lock().unwrap().clone();
        assert_eq!(order, vec!["v1:B::b", "v1:A::a"]);
        // Everything the double applied is fetchable by identity.
        assert!(cluster.get("v1:A::a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn first_apply_error_aborts() {
        let a = resource("A", "a", vec!["v1:B::b"]);
        let b = resource("B", "b", vec![]);
        let dag = Dag::build(&[a, b]).unwrap();
        let cluster = Arc::new(FakeCluster {
            fail_on: Some("v1:B::b".to_string()),
            ..FakeCluster::default()
        });
        let reconciler = fast(Arc::clone(&cluster));

        let err = reconciler
            .run(&dag, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Api(_)));
        // The dependent node was never applied.
        assert!(cluster.applied_order.lock().unwrap().is_empty());
        let statuses = reconciler.snapshot();
        assert_eq!(statuses["v1:B::b"].phase, Phase::Failed);
        assert_eq!(statuses["v1:A::a"].phase, Phase::Pending);
    }

    #[tokio::test]
    async fn statuses_reach_ready() {
        let dag = Dag::build(&[resource("A", "a", vec![])]).unwrap();
        let cluster = Arc::new(FakeCluster::default());
        let reconciler = fast(Arc::clone(&cluster));
        reconciler.run(&dag, CancellationToken::new()).await.unwrap();

        // Give the poller a few wakes to observe the applied resource.
        for _ in 0..50 {
            if reconciler.snapshot()["v1:A::a"].ready {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let statuses = reconciler.snapshot();
        assert!(statuses["v1:A::a"].ready);
        assert_eq!(statuses["v1:A::a"].detail, "exists");
    }

    #[tokio::test]
    async fn cancellation_stops_at_node_boundary() {
        let dag = Dag::build(&[resource("A", "a", vec![])]).unwrap();
        let cluster = Arc::new(FakeCluster::default());
        let reconciler = fast(Arc::clone(&cluster));
        let cancel = CancellationToken::new();
        cancel.cancel();
        reconciler.run(&dag, cancel).await.unwrap();
        assert!(cluster.applied_order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_reports_applied_resources() {
        let cluster = Arc::new(FakeCluster::default());
        let r = resource("A", "a", vec![]);
        cluster.apply(&r).await.unwrap();
        let events = cluster.watch(&r, Duration::from_millis(10)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ResourceEvent::Applied(_)));
    }

    #[tokio::test]
    async fn placeholder_nodes_are_skipped() {
        let a = resource("A", "a", vec!["v1:Ghost::g"]);
        let dag = Dag::build(&[a]).unwrap();
        let cluster = Arc::new(FakeCluster::default());
        let reconciler = fast(Arc::clone(&cluster));
        reconciler.run(&dag, CancellationToken::new()).await.unwrap();
        let order = cluster.applied_order.lock().unwrap().clone();
        assert_eq!(order, vec!["v1:A::a"]);
    }
}
