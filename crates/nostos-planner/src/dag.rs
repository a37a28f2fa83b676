//! Dependency graph over resources.

use crate::graph::topological_sort;
use crate::resource::Resource;
use crate::PlanError;
use indexmap::IndexMap;

/// One node of the [`Dag`].
///
/// Placeholder nodes (unknown dependency targets) have no resource and are
/// treated as roots.
#[derive(Debug, Clone, Default)]
pub struct DagNode {
    pub id: String,
    pub resource: Option<Resource>,
    /// IDs of prerequisite nodes.
    pub parents: Vec<String>,
    /// IDs of dependent nodes.
    pub children: Vec<String>,
}

/// Acyclic dependency graph with a retained topological order.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    pub nodes: IndexMap<String, DagNode>,
    /// Nodes without parents, in insertion order.
    pub roots: Vec<String>,
    /// Topological order over the real (non-placeholder) nodes.
    pub order: Vec<String>,
}

impl Dag {
    /// Build the graph, failing on dependency cycles.
    pub fn build(resources: &[Resource]) -> Result<Dag, PlanError> {
        let sorted = topological_sort(resources)?;

        let mut nodes: IndexMap<String, DagNode> = IndexMap::new();
        for r in resources {
            let id = r.id();
            nodes.insert(
                id.clone(),
                DagNode {
                    id,
                    resource: Some(r.clone()),
                    ..DagNode::default()
                },
            );
        }

        for r in resources {
            let id = r.id();
            for dep in &r.dependencies {
                if !nodes.contains_key(dep) {
                    nodes.insert(
                        dep.clone(),
                        DagNode {
                            id: dep.clone(),
                            ..DagNode::default()
                        },
                    );
                }
                nodes[dep].children.push(id.clone());
                nodes[&id].parents.push(dep.clone());
            }
        }

        let roots = nodes
            .values()
            .filter(|n| n.parents.is_empty())
            .map(|n| n.id.clone())
            .collect();
        let order = sorted.iter().map(Resource::id).collect();

        Ok(Dag {
            nodes,
            roots,
            order,
        })
    }

    pub fn node(&self, id: &str) -> Option<&DagNode> {
        self.nodes.get(id)
    }
}
