//! Topological ordering of resources by declared dependencies.

use crate::resource::Resource;
use crate::PlanError;
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Order resources so dependencies come first, using Kahn's algorithm.
///
/// The sort is stable: nodes with zero indegree drain in their insertion
/// order. Dependencies on IDs outside the set do not constrain the order
/// (the DAG builder turns them into placeholder roots). Returns
/// [`PlanError::DependencyCycle`] iff a cycle exists.
pub fn topological_sort(resources: &[Resource]) -> Result<Vec<Resource>, PlanError> {
    let mut nodes: IndexMap<String, &Resource> = IndexMap::new();
    for r in resources {
        nodes.insert(r.id(), r);
    }

    let mut indegree: IndexMap<&str, usize> =
        nodes.keys().map(|id| (id.as_str(), 0)).collect();
    let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();

    for (id, r) in &nodes {
        // Deduplicate so a repeated dependency does not inflate indegree.
        let mut seen: IndexSet<&str> = IndexSet::new();
        for dep in &r.dependencies {
            if nodes.contains_key(dep.as_str()) && seen.insert(dep.as_str()) {
                *indegree.get_mut(id.as_str()).expect("node indegree") += 1;
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }
    }

    let mut queue: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        sorted.push((*nodes[id]).clone());
        if let Some(children) = dependents.get(id) {
            for &child in children {
                let degree = indegree.get_mut(child).expect("child indegree");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if sorted.len() != nodes.len() {
        return Err(PlanError::DependencyCycle);
    }
    Ok(sorted)
}
