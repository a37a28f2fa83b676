//! Three-way set difference between desired and cluster state.

use crate::resource::Resource;
use indexmap::IndexMap;

/// A resource present in both sets whose content differs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceUpdate {
    pub current: Resource,
    pub desired: Resource,
}

/// Partitioned diff result.
///
/// `unmanaged` resources exist in the cluster but not in the desired set;
/// they are reported, never deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub to_create: Vec<Resource>,
    pub to_update: Vec<ResourceUpdate>,
    pub unmanaged: Vec<Resource>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.unmanaged.is_empty()
    }

    /// The resources a plan must apply: creates plus the desired side of
    /// updates, in diff order.
    pub fn to_apply(&self) -> Vec<Resource> {
        let mut out = self.to_create.clone();
        out.extend(self.to_update.iter().map(|u| u.desired.clone()));
        out
    }
}

/// Compute the difference between the cluster snapshot and the desired set.
///
/// A resource is an update when present in both by ID but its apiVersion,
/// kind or spec differ; spec comparison is structural (key set plus per-key
/// recursive equality, lists elementwise, numbers by value).
pub fn diff_resources(cluster: &[Resource], desired: &[Resource]) -> DiffResult {
    let cluster_by_id: IndexMap<String, &Resource> =
        cluster.iter().map(|r| (r.id(), r)).collect();
    let desired_by_id: IndexMap<String, &Resource> =
        desired.iter().map(|r| (r.id(), r)).collect();

    let mut diff = DiffResult::default();

    for (id, wanted) in &desired_by_id {
        match cluster_by_id.get(id) {
            None => diff.to_create.push((*wanted).clone()),
            Some(current) => {
                let changed = current.api_version != wanted.api_version
                    || current.kind != wanted.kind
                    || current.spec != wanted.spec;
                if changed {
                    diff.to_update.push(ResourceUpdate {
                        current: (*current).clone(),
                        desired: (*wanted).clone(),
                    });
                }
            }
        }
    }

    for (id, current) in &cluster_by_id {
        if !desired_by_id.contains_key(id) {
            diff.unmanaged.push((*current).clone());
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostos_types::Value;

    fn with_spec(api_version: &str, kind: &str, name: &str, spec: Vec<(&str, f64)>) -> Resource {
        let mut r = Resource {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            ..Resource::default()
        };
        r.metadata
            .insert("name".to_string(), Value::String(name.to_string()));
        for (k, v) in spec {
            r.spec.insert(k.to_string(), Value::Number(v));
        }
        r
    }

    #[test]
    fn create_update_unmanaged_partitions() {
        let cluster = vec![
            with_spec("v1", "A", "a", vec![("x", 1.0)]),
            with_spec("v1", "B", "b", vec![]),
        ];
        let desired = vec![
            with_spec("v1", "A", "a", vec![("x", 2.0)]),
            with_spec("v1", "C", "c", vec![]),
        ];
        let diff = diff_resources(&cluster, &desired);
        assert_eq!(diff.to_create.len(), 1);
        assert_eq!(diff.to_create[0].id(), "v1:C::c");
        assert_eq!(diff.to_update.len(), 1);
        assert_eq!(diff.to_update[0].desired.id(), "v1:A::a");
        assert_eq!(diff.unmanaged.len(), 1);
        assert_eq!(diff.unmanaged[0].id(), "v1:B::b");
    }

    #[test]
    fn identical_sets_diff_empty() {
        let resources = vec![
            with_spec("v1", "A", "a", vec![("x", 1.0)]),
            with_spec("v1", "B", "b", vec![("y", 2.0)]),
        ];
        let diff = diff_resources(&resources, &resources);
        assert!(diff.is_empty());
    }

    #[test]
    fn equal_specs_are_not_updates() {
        let cluster = vec![with_spec("v1", "A", "a", vec![("x", 1.0)])];
        let desired = vec![with_spec("v1", "A", "a", vec![("x", 1.0)])];
        assert!(diff_resources(&cluster, &desired).is_empty());
    }

    #[test]
    fn spec_equality_ignores_key_order() {
        let mut current = with_spec("v1", "A", "a", vec![]);
        current.spec.insert("x".into(), Value::Number(1.0));
        current.spec.insert("y".into(), Value::Number(2.0));
        let mut wanted = with_spec("v1", "A", "a", vec![]);
        wanted.spec.insert("y".into(), Value::Number(2.0));
        wanted.spec.insert("x".into(), Value::Number(1.0));
        assert!(diff_resources(&[current], &[wanted]).is_empty());
    }

    #[test]
    fn nested_spec_difference_is_an_update() {
        let mut current = with_spec("v1", "A", "a", vec![]);
        let mut inner = indexmap::IndexMap::new();
        inner.insert("replicas".to_string(), Value::Number(1.0));
        current.spec.insert("deep".into(), Value::Map(inner.clone()));
        let mut wanted = current.clone();
        inner.insert("replicas".to_string(), Value::Number(3.0));
        wanted.spec.insert("deep".into(), Value::Map(inner));
        let diff = diff_resources(&[current], &[wanted]);
        assert_eq!(diff.to_update.len(), 1);
    }

    #[test]
    fn partitions_obey_set_laws() {
        let cluster = vec![
            with_spec("v1", "A", "a", vec![("x", 1.0)]),
            with_spec("v1", "B", "b", vec![]),
            with_spec("v1", "D", "d", vec![]),
        ];
        let desired = vec![
            with_spec("v1", "A", "a", vec![("x", 9.0)]),
            with_spec("v1", "C", "c", vec![]),
        ];
        let diff = diff_resources(&cluster, &desired);
        let desired_ids: Vec<String> = desired.iter().map(Resource::id).collect();
        let cluster_ids: Vec<String> = cluster.iter().map(Resource::id).collect();
        for r in diff.to_create.iter().chain(diff.to_update.iter().map(|u| &u.desired)) {
            assert!(desired_ids.contains(&r.id()));
        }
        for r in &diff.unmanaged {
            assert!(cluster_ids.contains(&r.id()));
        }
    }
}
