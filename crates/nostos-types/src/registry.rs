//! In-memory registry of object types keyed by group/version/kind.

use crate::ObjectType;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe store of object types.
///
/// Many readers, single writer; writes replace whole entries. The registry
/// is shared process-wide between the evaluator, the planner's scope filter
/// and the language server.
#[derive(Debug, Default)]
pub struct Registry {
    types: RwLock<HashMap<(String, String, String), Arc<ObjectType>>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Insert a type, replacing any previous entry for the same
    /// group/version/kind.
    pub fn add_type(&self, ty: ObjectType) {
        let key = (ty.group.clone(), ty.version.clone(), ty.kind.clone());
        let mut types = self.types.write().expect("registry lock poisoned");
        types.insert(key, Arc::new(ty));
    }

    /// Look up a type by group, version and kind.
    pub fn get_type(&self, group: &str, version: &str, kind: &str) -> Option<Arc<ObjectType>> {
        let types = self.types.read().expect("registry lock poisoned");
        types
            .get(&(group.to_string(), version.to_string(), kind.to_string()))
            .cloned()
    }

    /// All registered types, in no particular order.
    pub fn list_types(&self) -> Vec<Arc<ObjectType>> {
        let types = self.types.read().expect("registry lock poisoned");
        types.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.types.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scope metadata for a kind, if any registered type declares it.
    ///
    /// Returns e.g. `"Cluster"` or `"Namespaced"`. When multiple versions of
    /// a kind disagree the first non-empty scope wins.
    pub fn scope_for_kind(&self, kind: &str) -> Option<String> {
        let types = self.types.read().expect("registry lock poisoned");
        types
            .values()
            .filter(|t| t.kind == kind && !t.scope.is_empty())
            .map(|t| t.scope.clone())
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(group: &str, version: &str, kind: &str, scope: &str) -> ObjectType {
        ObjectType {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            scope: scope.to_string(),
            ..ObjectType::default()
        }
    }

    #[test]
    fn add_and_get() {
        let reg = Registry::new();
        reg.add_type(ty("apps", "v1", "Deployment", "Namespaced"));
        let got = reg.get_type("apps", "v1", "Deployment").unwrap();
        assert_eq!(got.kind, "Deployment");
        assert!(reg.get_type("", "v1", "Deployment").is_none());
    }

    #[test]
    fn add_replaces_whole_entry() {
        let reg = Registry::new();
        reg.add_type(ty("", "v1", "Namespace", ""));
        reg.add_type(ty("", "v1", "Namespace", "Cluster"));
        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.get_type("", "v1", "Namespace").unwrap().scope,
            "Cluster"
        );
    }

    #[test]
    fn scope_lookup() {
        let reg = Registry::new();
        reg.add_type(ty("", "v1", "Namespace", "Cluster"));
        reg.add_type(ty("", "v1", "Service", "Namespaced"));
        assert_eq!(reg.scope_for_kind("Namespace").as_deref(), Some("Cluster"));
        assert_eq!(reg.scope_for_kind("Service").as_deref(), Some("Namespaced"));
        assert_eq!(reg.scope_for_kind("Unknown"), None);
    }

    #[test]
    fn concurrent_readers() {
        let reg = Arc::new(Registry::new());
        reg.add_type(ty("", "v1", "Service", "Namespaced"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(reg.get_type("", "v1", "Service").is_some());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
