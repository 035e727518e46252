//! The resource store collaborator.
//!
//! The engine never talks to a backend directly; it resolves a per-type
//! [`ResourceClient`] from a [`ResourceStore`] and performs list / get /
//! update / create-or-merge calls against it. Permanent-vs-transient
//! classification travels in the error variant the store returns
//! ([`crate::StewardError::is_retryable`]): `Conflict` and `Unavailable` may
//! be retried, everything else is final.

pub mod fs;
pub mod memory;

use crate::document::{Resource, TypeRef};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use fs::FsStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Label equality selector. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(BTreeMap<String, String>);

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Selector {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Resolves per-resource-type access. Fails with `UnknownResourceType` when
/// the type is not served.
pub trait ResourceStore: Send + Sync {
    fn client_for(&self, type_ref: &TypeRef) -> Result<Box<dyn ResourceClient + '_>>;
}

/// Typed access to one resource type.
pub trait ResourceClient: std::fmt::Debug {
    /// All resources in `namespace` matching `selector`, in a deterministic
    /// order.
    fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<Resource>>;

    /// A single resource by name, or `None` when absent.
    fn get(&self, namespace: &str, name: &str) -> Result<Option<Resource>>;

    /// Optimistic-concurrency write of a full document. A stale
    /// `metadata.resourceVersion` fails with `Conflict`.
    fn update(&self, desired: &Resource) -> Result<Resource>;

    /// Create the resource if absent; otherwise merge the desired fields
    /// into the existing document, preserving fields the desired document
    /// does not mention.
    fn create_or_merge(&self, desired: &Resource) -> Result<Resource>;
}

// ---------------------------------------------------------------------------
// Document merge (store-owned semantics)
// ---------------------------------------------------------------------------

/// Merge `desired` into `existing`: desired keys win, maps merge recursively,
/// lists are replaced wholesale, an explicit null deletes the key.
pub(crate) fn merge_document(existing: &mut Map<String, Value>, desired: &Map<String, Value>) {
    for (key, desired_value) in desired {
        match desired_value {
            Value::Null => {
                existing.remove(key);
            }
            Value::Object(desired_map) => match existing.get_mut(key) {
                Some(Value::Object(existing_map)) => merge_document(existing_map, desired_map),
                _ => {
                    existing.insert(key.clone(), desired_value.clone());
                }
            },
            _ => {
                existing.insert(key.clone(), desired_value.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn selector_empty_matches_all() {
        let selector = Selector::new();
        assert!(selector.matches(&BTreeMap::new()));
        let mut labels = BTreeMap::new();
        labels.insert("a".to_string(), "1".to_string());
        assert!(selector.matches(&labels));
    }

    #[test]
    fn selector_requires_every_pair() {
        let mut want = BTreeMap::new();
        want.insert("app".to_string(), "db".to_string());
        want.insert("tier".to_string(), "hot".to_string());
        let selector = Selector::from(want);

        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "db".to_string());
        assert!(!selector.matches(&labels));
        labels.insert("tier".to_string(), "hot".to_string());
        labels.insert("extra".to_string(), "x".to_string());
        assert!(selector.matches(&labels));
    }

    #[test]
    fn merge_preserves_unmentioned_fields() {
        let mut existing = as_map(json!({
            "spec": {"group": "openebs.io", "scope": "Namespaced"},
            "status": {"state": "Online"}
        }));
        let desired = as_map(json!({"spec": {"group": "steward.io"}}));
        merge_document(&mut existing, &desired);
        assert_eq!(existing["spec"]["group"], json!("steward.io"));
        assert_eq!(existing["spec"]["scope"], json!("Namespaced"));
        assert_eq!(existing["status"]["state"], json!("Online"));
    }

    #[test]
    fn merge_replaces_lists_wholesale() {
        let mut existing = as_map(json!({"spec": {"shortNames": ["cp"]}}));
        let desired = as_map(json!({"spec": {"shortNames": ["cp", "cpl"]}}));
        merge_document(&mut existing, &desired);
        assert_eq!(existing["spec"]["shortNames"], json!(["cp", "cpl"]));
    }

    #[test]
    fn merge_null_deletes_key() {
        let mut existing = as_map(json!({"spec": {"paused": true, "replicas": 3}}));
        let desired = as_map(json!({"spec": {"paused": null}}));
        merge_document(&mut existing, &desired);
        assert_eq!(existing["spec"], json!({"replicas": 3}));
    }

    #[test]
    fn merge_scalar_over_map_replaces() {
        let mut existing = as_map(json!({"spec": {"limits": {"cpu": "1"}}}));
        let desired = as_map(json!({"spec": {"limits": "unbounded"}}));
        merge_document(&mut existing, &desired);
        assert_eq!(existing["spec"]["limits"], json!("unbounded"));
    }
}
