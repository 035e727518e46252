//! Label reconciliation.
//!
//! A [`Label`] drives the labels of every resource matching the target's
//! selector: included resources get `apply_labels` merged in, excluded ones
//! optionally get exactly those labels removed again. The list-then-mutate
//! sequence is one retry-attempt unit: a transient failure on any item
//! re-runs the whole list-and-evaluate pass rather than resuming mid-list,
//! so no partial-state bookkeeping survives across attempts.

use crate::document::Resource;
use crate::error::{Result, StewardError};
use crate::retry::{absorb_transient, RetryPolicy};
use crate::store::{ResourceClient, ResourceStore, Selector};
use crate::types::Phase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Label / LabelResult
// ---------------------------------------------------------------------------

/// Labeling spec. `state` carries the target type, namespace, and the label
/// selector; `apply_labels` is what gets applied and must be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub state: Resource,
    pub apply_labels: BTreeMap<String, String>,
    /// Names of the resources to label. Empty means every selector match.
    #[serde(default)]
    pub include_by_names: Vec<String>,
    /// Remove `apply_labels` again from excluded resources that fully carry
    /// them.
    #[serde(default)]
    pub auto_unset: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelResult {
    pub phase: Phase,
    pub message: String,
    #[serde(default)]
    pub verbose: String,
    pub found: usize,
    pub labeled: usize,
    pub unlabeled: usize,
}

enum Mutation {
    Labeled,
    Unlabeled,
    None,
}

// ---------------------------------------------------------------------------
// Labeler
// ---------------------------------------------------------------------------

pub struct Labeler<'a> {
    store: &'a dyn ResourceStore,
    label: &'a Label,
    retry: &'a RetryPolicy,
}

impl<'a> Labeler<'a> {
    pub fn new(store: &'a dyn ResourceStore, label: &'a Label, retry: &'a RetryPolicy) -> Self {
        Self {
            store,
            label,
            retry,
        }
    }

    pub fn run(&self) -> Result<LabelResult> {
        if self.label.apply_labels.is_empty() {
            return Err(StewardError::MissingApplyLabels);
        }

        let type_ref = self.label.state.type_ref();
        let namespace = self.label.state.namespace();
        let selector = Selector::from(self.label.state.labels());
        let message = format!("label resources of type {type_ref} in namespace '{namespace}'");

        let mut found = 0;
        let mut labeled = 0;
        let mut unlabeled = 0;
        self.retry.wait(&message, || {
            // counts describe one attempt; a retried attempt starts over
            found = 0;
            labeled = 0;
            unlabeled = 0;
            let client = match self.store.client_for(&type_ref) {
                Ok(client) => client,
                Err(err) => return absorb_transient(err),
            };
            let items = match client.list(namespace, &selector) {
                Ok(items) => items,
                Err(err) => return absorb_transient(err),
            };
            found = items.len();
            for item in &items {
                match self.label_or_unset(client.as_ref(), item) {
                    Ok(Mutation::Labeled) => labeled += 1,
                    Ok(Mutation::Unlabeled) => unlabeled += 1,
                    Ok(Mutation::None) => {}
                    Err(err) => return absorb_transient(err),
                }
            }
            Ok(true)
        })?;

        debug!(%type_ref, found, labeled, unlabeled, "labeling complete");
        Ok(LabelResult {
            phase: Phase::Passed,
            message,
            verbose: format!("found {found}: labeled {labeled}: unlabeled {unlabeled}"),
            found,
            labeled,
            unlabeled,
        })
    }

    fn label_or_unset(&self, client: &dyn ResourceClient, item: &Resource) -> Result<Mutation> {
        let included = self.label.include_by_names.is_empty()
            || self
                .label
                .include_by_names
                .iter()
                .any(|name| name == item.name());
        if included {
            return self.apply(client, item);
        }
        if self.label.auto_unset {
            return self.unset(client, item);
        }
        Ok(Mutation::None)
    }

    /// Merge the desired labels into the item's existing labels. Desired
    /// values win on key conflict; untouched labels are preserved.
    fn apply(&self, client: &dyn ResourceClient, item: &Resource) -> Result<Mutation> {
        let mut labels = item.labels();
        for (key, value) in &self.label.apply_labels {
            labels.insert(key.clone(), value.clone());
        }
        let mut updated = item.clone();
        updated.set_labels(&labels);
        client.update(&updated)?;
        Ok(Mutation::Labeled)
    }

    /// Remove exactly the desired label keys, but only when the item carries
    /// every desired key with exactly the desired value. A resource the
    /// desired set was never fully applied to is not eligible; partially
    /// unsetting it would corrupt labels this action does not own.
    fn unset(&self, client: &dyn ResourceClient, item: &Resource) -> Result<Mutation> {
        let current = item.labels();
        for (key, value) in &self.label.apply_labels {
            if current.get(key) != Some(value) {
                return Ok(Mutation::None);
            }
        }
        let remaining: BTreeMap<String, String> = current
            .into_iter()
            .filter(|(key, _)| !self.label.apply_labels.contains_key(key))
            .collect();
        let mut updated = item.clone();
        updated.set_labels(&remaining);
        client.update(&updated)?;
        Ok(Mutation::Unlabeled)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TypeRef;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn seed_pool(store: &MemoryStore, name: &str, labels: &[(&str, &str)]) {
        let mut label_yaml = String::new();
        for (k, v) in labels {
            label_yaml.push_str(&format!("    {k}: \"{v}\"\n"));
        }
        let labels_block = if labels.is_empty() {
            String::new()
        } else {
            format!("  labels:\n{label_yaml}")
        };
        store
            .seed(
                Resource::from_yaml(&format!(
                    "apiVersion: v1\nkind: Pool\nmetadata:\n  name: {name}\n  namespace: default\n{labels_block}"
                ))
                .unwrap(),
            )
            .unwrap();
    }

    fn label_spec(apply: &[(&str, &str)], include: &[&str], auto_unset: bool) -> Label {
        Label {
            state: Resource::from_yaml(
                "apiVersion: v1\nkind: Pool\nmetadata:\n  namespace: default\n",
            )
            .unwrap(),
            apply_labels: apply
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            include_by_names: include.iter().map(|s| s.to_string()).collect(),
            auto_unset,
        }
    }

    fn stored_labels(store: &MemoryStore, name: &str) -> BTreeMap<String, String> {
        store
            .lookup(&TypeRef::new("v1", "Pool"), "default", name)
            .unwrap()
            .labels()
    }

    fn run(store: &MemoryStore, label: &Label) -> LabelResult {
        let retry = RetryPolicy::single_attempt();
        Labeler::new(store, label, &retry).run().unwrap()
    }

    #[test]
    fn empty_apply_labels_fails_fast() {
        let store = MemoryStore::new();
        let label = label_spec(&[], &[], false);
        let retry = RetryPolicy::single_attempt();
        let err = Labeler::new(&store, &label, &retry).run().unwrap_err();
        assert!(matches!(err, StewardError::MissingApplyLabels));
    }

    #[test]
    fn applies_labels_to_unlabeled_resource() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        let result = run(&store, &label_spec(&[("a", "1")], &[], false));

        assert_eq!(result.phase, Phase::Passed);
        assert_eq!((result.found, result.labeled, result.unlabeled), (1, 1, 0));
        assert_eq!(stored_labels(&store, "p1").get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn reapplying_is_idempotent_on_state() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[("a", "1"), ("keep", "me")]);
        let label = label_spec(&[("a", "1")], &[], false);

        let first = run(&store, &label);
        let before = stored_labels(&store, "p1");
        let second = run(&store, &label);
        let after = stored_labels(&store, "p1");

        // still counts toward labeled, but the resulting state is unchanged
        assert_eq!(first.labeled, 1);
        assert_eq!(second.labeled, 1);
        assert_eq!(before, after);
        assert_eq!(after.get("keep").map(String::as_str), Some("me"));
    }

    #[test]
    fn desired_labels_win_on_conflict() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[("a", "old"), ("b", "2")]);
        run(&store, &label_spec(&[("a", "new")], &[], false));

        let labels = stored_labels(&store, "p1");
        assert_eq!(labels.get("a").map(String::as_str), Some("new"));
        assert_eq!(labels.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn include_by_names_limits_application() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        seed_pool(&store, "p2", &[]);
        let result = run(&store, &label_spec(&[("a", "1")], &["p1"], false));

        assert_eq!((result.found, result.labeled, result.unlabeled), (2, 1, 0));
        assert!(stored_labels(&store, "p1").contains_key("a"));
        assert!(!stored_labels(&store, "p2").contains_key("a"));
    }

    #[test]
    fn auto_unset_removes_exactly_the_desired_keys() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        seed_pool(&store, "p2", &[("a", "1"), ("b", "2")]);
        let result = run(&store, &label_spec(&[("a", "1")], &["p1"], true));

        assert_eq!((result.found, result.labeled, result.unlabeled), (2, 1, 1));
        let labels = stored_labels(&store, "p2");
        assert!(!labels.contains_key("a"));
        assert_eq!(labels.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn value_mismatch_is_not_eligible_for_unset() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        seed_pool(&store, "p2", &[("a", "9")]);
        let result = run(&store, &label_spec(&[("a", "1")], &["p1"], true));

        assert_eq!(result.unlabeled, 0);
        assert_eq!(stored_labels(&store, "p2").get("a").map(String::as_str), Some("9"));
    }

    #[test]
    fn missing_desired_key_is_not_eligible_for_unset() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        seed_pool(&store, "p2", &[("a", "1")]);
        // two desired keys, p2 carries only one of them
        let result = run(&store, &label_spec(&[("a", "1"), ("b", "2")], &["p1"], true));

        assert_eq!(result.unlabeled, 0);
        assert!(stored_labels(&store, "p2").contains_key("a"));
    }

    #[test]
    fn excluded_without_auto_unset_is_a_noop() {
        let store = MemoryStore::new();
        seed_pool(&store, "p2", &[("a", "1"), ("b", "2")]);
        let result = run(&store, &label_spec(&[("a", "1")], &["p1"], false));

        assert_eq!((result.found, result.labeled, result.unlabeled), (1, 0, 0));
        assert!(stored_labels(&store, "p2").contains_key("a"));
    }

    #[test]
    fn write_conflict_retries_the_whole_attempt() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        seed_pool(&store, "p2", &[]);
        store.inject_update_conflicts(1);

        let label = label_spec(&[("a", "1")], &[], false);
        let retry = RetryPolicy::new(Duration::from_millis(5), Duration::from_millis(500));
        let result = Labeler::new(&store, &label, &retry).run().unwrap();

        // the first attempt died on p1's write; the second relabeled both,
        // and the counts reflect only that final attempt
        assert_eq!((result.found, result.labeled, result.unlabeled), (2, 2, 0));
        assert!(stored_labels(&store, "p1").contains_key("a"));
        assert!(stored_labels(&store, "p2").contains_key("a"));
    }

    #[test]
    fn retry_exhaustion_is_a_hard_error() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[]);
        store.inject_update_conflicts(100);

        let label = label_spec(&[("a", "1")], &[], false);
        let retry = RetryPolicy::single_attempt();
        let err = Labeler::new(&store, &label, &retry).run().unwrap_err();
        assert!(matches!(err, StewardError::Timeout { .. }));
    }

    #[test]
    fn selector_narrows_the_found_set() {
        let store = MemoryStore::new();
        seed_pool(&store, "p1", &[("app", "db")]);
        seed_pool(&store, "p2", &[("app", "web")]);

        let mut label = label_spec(&[("owned", "yes")], &[], false);
        label.state = Resource::from_yaml(
            "apiVersion: v1\nkind: Pool\nmetadata:\n  namespace: default\n  labels:\n    app: db\n",
        )
        .unwrap();
        let result = run(&store, &label);

        assert_eq!((result.found, result.labeled), (1, 1));
        assert!(stored_labels(&store, "p1").contains_key("owned"));
        assert!(!stored_labels(&store, "p2").contains_key("owned"));
    }
}
