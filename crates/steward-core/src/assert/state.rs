//! Whole-document assertions.

use crate::assert::AssertStatus;
use crate::compare::map_subset_match;
use crate::document::Resource;
use crate::error::{Result, StewardError};
use crate::retry::{absorb_transient, RetryPolicy};
use crate::store::{ResourceStore, Selector};
use crate::types::{Phase, StateCheckOperator};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StateCheck
// ---------------------------------------------------------------------------

/// A comparison of the target document against the set of observed
/// resources matching its namespace, labels, and (when set) name. The
/// expected subtree is the target state itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateCheck {
    #[serde(default)]
    pub operator: StateCheckOperator,
    /// Expected match count for the list-count operators.
    #[serde(default)]
    pub count: Option<usize>,
}

// ---------------------------------------------------------------------------
// StateChecker
// ---------------------------------------------------------------------------

/// Evaluates a [`StateCheck`], re-listing the matching resources each
/// attempt under the owning retry policy.
///
/// `equals` is subset containment: every key/value in the expected document
/// must be present and equal in the observed one; keys only the observed
/// document has are ignored; lists compare element-wise in order.
/// `not_equals` is its exact negation. Retry exhaustion converts into
/// `Phase::Failed`, same as the path checker.
pub struct StateChecker<'a> {
    name: &'a str,
    store: &'a dyn ResourceStore,
    target: &'a Resource,
    check: &'a StateCheck,
    retry: &'a RetryPolicy,
}

impl<'a> StateChecker<'a> {
    pub fn new(
        name: &'a str,
        store: &'a dyn ResourceStore,
        target: &'a Resource,
        check: &'a StateCheck,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            name,
            store,
            target,
            check,
            retry,
        }
    }

    pub fn run(&self) -> Result<AssertStatus> {
        self.validate_operands()?;

        let type_ref = self.target.type_ref();
        let namespace = self.target.namespace();
        let target_name = self.target.name();
        let selector = Selector::from(self.target.labels());
        let condition = self.condition();
        let label = format!("assert '{}': {condition}", self.name);

        let mut matched: usize = 0;
        let mut containing: usize = 0;
        let outcome = self.retry.wait(&label, || {
            let client = match self.store.client_for(&type_ref) {
                Ok(client) => client,
                Err(err) => return absorb_transient(err),
            };
            let items = match client.list(namespace, &selector) {
                Ok(items) => items,
                Err(err) => return absorb_transient(err),
            };
            let items: Vec<Resource> = items
                .into_iter()
                .filter(|item| target_name.is_empty() || item.name() == target_name)
                .collect();
            matched = items.len();
            containing = items
                .iter()
                .filter(|item| map_subset_match(self.target.as_map(), item.as_map()))
                .count();
            Ok(self.evaluate(matched, containing))
        });

        let detail = format!(
            "target {type_ref} {namespace}/{target_name}: matched {matched}, containing expected state {containing}"
        );
        match outcome {
            Ok(()) => Ok(AssertStatus {
                phase: Phase::Passed,
                message: format!("assert '{}' passed: {condition}", self.name),
                verbose: detail,
            }),
            Err(StewardError::Timeout { .. }) => Ok(AssertStatus {
                phase: Phase::Failed,
                message: format!("assert '{}' failed: {condition}: {detail}", self.name),
                verbose: "retry budget exhausted".to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    fn validate_operands(&self) -> Result<()> {
        use StateCheckOperator::*;
        match self.check.operator {
            ListCountEquals | ListCountNotEquals if self.check.count.is_none() => {
                Err(StewardError::InvalidAssert(
                    self.name.to_string(),
                    format!("operator {} needs a count", self.check.operator),
                ))
            }
            _ => Ok(()),
        }
    }

    fn evaluate(&self, matched: usize, containing: usize) -> bool {
        use StateCheckOperator::*;
        match self.check.operator {
            Equals => matched > 0 && containing == matched,
            NotEquals => !(matched > 0 && containing == matched),
            NotFound => matched == 0,
            ListCountEquals => Some(matched) == self.check.count,
            ListCountNotEquals => Some(matched) != self.check.count,
        }
    }

    fn condition(&self) -> String {
        match self.check.count {
            Some(count) => format!("state {} {count}", self.check.operator),
            None => format!("state {}", self.check.operator),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (name, state) in [("p1", "Online"), ("p2", "Online")] {
            store
                .seed(
                    Resource::from_yaml(&format!(
                        "apiVersion: v1\nkind: Pool\nmetadata:\n  name: {name}\n  namespace: default\n  labels:\n    app: storage\nstatus:\n  state: {state}\n"
                    ))
                    .unwrap(),
                )
                .unwrap();
        }
        store
    }

    fn run_check(store: &MemoryStore, target: &str, check: StateCheck) -> AssertStatus {
        let target = Resource::from_yaml(target).unwrap();
        let retry = RetryPolicy::single_attempt();
        StateChecker::new("pools", store, &target, &check, &retry)
            .run()
            .unwrap()
    }

    fn op(operator: StateCheckOperator) -> StateCheck {
        StateCheck {
            operator,
            count: None,
        }
    }

    #[test]
    fn equals_is_subset_containment() {
        // expected names only a fragment of the observed documents
        let status = run_check(
            &seeded_store(),
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\nstatus:\n  state: Online\n",
            op(StateCheckOperator::Equals),
        );
        assert_eq!(status.phase, Phase::Passed);
    }

    #[test]
    fn equals_fails_on_differing_value() {
        let status = run_check(
            &seeded_store(),
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\nstatus:\n  state: Offline\n",
            op(StateCheckOperator::Equals),
        );
        assert_eq!(status.phase, Phase::Failed);
    }

    #[test]
    fn not_equals_is_the_negation() {
        let store = seeded_store();
        let status = run_check(
            &store,
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\nstatus:\n  state: Offline\n",
            op(StateCheckOperator::NotEquals),
        );
        assert_eq!(status.phase, Phase::Passed);

        let status = run_check(
            &store,
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\nstatus:\n  state: Online\n",
            op(StateCheckOperator::NotEquals),
        );
        assert_eq!(status.phase, Phase::Failed);
    }

    #[test]
    fn unnamed_target_checks_every_selector_match() {
        // no metadata.name: both labeled pools must contain the fragment
        let status = run_check(
            &seeded_store(),
            "apiVersion: v1\nkind: Pool\nmetadata:\n  labels:\n    app: storage\nstatus:\n  state: Online\n",
            op(StateCheckOperator::Equals),
        );
        assert_eq!(status.phase, Phase::Passed);
    }

    #[test]
    fn not_found_passes_when_nothing_matches() {
        let store = seeded_store();
        let status = run_check(
            &store,
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: ghost\n",
            op(StateCheckOperator::NotFound),
        );
        assert_eq!(status.phase, Phase::Passed);

        let status = run_check(
            &store,
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\n",
            op(StateCheckOperator::NotFound),
        );
        assert_eq!(status.phase, Phase::Failed);
    }

    #[test]
    fn list_count_operators_compare_matched_set_size() {
        let store = seeded_store();
        let check = StateCheck {
            operator: StateCheckOperator::ListCountEquals,
            count: Some(2),
        };
        let status = run_check(
            &store,
            "apiVersion: v1\nkind: Pool\nmetadata:\n  labels:\n    app: storage\n",
            check,
        );
        assert_eq!(status.phase, Phase::Passed);

        let check = StateCheck {
            operator: StateCheckOperator::ListCountNotEquals,
            count: Some(2),
        };
        let status = run_check(
            &store,
            "apiVersion: v1\nkind: Pool\nmetadata:\n  labels:\n    app: storage\n",
            check,
        );
        assert_eq!(status.phase, Phase::Failed);
    }

    #[test]
    fn count_operator_without_count_is_a_validation_error() {
        let store = seeded_store();
        let target =
            Resource::from_yaml("apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\n").unwrap();
        let retry = RetryPolicy::single_attempt();
        let check = op(StateCheckOperator::ListCountEquals);
        let err = StateChecker::new("bad", &store, &target, &check, &retry)
            .run()
            .unwrap_err();
        assert!(matches!(err, StewardError::InvalidAssert(_, _)));
    }

    #[test]
    fn failure_message_reports_the_matched_counts() {
        let status = run_check(
            &seeded_store(),
            "apiVersion: v1\nkind: Pool\nmetadata:\n  name: p1\nstatus:\n  state: Offline\n",
            op(StateCheckOperator::Equals),
        );
        assert_eq!(status.phase, Phase::Failed);
        assert!(status.message.contains("matched 1"), "{}", status.message);
    }
}
