//! Assertions: match desired state against observed state.
//!
//! An [`Assert`] selects exactly one check kind, a field-path comparison
//! ([`path::PathCheck`]) or a whole-document comparison
//! ([`state::StateCheck`]), against a target document. [`Assertable`]
//! validates the spec, resolves the check kind, and dispatches to the one
//! checker; the checker re-fetches and re-evaluates under the retry policy
//! until the assertion holds or the policy times out.

pub mod path;
pub mod state;

use crate::document::Resource;
use crate::error::{Result, StewardError};
use crate::retry::RetryPolicy;
use crate::store::ResourceStore;
use crate::types::Phase;
use serde::{Deserialize, Serialize};

pub use path::{PathCheck, PathChecker};
pub use state::{StateCheck, StateChecker};

// ---------------------------------------------------------------------------
// Assert / AssertStatus
// ---------------------------------------------------------------------------

/// Assertion spec. At most one of `path_check` / `state_check` may be set;
/// neither set defaults to a state check with the `equals` operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assert {
    /// Target identity and, for state checks, the expected subtree.
    pub state: Resource,
    #[serde(default)]
    pub path_check: Option<PathCheck>,
    #[serde(default)]
    pub state_check: Option<StateCheck>,
}

/// Uniform result of an assertion run. `Phase::Failed` means the condition
/// was not observed within the retry budget: a legitimate outcome, distinct
/// from a hard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertStatus {
    pub phase: Phase,
    pub message: String,
    #[serde(default)]
    pub verbose: String,
}

// ---------------------------------------------------------------------------
// Assertable
// ---------------------------------------------------------------------------

/// Validates an [`Assert`] and routes it to the selected checker.
pub struct Assertable<'a> {
    name: &'a str,
    store: &'a dyn ResourceStore,
    assert: &'a Assert,
    retry: &'a RetryPolicy,
}

impl<'a> Assertable<'a> {
    pub fn new(
        name: &'a str,
        store: &'a dyn ResourceStore,
        assert: &'a Assert,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            name,
            store,
            assert,
            retry,
        }
    }

    /// Run the assertion. Configuration problems (missing name, empty target
    /// state, both check kinds set) fail fast without touching the store.
    pub fn run(&self) -> Result<AssertStatus> {
        if self.name.is_empty() {
            return Err(StewardError::MissingAssertName);
        }
        if self.assert.state.is_empty() {
            return Err(StewardError::MissingTargetState(self.name.to_string()));
        }
        match (&self.assert.path_check, &self.assert.state_check) {
            (Some(_), Some(_)) => Err(StewardError::AmbiguousAssert(self.name.to_string())),
            (Some(check), None) => {
                PathChecker::new(self.name, self.store, &self.assert.state, check, self.retry)
                    .run()
            }
            (None, Some(check)) => {
                StateChecker::new(self.name, self.store, &self.assert.state, check, self.retry)
                    .run()
            }
            (None, None) => {
                let check = StateCheck::default();
                StateChecker::new(self.name, self.store, &self.assert.state, &check, self.retry)
                    .run()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
