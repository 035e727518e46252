//! Field-path assertions.

use crate::assert::AssertStatus;
use crate::compare::as_f64;
use crate::document::Resource;
use crate::error::{Result, StewardError};
use crate::path::Path;
use crate::retry::{absorb_transient, RetryPolicy};
use crate::store::ResourceStore;
use crate::types::{PathCheckOperator, Phase};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// PathCheck
// ---------------------------------------------------------------------------

/// One field-path comparison: descend `path` in the observed document and
/// apply `operator` against `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathCheck {
    pub path: String,
    #[serde(default)]
    pub operator: PathCheckOperator,
    #[serde(default)]
    pub value: Option<Value>,
}

// ---------------------------------------------------------------------------
// PathChecker
// ---------------------------------------------------------------------------

/// Evaluates a [`PathCheck`] against the target resource, re-fetching it
/// each attempt under the owning retry policy.
///
/// A path that does not resolve (missing key, index out of range, scalar
/// where a container is expected, or the resource itself absent) yields an
/// absent value rather than an error; `exists`/`not_exists` are defined for
/// exactly that case. Retry exhaustion converts into `Phase::Failed`: an
/// assertion that never became true is a result, not an operational failure.
pub struct PathChecker<'a> {
    name: &'a str,
    store: &'a dyn ResourceStore,
    target: &'a Resource,
    check: &'a PathCheck,
    retry: &'a RetryPolicy,
}

impl<'a> PathChecker<'a> {
    pub fn new(
        name: &'a str,
        store: &'a dyn ResourceStore,
        target: &'a Resource,
        check: &'a PathCheck,
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
        let path = Path::parse(&self.check.path)?;
        self.validate_operands()?;

        let type_ref = self.target.type_ref();
        let namespace = self.target.namespace();
        let target_name = self.target.name();
        let condition = self.condition(&path);
        let label = format!("assert '{}': {condition}", self.name);

        let mut observed = String::from("<absent>");
        let outcome = self.retry.wait(&label, || {
            let client = match self.store.client_for(&type_ref) {
                Ok(client) => client,
                Err(err) => return absorb_transient(err),
            };
            let fetched = match client.get(namespace, target_name) {
                Ok(fetched) => fetched,
                Err(err) => return absorb_transient(err),
            };
            let resolved = fetched.as_ref().and_then(|r| r.nested(&path));
            observed = describe(resolved);
            Ok(self.evaluate(resolved))
        });

        match outcome {
            Ok(()) => Ok(AssertStatus {
                phase: Phase::Passed,
                message: format!("assert '{}' passed: {condition}", self.name),
                verbose: format!(
                    "target {type_ref} {namespace}/{target_name}: observed {observed}"
                ),
            }),
            Err(StewardError::Timeout { .. }) => Ok(AssertStatus {
                phase: Phase::Failed,
                message: format!(
                    "assert '{}' failed: {condition}: got {observed}",
                    self.name
                ),
                verbose: format!(
                    "target {type_ref} {namespace}/{target_name}: retry budget exhausted"
                ),
            }),
            Err(err) => Err(err),
        }
    }

    /// Operators other than `exists`/`not_exists` need an expected value;
    /// the list-count operators need it to be a non-negative integer. These
    /// are configuration errors, checked before the first store attempt.
    fn validate_operands(&self) -> Result<()> {
        use PathCheckOperator::*;
        match self.check.operator {
            Exists | NotExists => Ok(()),
            ListCountEquals | ListCountNotEquals => match &self.check.value {
                Some(value) if value.as_u64().is_some() => Ok(()),
                Some(_) => Err(StewardError::InvalidAssert(
                    self.name.to_string(),
                    format!("operator {} needs an integer value", self.check.operator),
                )),
                None => Err(StewardError::InvalidAssert(
                    self.name.to_string(),
                    format!("operator {} needs a value", self.check.operator),
                )),
            },
            Equals | NotEquals | Gte | Lte => {
                if self.check.value.is_some() {
                    Ok(())
                } else {
                    Err(StewardError::InvalidAssert(
                        self.name.to_string(),
                        format!("operator {} needs a value", self.check.operator),
                    ))
                }
            }
        }
    }

    fn evaluate(&self, resolved: Option<&Value>) -> bool {
        use PathCheckOperator::*;
        let expected = self.check.value.as_ref();
        match self.check.operator {
            Exists => resolved.is_some(),
            NotExists => resolved.is_none(),
            // deep, type-aware equality; an absent value equals nothing
            Equals => resolved == expected,
            NotEquals => resolved != expected,
            Gte => match (resolved.and_then(as_f64), expected.and_then(as_f64)) {
                (Some(actual), Some(want)) => actual >= want,
                _ => false,
            },
            Lte => match (resolved.and_then(as_f64), expected.and_then(as_f64)) {
                (Some(actual), Some(want)) => actual <= want,
                _ => false,
            },
            ListCountEquals => self.list_len(resolved) == self.expected_count(),
            ListCountNotEquals => match self.list_len(resolved) {
                Some(len) => Some(len) != self.expected_count(),
                None => false,
            },
        }
    }

    fn list_len(&self, resolved: Option<&Value>) -> Option<u64> {
        resolved?.as_array().map(|items| items.len() as u64)
    }

    fn expected_count(&self) -> Option<u64> {
        self.check.value.as_ref().and_then(Value::as_u64)
    }

    fn condition(&self, path: &Path) -> String {
        match &self.check.value {
            Some(value) => format!("path '{path}' {} {value}", self.check.operator),
            None => format!("path '{path}' {}", self.check.operator),
        }
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<absent>".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
