use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Terminal outcome of an action run. Every action result carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Passed,
    Failed,
    Warning,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Passed => "passed",
            Phase::Failed => "failed",
            Phase::Warning => "warning",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::StewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(Phase::Passed),
            "failed" => Ok(Phase::Failed),
            "warning" => Ok(Phase::Warning),
            _ => Err(crate::error::StewardError::InvalidDocument(format!(
                "unknown phase '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PathCheckOperator
// ---------------------------------------------------------------------------

/// Comparison applied to the value a field path resolves to.
///
/// `exists`/`not_exists` are defined for unresolvable paths as well: a path
/// that does not resolve yields an absent value, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCheckOperator {
    Exists,
    NotExists,
    Equals,
    NotEquals,
    Gte,
    Lte,
    ListCountEquals,
    ListCountNotEquals,
}

impl Default for PathCheckOperator {
    fn default() -> Self {
        PathCheckOperator::Exists
    }
}

impl PathCheckOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            PathCheckOperator::Exists => "exists",
            PathCheckOperator::NotExists => "not_exists",
            PathCheckOperator::Equals => "equals",
            PathCheckOperator::NotEquals => "not_equals",
            PathCheckOperator::Gte => "gte",
            PathCheckOperator::Lte => "lte",
            PathCheckOperator::ListCountEquals => "list_count_equals",
            PathCheckOperator::ListCountNotEquals => "list_count_not_equals",
        }
    }
}

impl fmt::Display for PathCheckOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StateCheckOperator
// ---------------------------------------------------------------------------

/// Comparison applied to the set of resources matching the target's
/// namespace, name, and label selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCheckOperator {
    Equals,
    NotEquals,
    NotFound,
    ListCountEquals,
    ListCountNotEquals,
}

impl Default for StateCheckOperator {
    fn default() -> Self {
        StateCheckOperator::Equals
    }
}

impl StateCheckOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            StateCheckOperator::Equals => "equals",
            StateCheckOperator::NotEquals => "not_equals",
            StateCheckOperator::NotFound => "not_found",
            StateCheckOperator::ListCountEquals => "list_count_equals",
            StateCheckOperator::ListCountNotEquals => "list_count_not_equals",
        }
    }
}

impl fmt::Display for StateCheckOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
