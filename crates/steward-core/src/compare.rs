//! Structural comparison over semi-structured documents.
//!
//! `subset_match` implements the containment semantics shared by the state
//! checker: every key/value in the expected tree must be present and equal in
//! the observed tree; keys present only in the observed tree are ignored.
//! Lists are compared element-wise in order with no reordering tolerance,
//! and the observed list may carry extra trailing elements, symmetric with
//! the extra-map-key rule. Scalars use deep, type-aware equality: a number
//! and a string never compare equal.

use serde_json::{Map, Value};

/// Does `observed` contain `expected`?
pub fn subset_match(expected: &Value, observed: &Value) -> bool {
    match (expected, observed) {
        (Value::Object(exp), Value::Object(obs)) => map_subset_match(exp, obs),
        (Value::Array(exp), Value::Array(obs)) => {
            exp.len() <= obs.len()
                && exp
                    .iter()
                    .zip(obs.iter())
                    .all(|(e, o)| subset_match(e, o))
        }
        (exp, obs) => exp == obs,
    }
}

/// Map-rooted form of [`subset_match`], used for whole-document comparison.
pub fn map_subset_match(expected: &Map<String, Value>, observed: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, exp)| {
        observed
            .get(key)
            .map_or(false, |obs| subset_match(exp, obs))
    })
}

/// Numeric coercion for ordering comparisons: JSON numbers directly, and
/// strings that parse as numbers (quantities frequently arrive quoted).
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
