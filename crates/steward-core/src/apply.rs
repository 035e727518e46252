//! Create-or-update reconciliation.
//!
//! The [`Applier`] owns only the retry discipline and the create-vs-update
//! decision; the document merge itself is the store's capability
//! ([`crate::store::ResourceClient::create_or_merge`]). Conflict and
//! already-exists races are transient by contract and retried; a permanent
//! store rejection becomes a `Phase::Failed` result with the store's
//! diagnostic.

use crate::document::Resource;
use crate::error::{Result, StewardError};
use crate::retry::{absorb_transient, RetryPolicy};
use crate::store::ResourceStore;
use crate::types::Phase;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Apply / ApplyStatus
// ---------------------------------------------------------------------------

/// Apply spec: the desired document to reconcile into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apply {
    pub state: Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyStatus {
    pub phase: Phase,
    pub message: String,
    #[serde(default)]
    pub verbose: String,
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

pub struct Applier<'a> {
    store: &'a dyn ResourceStore,
    apply: &'a Apply,
    retry: &'a RetryPolicy,
}

impl<'a> Applier<'a> {
    pub fn new(store: &'a dyn ResourceStore, apply: &'a Apply, retry: &'a RetryPolicy) -> Self {
        Self {
            store,
            apply,
            retry,
        }
    }

    pub fn run(&self) -> Result<ApplyStatus> {
        if self.apply.state.is_empty() {
            return Err(StewardError::InvalidDocument(
                "apply: empty desired state".to_string(),
            ));
        }
        if self.apply.state.name().is_empty() {
            return Err(StewardError::InvalidDocument(
                "apply: desired state has no metadata.name".to_string(),
            ));
        }

        let type_ref = self.apply.state.type_ref();
        let namespace = self.apply.state.namespace();
        let name = self.apply.state.name();
        let message = format!("apply {type_ref} {namespace}/{name}");

        let mut stored_version = String::new();
        let outcome = self.retry.wait(&message, || {
            let client = match self.store.client_for(&type_ref) {
                Ok(client) => client,
                Err(err) => return absorb_transient(err),
            };
            match client.create_or_merge(&self.apply.state) {
                Ok(stored) => {
                    stored_version = stored.resource_version().unwrap_or("").to_string();
                    Ok(true)
                }
                Err(err) => absorb_transient(err),
            }
        });

        match outcome {
            Ok(()) => {
                debug!(%type_ref, namespace, name, version = %stored_version, "applied");
                Ok(ApplyStatus {
                    phase: Phase::Passed,
                    message,
                    verbose: format!("stored at resource version {stored_version}"),
                })
            }
            // a permanent rejection is a result, not an operational failure
            Err(err @ StewardError::UnknownResourceType(_))
            | Err(err @ StewardError::InvalidDocument(_)) => Ok(ApplyStatus {
                phase: Phase::Failed,
                message: format!("{message}: rejected by store"),
                verbose: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
