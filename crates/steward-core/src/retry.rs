//! Bounded-polling primitive shared by every action.
//!
//! A [`RetryPolicy`] separates "how long and how often to retry" from "what a
//! single attempt does". The attempt closure performs one observation or
//! mutation and reports done / not-done / error; the policy owns the loop,
//! the interval sleep, and the deadline. Every action reuses this one loop
//! rather than hand-rolling its own polling.

use crate::error::{Result, StewardError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{Duration, Instant};
use tracing::debug;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Interval + timeout for one action's retry loop.
///
/// Invariant: a zero timeout means "single attempt"; the closure runs once
/// and an unfinished attempt converts straight into a timeout error. The
/// deadline is only consulted at attempt boundaries; an attempt in progress
/// is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration",
        default = "default_interval"
    )]
    pub interval: Duration,
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration",
        default = "default_timeout"
    )]
    pub timeout: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// A policy that runs its attempt exactly once.
    pub fn single_attempt() -> Self {
        Self {
            interval: Duration::ZERO,
            timeout: Duration::ZERO,
        }
    }

    /// Repeatedly invoke `attempt` until it reports done, returns an error,
    /// or the timeout elapses.
    ///
    /// - `Ok(true)`: done; returns `Ok(())` immediately, no sleep.
    /// - `Ok(false)`: not yet; sleeps the interval and tries again while the
    ///   deadline allows.
    /// - `Err(e)`: propagated immediately, no further attempts. Attempt
    ///   closures are expected to map store errors they consider transient
    ///   into `Ok(false)` themselves (see [`StewardError::is_retryable`]).
    ///
    /// `label` names the waited-for condition in the timeout error.
    pub fn wait<F>(&self, label: &str, mut attempt: F) -> Result<()>
    where
        F: FnMut() -> Result<bool>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            if attempt()? {
                return Ok(());
            }
            if started.elapsed() >= self.timeout {
                debug!(label, attempts, "retry budget exhausted");
                return Err(StewardError::Timeout {
                    label: label.to_string(),
                });
            }
            debug!(label, attempts, "condition not met; retrying");
            std::thread::sleep(self.interval);
        }
    }
}

/// Convert a transient store error into a not-done attempt outcome, so the
/// owning retry loop re-runs the attempt instead of aborting. Permanent
/// errors pass through and end the loop immediately.
pub(crate) fn absorb_transient(err: StewardError) -> Result<bool> {
    if err.is_retryable() {
        debug!(error = %err, "transient store error; attempt will be retried");
        Ok(false)
    } else {
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for Duration (serialized as seconds: u64)
// ---------------------------------------------------------------------------

fn serialize_duration<S>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_u64(d.as_secs())
}

fn deserialize_duration<'de, D>(d: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(d)?;
    Ok(Duration::from_secs(secs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
