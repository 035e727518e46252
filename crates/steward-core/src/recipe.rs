//! Recipe sequencing.
//!
//! A recipe is an ordered list of steps, each holding exactly one action:
//! assert, label, or apply. Steps run sequentially and blocking; each action
//! owns its own retry policy and counters, so there is no shared mutable
//! engine state between steps or between concurrently running recipes.

use crate::apply::{Applier, Apply};
use crate::assert::{Assert, Assertable};
use crate::error::{Result, StewardError};
use crate::label::{Label, Labeler};
use crate::retry::RetryPolicy;
use crate::store::ResourceStore;
use crate::types::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

// ---------------------------------------------------------------------------
// Recipe / Step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    /// Default retry policy for steps that do not set their own.
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One recipe step. Exactly one of `assert` / `label` / `apply` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub assert: Option<Assert>,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub apply: Option<Apply>,
    /// Downgrade a failure of this step to a warning and keep going.
    #[serde(default)]
    pub continue_on_failure: bool,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Assert,
    Label,
    Apply,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Assert => "assert",
            ActionKind::Label => "label",
            ActionKind::Apply => "apply",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepResult / RecipeResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub action: ActionKind,
    pub phase: Phase,
    pub message: String,
    #[serde(default)]
    pub verbose: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub name: String,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub steps: Vec<StepResult>,
}

// ---------------------------------------------------------------------------
// RecipeRunner
// ---------------------------------------------------------------------------

pub struct RecipeRunner<'a> {
    store: &'a dyn ResourceStore,
    recipe: &'a Recipe,
}

impl<'a> RecipeRunner<'a> {
    pub fn new(store: &'a dyn ResourceStore, recipe: &'a Recipe) -> Self {
        Self { store, recipe }
    }

    /// Run the steps in order. A terminally failed step stops the recipe;
    /// `continue_on_failure` downgrades that step to a warning instead.
    /// Hard errors (configuration problems, retry exhaustion on a mutation)
    /// propagate unless the step opted into continuing.
    pub fn run(&self) -> Result<RecipeResult> {
        let started_at = Utc::now();
        let mut steps = Vec::with_capacity(self.recipe.steps.len());
        let mut overall = Phase::Passed;

        for step in &self.recipe.steps {
            let action = step_action(step)?;
            let retry = step.retry.unwrap_or(self.recipe.retry);
            let result = match self.run_step(step, action, &retry) {
                Ok(result) => result,
                Err(err) if step.continue_on_failure => StepResult {
                    name: step.name.clone(),
                    action,
                    phase: Phase::Warning,
                    message: format!("{action} '{}' errored: {err}", step.name),
                    verbose: String::new(),
                },
                Err(err) => return Err(err),
            };

            let phase = if result.phase == Phase::Failed && step.continue_on_failure {
                Phase::Warning
            } else {
                result.phase
            };
            info!(
                recipe = %self.recipe.name,
                step = %step.name,
                action = %action,
                phase = %phase,
                "step finished"
            );
            let stop = phase == Phase::Failed;
            if phase == Phase::Failed {
                overall = Phase::Failed;
            } else if phase == Phase::Warning && overall == Phase::Passed {
                overall = Phase::Warning;
            }
            steps.push(StepResult { phase, ..result });
            if stop {
                break;
            }
        }

        Ok(RecipeResult {
            name: self.recipe.name.clone(),
            phase: overall,
            started_at,
            completed_at: Utc::now(),
            steps,
        })
    }

    fn run_step(&self, step: &Step, action: ActionKind, retry: &RetryPolicy) -> Result<StepResult> {
        let (phase, message, verbose) = match action {
            ActionKind::Assert => {
                let status = Assertable::new(
                    &step.name,
                    self.store,
                    step.assert.as_ref().unwrap(),
                    retry,
                )
                .run()?;
                (status.phase, status.message, status.verbose)
            }
            ActionKind::Label => {
                let result = Labeler::new(self.store, step.label.as_ref().unwrap(), retry).run()?;
                (result.phase, result.message, result.verbose)
            }
            ActionKind::Apply => {
                let status = Applier::new(self.store, step.apply.as_ref().unwrap(), retry).run()?;
                (status.phase, status.message, status.verbose)
            }
        };
        Ok(StepResult {
            name: step.name.clone(),
            action,
            phase,
            message,
            verbose,
        })
    }
}

/// Resolve the step's single action, or fail on none / more than one.
fn step_action(step: &Step) -> Result<ActionKind> {
    let mut kinds = Vec::new();
    if step.assert.is_some() {
        kinds.push(ActionKind::Assert);
    }
    if step.label.is_some() {
        kinds.push(ActionKind::Label);
    }
    if step.apply.is_some() {
        kinds.push(ActionKind::Apply);
    }
    match kinds.as_slice() {
        [one] => Ok(*one),
        [] => Err(StewardError::EmptyStep(step.name.clone())),
        _ => Err(StewardError::AmbiguousStep(step.name.clone())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
