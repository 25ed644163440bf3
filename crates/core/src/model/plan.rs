use serde::Serialize;
use thiserror::Error;

use crate::model::step::Step;

/// Current version of the persisted plans envelope.
pub const PLANS_SCHEMA_VERSION: u32 = 1;

/// Plan names longer than this are truncated on load.
pub const MAX_PLAN_NAME_CHARS: usize = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("plan name cannot be empty")]
    EmptyName,

    #[error("plan name exceeds {MAX_PLAN_NAME_CHARS} characters")]
    NameTooLong,

    #[error("plan must contain at least one step")]
    NoSteps,

    #[error("duplicate step id {0} in plan")]
    DuplicateStepId(u64),
}

/// A named, saved custom queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    name: String,
    steps: Vec<Step>,
    date: i64,
}

impl Plan {
    /// Creates a plan, trimming the name.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if the name is empty or too long, the queue is empty,
    /// or two steps share an id.
    pub fn new(name: impl Into<String>, steps: Vec<Step>, date: i64) -> Result<Self, PlanError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(PlanError::EmptyName);
        }
        if name.chars().count() > MAX_PLAN_NAME_CHARS {
            return Err(PlanError::NameTooLong);
        }
        if steps.is_empty() {
            return Err(PlanError::NoSteps);
        }
        let mut seen = std::collections::HashSet::with_capacity(steps.len());
        for step in &steps {
            if !seen.insert(step.id()) {
                return Err(PlanError::DuplicateStepId(step.id().value()));
            }
        }
        Ok(Self { name, steps, date })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Creation time in epoch milliseconds.
    #[must_use]
    pub fn date(&self) -> i64 {
        self.date
    }

    #[must_use]
    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

/// Versioned envelope written to the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlansPayload {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    pub plans: Vec<Plan>,
}

impl PlansPayload {
    #[must_use]
    pub fn new(plans: Vec<Plan>) -> Self {
        Self {
            schema_version: PLANS_SCHEMA_VERSION,
            plans,
        }
    }
}
