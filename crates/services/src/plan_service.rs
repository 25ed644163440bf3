use std::sync::Arc;

use serde_json::Value;
use sketch_core::model::{Plan, PlansPayload, SessionMode, Step};
use sketch_core::normalize::normalize_session_plans_payload;
use sketch_core::replay::{LoadSessionOptions, ReplayOptions, normalize_load_session_options};
use sketch_core::timer::{custom_pose_session_progress, queue_total_seconds};
use storage::repository::{KeyValueStore, keys};
use tracing::{debug, warn};

use crate::Clock;
use crate::error::PlanServiceError;

/// Totals shown next to a saved plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub name: String,
    pub date: i64,
    pub step_count: usize,
    pub total_seconds: u64,
    pub total_poses: u64,
    pub pose_groups: usize,
}

impl PlanSummary {
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        let progress = custom_pose_session_progress(plan.steps(), 0, 0);
        Self {
            name: plan.name().to_string(),
            date: plan.date(),
            step_count: plan.steps().len(),
            total_seconds: queue_total_seconds(plan.steps()),
            total_poses: progress.total_poses,
            pose_groups: progress.pose_group_count,
        }
    }
}

/// Loads, repairs, and saves named plans.
#[derive(Clone)]
pub struct PlanService {
    clock: Clock,
    kv: Arc<dyn KeyValueStore>,
}

impl PlanService {
    #[must_use]
    pub fn new(clock: Clock, kv: Arc<dyn KeyValueStore>) -> Self {
        Self { clock, kv }
    }

    /// Load every saved plan.
    ///
    /// A payload that needed repair is written back in its corrected form.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` if the store cannot be read or written.
    pub async fn load_plans(&self) -> Result<Vec<Plan>, PlanServiceError> {
        let raw = self
            .kv
            .get(keys::SESSION_PLANS)
            .await?
            .unwrap_or(Value::Null);
        let normalized = normalize_session_plans_payload(&raw, self.clock.now_millis());
        if normalized.repaired {
            warn!(
                plans = normalized.plans.len(),
                "plans payload needed repair; re-persisting"
            );
            self.persist(&normalized.payload).await?;
        }
        Ok(normalized.plans)
    }

    /// Fetch one plan by name.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::NotFound` if no plan has that name.
    pub async fn get_plan(&self, name: &str) -> Result<Plan, PlanServiceError> {
        let name = name.trim();
        self.load_plans()
            .await?
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| PlanServiceError::NotFound {
                name: name.to_string(),
            })
    }

    /// Save a plan, replacing any plan with the same name.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Model` if the plan is invalid, or a storage error.
    pub async fn save_plan(
        &self,
        name: impl Into<String>,
        steps: Vec<Step>,
    ) -> Result<Plan, PlanServiceError> {
        let plan = Plan::new(name, steps, self.clock.now_millis())?;
        let mut plans = self.load_plans().await?;
        match plans.iter_mut().find(|p| p.name() == plan.name()) {
            Some(existing) => *existing = plan.clone(),
            None => plans.push(plan.clone()),
        }
        self.persist(&PlansPayload::new(plans)).await?;
        debug!(name = plan.name(), steps = plan.steps().len(), "saved plan");
        Ok(plan)
    }

    /// Delete a plan by name, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` on persistence failures.
    pub async fn delete_plan(&self, name: &str) -> Result<bool, PlanServiceError> {
        let name = name.trim();
        let mut plans = self.load_plans().await?;
        let before = plans.len();
        plans.retain(|p| p.name() != name);
        if plans.len() == before {
            return Ok(false);
        }
        if plans.is_empty() {
            self.kv.remove(keys::SESSION_PLANS).await?;
        } else {
            self.persist(&PlansPayload::new(plans)).await?;
        }
        Ok(true)
    }

    /// Summaries of all plans, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` if the store cannot be read.
    pub async fn plan_summaries(&self) -> Result<Vec<PlanSummary>, PlanServiceError> {
        let plans = self.load_plans().await?;
        Ok(plans.iter().map(PlanSummary::from_plan).collect())
    }

    /// Options for starting a custom session from a saved plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::NotFound` if no plan has that name.
    pub async fn load_options(&self, name: &str) -> Result<ReplayOptions, PlanServiceError> {
        let plan = self.get_plan(name).await?;
        let custom_queue = plan
            .steps()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let options = LoadSessionOptions {
            mode: SessionMode::Custom.as_str().to_string(),
            duration: None,
            custom_queue: Some(custom_queue),
            memory_type: None,
        };
        Ok(normalize_load_session_options(&options))
    }

    async fn persist(&self, payload: &PlansPayload) -> Result<(), PlanServiceError> {
        let doc = serde_json::to_value(payload)?;
        self.kv.set(keys::SESSION_PLANS, &doc).await?;
        Ok(())
    }
}
