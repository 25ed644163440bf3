use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::StepId;

/// Longest duration a single step may carry (one day).
pub const MAX_STEP_DURATION_SECS: u32 = 86_400;

/// Largest number of repetitions a pose step may carry.
pub const MAX_POSE_COUNT: u32 = 10_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("step duration must be between 1 and {MAX_STEP_DURATION_SECS} seconds, got {0}")]
    InvalidDuration(u32),

    #[error("pose count must be between 1 and {MAX_POSE_COUNT}, got {0}")]
    InvalidCount(u32),

    #[error("pause steps always have a count of 1, got {0}")]
    PauseCount(u32),
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// What a queue entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// `count` images, each shown for `duration` seconds.
    Pose { count: u32, duration: u32 },
    /// A single rest interval of `duration` seconds.
    Pause { duration: u32 },
}

/// One unit of a custom session queue.
///
/// A pose step is an inline repetition loop; it is never expanded into
/// `count` separate entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StepRecord", into = "StepRecord")]
pub struct Step {
    id: StepId,
    kind: StepKind,
}

impl Step {
    /// Creates a pose group.
    ///
    /// # Errors
    ///
    /// Returns `StepError` if `count` or `duration` is out of range.
    pub fn pose(id: StepId, count: u32, duration: u32) -> Result<Self, StepError> {
        check_duration(duration)?;
        if !(1..=MAX_POSE_COUNT).contains(&count) {
            return Err(StepError::InvalidCount(count));
        }
        Ok(Self {
            id,
            kind: StepKind::Pose { count, duration },
        })
    }

    /// Creates a rest interval.
    ///
    /// # Errors
    ///
    /// Returns `StepError::InvalidDuration` if `duration` is out of range.
    pub fn pause(id: StepId, duration: u32) -> Result<Self, StepError> {
        check_duration(duration)?;
        Ok(Self {
            id,
            kind: StepKind::Pause { duration },
        })
    }

    /// Builds a step from arbitrary numbers, clamping them into range.
    #[must_use]
    pub fn clamped(id: StepId, is_pause: bool, count: u32, duration: u32) -> Self {
        let duration = duration.clamp(1, MAX_STEP_DURATION_SECS);
        let kind = if is_pause {
            StepKind::Pause { duration }
        } else {
            StepKind::Pose {
                count: count.clamp(1, MAX_POSE_COUNT),
                duration,
            }
        };
        Self { id, kind }
    }

    #[must_use]
    pub fn id(&self) -> StepId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    #[must_use]
    pub fn with_id(mut self, id: StepId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn is_pause(&self) -> bool {
        matches!(self.kind, StepKind::Pause { .. })
    }

    #[must_use]
    pub fn is_pose(&self) -> bool {
        matches!(self.kind, StepKind::Pose { .. })
    }

    /// Repetitions in this step; pauses always report 1.
    #[must_use]
    pub fn count(&self) -> u32 {
        match self.kind {
            StepKind::Pose { count, .. } => count,
            StepKind::Pause { .. } => 1,
        }
    }

    /// Per-pose duration for pose steps, total duration for pauses.
    #[must_use]
    pub fn duration(&self) -> u32 {
        match self.kind {
            StepKind::Pose { duration, .. } | StepKind::Pause { duration } => duration,
        }
    }

    /// Full cost of the step in seconds.
    #[must_use]
    pub fn total_seconds(&self) -> u64 {
        match self.kind {
            StepKind::Pose { count, duration } => u64::from(count) * u64::from(duration),
            StepKind::Pause { duration } => u64::from(duration),
        }
    }
}

fn check_duration(duration: u32) -> Result<(), StepError> {
    if (1..=MAX_STEP_DURATION_SECS).contains(&duration) {
        Ok(())
    } else {
        Err(StepError::InvalidDuration(duration))
    }
}

//
// ─── WIRE SHAPE ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Pose,
    Pause,
}

/// Persisted shape: `{ "type", "count", "duration", "id" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default = "default_count")]
    pub count: u32,
    pub duration: u32,
    pub id: u64,
}

fn default_count() -> u32 {
    1
}

impl TryFrom<StepRecord> for Step {
    type Error = StepError;

    fn try_from(record: StepRecord) -> Result<Self, Self::Error> {
        let id = StepId::new(record.id);
        match record.step_type {
            StepType::Pose => Step::pose(id, record.count, record.duration),
            StepType::Pause if record.count == 1 => Step::pause(id, record.duration),
            StepType::Pause => Err(StepError::PauseCount(record.count)),
        }
    }
}

impl From<Step> for StepRecord {
    fn from(step: Step) -> Self {
        Self {
            step_type: if step.is_pause() {
                StepType::Pause
            } else {
                StepType::Pose
            },
            count: step.count(),
            duration: step.duration(),
            id: step.id.value(),
        }
    }
}
