//! Rebuilding a playable session from history or a saved plan.

use serde::Deserialize;
use serde_json::Value;

use crate::model::{
    MAX_POSE_COUNT, MAX_STEP_DURATION_SECS, MemoryType, SessionMode, SessionRecord, Step,
};
use crate::normalize::{StepIdAllocator, clamp_to_u32, finite_number};

/// Configuration a replay or plan load hands to the session start screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOptions {
    pub mode: SessionMode,
    /// Per-pose duration; `None` means use the configured default.
    pub duration: Option<u32>,
    /// Only set in Custom mode.
    pub custom_queue: Option<Vec<Step>>,
    /// Only set in Memory mode.
    pub memory_type: Option<MemoryType>,
}

/// Raw options attached to an explicit "load this plan" request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadSessionOptions {
    pub mode: String,
    pub duration: Option<Value>,
    pub custom_queue: Option<Vec<Value>>,
    pub memory_type: Option<String>,
}

/// Average seconds per pose, or `None` when the aggregates cannot produce one.
#[must_use]
pub fn compute_replay_duration(record: &SessionRecord) -> Option<u32> {
    if record.poses <= 0 || record.time <= 0 {
        return None;
    }
    let per_pose = record
        .time
        .checked_add(record.poses / 2)
        .map_or(record.time / record.poses, |t| t / record.poses);
    let clamped = per_pose.clamp(1, i64::from(MAX_STEP_DURATION_SECS));
    u32::try_from(clamped).ok()
}

/// Coerces persisted queue entries into steps.
///
/// Non-object entries are skipped; everything else becomes a step, with
/// `count` and `duration` clamped to at least 1 and the type defaulting to pose.
#[must_use]
pub fn sanitize_custom_queue(entries: &[Value]) -> Vec<Step> {
    let mut ids = StepIdAllocator::for_entries(entries);
    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            let is_pause = obj.get("type").and_then(Value::as_str) == Some("pause");
            let count = obj
                .get("count")
                .and_then(finite_number)
                .map_or(1, |c| clamp_to_u32(c, 1, MAX_POSE_COUNT));
            let duration = obj
                .get("duration")
                .and_then(finite_number)
                .map_or(1, |d| clamp_to_u32(d, 1, MAX_STEP_DURATION_SECS));
            let (id, _) = ids.claim(obj.get("id"));
            Step::clamped(id, is_pause, count, duration)
        })
        .collect()
}

#[must_use]
pub fn build_replay_options_from_session(record: &SessionRecord) -> ReplayOptions {
    let mode = SessionMode::from_history(&record.mode);
    ReplayOptions {
        mode,
        duration: compute_replay_duration(record),
        custom_queue: custom_queue_for(mode, record.custom_queue.as_deref()),
        memory_type: memory_type_for(mode, record.memory_type.as_deref()),
    }
}

/// Same sanitation as a replay, applied to an explicit plan load.
#[must_use]
pub fn normalize_load_session_options(options: &LoadSessionOptions) -> ReplayOptions {
    let mode = SessionMode::from_history(&options.mode);
    let duration = options
        .duration
        .as_ref()
        .and_then(finite_number)
        .filter(|d| *d > 0.0)
        .map(|d| clamp_to_u32(d, 1, MAX_STEP_DURATION_SECS));
    ReplayOptions {
        mode,
        duration,
        custom_queue: custom_queue_for(mode, options.custom_queue.as_deref()),
        memory_type: memory_type_for(mode, options.memory_type.as_deref()),
    }
}

fn custom_queue_for(mode: SessionMode, raw: Option<&[Value]>) -> Option<Vec<Step>> {
    if mode != SessionMode::Custom {
        return None;
    }
    raw.map(sanitize_custom_queue).filter(|q| !q.is_empty())
}

fn memory_type_for(mode: SessionMode, raw: Option<&str>) -> Option<MemoryType> {
    (mode == SessionMode::Memory)
        .then(|| raw.and_then(|r| r.parse().ok()).unwrap_or_default())
}
