//! Repair of persisted plan payloads.
//!
//! Loading never fails: invalid entries are coerced or dropped and the result
//! reports `repaired` so the caller can write the corrected payload back.

use serde_json::Value;
use std::collections::HashSet;

use crate::model::{
    MAX_PLAN_NAME_CHARS, MAX_POSE_COUNT, MAX_STEP_DURATION_SECS, PLANS_SCHEMA_VERSION, Plan,
    PlansPayload, Step, StepId,
};

/// 2000-01-01T00:00:00Z in epoch milliseconds.
pub const MIN_PLAN_DATE_MS: i64 = 946_684_800_000;

/// 2100-01-01T00:00:00Z in epoch milliseconds.
pub const MAX_PLAN_DATE_MS: i64 = 4_102_444_800_000;

/// Outcome of loading a plans payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPlans {
    /// Envelope to persist.
    pub payload: PlansPayload,
    pub plans: Vec<Plan>,
    /// Something was coerced, dropped, or upgraded.
    pub repaired: bool,
}

/// A step that survived normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedStep {
    pub step: Step,
    pub repaired: bool,
}

/// Accepts a legacy bare array or a `{schemaVersion, plans}` envelope.
#[must_use]
pub fn normalize_session_plans_payload(raw: &Value, now_ms: i64) -> NormalizedPlans {
    let empty: &[Value] = &[];
    let (entries, mut repaired) = match raw {
        Value::Null => (empty, false),
        Value::Array(items) => (items.as_slice(), true),
        Value::Object(obj) => {
            let version_ok = obj
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .is_some_and(|v| v == u64::from(PLANS_SCHEMA_VERSION));
            match obj.get("plans") {
                Some(Value::Array(items)) => (items.as_slice(), !version_ok),
                _ => (empty, true),
            }
        }
        _ => (empty, true),
    };

    let mut plans = Vec::with_capacity(entries.len());
    for entry in entries {
        let position = plans.len() + 1;
        match normalize_plan(entry, position, now_ms) {
            Some((plan, plan_repaired)) => {
                repaired |= plan_repaired;
                plans.push(plan);
            }
            None => repaired = true,
        }
    }

    NormalizedPlans {
        payload: PlansPayload::new(plans.clone()),
        plans,
        repaired,
    }
}

fn normalize_plan(raw: &Value, position: usize, now_ms: i64) -> Option<(Plan, bool)> {
    let obj = raw.as_object()?;
    let mut repaired = false;

    let raw_steps = match obj.get("steps") {
        Some(Value::Array(items)) => items.as_slice(),
        _ => return None,
    };
    let mut ids = StepIdAllocator::for_entries(raw_steps);
    let mut steps = Vec::with_capacity(raw_steps.len());
    for raw_step in raw_steps {
        let Some(normalized) = normalize_custom_step(raw_step, &mut ids) else {
            repaired = true;
            continue;
        };
        repaired |= normalized.repaired;
        steps.push(normalized.step);
    }
    if steps.is_empty() {
        return None;
    }

    let (name, name_repaired) = normalize_plan_name(obj.get("name"), position);
    repaired |= name_repaired;

    let date = obj
        .get("date")
        .and_then(Value::as_i64)
        .filter(|d| (MIN_PLAN_DATE_MS..MAX_PLAN_DATE_MS).contains(d));
    let date = date.unwrap_or_else(|| {
        repaired = true;
        now_ms
    });

    Plan::new(name, steps, date).ok().map(|plan| (plan, repaired))
}

fn normalize_plan_name(raw: Option<&Value>, position: usize) -> (String, bool) {
    let original = raw.and_then(Value::as_str).unwrap_or_default();
    let trimmed = original.trim();
    if trimmed.is_empty() {
        return (format!("Plan {position}"), true);
    }
    let name: String = trimmed.chars().take(MAX_PLAN_NAME_CHARS).collect();
    let name = name.trim_end().to_string();
    let repaired = name != original;
    (name, repaired)
}

/// Coerces one persisted step.
///
/// Returns `None` for entries that cannot be recovered: non-objects and
/// entries without a numeric duration.
pub fn normalize_custom_step(raw: &Value, ids: &mut StepIdAllocator) -> Option<NormalizedStep> {
    let obj = raw.as_object()?;
    let raw_duration = obj.get("duration").and_then(finite_number)?;
    let mut repaired = !obj.get("duration").is_some_and(Value::is_number);

    let is_pause = match obj.get("type").and_then(Value::as_str) {
        Some("pause") => true,
        Some("pose") => false,
        _ => {
            repaired = true;
            false
        }
    };

    let duration = clamp_to_u32(raw_duration, 1, MAX_STEP_DURATION_SECS);
    repaired |= !same_number(raw_duration, duration);

    let count = if is_pause {
        repaired |= obj
            .get("count")
            .is_some_and(|c| c.as_u64() != Some(1));
        1
    } else {
        match obj.get("count").and_then(finite_number) {
            Some(raw_count) => {
                let count = clamp_to_u32(raw_count, 1, MAX_POSE_COUNT);
                repaired |= !same_number(raw_count, count);
                count
            }
            None => {
                repaired = true;
                1
            }
        }
    };

    let (id, reassigned) = ids.claim(obj.get("id"));
    repaired |= reassigned;

    Some(NormalizedStep {
        step: Step::clamped(id, is_pause, count, duration),
        repaired,
    })
}

/// Largest id that survives a round trip through a JSON number as `f64`.
pub const MAX_STEP_ID: u64 = 9_007_199_254_740_991;

/// Hands out step ids that are unique within one queue.
///
/// Ids already present in the raw entries are kept on first use; missing,
/// non-numeric, out-of-range, or duplicated ids receive fresh values above
/// the largest one, falling back to the lowest free id once that runs out.
#[derive(Debug, Clone, Default)]
pub struct StepIdAllocator {
    used: HashSet<u64>,
    next: u64,
}

impl StepIdAllocator {
    #[must_use]
    pub fn for_entries(entries: &[Value]) -> Self {
        let max = entries
            .iter()
            .filter_map(|e| e.get("id").and_then(numeric_id))
            .max()
            .unwrap_or(0);
        Self {
            used: HashSet::with_capacity(entries.len()),
            next: max.saturating_add(1),
        }
    }

    /// Returns the id to use and whether it differs from the raw one.
    pub fn claim(&mut self, raw: Option<&Value>) -> (StepId, bool) {
        if let Some(id) = raw.and_then(numeric_id) {
            if self.used.insert(id) {
                return (StepId::new(id), false);
            }
        }
        while self.next <= MAX_STEP_ID {
            let id = self.next;
            self.next += 1;
            if self.used.insert(id) {
                return (StepId::new(id), true);
            }
        }
        // Everything above the largest raw id is taken; reuse the lowest free one.
        let id = (1..=MAX_STEP_ID)
            .find(|id| !self.used.contains(id))
            .unwrap_or(MAX_STEP_ID);
        self.used.insert(id);
        (StepId::new(id), true)
    }
}

fn numeric_id(value: &Value) -> Option<u64> {
    if let Some(id) = value.as_u64() {
        return (id <= MAX_STEP_ID).then_some(id);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= 9_007_199_254_740_991.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some(f as u64);
    }
    None
}

/// Reads a number, also accepting numeric strings written by older versions.
pub(crate) fn finite_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Rounds and clamps into `[min, max]`.
pub(crate) fn clamp_to_u32(value: f64, min: u32, max: u32) -> u32 {
    let rounded = value.round();
    if rounded <= f64::from(min) {
        min
    } else if rounded >= f64::from(max) {
        max
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = rounded as u32;
        v
    }
}

fn same_number(raw: f64, coerced: u32) -> bool {
    (raw - f64::from(coerced)).abs() < f64::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn envelope(plans: Value) -> Value {
        json!({"schemaVersion": 1, "plans": plans})
    }

    #[test]
    fn clean_payload_is_not_repaired() {
        let raw = envelope(json!([{
            "name": "Gesture",
            "date": NOW,
            "steps": [
                {"type": "pose", "count": 5, "duration": 30, "id": 1},
                {"type": "pause", "count": 1, "duration": 60, "id": 2}
            ]
        }]));
        let out = normalize_session_plans_payload(&raw, NOW);
        assert!(!out.repaired);
        assert_eq!(out.plans.len(), 1);
        assert_eq!(out.plans[0].steps().len(), 2);
        assert_eq!(serde_json::to_value(&out.payload).unwrap(), raw);
    }

    #[test]
    fn malformed_step_is_dropped_and_plan_kept() {
        let raw = envelope(json!([{
            "name": "Mixed",
            "date": NOW,
            "steps": [
                {"type": "pose", "count": 2, "duration": 45, "id": 1},
                {"type": "pose", "count": 2, "duration": "abc", "id": 2}
            ]
        }]));
        let out = normalize_session_plans_payload(&raw, NOW);
        assert!(out.repaired);
        assert_eq!(out.plans.len(), 1);
        let steps = out.plans[0].steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].duration(), 45);
    }

    #[test]
    fn plan_without_valid_steps_is_dropped() {
        let raw = envelope(json!([
            {"name": "Empty", "date": NOW, "steps": []},
            {"name": "Broken", "date": NOW, "steps": ["nope", 3]},
            {"name": "Kept", "date": NOW, "steps": [{"type": "pose", "count": 1, "duration": 10, "id": 1}]}
        ]));
        let out = normalize_session_plans_payload(&raw, NOW);
        assert!(out.repaired);
        assert_eq!(out.plans.len(), 1);
        assert_eq!(out.plans[0].name(), "Kept");
    }

    #[test]
    fn legacy_array_and_version_mismatch_are_repairs() {
        let plan = json!({"name": "A", "date": NOW, "steps": [{"type": "pose", "count": 1, "duration": 10, "id": 1}]});
        let legacy = normalize_session_plans_payload(&json!([plan.clone()]), NOW);
        assert!(legacy.repaired);
        assert_eq!(legacy.payload.schema_version, PLANS_SCHEMA_VERSION);

        let old = normalize_session_plans_payload(&json!({"schemaVersion": 0, "plans": [plan]}), NOW);
        assert!(old.repaired);
        assert_eq!(old.plans.len(), 1);
    }

    #[test]
    fn null_is_empty_without_repair_but_garbage_is_repaired() {
        let none = normalize_session_plans_payload(&Value::Null, NOW);
        assert!(!none.repaired);
        assert!(none.plans.is_empty());

        let garbage = normalize_session_plans_payload(&json!("plans"), NOW);
        assert!(garbage.repaired);
        assert!(garbage.plans.is_empty());
    }

    #[test]
    fn names_are_trimmed_truncated_and_defaulted() {
        let long = "x".repeat(200);
        let step = json!([{"type": "pose", "count": 1, "duration": 10, "id": 1}]);
        let raw = envelope(json!([
            {"name": "  Warmup ", "date": NOW, "steps": step.clone()},
            {"name": long, "date": NOW, "steps": step.clone()},
            {"name": "", "date": NOW, "steps": step}
        ]));
        let out = normalize_session_plans_payload(&raw, NOW);
        assert!(out.repaired);
        assert_eq!(out.plans[0].name(), "Warmup");
        assert_eq!(out.plans[1].name().chars().count(), MAX_PLAN_NAME_CHARS);
        assert_eq!(out.plans[2].name(), "Plan 3");
    }

    #[test]
    fn bad_dates_fall_back_to_now() {
        let step = json!([{"type": "pose", "count": 1, "duration": 10, "id": 1}]);
        let raw = envelope(json!([
            {"name": "Old", "date": -5, "steps": step.clone()},
            {"name": "Missing", "steps": step}
        ]));
        let out = normalize_session_plans_payload(&raw, NOW);
        assert!(out.repaired);
        assert!(out.plans.iter().all(|p| p.date() == NOW));
    }

    #[test]
    fn step_values_are_clamped() {
        let entries = vec![
            json!({"type": "pose", "count": 50_000, "duration": 0, "id": 1}),
            json!({"type": "pause", "count": 4, "duration": 100_000, "id": 2}),
        ];
        let mut ids = StepIdAllocator::for_entries(&entries);
        let pose = normalize_custom_step(&entries[0], &mut ids).unwrap();
        assert!(pose.repaired);
        assert_eq!(pose.step.count(), MAX_POSE_COUNT);
        assert_eq!(pose.step.duration(), 1);

        let pause = normalize_custom_step(&entries[1], &mut ids).unwrap();
        assert!(pause.repaired);
        assert_eq!(pause.step.count(), 1);
        assert_eq!(pause.step.duration(), MAX_STEP_DURATION_SECS);
    }

    #[test]
    fn missing_and_duplicate_ids_get_fallbacks() {
        let entries = vec![
            json!({"type": "pose", "count": 1, "duration": 10, "id": 7}),
            json!({"type": "pose", "count": 1, "duration": 10, "id": 7}),
            json!({"type": "pose", "count": 1, "duration": 10, "id": "x"}),
            json!({"type": "pose", "count": 1, "duration": 10}),
        ];
        let mut ids = StepIdAllocator::for_entries(&entries);
        let got: Vec<_> = entries
            .iter()
            .map(|e| normalize_custom_step(e, &mut ids).unwrap())
            .collect();
        assert!(!got[0].repaired);
        assert_eq!(got[0].step.id(), StepId::new(7));
        assert!(got[1..].iter().all(|s| s.repaired));
        let mut unique: Vec<_> = got.iter().map(|s| s.step.id()).collect();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn oversized_ids_do_not_exhaust_the_allocator() {
        let raw = envelope(json!([{
            "name": "Huge ids",
            "date": NOW,
            "steps": [
                {"type": "pose", "count": 1, "duration": 10, "id": u64::MAX},
                {"type": "pose", "count": 1, "duration": 20},
                {"type": "pose", "count": 1, "duration": 30, "id": MAX_STEP_ID},
                {"type": "pose", "count": 1, "duration": 40, "id": MAX_STEP_ID}
            ]
        }]));
        let out = normalize_session_plans_payload(&raw, NOW);
        assert!(out.repaired);
        let steps = out.plans[0].steps();
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|s| s.id().value() <= MAX_STEP_ID));
        let mut unique: Vec<_> = steps.iter().map(|s| s.id()).collect();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn default_names_count_surviving_plans() {
        let step = json!([{"type": "pose", "count": 1, "duration": 10, "id": 1}]);
        let raw = envelope(json!([
            {"name": "Dropped", "date": NOW, "steps": []},
            {"name": "", "date": NOW, "steps": step.clone()},
            {"name": "  ", "date": NOW, "steps": step}
        ]));
        let out = normalize_session_plans_payload(&raw, NOW);
        let names: Vec<_> = out.plans.iter().map(Plan::name).collect();
        assert_eq!(names, ["Plan 1", "Plan 2"]);
    }

    #[test]
    fn unknown_type_becomes_pose() {
        let entry = json!({"type": "sketch", "count": 2, "duration": 20, "id": 1});
        let mut ids = StepIdAllocator::for_entries(std::slice::from_ref(&entry));
        let got = normalize_custom_step(&entry, &mut ids).unwrap();
        assert!(got.repaired);
        assert!(got.step.is_pose());
        assert_eq!(got.step.count(), 2);
    }
}
