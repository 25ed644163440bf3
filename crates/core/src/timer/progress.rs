use crate::model::{Step, StepKind};

/// Pose counters for display during a custom session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoseProgress {
    /// Poses across every pose step.
    pub total_poses: u64,
    /// 1-based position of the current pose, or poses already done during a pause.
    pub global_pose_index: u64,
    /// Number of pose steps.
    pub pose_group_count: usize,
    /// A global counter is only shown when there is more than one group.
    pub show_global: bool,
}

#[must_use]
pub fn custom_pose_session_progress(
    queue: &[Step],
    step_index: usize,
    pose_in_step: u32,
) -> PoseProgress {
    let mut total_poses = 0_u64;
    let mut pose_group_count = 0_usize;
    let mut global_pose_index = 0_u64;

    for (idx, step) in queue.iter().enumerate() {
        let StepKind::Pose { count, .. } = step.kind() else {
            continue;
        };
        total_poses += u64::from(count);
        pose_group_count += 1;
        if idx < step_index {
            global_pose_index += u64::from(count);
        } else if idx == step_index {
            global_pose_index += u64::from(pose_in_step.min(count));
        }
    }

    PoseProgress {
        total_poses,
        global_pose_index,
        pose_group_count,
        show_global: pose_group_count > 1,
    }
}

/// Seconds left in the whole custom session.
///
/// Starts from the live countdown, adds the untouched repetitions of the
/// current pose step, then every later step in full.
#[must_use]
pub fn custom_total_remaining_seconds(
    queue: &[Step],
    step_index: usize,
    pose_in_step: u32,
    time_remaining: i64,
) -> i64 {
    let mut total = time_remaining;

    if let Some(StepKind::Pose { count, duration }) = queue.get(step_index).map(Step::kind) {
        let left = i64::from(count.saturating_sub(pose_in_step));
        total += left * i64::from(duration);
    }

    let later: u64 = queue
        .iter()
        .skip(step_index.saturating_add(1))
        .map(Step::total_seconds)
        .sum();
    total.saturating_add(i64::try_from(later).unwrap_or(i64::MAX))
}

/// Full length of a queue, independent of any cursor.
#[must_use]
pub fn queue_total_seconds(queue: &[Step]) -> u64 {
    queue.iter().map(Step::total_seconds).sum()
}
