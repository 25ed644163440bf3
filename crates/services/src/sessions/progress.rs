use sketch_core::model::SessionMode;
use sketch_core::timer::PoseProgress;

/// Aggregated view of a running session, useful for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub mode: SessionMode,
    pub elapsed_secs: u64,
    pub poses_completed: u64,
    /// Live countdown of the current pose, pause, or memory phase.
    pub time_remaining: i64,
    /// Seconds left in the whole session; `None` for open-ended modes.
    pub remaining_seconds: Option<i64>,
    /// Custom sessions only.
    pub pose: Option<PoseProgress>,
    /// Memory sessions only: 1-based image position and the image count.
    pub memory_position: Option<(usize, usize)>,
    pub is_paused: bool,
    pub is_complete: bool,
}
