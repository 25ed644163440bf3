use crate::model::{RuntimeState, SessionMode, Step};

/// Upper bound of the automatic tick threshold, in seconds.
const MAX_AUTO_THRESHOLD_SECS: f64 = 15.0;

/// Fraction of the pose duration during which ticks are played.
const AUTO_THRESHOLD_RATIO: f64 = 0.2;

/// Inputs to the per-tick audio decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSoundInput {
    pub sound_enabled: bool,
    pub time_remaining: i64,
    /// Duration the threshold is derived from.
    pub selected_duration: u32,
    /// Replaces `min(selected_duration * 0.2, 15)` when set.
    pub threshold_override: Option<f64>,
    /// Ticks are suppressed while a custom pause runs.
    pub in_custom_pause: bool,
}

impl TickSoundInput {
    /// Builds the input for the current state.
    ///
    /// In Custom mode the threshold is derived from the running step's duration
    /// rather than the session-wide base duration.
    #[must_use]
    pub fn from_state(
        state: &RuntimeState,
        sound_enabled: bool,
        threshold_override: Option<f64>,
    ) -> Self {
        let selected_duration = state
            .current_step()
            .map_or(state.selected_duration, Step::duration);
        Self {
            sound_enabled,
            time_remaining: state.time_remaining,
            selected_duration,
            threshold_override,
            in_custom_pause: is_custom_pause_step(
                state.session_mode,
                &state.custom_queue,
                state.current_step_index,
            ),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold_override.unwrap_or_else(|| {
            (f64::from(self.selected_duration) * AUTO_THRESHOLD_RATIO).min(MAX_AUTO_THRESHOLD_SECS)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickSoundDecision {
    pub play_tick: bool,
    /// Linear ramp in `[0, 1)` towards the end of the countdown.
    pub volume: f64,
}

#[must_use]
pub fn tick_sound_decision(input: &TickSoundInput) -> TickSoundDecision {
    if !input.sound_enabled || input.in_custom_pause {
        return TickSoundDecision::default();
    }
    let threshold = input.threshold();
    if !threshold.is_finite() || threshold <= 0.0 {
        return TickSoundDecision::default();
    }
    // Countdown values stay far below 2^53, so the conversion is exact.
    #[allow(clippy::cast_precision_loss)]
    let remaining = input.time_remaining as f64;
    if remaining > 0.0 && remaining <= threshold {
        TickSoundDecision {
            play_tick: true,
            volume: (threshold - remaining) / threshold,
        }
    } else {
        TickSoundDecision::default()
    }
}

#[must_use]
pub fn should_play_end_sound(state: &RuntimeState) -> bool {
    state.time_remaining == 0 && !state.is_memory_flash()
}

#[must_use]
pub fn should_auto_advance_on_timer_end(state: &RuntimeState) -> bool {
    state.time_remaining <= 0 && !state.is_memory_flash()
}

/// True exactly once per image: the display countdown went negative and the
/// image is still visible.
#[must_use]
pub fn should_enter_memory_hidden_phase(state: &RuntimeState) -> bool {
    state.is_memory_flash() && state.time_remaining < 0 && !state.memory_hidden
}

/// True when the recall countdown itself went negative.
#[must_use]
pub fn should_advance_from_memory_hidden_phase(state: &RuntimeState) -> bool {
    state.is_memory_flash() && state.time_remaining < 0 && state.memory_hidden
}

#[must_use]
pub fn is_custom_pause_step(mode: SessionMode, queue: &[Step], step_index: usize) -> bool {
    mode == SessionMode::Custom && queue.get(step_index).is_some_and(Step::is_pause)
}

/// What a memory-flash tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFlashTransition {
    None,
    /// Image hidden; the recall countdown started.
    EnteredHidden,
    /// Recall elapsed; the caller must move to the next image and restart the display countdown.
    AdvanceFromHidden,
}

/// Applies the memory-flash phase protocol, consuming a negative countdown once.
///
/// Entering the hidden phase resets `time_remaining` to `recall_seconds`
/// immediately, so re-evaluating the same state cannot fire twice.
pub fn memory_flash_transition(state: &mut RuntimeState, recall_seconds: u32) -> MemoryFlashTransition {
    if should_enter_memory_hidden_phase(state) {
        state.memory_hidden = true;
        state.time_remaining = i64::from(recall_seconds.max(1));
        MemoryFlashTransition::EnteredHidden
    } else if should_advance_from_memory_hidden_phase(state) {
        state.memory_hidden = false;
        MemoryFlashTransition::AdvanceFromHidden
    } else {
        MemoryFlashTransition::None
    }
}
