//! Tick-driven session timer.
//!
//! Every function here is a pure transform of explicit inputs. The caller owns
//! the 1 Hz driver and decides when to call what:
//! resolve once, then tick, and advance the cursor whenever a step boundary is crossed.

mod cursor;
mod memory;
mod progress;
mod resolver;
mod tick;

pub use cursor::{CursorAdvance, SoundCue, advance_custom_cursor};
pub use memory::{next_cyclic_index, should_end_memory_session};
pub use progress::{
    PoseProgress, custom_pose_session_progress, custom_total_remaining_seconds,
    queue_total_seconds,
};
pub use resolver::{StartError, resolve_session_start_state};
pub use tick::{
    MemoryFlashTransition, TickSoundDecision, TickSoundInput, is_custom_pause_step,
    memory_flash_transition, should_advance_from_memory_hidden_phase,
    should_auto_advance_on_timer_end, should_enter_memory_hidden_phase, should_play_end_sound,
    tick_sound_decision,
};
