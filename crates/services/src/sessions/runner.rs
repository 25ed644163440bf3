use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;
use sketch_core::model::{
    MemoryType, RuntimeState, SessionMode, SessionRecord, StepKind, TimerSettings,
};
use sketch_core::timer::{
    MemoryFlashTransition, SoundCue, TickSoundInput, advance_custom_cursor,
    custom_pose_session_progress, custom_total_remaining_seconds, is_custom_pause_step,
    memory_flash_transition, next_cyclic_index, should_auto_advance_on_timer_end,
    should_end_memory_session, should_play_end_sound, tick_sound_decision,
};
use tracing::{debug, info};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Something the caller should render or play after a tick or skip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// Countdown tick near the end of a pose.
    Tick { volume: f64 },
    /// The countdown reached zero.
    EndSound,
    Cue(SoundCue),
    /// Memory flash: the reference image is hidden for recall.
    ImageHidden,
    /// A new reference image is shown; `image` indexes the caller's image list.
    ImageChanged { image: usize },
    PauseStarted { seconds: u32 },
    Finished,
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

/// Drives one session from start to finish.
///
/// The owner calls [`SessionRunner::tick`] once per second and renders the
/// returned events. Nothing here sleeps or plays audio.
pub struct SessionRunner {
    state: RuntimeState,
    sound_enabled: bool,
    threshold_override: Option<f64>,
    flash_seconds: u32,
    image_order: Vec<usize>,
    image_cursor: usize,
    memory_index: usize,
    poses_completed: u64,
    elapsed_secs: u64,
    paused: bool,
    finished: bool,
    started_at: DateTime<Utc>,
}

impl SessionRunner {
    /// Wrap a resolved start state.
    ///
    /// `started_at` should come from the services layer clock to keep time deterministic.
    #[must_use]
    pub fn new(
        state: RuntimeState,
        settings: &TimerSettings,
        images_len: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut image_order: Vec<usize> = (0..images_len.max(1)).collect();
        if settings.shuffle_images() {
            image_order.as_mut_slice().shuffle(&mut rng());
        }
        debug!(mode = %state.session_mode, images = image_order.len(), "session started");
        Self {
            state,
            sound_enabled: settings.sound_enabled(),
            threshold_override: settings.tick_threshold_override(),
            flash_seconds: settings.memory_flash_duration(),
            image_order,
            image_cursor: 0,
            memory_index: 0,
            poses_completed: 0,
            elapsed_secs: 0,
            paused: false,
            finished: false,
            started_at,
        }
    }

    /// Replace the image order, e.g. for a replay that must show images in sequence.
    ///
    /// An empty order is ignored.
    #[must_use]
    pub fn with_image_order(mut self, order: Vec<usize>) -> Self {
        if !order.is_empty() {
            self.image_order = order;
            self.image_cursor = 0;
        }
        self
    }

    /// Seconds each Memory-Flash image stays visible, overriding the settings value.
    #[must_use]
    pub fn with_flash_seconds(mut self, seconds: u32) -> Self {
        self.flash_seconds = seconds.max(1);
        self
    }

    #[must_use]
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn poses_completed(&self) -> u64 {
        self.poses_completed
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finished
    }

    /// Index into the caller's image list of the image on screen.
    #[must_use]
    pub fn current_image(&self) -> usize {
        self.image_order.get(self.image_cursor).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_image_hidden(&self) -> bool {
        self.state.memory_hidden
    }

    #[must_use]
    pub fn in_pause(&self) -> bool {
        is_custom_pause_step(
            self.state.session_mode,
            &self.state.custom_queue,
            self.state.current_step_index,
        )
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flip the pause flag, returning the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Advance the clock by one second.
    ///
    /// Paused or finished sessions ignore ticks.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.paused || self.finished {
            return events;
        }
        self.elapsed_secs += 1;

        // Relax has no countdown; the artist moves on with `next`.
        if self.state.session_mode == SessionMode::Relax {
            return events;
        }

        self.state.time_remaining -= 1;

        if self.state.is_memory_flash() {
            self.flash_tick(&mut events);
            return events;
        }

        self.push_tick_sound(&mut events);
        if should_play_end_sound(&self.state) && self.sound_enabled {
            events.push(SessionEvent::EndSound);
        }
        if should_auto_advance_on_timer_end(&self.state) {
            self.advance(&mut events);
        }
        events
    }

    /// Skip the rest of the current pose, pause, or memory phase.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session has finished.
    pub fn next(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if self.finished {
            return Err(SessionError::Completed);
        }
        let mut events = Vec::new();
        if self.state.is_memory_flash() {
            self.state.time_remaining = -1;
            self.flash_tick(&mut events);
        } else {
            self.advance(&mut events);
        }
        Ok(events)
    }

    /// Seconds left in the whole session, when the mode has a fixed length.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<i64> {
        if self.finished {
            return Some(0);
        }
        let state = &self.state;
        match state.session_mode {
            SessionMode::Custom => Some(custom_total_remaining_seconds(
                &state.custom_queue,
                state.current_step_index,
                state.current_pose_in_step,
                state.time_remaining,
            )),
            SessionMode::Memory => {
                let images_left = state
                    .memory_poses_count
                    .saturating_sub(self.memory_index + 1);
                let images_left = i64::try_from(images_left).unwrap_or(i64::MAX);
                // A flash phase ends on the tick that takes its countdown below zero.
                let recall = i64::from(self.recall_seconds()) + 1;
                let flash = i64::from(self.flash_seconds) + 1;
                let (current, per_image) = match state.memory_type {
                    MemoryType::Progressive => {
                        (state.time_remaining, i64::from(state.selected_duration))
                    }
                    MemoryType::Flash if state.memory_hidden => {
                        (state.time_remaining + 1, flash + recall)
                    }
                    MemoryType::Flash => (state.time_remaining + 1 + recall, flash + recall),
                };
                Some(current.max(0).saturating_add(images_left.saturating_mul(per_image)))
            }
            SessionMode::Classic | SessionMode::Relax => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let state = &self.state;
        let pose = (state.session_mode == SessionMode::Custom).then(|| {
            custom_pose_session_progress(
                &state.custom_queue,
                state.current_step_index,
                state.current_pose_in_step,
            )
        });
        let memory_position = (state.session_mode == SessionMode::Memory)
            .then(|| (self.memory_index + 1, state.memory_poses_count));
        SessionProgress {
            mode: state.session_mode,
            elapsed_secs: self.elapsed_secs,
            poses_completed: self.poses_completed,
            time_remaining: state.time_remaining,
            remaining_seconds: self.remaining_seconds(),
            pose,
            memory_position,
            is_paused: self.paused,
            is_complete: self.finished,
        }
    }

    /// End the session, finished or not, and produce its history entry.
    #[must_use]
    pub fn finish(self, now: DateTime<Utc>) -> SessionRecord {
        let mode = self.state.session_mode;
        let custom_queue = (mode == SessionMode::Custom).then(|| {
            self.state
                .custom_queue
                .iter()
                .filter_map(|step| serde_json::to_value(step).ok())
                .collect()
        });
        let memory_type =
            (mode == SessionMode::Memory).then(|| self.state.memory_type.as_str().to_string());
        info!(
            %mode,
            poses = self.poses_completed,
            seconds = self.elapsed_secs,
            completed = self.finished,
            "session ended"
        );
        SessionRecord {
            mode: mode.as_str().to_string(),
            poses: i64::try_from(self.poses_completed).unwrap_or(i64::MAX),
            time: i64::try_from(self.elapsed_secs).unwrap_or(i64::MAX),
            custom_queue,
            memory_type,
            date: Some(now.timestamp_millis()),
        }
    }

    fn recall_seconds(&self) -> u32 {
        self.state.selected_duration.max(1)
    }

    fn push_tick_sound(&self, events: &mut Vec<SessionEvent>) {
        let input =
            TickSoundInput::from_state(&self.state, self.sound_enabled, self.threshold_override);
        let decision = tick_sound_decision(&input);
        if decision.play_tick {
            events.push(SessionEvent::Tick {
                volume: decision.volume,
            });
        }
    }

    fn flash_tick(&mut self, events: &mut Vec<SessionEvent>) {
        let recall = self.recall_seconds();
        match memory_flash_transition(&mut self.state, recall) {
            MemoryFlashTransition::EnteredHidden => {
                debug!(image = self.current_image(), "reference hidden");
                events.push(SessionEvent::ImageHidden);
            }
            MemoryFlashTransition::AdvanceFromHidden => self.advance(events),
            MemoryFlashTransition::None => {
                // Only the recall countdown ticks.
                if self.state.memory_hidden {
                    self.push_tick_sound(events);
                }
            }
        }
    }

    fn advance(&mut self, events: &mut Vec<SessionEvent>) {
        match self.state.session_mode {
            SessionMode::Classic => {
                self.poses_completed += 1;
                self.state.time_remaining = i64::from(self.state.selected_duration);
                self.show_next_image(events);
            }
            SessionMode::Relax => {
                self.poses_completed += 1;
                self.show_next_image(events);
            }
            SessionMode::Memory => self.advance_memory(events),
            SessionMode::Custom => self.advance_custom(events),
        }
    }

    fn advance_memory(&mut self, events: &mut Vec<SessionEvent>) {
        self.poses_completed += 1;
        if should_end_memory_session(self.memory_index, self.state.memory_poses_count) {
            self.complete(events);
            return;
        }
        self.memory_index += 1;
        self.state.memory_hidden = false;
        self.state.time_remaining = match self.state.memory_type {
            MemoryType::Flash => i64::from(self.flash_seconds),
            MemoryType::Progressive => i64::from(self.state.selected_duration),
        };
        self.show_next_image(events);
    }

    fn advance_custom(&mut self, events: &mut Vec<SessionEvent>) {
        let state = &mut self.state;
        if state.current_step().is_some_and(|s| s.is_pose()) {
            self.poses_completed += 1;
        }
        let advance = advance_custom_cursor(
            &state.custom_queue,
            state.current_step_index,
            state.current_pose_in_step,
        );
        state.current_step_index = advance.current_step_index;
        state.current_pose_in_step = advance.current_pose_in_step;

        let Some(next) = advance.next_step.filter(|_| !advance.finished) else {
            state.time_remaining = 0;
            self.complete(events);
            return;
        };
        state.time_remaining = i64::from(next.duration());

        if let Some(cue) = advance.sound_cue {
            debug!(step = advance.current_step_index, ?cue, "entered step");
            if self.sound_enabled {
                events.push(SessionEvent::Cue(cue));
            }
        }
        match next.kind() {
            StepKind::Pause { duration } => {
                events.push(SessionEvent::PauseStarted { seconds: duration });
            }
            StepKind::Pose { .. } => self.show_next_image(events),
        }
    }

    fn show_next_image(&mut self, events: &mut Vec<SessionEvent>) {
        self.image_cursor = next_cyclic_index(self.image_cursor, self.image_order.len());
        events.push(SessionEvent::ImageChanged {
            image: self.current_image(),
        });
    }

    fn complete(&mut self, events: &mut Vec<SessionEvent>) {
        self.finished = true;
        events.push(SessionEvent::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch_core::model::{SessionConfig, Step, StepId, TimerSettingsDraft};
    use sketch_core::time::fixed_now;
    use sketch_core::timer::resolve_session_start_state;

    fn settings(config: &SessionConfig) -> TimerSettings {
        TimerSettingsDraft {
            shuffle_images: Some(false),
            memory_flash_duration: config.memory_flash_duration,
            ..TimerSettingsDraft::default()
        }
        .validate()
        .unwrap()
    }

    fn runner(config: &SessionConfig) -> SessionRunner {
        let state = resolve_session_start_state(config).unwrap();
        SessionRunner::new(state, &settings(config), config.images_len, fixed_now())
    }

    fn custom_config() -> SessionConfig {
        SessionConfig {
            session_mode: SessionMode::Custom,
            custom_queue: vec![
                Step::pose(StepId::new(1), 2, 2).unwrap(),
                Step::pause(StepId::new(2), 1).unwrap(),
                Step::pose(StepId::new(3), 1, 1).unwrap(),
            ],
            images_len: 3,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn classic_advances_when_countdown_ends() {
        let mut r = runner(&SessionConfig {
            selected_duration: 3,
            images_len: 2,
            ..SessionConfig::default()
        });
        assert!(r.tick().is_empty());
        assert!(r.tick().is_empty());
        assert_eq!(
            r.tick(),
            vec![SessionEvent::EndSound, SessionEvent::ImageChanged { image: 1 }]
        );
        assert_eq!(r.state().time_remaining, 3);
        assert_eq!(r.poses_completed(), 1);
        assert_eq!(r.remaining_seconds(), None);
    }

    #[test]
    fn classic_ticks_ramp_near_the_end() {
        let mut r = runner(&SessionConfig::default());
        for _ in 0..54 {
            r.tick();
        }
        let events = r.tick();
        assert_eq!(r.state().time_remaining, 5);
        let [SessionEvent::Tick { volume }] = events.as_slice() else {
            panic!("expected one tick, got {events:?}");
        };
        assert!((volume - 7.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn custom_session_walks_the_queue() {
        let mut r = runner(&custom_config());
        assert_eq!(r.remaining_seconds(), Some(6));

        assert!(r.tick().is_empty());
        assert_eq!(
            r.tick(),
            vec![SessionEvent::EndSound, SessionEvent::ImageChanged { image: 1 }]
        );
        assert_eq!(r.progress().pose.unwrap().global_pose_index, 2);
        assert!(r.tick().is_empty());
        assert_eq!(
            r.tick(),
            vec![
                SessionEvent::EndSound,
                SessionEvent::Cue(SoundCue::Pause),
                SessionEvent::PauseStarted { seconds: 1 },
            ]
        );
        assert!(r.in_pause());
        assert_eq!(
            r.tick(),
            vec![
                SessionEvent::EndSound,
                SessionEvent::Cue(SoundCue::Group),
                SessionEvent::ImageChanged { image: 2 },
            ]
        );
        assert_eq!(
            r.tick(),
            vec![SessionEvent::EndSound, SessionEvent::Finished]
        );

        assert!(r.is_complete());
        assert_eq!(r.remaining_seconds(), Some(0));
        assert!(r.tick().is_empty());
        assert!(matches!(r.next(), Err(SessionError::Completed)));

        let record = r.finish(fixed_now());
        assert_eq!(record.mode, "custom");
        assert_eq!(record.poses, 3);
        assert_eq!(record.time, 6);
        assert_eq!(record.custom_queue.map(|q| q.len()), Some(3));
        assert_eq!(record.date, Some(fixed_now().timestamp_millis()));
    }

    #[test]
    fn skipping_a_pause_does_not_count_a_pose() {
        let mut r = runner(&custom_config());
        r.next().unwrap();
        r.next().unwrap();
        assert!(r.in_pause());
        assert_eq!(r.poses_completed(), 2);
        r.next().unwrap();
        assert_eq!(r.poses_completed(), 2);
        assert_eq!(r.state().current_step_index, 2);
    }

    #[test]
    fn memory_flash_hides_then_moves_on() {
        let mut r = runner(&SessionConfig {
            session_mode: SessionMode::Memory,
            memory_type: MemoryType::Flash,
            selected_duration: 10,
            memory_flash_duration: Some(2),
            memory_poses_count: 2,
            images_len: 3,
            ..SessionConfig::default()
        });

        assert_eq!(r.remaining_seconds(), Some(28));

        let mut all = Vec::new();
        let mut ticks = 0;
        while !r.is_complete() && ticks < 100 {
            all.extend(r.tick());
            ticks += 1;
            if !r.is_complete() {
                assert_eq!(r.remaining_seconds(), Some(28 - ticks));
            }
        }

        assert_eq!(ticks, 28);
        assert_eq!(r.remaining_seconds(), Some(0));
        let hidden = all.iter().filter(|e| **e == SessionEvent::ImageHidden).count();
        assert_eq!(hidden, 2);
        assert!(all.contains(&SessionEvent::ImageChanged { image: 1 }));
        assert!(!all.contains(&SessionEvent::EndSound));
        assert_eq!(all.last(), Some(&SessionEvent::Finished));
        assert_eq!(r.poses_completed(), 2);
    }

    #[test]
    fn memory_flash_skip_hides_before_advancing() {
        let mut r = runner(&SessionConfig {
            session_mode: SessionMode::Memory,
            memory_poses_count: 3,
            images_len: 5,
            ..SessionConfig::default()
        });
        assert_eq!(r.next().unwrap(), vec![SessionEvent::ImageHidden]);
        assert!(r.is_image_hidden());
        assert_eq!(r.state().time_remaining, 60);
        assert_eq!(
            r.next().unwrap(),
            vec![SessionEvent::ImageChanged { image: 1 }]
        );
        assert!(!r.is_image_hidden());
        assert_eq!(r.state().time_remaining, 10);
        assert_eq!(r.progress().memory_position, Some((2, 3)));
    }

    #[test]
    fn memory_progressive_ends_after_last_image() {
        let mut r = runner(&SessionConfig {
            session_mode: SessionMode::Memory,
            memory_type: MemoryType::Progressive,
            selected_duration: 1,
            memory_poses_count: 2,
            images_len: 2,
            ..SessionConfig::default()
        });
        assert_eq!(r.remaining_seconds(), Some(2));
        assert_eq!(
            r.tick(),
            vec![SessionEvent::EndSound, SessionEvent::ImageChanged { image: 1 }]
        );
        assert_eq!(r.tick(), vec![SessionEvent::EndSound, SessionEvent::Finished]);
        assert_eq!(r.finish(fixed_now()).memory_type.as_deref(), Some("progressive"));
    }

    #[test]
    fn relax_only_moves_on_request() {
        let mut r = runner(&SessionConfig {
            session_mode: SessionMode::Relax,
            images_len: 2,
            ..SessionConfig::default()
        });
        for _ in 0..10 {
            assert!(r.tick().is_empty());
        }
        assert_eq!(r.elapsed_secs(), 10);
        assert_eq!(
            r.next().unwrap(),
            vec![SessionEvent::ImageChanged { image: 1 }]
        );
        assert_eq!(
            r.next().unwrap(),
            vec![SessionEvent::ImageChanged { image: 0 }]
        );
        assert_eq!(r.poses_completed(), 2);
    }

    #[test]
    fn paused_sessions_ignore_ticks() {
        let mut r = runner(&SessionConfig::default());
        assert!(r.toggle_pause());
        r.tick();
        assert_eq!(r.elapsed_secs(), 0);
        assert_eq!(r.state().time_remaining, 60);
        r.set_paused(false);
        r.tick();
        assert_eq!(r.elapsed_secs(), 1);
    }

    #[test]
    fn muted_sessions_emit_no_audio() {
        let muted = TimerSettingsDraft {
            sound_enabled: Some(false),
            shuffle_images: Some(false),
            ..TimerSettingsDraft::default()
        }
        .validate()
        .unwrap();
        let config = custom_config();
        let state = resolve_session_start_state(&config).unwrap();
        let mut r = SessionRunner::new(state, &muted, 3, fixed_now());
        let mut all = Vec::new();
        while !r.is_complete() {
            all.extend(r.tick());
        }
        assert!(all.iter().all(|e| matches!(
            e,
            SessionEvent::ImageChanged { .. }
                | SessionEvent::PauseStarted { .. }
                | SessionEvent::Finished
        )));
    }

    #[test]
    fn custom_image_order_is_respected() {
        let r = runner(&SessionConfig {
            images_len: 3,
            ..SessionConfig::default()
        })
        .with_image_order(vec![2, 0, 1]);
        assert_eq!(r.current_image(), 2);
    }
}
