use sketch_core::model::{SessionConfig, SessionRecord, TimerSettings};
use sketch_core::replay::ReplayOptions;
use sketch_core::timer::resolve_session_start_state;
use tracing::{debug, info};

use super::runner::SessionRunner;
use crate::Clock;
use crate::error::SessionError;
use crate::history_service::HistoryService;
use crate::plan_service::PlanService;
use crate::settings_service::SettingsService;

/// Image counts supplied by whoever owns the reference images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSet {
    pub images_len: usize,
    /// Images to memorise in a Memory session; clamped to `images_len`.
    pub memory_poses_count: usize,
}

impl ImageSet {
    #[must_use]
    pub fn new(images_len: usize) -> Self {
        Self {
            images_len,
            memory_poses_count: images_len,
        }
    }

    #[must_use]
    pub fn with_memory_poses(mut self, count: usize) -> Self {
        self.memory_poses_count = count;
        self
    }
}

/// Orchestrates session start and records finished sessions.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    plans: PlanService,
    history: HistoryService,
    settings: SettingsService,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        plans: PlanService,
        history: HistoryService,
        settings: SettingsService,
    ) -> Self {
        Self {
            clock,
            plans,
            history,
            settings,
        }
    }

    /// Start a session from an explicit configuration.
    ///
    /// A missing memory flash duration is taken from the stored settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Start` if the configuration cannot run, or a settings error.
    pub async fn start(&self, mut config: SessionConfig) -> Result<SessionRunner, SessionError> {
        let settings = self.settings.load().await?;
        config
            .memory_flash_duration
            .get_or_insert(settings.memory_flash_duration());
        self.start_with(&config, &settings)
    }

    /// Start a custom session from a saved plan.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Plan` if the plan is missing, or a start error.
    pub async fn start_from_plan(
        &self,
        name: &str,
        images: ImageSet,
    ) -> Result<SessionRunner, SessionError> {
        let options = self.plans.load_options(name).await?;
        debug!(plan = name, "starting plan");
        self.start_options(&options, images).await
    }

    /// Start a session shaped like the history entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::History` if there is no such entry, or a start error.
    pub async fn start_replay(
        &self,
        index: usize,
        images: ImageSet,
    ) -> Result<SessionRunner, SessionError> {
        let options = self.history.replay_options(index).await?;
        debug!(index, mode = %options.mode, "replaying session");
        self.start_options(&options, images).await
    }

    /// Start from replay or plan options, filling gaps from the stored settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Start` for a custom session without steps.
    pub async fn start_options(
        &self,
        options: &ReplayOptions,
        images: ImageSet,
    ) -> Result<SessionRunner, SessionError> {
        let settings = self.settings.load().await?;
        let config = config_from_options(options, images, &settings);
        self.start_with(&config, &settings)
    }

    /// End the session and append it to history.
    ///
    /// Sessions that never ran are not recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::History` if the record cannot be stored.
    pub async fn complete(&self, runner: SessionRunner) -> Result<SessionRecord, SessionError> {
        let ran = runner.elapsed_secs() > 0 || runner.poses_completed() > 0;
        let record = runner.finish(self.clock.now());
        if ran {
            self.history.record(&record).await?;
        } else {
            debug!(mode = %record.mode, "session never ran; not recorded");
        }
        Ok(record)
    }

    fn start_with(
        &self,
        config: &SessionConfig,
        settings: &TimerSettings,
    ) -> Result<SessionRunner, SessionError> {
        let state = resolve_session_start_state(config)?;
        let flash_seconds = config
            .memory_flash_duration
            .unwrap_or(settings.memory_flash_duration());
        info!(
            mode = %config.session_mode,
            duration = config.selected_duration,
            steps = config.custom_queue.len(),
            "session starting"
        );
        Ok(SessionRunner::new(
            state,
            settings,
            config.images_len,
            self.clock.now(),
        )
        .with_flash_seconds(flash_seconds))
    }
}

fn config_from_options(
    options: &ReplayOptions,
    images: ImageSet,
    settings: &TimerSettings,
) -> SessionConfig {
    SessionConfig {
        session_mode: options.mode,
        selected_duration: options.duration.unwrap_or(settings.default_duration()),
        custom_queue: options.custom_queue.clone().unwrap_or_default(),
        memory_type: options.memory_type.unwrap_or_default(),
        images_len: images.images_len,
        memory_poses_count: images.memory_poses_count,
        memory_flash_duration: Some(settings.memory_flash_duration()),
    }
}
