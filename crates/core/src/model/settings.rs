use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::session::{DEFAULT_MEMORY_FLASH_SECONDS, DEFAULT_SELECTED_DURATION_SECS};
use crate::model::step::MAX_STEP_DURATION_SECS;

/// User preferences that shape how sessions run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    sound_enabled: bool,
    tick_threshold_override: Option<f64>,
    default_duration: u32,
    memory_flash_duration: u32,
    shuffle_images: bool,
}

/// Unvalidated settings as read from storage or the command line.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettingsDraft {
    pub sound_enabled: Option<bool>,
    pub tick_threshold_override: Option<f64>,
    pub default_duration: Option<u32>,
    pub memory_flash_duration: Option<u32>,
    pub shuffle_images: Option<bool>,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TimerSettingsError {
    #[error("tick threshold must be a positive number of seconds, got {0}")]
    InvalidThreshold(f64),

    #[error("default duration must be between 1 and {MAX_STEP_DURATION_SECS} seconds")]
    InvalidDefaultDuration,

    #[error("memory flash duration must be between 1 and {MAX_STEP_DURATION_SECS} seconds")]
    InvalidFlashDuration,
}

impl TimerSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns `TimerSettingsError` when a provided value is out of range.
    pub fn validate(self) -> Result<TimerSettings, TimerSettingsError> {
        if let Some(threshold) = self.tick_threshold_override {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(TimerSettingsError::InvalidThreshold(threshold));
            }
        }
        let default_duration = self
            .default_duration
            .unwrap_or(DEFAULT_SELECTED_DURATION_SECS);
        if !(1..=MAX_STEP_DURATION_SECS).contains(&default_duration) {
            return Err(TimerSettingsError::InvalidDefaultDuration);
        }
        let memory_flash_duration = self
            .memory_flash_duration
            .unwrap_or(DEFAULT_MEMORY_FLASH_SECONDS);
        if !(1..=MAX_STEP_DURATION_SECS).contains(&memory_flash_duration) {
            return Err(TimerSettingsError::InvalidFlashDuration);
        }

        Ok(TimerSettings {
            sound_enabled: self.sound_enabled.unwrap_or(true),
            tick_threshold_override: self.tick_threshold_override,
            default_duration,
            memory_flash_duration,
            shuffle_images: self.shuffle_images.unwrap_or(true),
        })
    }
}

impl TimerSettings {
    #[must_use]
    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    #[must_use]
    pub fn tick_threshold_override(&self) -> Option<f64> {
        self.tick_threshold_override
    }

    #[must_use]
    pub fn default_duration(&self) -> u32 {
        self.default_duration
    }

    #[must_use]
    pub fn memory_flash_duration(&self) -> u32 {
        self.memory_flash_duration
    }

    #[must_use]
    pub fn shuffle_images(&self) -> bool {
        self.shuffle_images
    }

    /// Draft seeded from these settings, for partial edits.
    #[must_use]
    pub fn to_draft(&self) -> TimerSettingsDraft {
        TimerSettingsDraft {
            sound_enabled: Some(self.sound_enabled),
            tick_threshold_override: self.tick_threshold_override,
            default_duration: Some(self.default_duration),
            memory_flash_duration: Some(self.memory_flash_duration),
            shuffle_images: Some(self.shuffle_images),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            tick_threshold_override: None,
            default_duration: DEFAULT_SELECTED_DURATION_SECS,
            memory_flash_duration: DEFAULT_MEMORY_FLASH_SECONDS,
            shuffle_images: true,
        }
    }
}
