use std::sync::Arc;

use sketch_core::model::{TimerSettings, TimerSettingsDraft};
use storage::repository::{KeyValueStore, keys};
use tracing::{debug, warn};

use crate::error::SettingsError;

/// Reads and writes timer preferences.
#[derive(Clone)]
pub struct SettingsService {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsService {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Current settings. Missing or unreadable settings yield the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Storage` if the store cannot be read.
    pub async fn load(&self) -> Result<TimerSettings, SettingsError> {
        let Some(raw) = self.kv.get(keys::TIMER_SETTINGS).await? else {
            return Ok(TimerSettings::default());
        };
        let settings = serde_json::from_value::<TimerSettingsDraft>(raw)
            .map_err(SettingsError::from)
            .and_then(|draft| draft.validate().map_err(SettingsError::from));
        match settings {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(%err, "stored timer settings are invalid; using defaults");
                Ok(TimerSettings::default())
            }
        }
    }

    /// Persist already-validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Storage` if the store cannot be written.
    pub async fn save(&self, settings: &TimerSettings) -> Result<(), SettingsError> {
        let doc = serde_json::to_value(settings)?;
        self.kv.set(keys::TIMER_SETTINGS, &doc).await?;
        debug!(?settings, "saved timer settings");
        Ok(())
    }

    /// Apply a partial edit on top of the current settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` if the merged settings fail validation.
    pub async fn update(&self, edit: TimerSettingsDraft) -> Result<TimerSettings, SettingsError> {
        let current = self.load().await?.to_draft();
        let merged = TimerSettingsDraft {
            sound_enabled: edit.sound_enabled.or(current.sound_enabled),
            tick_threshold_override: edit
                .tick_threshold_override
                .or(current.tick_threshold_override),
            default_duration: edit.default_duration.or(current.default_duration),
            memory_flash_duration: edit
                .memory_flash_duration
                .or(current.memory_flash_duration),
            shuffle_images: edit.shuffle_images.or(current.shuffle_images),
        }
        .validate()?;
        self.save(&merged).await?;
        Ok(merged)
    }

    /// Drop stored settings so the defaults apply again.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Storage` if the store cannot be written.
    pub async fn reset(&self) -> Result<TimerSettings, SettingsError> {
        self.kv.remove(keys::TIMER_SETTINGS).await?;
        Ok(TimerSettings::default())
    }
}
