//! Shared error types for the services crate.

use thiserror::Error;

use sketch_core::model::{PlanError, StepError, TimerSettingsError};
use sketch_core::timer::StartError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `PlanService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanServiceError {
    #[error("no plan named {name:?}")]
    NotFound { name: String },
    #[error(transparent)]
    Model(#[from] sketch_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<PlanError> for PlanServiceError {
    fn from(err: PlanError) -> Self {
        Self::Model(err.into())
    }
}

impl From<StepError> for PlanServiceError {
    fn from(err: StepError) -> Self {
        Self::Model(err.into())
    }
}

/// Errors emitted by `HistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("no history entry at index {index}")]
    NotFound { index: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error(transparent)]
    Invalid(#[from] TimerSettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session cannot start: {0}")]
    Start(#[from] StartError),
    #[error("session already completed")]
    Completed,
    #[error(transparent)]
    Plan(#[from] PlanServiceError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
