use thiserror::Error;

use crate::model::{PlanError, StepError, TimerSettingsError};
use crate::timer::StartError;

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Settings(#[from] TimerSettingsError),
    #[error(transparent)]
    Start(#[from] StartError),
}
