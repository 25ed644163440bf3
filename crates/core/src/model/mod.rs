mod ids;
mod plan;
mod session;
mod settings;
mod step;

pub use ids::{ParseIdError, StepId};
pub use plan::{MAX_PLAN_NAME_CHARS, PLANS_SCHEMA_VERSION, Plan, PlanError, PlansPayload};
pub use session::{
    DEFAULT_MEMORY_FLASH_SECONDS, DEFAULT_SELECTED_DURATION_SECS, MemoryType, ParseModeError,
    RuntimeState, SessionConfig, SessionMode, SessionRecord,
};
pub use settings::{TimerSettings, TimerSettingsDraft, TimerSettingsError};
pub use step::{
    MAX_POSE_COUNT, MAX_STEP_DURATION_SECS, Step, StepError, StepKind, StepRecord, StepType,
};
