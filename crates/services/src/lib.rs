#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod history_service;
pub mod plan_service;
pub mod sessions;
pub mod settings_service;

pub use sketch_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, HistoryError, PlanServiceError, SessionError, SettingsError,
};
pub use history_service::{HistoryService, HistoryStats, MAX_HISTORY_RECORDS};
pub use plan_service::{PlanService, PlanSummary};
pub use settings_service::SettingsService;

pub use sessions::{ImageSet, SessionEvent, SessionLoopService, SessionProgress, SessionRunner};
