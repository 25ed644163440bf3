use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::error::AppServicesError;
use crate::history_service::HistoryService;
use crate::plan_service::PlanService;
use crate::sessions::SessionLoopService;
use crate::settings_service::SettingsService;

/// Assembles app-facing services over one store.
#[derive(Clone)]
pub struct AppServices {
    plans: Arc<PlanService>,
    history: Arc<HistoryService>,
    settings: Arc<SettingsService>,
    session_loop: Arc<SessionLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        info!(db_url, "storage ready");
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a throwaway in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let plans = PlanService::new(clock, Arc::clone(&storage.kv));
        let history = HistoryService::new(Arc::clone(&storage.kv));
        let settings = SettingsService::new(Arc::clone(&storage.kv));
        let session_loop = SessionLoopService::new(
            clock,
            plans.clone(),
            history.clone(),
            settings.clone(),
        );
        Self {
            plans: Arc::new(plans),
            history: Arc::new(history),
            settings: Arc::new(settings),
            session_loop: Arc::new(session_loop),
        }
    }

    #[must_use]
    pub fn plans(&self) -> Arc<PlanService> {
        Arc::clone(&self.plans)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }
}
