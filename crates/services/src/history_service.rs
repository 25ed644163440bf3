use std::sync::Arc;

use serde_json::Value;
use sketch_core::model::SessionRecord;
use sketch_core::replay::{ReplayOptions, build_replay_options_from_session};
use storage::repository::{KeyValueStore, keys};
use tracing::warn;

use crate::error::HistoryError;

/// Oldest records are dropped beyond this many entries.
pub const MAX_HISTORY_RECORDS: usize = 500;

/// Lifetime totals across the stored history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub sessions: usize,
    pub poses: i64,
    pub seconds: i64,
}

/// Appends finished sessions and rebuilds them for replay.
#[derive(Clone)]
pub struct HistoryService {
    kv: Arc<dyn KeyValueStore>,
}

impl HistoryService {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Append a finished session.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the history cannot be read or written.
    pub async fn record(&self, record: &SessionRecord) -> Result<(), HistoryError> {
        let mut entries = self.raw_entries().await?;
        entries.push(serde_json::to_value(record)?);
        if entries.len() > MAX_HISTORY_RECORDS {
            let excess = entries.len() - MAX_HISTORY_RECORDS;
            entries.drain(..excess);
        }
        self.kv
            .set(keys::SESSION_HISTORY, &Value::Array(entries))
            .await?;
        Ok(())
    }

    /// Every readable record, oldest first. Unreadable entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<SessionRecord>, HistoryError> {
        let entries = self.raw_entries().await?;
        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<SessionRecord>(entry) {
                Ok(record) => records.push(record),
                Err(err) => warn!(index, %err, "skipping unreadable history entry"),
            }
        }
        Ok(records)
    }

    /// Replay configuration for the record at `index` in `list()` order.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::NotFound` if there is no such record.
    pub async fn replay_options(&self, index: usize) -> Result<ReplayOptions, HistoryError> {
        let records = self.list().await?;
        let record = records
            .get(index)
            .ok_or(HistoryError::NotFound { index })?;
        Ok(build_replay_options_from_session(record))
    }

    /// Totals across every readable record.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the store cannot be read.
    pub async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        let records = self.list().await?;
        Ok(records.iter().fold(HistoryStats::default(), |acc, r| HistoryStats {
            sessions: acc.sessions + 1,
            poses: acc.poses.saturating_add(r.poses.max(0)),
            seconds: acc.seconds.saturating_add(r.time.max(0)),
        }))
    }

    async fn raw_entries(&self) -> Result<Vec<Value>, HistoryError> {
        match self.kv.get(keys::SESSION_HISTORY).await? {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => {
                warn!(kind = value_kind(&other), "history is not an array; starting over");
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
