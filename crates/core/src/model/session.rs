use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::step::Step;

/// Fallback per-pose duration when nothing else is configured.
pub const DEFAULT_SELECTED_DURATION_SECS: u32 = 60;

/// How long a memory-flash image is shown before it is hidden.
pub const DEFAULT_MEMORY_FLASH_SECONDS: u32 = 10;

//
// ─── MODES ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Every image gets the same duration.
    #[default]
    #[serde(alias = "classique")]
    Classic,
    /// Images follow a queue of pose and pause steps.
    #[serde(alias = "personnalise", alias = "personnalisé")]
    Custom,
    /// No countdown; the user advances manually.
    Relax,
    /// Memorisation drills.
    #[serde(alias = "memoire", alias = "mémoire")]
    Memory,
}

impl SessionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Classic => "classic",
            SessionMode::Custom => "custom",
            SessionMode::Relax => "relax",
            SessionMode::Memory => "memory",
        }
    }

    /// Parses a mode string from history records; unknown values fall back to Classic.
    #[must_use]
    pub fn from_history(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown session mode: {}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for SessionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" | "classique" => Ok(Self::Classic),
            "custom" | "personnalise" | "personnalisé" => Ok(Self::Custom),
            "relax" => Ok(Self::Relax),
            "memory" | "memoire" | "mémoire" => Ok(Self::Memory),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Show briefly, hide, then recall from memory.
    #[default]
    Flash,
    /// Count down openly like a classic pose.
    Progressive,
}

impl MemoryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryType::Flash => "flash",
            MemoryType::Progressive => "progressive",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flash" => Ok(Self::Flash),
            "progressive" => Ok(Self::Progressive),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Everything needed to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub session_mode: SessionMode,
    /// Base duration for Classic and Memory-progressive. Default 60.
    pub selected_duration: u32,
    /// Only read in Custom mode.
    pub custom_queue: Vec<Step>,
    /// Default Flash.
    pub memory_type: MemoryType,
    /// Number of images available. Default 1.
    pub images_len: usize,
    /// Images covered by a memory drill; clamped into `[1, images_len]`.
    pub memory_poses_count: usize,
    /// Overrides `DEFAULT_MEMORY_FLASH_SECONDS`.
    pub memory_flash_duration: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_mode: SessionMode::Classic,
            selected_duration: DEFAULT_SELECTED_DURATION_SECS,
            custom_queue: Vec::new(),
            memory_type: MemoryType::Flash,
            images_len: 1,
            memory_poses_count: 1,
            memory_flash_duration: None,
        }
    }
}

//
// ─── RUNTIME STATE ─────────────────────────────────────────────────────────────
//

/// Mutable state of the one active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    pub session_mode: SessionMode,
    pub selected_duration: u32,
    pub custom_queue: Vec<Step>,
    pub memory_type: MemoryType,
    pub memory_poses_count: usize,
    pub current_step_index: usize,
    pub current_pose_in_step: u32,
    /// Seconds left on the current countdown. Negative values drive the
    /// memory-flash phase transitions.
    pub time_remaining: i64,
    pub memory_hidden: bool,
}

impl RuntimeState {
    #[must_use]
    pub fn is_memory_flash(&self) -> bool {
        self.session_mode == SessionMode::Memory && self.memory_type == MemoryType::Flash
    }

    /// Step under the custom cursor, if any.
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        if self.session_mode == SessionMode::Custom {
            self.custom_queue.get(self.current_step_index)
        } else {
            None
        }
    }
}

//
// ─── HISTORY ───────────────────────────────────────────────────────────────────
//

/// One finished session as kept in history.
///
/// Only aggregates are stored; the queue and memory type are kept raw because
/// older entries may not match the current step shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub mode: String,
    #[serde(default)]
    pub poses: i64,
    /// Seconds spent.
    #[serde(default)]
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_queue: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    /// Epoch milliseconds at which the session ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_parses_legacy_aliases() {
        assert_eq!(SessionMode::from_history("classique"), SessionMode::Classic);
        assert_eq!(SessionMode::from_history("Personnalisé"), SessionMode::Custom);
        assert_eq!(SessionMode::from_history("memoire"), SessionMode::Memory);
        assert_eq!(SessionMode::from_history("relax"), SessionMode::Relax);
    }

    #[test]
    fn unknown_mode_falls_back_to_classic() {
        assert_eq!(SessionMode::from_history("zen"), SessionMode::Classic);
        assert!("zen".parse::<SessionMode>().is_err());
    }

    #[test]
    fn memory_flash_detection() {
        let state = RuntimeState {
            session_mode: SessionMode::Memory,
            selected_duration: 60,
            custom_queue: Vec::new(),
            memory_type: MemoryType::Flash,
            memory_poses_count: 1,
            current_step_index: 0,
            current_pose_in_step: 1,
            time_remaining: 10,
            memory_hidden: false,
        };
        assert!(state.is_memory_flash());
        assert!(state.current_step().is_none());
    }

    #[test]
    fn record_reads_minimal_history_entry() {
        let record: SessionRecord =
            serde_json::from_value(json!({"mode": "classique", "poses": 4, "time": 240})).unwrap();
        assert_eq!(record.poses, 4);
        assert!(record.custom_queue.is_none());
        assert!(record.date.is_none());
    }
}
