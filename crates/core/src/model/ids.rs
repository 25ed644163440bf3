use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a step inside a plan's queue.
///
/// Only unique within one plan; the UI uses it to keep reordering stable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(u64);

impl StepId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Next id in sequence, used when a step needs a fresh fallback id.
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepId({})", self.0)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse StepId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for StepId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(StepId::new)
            .map_err(|_| ParseIdError { raw: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_display_and_parse() {
        let id: StepId = " 42 ".parse().unwrap();
        assert_eq!(id, StepId::new(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn step_id_rejects_garbage() {
        assert!("pose".parse::<StepId>().is_err());
    }

    #[test]
    fn step_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&StepId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn next_saturates() {
        assert_eq!(StepId::new(u64::MAX).next(), StepId::new(u64::MAX));
        assert_eq!(StepId::new(1).next(), StepId::new(2));
    }
}
