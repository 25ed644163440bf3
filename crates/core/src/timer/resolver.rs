use thiserror::Error;

use crate::model::{
    DEFAULT_MEMORY_FLASH_SECONDS, MemoryType, RuntimeState, SessionConfig, SessionMode,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StartError {
    #[error("custom session needs at least one step")]
    EmptyCustomQueue,
}

/// Computes the state a session starts in.
///
/// # Errors
///
/// Returns `StartError::EmptyCustomQueue` for a Custom session without steps;
/// the caller must not start the countdown in that case.
pub fn resolve_session_start_state(config: &SessionConfig) -> Result<RuntimeState, StartError> {
    let images_len = config.images_len.max(1);
    let mut state = RuntimeState {
        session_mode: config.session_mode,
        selected_duration: config.selected_duration,
        custom_queue: Vec::new(),
        memory_type: config.memory_type,
        memory_poses_count: config.memory_poses_count.clamp(1, images_len),
        current_step_index: 0,
        current_pose_in_step: 1,
        time_remaining: i64::from(config.selected_duration),
        memory_hidden: false,
    };

    match config.session_mode {
        SessionMode::Custom => {
            let first = config
                .custom_queue
                .first()
                .ok_or(StartError::EmptyCustomQueue)?;
            state.time_remaining = i64::from(first.duration());
            state.custom_queue = config.custom_queue.clone();
        }
        SessionMode::Memory => {
            state.time_remaining = match config.memory_type {
                MemoryType::Flash => i64::from(
                    config
                        .memory_flash_duration
                        .unwrap_or(DEFAULT_MEMORY_FLASH_SECONDS),
                ),
                MemoryType::Progressive => i64::from(config.selected_duration),
            };
        }
        SessionMode::Relax => state.time_remaining = 0,
        SessionMode::Classic => {}
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Step, StepId};

    fn custom(queue: Vec<Step>) -> SessionConfig {
        SessionConfig {
            session_mode: SessionMode::Custom,
            custom_queue: queue,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn empty_custom_queue_is_invalid() {
        assert_eq!(
            resolve_session_start_state(&custom(Vec::new())).unwrap_err(),
            StartError::EmptyCustomQueue
        );
    }

    #[test]
    fn custom_starts_on_first_step() {
        let queue = vec![Step::pose(StepId::new(1), 5, 60).unwrap()];
        let state = resolve_session_start_state(&custom(queue)).unwrap();
        assert_eq!(state.time_remaining, 60);
        assert_eq!(state.current_step_index, 0);
        assert_eq!(state.current_pose_in_step, 1);
    }

    #[test]
    fn custom_starting_with_pause_uses_pause_duration() {
        let queue = vec![
            Step::pause(StepId::new(1), 15).unwrap(),
            Step::pose(StepId::new(2), 2, 90).unwrap(),
        ];
        let state = resolve_session_start_state(&custom(queue)).unwrap();
        assert_eq!(state.time_remaining, 15);
    }

    #[test]
    fn classic_uses_selected_duration() {
        let config = SessionConfig {
            selected_duration: 45,
            ..SessionConfig::default()
        };
        let state = resolve_session_start_state(&config).unwrap();
        assert_eq!(state.session_mode, SessionMode::Classic);
        assert_eq!(state.time_remaining, 45);
    }

    #[test]
    fn relax_is_untimed() {
        let config = SessionConfig {
            session_mode: SessionMode::Relax,
            ..SessionConfig::default()
        };
        assert_eq!(resolve_session_start_state(&config).unwrap().time_remaining, 0);
    }

    #[test]
    fn memory_flash_uses_flash_duration_and_override() {
        let mut config = SessionConfig {
            session_mode: SessionMode::Memory,
            memory_type: MemoryType::Flash,
            ..SessionConfig::default()
        };
        assert_eq!(
            resolve_session_start_state(&config).unwrap().time_remaining,
            i64::from(DEFAULT_MEMORY_FLASH_SECONDS)
        );
        config.memory_flash_duration = Some(4);
        assert_eq!(resolve_session_start_state(&config).unwrap().time_remaining, 4);
    }

    #[test]
    fn memory_progressive_uses_selected_duration() {
        let config = SessionConfig {
            session_mode: SessionMode::Memory,
            memory_type: MemoryType::Progressive,
            selected_duration: 120,
            ..SessionConfig::default()
        };
        assert_eq!(resolve_session_start_state(&config).unwrap().time_remaining, 120);
    }

    #[test]
    fn memory_poses_count_is_clamped_to_images() {
        let mut config = SessionConfig {
            session_mode: SessionMode::Memory,
            images_len: 8,
            memory_poses_count: 20,
            ..SessionConfig::default()
        };
        assert_eq!(resolve_session_start_state(&config).unwrap().memory_poses_count, 8);
        config.memory_poses_count = 0;
        assert_eq!(resolve_session_start_state(&config).unwrap().memory_poses_count, 1);
    }
}
