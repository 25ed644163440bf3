use crate::model::Step;

/// Chime to play when the cursor lands on a new step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// A rest interval begins.
    Pause,
    /// A new pose group begins.
    Group,
}

/// Result of moving the custom cursor one unit forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorAdvance {
    pub finished: bool,
    pub current_step_index: usize,
    pub current_pose_in_step: u32,
    /// Step under the new cursor; `None` once finished.
    pub next_step: Option<Step>,
    pub entered_new_step: bool,
    pub sound_cue: Option<SoundCue>,
}

impl CursorAdvance {
    fn finished(step_index: usize, pose_in_step: u32, entered_new_step: bool) -> Self {
        Self {
            finished: true,
            current_step_index: step_index,
            current_pose_in_step: pose_in_step.max(1),
            next_step: None,
            entered_new_step,
            sound_cue: None,
        }
    }
}

/// Moves the `(step_index, pose_in_step)` cursor to the next pose or pause.
///
/// A pose step with `count > 1` is walked in place: the pose counter grows
/// until it reaches `count`, then the cursor moves to the next step.
#[must_use]
pub fn advance_custom_cursor(queue: &[Step], step_index: usize, pose_in_step: u32) -> CursorAdvance {
    let Some(current) = queue.get(step_index) else {
        return CursorAdvance::finished(step_index, pose_in_step, false);
    };

    if pose_in_step < current.count() {
        return CursorAdvance {
            finished: false,
            current_step_index: step_index,
            current_pose_in_step: pose_in_step.saturating_add(1).max(1),
            next_step: Some(*current),
            entered_new_step: false,
            sound_cue: None,
        };
    }

    let next_index = step_index.saturating_add(1);
    let Some(next) = queue.get(next_index) else {
        return CursorAdvance::finished(next_index, 1, true);
    };

    CursorAdvance {
        finished: false,
        current_step_index: next_index,
        current_pose_in_step: 1,
        next_step: Some(*next),
        entered_new_step: true,
        sound_cue: Some(if next.is_pause() {
            SoundCue::Pause
        } else {
            SoundCue::Group
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepId;

    fn queue() -> Vec<Step> {
        vec![
            Step::pose(StepId::new(1), 2, 30).unwrap(),
            Step::pause(StepId::new(2), 10).unwrap(),
            Step::pose(StepId::new(3), 1, 60).unwrap(),
        ]
    }

    #[test]
    fn repeats_within_pose_step() {
        let adv = advance_custom_cursor(&queue(), 0, 1);
        assert!(!adv.finished);
        assert!(!adv.entered_new_step);
        assert_eq!((adv.current_step_index, adv.current_pose_in_step), (0, 2));
        assert_eq!(adv.sound_cue, None);
    }

    #[test]
    fn entering_pause_cues_pause() {
        let adv = advance_custom_cursor(&queue(), 0, 2);
        assert!(adv.entered_new_step);
        assert_eq!((adv.current_step_index, adv.current_pose_in_step), (1, 1));
        assert_eq!(adv.sound_cue, Some(SoundCue::Pause));
        assert!(adv.next_step.unwrap().is_pause());
    }

    #[test]
    fn entering_pose_group_cues_group() {
        let adv = advance_custom_cursor(&queue(), 1, 1);
        assert_eq!(adv.current_step_index, 2);
        assert_eq!(adv.sound_cue, Some(SoundCue::Group));
    }

    #[test]
    fn last_step_finishes() {
        let adv = advance_custom_cursor(&queue(), 2, 1);
        assert!(adv.finished);
        assert!(adv.next_step.is_none());
        assert_eq!(adv.sound_cue, None);
    }

    #[test]
    fn out_of_range_cursor_is_finished_not_a_fault() {
        let adv = advance_custom_cursor(&queue(), 99, 3);
        assert!(adv.finished);
        assert!(!adv.entered_new_step);
        assert!(advance_custom_cursor(&[], 0, 1).finished);
    }

    #[test]
    fn walk_never_reports_pose_below_one() {
        let queue = queue();
        let (mut step, mut pose) = (0_usize, 0_u32);
        let mut visited = 0;
        loop {
            let adv = advance_custom_cursor(&queue, step, pose);
            assert!(adv.current_pose_in_step >= 1);
            if adv.finished {
                break;
            }
            step = adv.current_step_index;
            pose = adv.current_pose_in_step;
            visited += 1;
        }
        // pose 0 normalises to pose 1, then pose 2, pause, final pose
        assert_eq!(visited, 4);
    }
}
