use serde::{Serialize, Deserialize};

use crate::error::{QDriveError, Result};

/// The four discrete driving actions, in network output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveAction {
    Forward,
    Left,
    Right,
    Reverse,
}

impl DriveAction {
    pub const ALL: [DriveAction; 4] = [
        DriveAction::Forward,
        DriveAction::Left,
        DriveAction::Right,
        DriveAction::Reverse,
    ];

    /// Number of discrete actions (the network's output width).
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            DriveAction::Forward => 0,
            DriveAction::Left => 1,
            DriveAction::Right => 2,
            DriveAction::Reverse => 3,
        }
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or(QDriveError::InvalidAction {
            action: index,
            max_actions: Self::COUNT,
        })
    }

    /// The control flags this action holds down.
    pub fn controls(self) -> DriveControls {
        let mut controls = DriveControls::default();
        match self {
            DriveAction::Forward => controls.forward = true,
            DriveAction::Left => controls.left = true,
            DriveAction::Right => controls.right = true,
            DriveAction::Reverse => controls.reverse = true,
        }
        controls
    }
}

/// Control flags read by the car model. Exactly one is set per action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveControls {
    pub forward: bool,
    pub left: bool,
    pub right: bool,
    pub reverse: bool,
}

/// Observations the reward formula needs from one simulation tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveOutcome {
    /// Distance advanced towards the finish line this tick (negative when going backwards)
    pub progress: f32,
    pub speed: f32,
    /// Horizontal distance from the centre lane
    pub lane_offset: f32,
    pub crashed: bool,
    pub finished: bool,
    /// Steps taken so far in the episode
    pub step: usize,
}

/// Reward constants for the driving task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardShaping {
    pub crash_penalty: f32,
    pub finish_reward: f32,
    /// Maximum bonus for finishing, scaled by the fraction of unused steps
    pub finish_time_bonus: f32,
    pub max_steps: usize,
    pub progress_scale: f32,
    pub backward_scale: f32,
    pub speed_scale: f32,
    pub time_penalty: f32,
    pub lane_bonus: f32,
    pub lane_width: f32,
}

impl Default for RewardShaping {
    fn default() -> Self {
        RewardShaping {
            crash_penalty: -100.0,
            finish_reward: 10_000.0,
            finish_time_bonus: 100.0,
            max_steps: 10_000,
            progress_scale: 1.0,
            backward_scale: 0.5,
            speed_scale: 0.1,
            time_penalty: -0.5,
            lane_bonus: 0.5,
            lane_width: 30.0,
        }
    }
}

impl RewardShaping {
    /// Reward for one tick. Crashing and finishing are terminal and short-circuit the shaping terms.
    pub fn reward(&self, outcome: &DriveOutcome) -> f32 {
        if outcome.crashed {
            return self.crash_penalty;
        }

        if outcome.finished {
            let remaining = self.max_steps.saturating_sub(outcome.step) as f32;
            let bonus = (remaining / self.max_steps.max(1) as f32 * self.finish_time_bonus).max(0.0);
            return self.finish_reward + bonus;
        }

        let mut reward = if outcome.progress > 0.0 {
            outcome.progress * self.progress_scale
        } else {
            outcome.progress * self.backward_scale
        };

        if outcome.speed > 0.0 {
            reward += outcome.speed * self.speed_scale;
        }

        reward += self.time_penalty;

        if outcome.lane_offset.abs() < self.lane_width {
            reward += self.lane_bonus;
        }

        reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_encoding_round_trip() {
        for (index, action) in DriveAction::ALL.iter().enumerate() {
            assert_eq!(action.index(), index);
            assert_eq!(DriveAction::from_index(index).unwrap(), *action);
        }
        assert_eq!(
            DriveAction::from_index(4),
            Err(QDriveError::InvalidAction { action: 4, max_actions: 4 })
        );
    }

    #[test]
    fn test_controls_single_flag() {
        let controls = DriveAction::Left.controls();
        assert!(controls.left);
        assert!(!controls.forward && !controls.right && !controls.reverse);
    }

    #[test]
    fn test_crash_reward() {
        let shaping = RewardShaping::default();
        let outcome = DriveOutcome { crashed: true, progress: 50.0, ..Default::default() };
        assert_eq!(shaping.reward(&outcome), -100.0);
    }

    #[test]
    fn test_finish_reward_with_time_bonus() {
        let shaping = RewardShaping::default();
        let outcome = DriveOutcome { finished: true, step: 5_000, ..Default::default() };
        assert!((shaping.reward(&outcome) - 10_050.0).abs() < 1e-3);
    }

    #[test]
    fn test_shaped_reward() {
        let shaping = RewardShaping::default();
        // 2.0 progress + 0.3 speed - 0.5 time + 0.5 lane
        let outcome = DriveOutcome { progress: 2.0, speed: 3.0, lane_offset: 10.0, ..Default::default() };
        assert!((shaping.reward(&outcome) - 2.3).abs() < 1e-5);

        // -1.0 * 0.5 - 0.5 time, outside the lane
        let outcome = DriveOutcome { progress: -1.0, speed: 0.0, lane_offset: 45.0, ..Default::default() };
        assert!((shaping.reward(&outcome) + 1.0).abs() < 1e-5);
    }
}
