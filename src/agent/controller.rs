use ndarray::ArrayView1;

use crate::error::{QDriveError, Result};
use super::DqnAgent;

/// Who decides the next action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controller {
    /// Greedy with respect to the live network, no exploration
    Autonomous,
    /// Epsilon-greedy, as during training
    Exploring,
    /// Uniformly random action
    Random,
    /// Always the same action, e.g. traffic that only drives forward
    Scripted(usize),
}

impl Controller {
    pub fn select_action(&self, agent: &mut DqnAgent, state: ArrayView1<f32>) -> Result<usize> {
        match *self {
            Controller::Autonomous => agent.greedy_action(state),
            Controller::Exploring => agent.act(state),
            Controller::Random => Ok(agent.random_action()),
            Controller::Scripted(action) => {
                if action >= agent.num_actions() {
                    return Err(QDriveError::InvalidAction {
                        action,
                        max_actions: agent.num_actions(),
                    });
                }
                Ok(action)
            }
        }
    }
}
