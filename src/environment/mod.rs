//! # Environment Contract
//!
//! The trainer treats the simulation as an opaque collaborator: it resets to a
//! state vector and steps with a discrete action index. [`driving`] fixes the
//! action encoding and the reward formula used by the driving simulation.

pub mod driving;

use ndarray::Array1;

use crate::error::Result;

pub use driving::{DriveAction, DriveControls, DriveOutcome, RewardShaping};

/// What one environment step produced.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    pub next_state: Array1<f32>,
    pub reward: f32,
    pub done: bool,
}

/// A discrete-action environment.
///
/// `reset` and `step` return state vectors of length [`state_size`](Environment::state_size);
/// valid actions are `0..action_size()`.
pub trait Environment {
    /// Start a new episode and return its first state.
    fn reset(&mut self) -> Array1<f32>;

    /// Apply `action` and advance one tick.
    fn step(&mut self, action: usize) -> Result<StepResult>;

    fn state_size(&self) -> usize;

    fn action_size(&self) -> usize;
}
