//! # Reinforcement Learning Agents Module
//!
//! The agent pairs a live Q-network with a slowly moving target network.
//!
//! ## Core Concepts
//!
//! - **Q-Learning**: learning the value of state-action pairs from TD targets
//! - **Target Network**: a Polyak-averaged copy of the live network that supplies
//!   bootstrap values, so the regression target does not move with every update
//! - **Exploration vs Exploitation**: epsilon-greedy action selection
//!
//! ## Example Usage
//!
//! ```rust
//! use qdrive::agent::{Controller, DqnAgentBuilder};
//! use ndarray::array;
//!
//! let mut agent = DqnAgentBuilder::new()
//!     .layer_sizes(&[5, 16, 4])
//!     .epsilon(1.0)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let state = array![0.0, 0.2, 0.4, 0.2, 0.0];
//! let action = Controller::Autonomous.select_action(&mut agent, state.view()).unwrap();
//! assert!(action < 4);
//! ```

mod controller;
mod dqn;

pub use controller::Controller;
pub use dqn::{argmax, DqnAgent, DqnAgentBuilder};
