//! # qdrive - Q-learning core for a self-driving agent
//!
//! qdrive is a small, dependency-light deep Q-learning library. The network,
//! its backpropagation and the target-network smoothing are written by hand on
//! top of `ndarray`; the driving simulation, rendering and storage are treated
//! as collaborators behind traits.
//!
//! ## Key Features
//!
//! - **Dense Q-network**: ReLU hidden layers, linear output, Xavier-uniform init
//! - **TD backpropagation**: gradients supervise only the executed action
//! - **Gradient accumulation**: add and average per-transition gradients
//! - **Target network**: Polyak-averaged copy that stabilises TD targets
//! - **Experience replay**: fixed-capacity FIFO with uniform sampling
//! - **Training driver**: tick-driven episode loop with epsilon-greedy exploration
//!
//! ## Quick Start
//!
//! ```rust
//! use qdrive::network::NeuralNetwork;
//! use qdrive::replay_buffer::Experience;
//! use ndarray::array;
//!
//! let mut policy = NeuralNetwork::new(&[5, 16, 4]).unwrap();
//! let mut target = policy.clone();
//!
//! let experience = Experience {
//!     state: array![0.0, 0.1, 0.9, 0.1, 0.0],
//!     action: 0,
//!     reward: 1.0,
//!     next_state: array![0.0, 0.2, 0.8, 0.2, 0.0],
//!     done: false,
//! };
//!
//! let mut batch = policy.make_empty_grad();
//! batch.add(&policy.compute_gradient(&experience, &target, 0.99).unwrap()).unwrap();
//! batch.divide(1).unwrap();
//! policy.update_params(&batch, 0.001).unwrap();
//! target.soft_update_from(&policy, 0.005).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - ReLU and identity activations
//! - [`agent`] - DQN agent with target network, controllers
//! - [`config`] - Training hyper-parameters
//! - [`environment`] - Environment contract, driving actions and reward shaping
//! - [`error`] - Error types and result handling
//! - [`gradient`] - Gradient containers and accumulation
//! - [`layers`] - Dense layer and weight initialization
//! - [`metrics`] - Episode summaries and statistics
//! - [`network`] - Core neural network implementation
//! - [`persistence`] - Parameter stores
//! - [`replay_buffer`] - Experience replay
//! - [`trainer`] - Training loop driver

pub mod activations;
pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod gradient;
pub mod layers;
pub mod metrics;
pub mod network;
pub mod persistence;
pub mod replay_buffer;
pub mod trainer;

#[cfg(test)]
mod tests;
