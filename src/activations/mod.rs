//! # Activation Functions Module
//!
//! The network uses exactly two activations:
//!
//! - **ReLU** (Rectified Linear Unit): `max(0, x)`, on every hidden layer
//! - **Linear**: identity, on the output layer so Q-values are unbounded
//!
//! ## Usage Example
//!
//! ```rust
//! use qdrive::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![1.0, -0.5, 0.0, 2.0];
//! Activation::Relu.apply(&mut data);
//! assert_eq!(data, array![1.0, 0.0, 0.0, 2.0]);
//! ```

pub mod functions;

pub use functions::Activation;
