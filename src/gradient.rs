//! Per-layer gradient containers and the accumulation arithmetic used to
//! average gradients over a mini-batch.

use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

use crate::error::{QDriveError, Result};
use crate::network::NeuralNetwork;

/// Gradient of one layer's weights and biases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerGradient {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

impl LayerGradient {
    pub fn zeros(input_size: usize, output_size: usize) -> Self {
        LayerGradient {
            weights: Array2::zeros((input_size, output_size)),
            biases: Array1::zeros(output_size),
        }
    }
}

/// One [`LayerGradient`] per network layer, in forward order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    layers: Vec<LayerGradient>,
}

impl Gradient {
    pub fn from_layers(layers: Vec<LayerGradient>) -> Self {
        Gradient { layers }
    }

    /// All-zero gradient matching `network`'s shape.
    pub fn zeros_like(network: &NeuralNetwork) -> Self {
        Gradient {
            layers: network
                .layers()
                .iter()
                .map(|layer| LayerGradient::zeros(layer.input_size(), layer.output_size()))
                .collect(),
        }
    }

    pub fn layers(&self) -> &[LayerGradient] {
        &self.layers
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Element-wise `self += other`.
    pub fn add(&mut self, other: &Gradient) -> Result<&mut Self> {
        self.check_compatible(other)?;
        for (mine, theirs) in self.layers.iter_mut().zip(&other.layers) {
            mine.weights += &theirs.weights;
            mine.biases += &theirs.biases;
        }
        Ok(self)
    }

    /// Scale every entry by `1 / n`, turning a batch sum into a batch mean.
    pub fn divide(&mut self, n: usize) -> Result<&mut Self> {
        if n == 0 {
            return Err(QDriveError::invalid_parameter(
                "n".to_string(),
                "cannot average over zero samples".to_string(),
            ));
        }
        Ok(self.scale(1.0 / n as f32))
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&mut self, factor: f32) -> &mut Self {
        for layer in &mut self.layers {
            layer.weights.mapv_inplace(|g| g * factor);
            layer.biases.mapv_inplace(|g| g * factor);
        }
        self
    }

    /// Euclidean norm over every entry.
    pub fn l2_norm(&self) -> f32 {
        self.layers
            .iter()
            .map(|layer| {
                layer.weights.iter().map(|g| g * g).sum::<f32>()
                    + layer.biases.iter().map(|g| g * g).sum::<f32>()
            })
            .sum::<f32>()
            .sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.layers
            .iter()
            .all(|layer| layer.weights.iter().all(|&g| g == 0.0) && layer.biases.iter().all(|&g| g == 0.0))
    }

    /// Fails unless `other` has the same number of layers and identical shapes.
    pub fn check_compatible(&self, other: &Gradient) -> Result<()> {
        if self.layers.len() != other.layers.len() {
            return Err(QDriveError::ArchitectureMismatch {
                expected: vec![self.layers.len()],
                actual: vec![other.layers.len()],
            });
        }
        for (index, (mine, theirs)) in self.layers.iter().zip(&other.layers).enumerate() {
            if mine.weights.shape() != theirs.weights.shape() {
                return Err(QDriveError::shape_mismatch(index, "weights", mine.weights.shape(), theirs.weights.shape()));
            }
            if mine.biases.shape() != theirs.biases.shape() {
                return Err(QDriveError::shape_mismatch(index, "biases", mine.biases.shape(), theirs.biases.shape()));
            }
        }
        Ok(())
    }

    /// Fails unless this gradient can be applied to `network`.
    pub fn check_matches(&self, network: &NeuralNetwork) -> Result<()> {
        if self.layers.len() != network.num_layers() {
            return Err(QDriveError::ArchitectureMismatch {
                expected: vec![network.num_layers()],
                actual: vec![self.layers.len()],
            });
        }
        for (index, (grad, layer)) in self.layers.iter().zip(network.layers()).enumerate() {
            if grad.weights.shape() != layer.weights.shape() {
                return Err(QDriveError::shape_mismatch(index, "weights", layer.weights.shape(), grad.weights.shape()));
            }
            if grad.biases.shape() != layer.biases.shape() {
                return Err(QDriveError::shape_mismatch(index, "biases", layer.biases.shape(), grad.biases.shape()));
            }
        }
        Ok(())
    }
}
