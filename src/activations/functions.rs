use ndarray::{Array1, ArrayView1};
use serde::{Serialize, Deserialize};

/// Activation applied after a layer's affine transform.
///
/// Hidden layers always use `Relu`, the output layer always uses `Linear`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
}

impl Activation {
    /// Activation for layer `index` out of `num_layers`.
    pub fn for_layer(index: usize, num_layers: usize) -> Self {
        if index + 1 == num_layers {
            Activation::Linear
        } else {
            Activation::Relu
        }
    }

    /// Apply the activation function to an input array in-place.
    pub fn apply(&self, input: &mut Array1<f32>) {
        match self {
            Activation::Relu => {
                input.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
        }
    }

    /// Compute the derivative of the activation function at the given pre-activations.
    pub fn derivative(&self, pre_activation: ArrayView1<f32>) -> Array1<f32> {
        match self {
            Activation::Relu => {
                pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
            }
            Activation::Linear => {
                Array1::ones(pre_activation.len())
            }
        }
    }
}
