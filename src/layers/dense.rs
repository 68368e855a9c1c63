use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::activations::Activation;
use super::initialization::WeightInit;

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DenseLayer {
    /// Shape `(input_size, output_size)`
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Create a new dense layer with the given input size, output size and activation function.
    /// Weights come from `init`, biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        DenseLayer {
            weights: init.initialize_weights((input_size, output_size), rng),
            biases: init.initialize_biases(output_size),
            activation,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }

    /// Compute `(pre_activation, post_activation)` for one input vector.
    pub fn forward(&self, input: ArrayView1<f32>) -> (Array1<f32>, Array1<f32>) {
        let pre_activation = input.dot(&self.weights) + &self.biases;
        let mut output = pre_activation.clone();
        self.activation.apply(&mut output);
        (pre_activation, output)
    }

    /// Gradients of this layer's weights and biases given the activation that fed it
    /// and the delta at its pre-activation.
    pub fn backward(&self, input: ArrayView1<f32>, delta: ArrayView1<f32>) -> (Array2<f32>, Array1<f32>) {
        let weight_gradients = input.insert_axis(Axis(1)).dot(&delta.insert_axis(Axis(0)));
        (weight_gradients, delta.to_owned())
    }

    /// Push a delta back through the weights. The caller multiplies by the previous
    /// layer's activation derivative.
    pub fn propagate(&self, delta: ArrayView1<f32>) -> Array1<f32> {
        self.weights.dot(&delta)
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_layer(activation: Activation) -> DenseLayer {
        let mut rng = StdRng::seed_from_u64(0);
        DenseLayer::new(2, 2, activation, WeightInit::Zeros, &mut rng)
            .with_weights(arr2(&[[1.0, -2.0], [0.5, 1.0]]))
            .with_biases(arr1(&[0.0, 0.5]))
    }

    #[test]
    fn test_forward_relu() {
        let layer = fixed_layer(Activation::Relu);
        let (pre, post) = layer.forward(arr1(&[1.0, 1.0]).view());
        assert_eq!(pre, arr1(&[1.5, -0.5]));
        assert_eq!(post, arr1(&[1.5, 0.0]));
    }

    #[test]
    fn test_forward_linear_keeps_negatives() {
        let layer = fixed_layer(Activation::Linear);
        let (pre, post) = layer.forward(arr1(&[1.0, 1.0]).view());
        assert_eq!(pre, post);
    }

    #[test]
    fn test_backward_is_outer_product() {
        let layer = fixed_layer(Activation::Linear);
        let (dw, db) = layer.backward(arr1(&[2.0, 3.0]).view(), arr1(&[1.0, -1.0]).view());
        assert_eq!(dw, arr2(&[[2.0, -2.0], [3.0, -3.0]]));
        assert_eq!(db, arr1(&[1.0, -1.0]));
    }

    #[test]
    fn test_propagate() {
        let layer = fixed_layer(Activation::Linear);
        let back = layer.propagate(arr1(&[1.0, 1.0]).view());
        assert_eq!(back, arr1(&[-1.0, 1.5]));
    }
}
