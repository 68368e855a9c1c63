use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;
use log::trace;

use crate::activations::Activation;
use crate::error::{QDriveError, Result};
use crate::gradient::{Gradient, LayerGradient};
use crate::layers::{DenseLayer, WeightInit};
use crate::replay_buffer::Experience;

/// Weights and biases of one layer, detached from the network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerParameters {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// Deep snapshot of a network: declared widths plus every weight and bias.
///
/// This is what gets handed to a [`ParameterStore`](crate::persistence::ParameterStore).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub widths: Vec<usize>,
    pub layers: Vec<LayerParameters>,
}

impl NetworkParameters {
    /// Encode as a bincode blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Encode as JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Everything one forward pass produced.
///
/// Backpropagation needs the input, and per layer the pre-activation and the
/// post-activation. Returning them as a value keeps [`NeuralNetwork::forward`]
/// free of hidden state.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardPass {
    input: Array1<f32>,
    pre_activations: Vec<Array1<f32>>,
    activations: Vec<Array1<f32>>,
}

impl ForwardPass {
    pub fn input(&self) -> &Array1<f32> {
        &self.input
    }

    /// Pre-activation vector of layer `index`.
    pub fn pre_activation(&self, index: usize) -> &Array1<f32> {
        &self.pre_activations[index]
    }

    /// Post-activation vector of layer `index`.
    pub fn activation(&self, index: usize) -> &Array1<f32> {
        &self.activations[index]
    }

    /// Output of the final layer (the Q-values).
    pub fn output(&self) -> &Array1<f32> {
        // a network always has at least one layer
        &self.activations[self.activations.len() - 1]
    }

    pub fn into_output(mut self) -> Array1<f32> {
        self.activations.pop().unwrap_or_default()
    }

    /// Activation feeding layer `index`.
    fn incoming(&self, index: usize) -> ArrayView1<f32> {
        if index == 0 {
            self.input.view()
        } else {
            self.activations[index - 1].view()
        }
    }
}

/// A feedforward Q-network: ReLU on every hidden layer, linear output.
///
/// # Example
///
/// ```rust
/// use qdrive::network::NeuralNetwork;
/// use ndarray::array;
///
/// let network = NeuralNetwork::new(&[5, 16, 4]).unwrap();
/// let q_values = network.forward(array![0.1, 0.2, 0.3, 0.4, 0.5].view()).unwrap();
/// assert_eq!(q_values.len(), 4);
/// ```
///
/// Serialises as its [`NetworkParameters`]; deserialising validates them the
/// same way [`from_parameters`](NeuralNetwork::from_parameters) does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NetworkParameters", into = "NetworkParameters")]
pub struct NeuralNetwork {
    widths: Vec<usize>,
    layers: Vec<DenseLayer>,
}

impl NeuralNetwork {
    /// Create a network with Xavier-uniform weights drawn from the thread RNG.
    pub fn new(layer_sizes: &[usize]) -> Result<Self> {
        Self::with_rng(layer_sizes, &mut rand::thread_rng())
    }

    /// Create a network with Xavier-uniform weights drawn from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(layer_sizes: &[usize], rng: &mut R) -> Result<Self> {
        Self::with_init(layer_sizes, WeightInit::XavierUniform, rng)
    }

    pub fn with_init<R: Rng + ?Sized>(layer_sizes: &[usize], init: WeightInit, rng: &mut R) -> Result<Self> {
        validate_widths(layer_sizes)?;

        let num_layers = layer_sizes.len() - 1;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(index, window)| {
                DenseLayer::new(window[0], window[1], Activation::for_layer(index, num_layers), init, rng)
            })
            .collect();

        Ok(NeuralNetwork {
            widths: layer_sizes.to_vec(),
            layers,
        })
    }

    /// Build a network directly from a parameter snapshot.
    pub fn from_parameters(params: &NetworkParameters) -> Result<Self> {
        let mut network = Self::with_init(&params.widths, WeightInit::Zeros, &mut rand::thread_rng())?;
        network.set_parameters(params)?;
        Ok(network)
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn input_size(&self) -> usize {
        self.widths[0]
    }

    /// Number of Q-values produced, i.e. the size of the action set.
    pub fn output_size(&self) -> usize {
        self.widths[self.widths.len() - 1]
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Run a forward pass and keep every intermediate vector.
    pub fn forward_pass(&self, input: ArrayView1<f32>) -> Result<ForwardPass> {
        if input.len() != self.input_size() {
            return Err(QDriveError::dimension_mismatch(
                format!("input of length {}", self.input_size()),
                format!("input of length {}", input.len()),
            ));
        }

        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut activations: Vec<Array1<f32>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (pre, post) = match activations.last() {
                Some(previous) => layer.forward(previous.view()),
                None => layer.forward(input),
            };
            pre_activations.push(pre);
            activations.push(post);
        }

        Ok(ForwardPass {
            input: input.to_owned(),
            pre_activations,
            activations,
        })
    }

    /// Q-values for one state.
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        Ok(self.forward_pass(input)?.into_output())
    }

    /// Backpropagate `output_delta` (dLoss/dOutput) through a pass produced by this network.
    pub fn backward(&self, pass: &ForwardPass, output_delta: ArrayView1<f32>) -> Result<Gradient> {
        let pass_widths: Vec<usize> = std::iter::once(pass.input.len())
            .chain(pass.pre_activations.iter().map(|pre| pre.len()))
            .collect();
        if pass_widths != self.widths {
            return Err(QDriveError::ArchitectureMismatch {
                expected: self.widths.clone(),
                actual: pass_widths,
            });
        }
        if output_delta.len() != self.output_size() {
            return Err(QDriveError::dimension_mismatch(
                format!("delta of length {}", self.output_size()),
                format!("delta of length {}", output_delta.len()),
            ));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut delta = output_delta.to_owned();

        for index in (0..self.layers.len()).rev() {
            let layer = &self.layers[index];
            let (weights, biases) = layer.backward(pass.incoming(index), delta.view());
            layers.push(LayerGradient { weights, biases });

            if index > 0 {
                let previous = &self.layers[index - 1];
                let derivative = previous.activation.derivative(pass.pre_activations[index - 1].view());
                delta = layer.propagate(delta.view()) * &derivative;
            }
        }

        layers.reverse();
        Ok(Gradient::from_layers(layers))
    }

    /// Gradient of the squared TD error for one transition, bootstrapping from `target`.
    pub fn compute_gradient(&self, experience: &Experience, target: &NeuralNetwork, gamma: f32) -> Result<Gradient> {
        self.compute_gradient_with_loss(experience, target, gamma)
            .map(|(gradient, _)| gradient)
    }

    /// Same as [`compute_gradient`](Self::compute_gradient), also returning the loss `0.5 * td_error^2`.
    pub fn compute_gradient_with_loss(
        &self,
        experience: &Experience,
        target: &NeuralNetwork,
        gamma: f32,
    ) -> Result<(Gradient, f32)> {
        self.check_same_architecture(target)?;
        if experience.action >= self.output_size() {
            return Err(QDriveError::InvalidAction {
                action: experience.action,
                max_actions: self.output_size(),
            });
        }

        let pass = self.forward_pass(experience.state.view())?;
        let td_target = if experience.done {
            experience.reward
        } else {
            let next_q_values = target.forward(experience.next_state.view())?;
            let max_next_q = next_q_values.iter().fold(f32::NEG_INFINITY, |max, &val| max.max(val));
            experience.reward + gamma * max_next_q
        };

        let td_error = pass.output()[experience.action] - td_target;
        trace!("td target {:.4}, td error {:.4}", td_target, td_error);

        // Only the executed action is supervised.
        let mut output_delta = Array1::zeros(self.output_size());
        output_delta[experience.action] = td_error;

        let gradient = self.backward(&pass, output_delta.view())?;
        Ok((gradient, 0.5 * td_error * td_error))
    }

    /// A zero gradient shaped like this network.
    pub fn make_empty_grad(&self) -> Gradient {
        Gradient::zeros_like(self)
    }

    /// Vanilla gradient descent: `theta -= learning_rate * gradient`.
    pub fn update_params(&mut self, gradient: &Gradient, learning_rate: f32) -> Result<()> {
        gradient.check_matches(self)?;

        for (layer, grad) in self.layers.iter_mut().zip(gradient.layers()) {
            layer.weights.zip_mut_with(&grad.weights, |w, &g| *w -= learning_rate * g);
            layer.biases.zip_mut_with(&grad.biases, |b, &g| *b -= learning_rate * g);
        }
        Ok(())
    }

    /// Polyak averaging: `theta = tau * source + (1 - tau) * theta`.
    pub fn soft_update_from(&mut self, source: &NeuralNetwork, tau: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&tau) {
            return Err(QDriveError::invalid_parameter(
                "tau".to_string(),
                format!("must be within [0, 1], got {}", tau),
            ));
        }
        self.check_same_architecture(source)?;

        for (target, src) in self.layers.iter_mut().zip(&source.layers) {
            Zip::from(&mut target.weights)
                .and(&src.weights)
                .for_each(|t, &s| *t = tau * s + (1.0 - tau) * *t);
            Zip::from(&mut target.biases)
                .and(&src.biases)
                .for_each(|t, &s| *t = tau * s + (1.0 - tau) * *t);
        }
        Ok(())
    }

    /// Deep copy of widths, weights and biases.
    pub fn get_parameters(&self) -> NetworkParameters {
        NetworkParameters {
            widths: self.widths.clone(),
            layers: self
                .layers
                .iter()
                .map(|layer| LayerParameters {
                    weights: layer.weights.clone(),
                    biases: layer.biases.clone(),
                })
                .collect(),
        }
    }

    /// Overwrite every weight and bias from a snapshot.
    ///
    /// The whole snapshot is validated first, so a failed call leaves the network untouched.
    pub fn set_parameters(&mut self, params: &NetworkParameters) -> Result<()> {
        if params.widths != self.widths {
            return Err(QDriveError::ArchitectureMismatch {
                expected: self.widths.clone(),
                actual: params.widths.clone(),
            });
        }
        if params.layers.len() != self.layers.len() {
            return Err(QDriveError::ArchitectureMismatch {
                expected: vec![self.layers.len()],
                actual: vec![params.layers.len()],
            });
        }
        for (index, (layer, src)) in self.layers.iter().zip(&params.layers).enumerate() {
            if layer.weights.shape() != src.weights.shape() {
                return Err(QDriveError::shape_mismatch(index, "weights", layer.weights.shape(), src.weights.shape()));
            }
            if layer.biases.shape() != src.biases.shape() {
                return Err(QDriveError::shape_mismatch(index, "biases", layer.biases.shape(), src.biases.shape()));
            }
        }

        for (layer, src) in self.layers.iter_mut().zip(&params.layers) {
            layer.weights.assign(&src.weights);
            layer.biases.assign(&src.biases);
        }
        Ok(())
    }

    /// Save the network's parameters to a bincode file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = self.get_parameters().to_bytes()?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a network from a file written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_parameters(&NetworkParameters::from_bytes(&data)?)
    }

    fn check_same_architecture(&self, other: &NeuralNetwork) -> Result<()> {
        if self.widths != other.widths {
            return Err(QDriveError::ArchitectureMismatch {
                expected: self.widths.clone(),
                actual: other.widths.clone(),
            });
        }
        Ok(())
    }
}

impl TryFrom<NetworkParameters> for NeuralNetwork {
    type Error = QDriveError;

    fn try_from(params: NetworkParameters) -> Result<Self> {
        NeuralNetwork::from_parameters(&params)
    }
}

impl From<NeuralNetwork> for NetworkParameters {
    fn from(network: NeuralNetwork) -> Self {
        network.get_parameters()
    }
}

fn validate_widths(layer_sizes: &[usize]) -> Result<()> {
    if layer_sizes.len() < 2 {
        return Err(QDriveError::invalid_parameter(
            "layer_sizes".to_string(),
            format!("need at least input and output widths, got {:?}", layer_sizes),
        ));
    }
    if layer_sizes.iter().any(|&size| size == 0) {
        return Err(QDriveError::invalid_parameter(
            "layer_sizes".to_string(),
            format!("every width must be at least 1, got {:?}", layer_sizes),
        ));
    }
    Ok(())
}
