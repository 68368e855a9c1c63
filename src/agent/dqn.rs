use crate::network::{NeuralNetwork, NetworkParameters};
use crate::gradient::Gradient;
use crate::replay_buffer::Experience;
use crate::error::{Result, QDriveError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ndarray::{Array1, ArrayView1};

/// Deep Q-Network agent with a Polyak-averaged target network
///
/// The agent owns two structurally identical networks:
/// - `q_network`, trained by gradient descent and used for action selection
/// - the target network, which supplies bootstrap values for TD targets and is
///   only ever moved towards `q_network` through [`soft_update_target`](DqnAgent::soft_update_target)
///
/// # Example
///
/// ```rust
/// use qdrive::agent::DqnAgent;
/// use qdrive::replay_buffer::Experience;
/// use ndarray::array;
///
/// let mut agent = DqnAgent::new(&[5, 16, 4], 0.1, Some(42)).unwrap();
///
/// let state = array![0.1, 0.2, 0.3, 0.4, 0.5];
/// let action = agent.act(state.view()).unwrap();
///
/// let experience = Experience {
///     state,
///     action,
///     reward: 1.0,
///     next_state: array![0.2, 0.3, 0.4, 0.5, 0.6],
///     done: false,
/// };
/// let (gradient, _loss) = agent.compute_gradient(&experience, 0.99).unwrap();
/// agent.apply_gradient(&gradient, 0.001).unwrap();
/// agent.soft_update_target(0.005).unwrap();
/// ```
pub struct DqnAgent {
    /// Main network for action selection
    pub q_network: NeuralNetwork,

    /// Target network for stable TD targets
    target_network: NeuralNetwork,

    /// Exploration rate
    pub epsilon: f32,

    /// Drives exploration draws and replay sampling
    rng: StdRng,
}

impl DqnAgent {
    /// Create a new agent. With a `seed`, initialisation and exploration are reproducible.
    pub fn new(layer_sizes: &[usize], epsilon: f32, seed: Option<u64>) -> Result<Self> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let q_network = NeuralNetwork::with_rng(layer_sizes, &mut rng)?;
        Ok(Self::from_network(q_network, epsilon, rng))
    }

    /// Wrap an existing network; the target starts as a deep copy of it.
    pub fn from_network(q_network: NeuralNetwork, epsilon: f32, rng: StdRng) -> Self {
        let target_network = q_network.clone();
        DqnAgent {
            q_network,
            target_network,
            epsilon: epsilon.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn target_network(&self) -> &NeuralNetwork {
        &self.target_network
    }

    pub fn num_actions(&self) -> usize {
        self.q_network.output_size()
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn q_values(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.q_network.forward(state)
    }

    /// Select action using epsilon-greedy policy
    pub fn act(&mut self, state: ArrayView1<f32>) -> Result<usize> {
        if self.rng.gen::<f32>() < self.epsilon {
            // Exploration: random action
            Ok(self.random_action())
        } else {
            self.greedy_action(state)
        }
    }

    /// Action with the highest Q-value.
    pub fn greedy_action(&self, state: ArrayView1<f32>) -> Result<usize> {
        let q_values = self.q_network.forward(state)?;
        Ok(argmax(&q_values))
    }

    pub fn random_action(&mut self) -> usize {
        self.rng.gen_range(0..self.num_actions())
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Multiply epsilon by `decay`, never going below `min_epsilon`. Returns the new value.
    pub fn decay_epsilon(&mut self, decay: f32, min_epsilon: f32) -> f32 {
        self.epsilon = (self.epsilon * decay).max(min_epsilon).min(1.0);
        self.epsilon
    }

    /// TD gradient and loss for one transition, bootstrapping from the target network.
    pub fn compute_gradient(&self, experience: &Experience, gamma: f32) -> Result<(Gradient, f32)> {
        self.q_network.compute_gradient_with_loss(experience, &self.target_network, gamma)
    }

    /// Averaged TD gradient and mean loss over a batch.
    pub fn compute_batch_gradient(&self, experiences: &[&Experience], gamma: f32) -> Result<(Gradient, f32)> {
        if experiences.is_empty() {
            return Err(QDriveError::InsufficientSamples { requested: 1, available: 0 });
        }

        let mut total = self.q_network.make_empty_grad();
        let mut total_loss = 0.0;
        for experience in experiences {
            let (gradient, loss) = self.compute_gradient(experience, gamma)?;
            total.add(&gradient)?;
            total_loss += loss;
        }
        total.divide(experiences.len())?;
        Ok((total, total_loss / experiences.len() as f32))
    }

    /// Gradient descent step on the live network.
    pub fn apply_gradient(&mut self, gradient: &Gradient, learning_rate: f32) -> Result<()> {
        self.q_network.update_params(gradient, learning_rate)
    }

    /// Move the target network towards the live network.
    pub fn soft_update_target(&mut self, tau: f32) -> Result<()> {
        self.target_network.soft_update_from(&self.q_network, tau)
    }

    /// Restore the live network from a snapshot and restart the target from it.
    pub fn load_parameters(&mut self, params: &NetworkParameters) -> Result<()> {
        self.q_network.set_parameters(params)?;
        self.target_network = self.q_network.clone();
        Ok(())
    }
}

/// Index of the largest value; NaNs compare as equal.
pub fn argmax(values: &Array1<f32>) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Builder pattern for DqnAgent
pub struct DqnAgentBuilder {
    layer_sizes: Vec<usize>,
    epsilon: f32,
    seed: Option<u64>,
}

impl DqnAgentBuilder {
    pub fn new() -> Self {
        DqnAgentBuilder {
            layer_sizes: vec![],
            epsilon: 1.0,
            seed: None,
        }
    }

    pub fn layer_sizes(mut self, sizes: &[usize]) -> Self {
        self.layer_sizes = sizes.to_vec();
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<DqnAgent> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(QDriveError::InvalidParameter {
                name: "epsilon".to_string(),
                reason: format!("must be within [0, 1], got {}", self.epsilon),
            });
        }
        DqnAgent::new(&self.layer_sizes, self.epsilon, self.seed)
    }
}

impl Default for DqnAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
