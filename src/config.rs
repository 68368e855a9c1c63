//! Training hyper-parameters.

use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{QDriveError, Result};
use crate::persistence::DEFAULT_PARAMETERS_KEY;

/// Where per-step gradients come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LearningMode {
    /// Use each transition as it happens; flush after `batch_size` steps or at episode end
    Online,
    /// Store transitions and train on uniformly sampled batches of `batch_size`
    Replay { capacity: usize },
}

/// Everything the training driver needs besides the environment and the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Network widths, input first, action count last
    pub layer_sizes: Vec<usize>,
    pub episodes: usize,
    pub max_steps_per_episode: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Discount factor
    pub gamma: f32,
    /// Polyak coefficient for the target network
    pub tau: f32,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    pub mode: LearningMode,
    /// Seed for initialisation, exploration and sampling
    pub seed: Option<u64>,
    /// Store key the final parameters are exported under
    pub parameters_key: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            layer_sizes: vec![5, 16, 4],
            episodes: 100,
            max_steps_per_episode: 10_000,
            batch_size: 64,
            learning_rate: 0.001,
            gamma: 0.99,
            tau: 0.005,
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.05,
            mode: LearningMode::Online,
            seed: None,
            parameters_key: DEFAULT_PARAMETERS_KEY.to_string(),
        }
    }
}

impl TrainingConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.len() < 2 || self.layer_sizes.contains(&0) {
            return Err(invalid("layer_sizes", format!("need at least two non-zero widths, got {:?}", self.layer_sizes)));
        }
        if self.episodes == 0 {
            return Err(invalid("episodes", "must be at least 1".to_string()));
        }
        if self.max_steps_per_episode == 0 {
            return Err(invalid("max_steps_per_episode", "must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", format!("must be positive, got {}", self.learning_rate)));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(invalid("gamma", format!("must be within [0, 1], got {}", self.gamma)));
        }
        if !(0.0..=1.0).contains(&self.tau) {
            return Err(invalid("tau", format!("must be within [0, 1], got {}", self.tau)));
        }
        for (name, value) in [
            ("epsilon_start", self.epsilon_start),
            ("epsilon_decay", self.epsilon_decay),
            ("epsilon_min", self.epsilon_min),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("must be within [0, 1], got {}", value)));
            }
        }
        if let LearningMode::Replay { capacity } = self.mode {
            if capacity < self.batch_size {
                return Err(invalid(
                    "mode",
                    format!("replay capacity {} is smaller than batch size {}", capacity, self.batch_size),
                ));
            }
        }
        if self.parameters_key.is_empty() {
            return Err(invalid("parameters_key", "must not be empty".to_string()));
        }
        Ok(())
    }

    /// State vector length.
    pub fn state_size(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    /// Number of discrete actions.
    pub fn action_size(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }
}

fn invalid(name: &str, reason: String) -> QDriveError {
    QDriveError::InvalidParameter {
        name: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TrainingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TrainingConfig::from_json_str(r#"{ "episodes": 3, "batch_size": 8 }"#).unwrap();
        assert_eq!(config.episodes, 3);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.tau, 0.005);
        assert_eq!(config.mode, LearningMode::Online);
    }

    #[test]
    fn test_json_round_trip() {
        let config = TrainingConfig {
            mode: LearningMode::Replay { capacity: 1000 },
            seed: Some(3),
            ..Default::default()
        };
        let text = config.to_json_string().unwrap();
        assert_eq!(TrainingConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = TrainingConfig { tau: 1.5, ..Default::default() };
        assert!(matches!(config.validate(), Err(QDriveError::InvalidParameter { .. })));

        let config = TrainingConfig {
            mode: LearningMode::Replay { capacity: 10 },
            batch_size: 64,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(TrainingConfig::from_json_str(r#"{ "layer_sizes": [4] }"#).is_err());
    }
}
