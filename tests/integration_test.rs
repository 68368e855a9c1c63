use qdrive::{
    agent::{Controller, DqnAgent},
    config::{LearningMode, TrainingConfig},
    environment::{DriveAction, DriveOutcome, Environment, RewardShaping, StepResult},
    error::Result,
    network::NeuralNetwork,
    persistence::{FileStore, ParameterStore, StoreFormat},
    trainer::Trainer,
};
use ndarray::{array, Array1};
use tempfile::tempdir;

/// Straight road with a lane on either side of the centre line.
struct Road {
    x: f32,
    y: f32,
    speed: f32,
    step: usize,
    length: f32,
    shaping: RewardShaping,
}

impl Road {
    fn new(length: f32, max_steps: usize) -> Self {
        Road {
            x: 0.0,
            y: 0.0,
            speed: 0.0,
            step: 0,
            length,
            shaping: RewardShaping { max_steps, ..Default::default() },
        }
    }

    fn observe(&self) -> Array1<f32> {
        array![
            self.x / 60.0,
            self.speed / 3.0,
            self.y / self.length,
            1.0 - self.x.abs() / 60.0,
            self.step as f32 / self.shaping.max_steps as f32,
        ]
    }
}

impl Environment for Road {
    fn reset(&mut self) -> Array1<f32> {
        self.x = 0.0;
        self.y = 0.0;
        self.speed = 0.0;
        self.step = 0;
        self.observe()
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        let controls = DriveAction::from_index(action)?.controls();
        if controls.forward {
            self.speed = (self.speed + 0.5).min(3.0);
        } else if controls.reverse {
            self.speed = (self.speed - 0.5).max(-1.0);
        } else {
            self.speed *= 0.95;
        }
        if controls.left {
            self.x -= 10.0;
        }
        if controls.right {
            self.x += 10.0;
        }
        self.y += self.speed;
        self.step += 1;

        let outcome = DriveOutcome {
            progress: self.speed,
            speed: self.speed,
            lane_offset: self.x,
            crashed: self.x.abs() > 60.0,
            finished: self.y >= self.length,
            step: self.step,
        };
        Ok(StepResult {
            next_state: self.observe(),
            reward: self.shaping.reward(&outcome),
            done: outcome.crashed || outcome.finished,
        })
    }

    fn state_size(&self) -> usize {
        5
    }

    fn action_size(&self) -> usize {
        DriveAction::COUNT
    }
}

/// Five cells; moving left is expensive, reaching the right end pays 1.
struct Corridor {
    position: usize,
}

impl Environment for Corridor {
    fn reset(&mut self) -> Array1<f32> {
        self.position = 0;
        self.one_hot()
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        let reward = if action == 1 {
            self.position += 1;
            if self.position == 4 { 1.0 } else { 0.0 }
        } else {
            self.position = self.position.saturating_sub(1);
            -1.0
        };
        Ok(StepResult {
            next_state: self.one_hot(),
            reward,
            done: self.position == 4,
        })
    }

    fn state_size(&self) -> usize {
        5
    }

    fn action_size(&self) -> usize {
        2
    }
}

impl Corridor {
    fn one_hot(&self) -> Array1<f32> {
        let mut state = Array1::zeros(5);
        state[self.position] = 1.0;
        state
    }
}

fn road_config() -> TrainingConfig {
    TrainingConfig {
        episodes: 12,
        max_steps_per_episode: 150,
        batch_size: 16,
        seed: Some(7),
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_training_exports_to_disk() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path(), StoreFormat::Json).unwrap();
    let config = road_config();
    let mut trainer = Trainer::new(config, Road::new(200.0, 150), store).unwrap();

    let report = trainer.run().unwrap();
    assert_eq!(report.episodes.len(), 12);
    assert!(report.total_updates > 0);
    assert!(report.final_epsilon < 1.0);
    for summary in &report.episodes {
        assert!(summary.steps >= 1 && summary.steps <= 150);
        assert!(summary.total_reward.is_finite());
        if let Some(loss) = summary.mean_loss {
            assert!(loss.is_finite());
        }
    }
    let stats = report.stats().unwrap();
    assert!(stats.best_reward >= stats.worst_reward);

    assert!(dir.path().join("best_brain.json").exists());
    let saved = trainer.store().load("best_brain").unwrap().unwrap();
    let network = NeuralNetwork::from_parameters(&saved).unwrap();
    assert_eq!(network.widths(), &[5, 16, 4]);
    let q_values = network.forward(array![0.0, 0.0, 0.0, 1.0, 0.0].view()).unwrap();
    assert_eq!(q_values.len(), 4);
    assert!(q_values.iter().all(|q| q.is_finite()));
}

#[test]
fn test_training_resumes_from_saved_parameters() {
    let dir = tempdir().unwrap();
    {
        let store = FileStore::new(dir.path(), StoreFormat::Bincode).unwrap();
        let mut trainer = Trainer::new(road_config(), Road::new(200.0, 150), store).unwrap();
        trainer.run().unwrap();
    }

    let store = FileStore::new(dir.path(), StoreFormat::Bincode).unwrap();
    let saved = store.load("best_brain").unwrap().unwrap();
    let config = TrainingConfig { seed: Some(99), ..road_config() };
    let mut resumed = Trainer::new(config, Road::new(200.0, 150), store).unwrap();
    assert!(resumed.resume_from_store().unwrap());
    assert_eq!(resumed.agent().q_network.get_parameters(), saved);
    assert_eq!(resumed.agent().target_network(), &resumed.agent().q_network);

    let summaries = resumed.evaluate(Controller::Autonomous, 2).unwrap();
    assert_eq!(summaries.len(), 2);
}

#[test]
fn test_replay_mode_end_to_end() {
    let config = TrainingConfig {
        mode: LearningMode::Replay { capacity: 500 },
        batch_size: 8,
        ..road_config()
    };
    let mut trainer = Trainer::new(config, Road::new(200.0, 150), qdrive::persistence::MemoryStore::new()).unwrap();
    let report = trainer.run().unwrap();

    let buffer = trainer.replay_buffer().unwrap();
    assert_eq!(buffer.len(), report.total_steps.min(500));
    assert_eq!(report.total_updates, report.total_steps.saturating_sub(7));
}

#[test]
fn test_corridor_prefers_moving_right_after_training() {
    let config = TrainingConfig {
        layer_sizes: vec![5, 16, 2],
        episodes: 300,
        max_steps_per_episode: 30,
        batch_size: 1,
        learning_rate: 0.01,
        gamma: 0.9,
        tau: 0.1,
        epsilon_decay: 0.98,
        epsilon_min: 0.1,
        seed: Some(3),
        ..Default::default()
    };
    let agent = DqnAgent::new(&config.layer_sizes, config.epsilon_start, config.seed).unwrap();
    let mut trainer = Trainer::with_agent(
        config,
        agent,
        Corridor { position: 0 },
        qdrive::persistence::MemoryStore::new(),
    )
    .unwrap();
    trainer.run().unwrap();

    let q = trainer.agent().q_values(array![1.0, 0.0, 0.0, 0.0, 0.0].view()).unwrap();
    assert!(q[1] > q[0], "q values at the start: {:?}", q);
}
