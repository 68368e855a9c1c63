//! # Training Loop Driver
//!
//! [`Trainer`] runs one unit of work per [`tick`](Trainer::tick): it resets the
//! environment when an episode starts, otherwise it picks an epsilon-greedy
//! action, steps the environment and turns the transition into a gradient.
//! Gradients are averaged over a batch, applied to the live network, and the
//! target network is smoothed towards it once per applied batch.
//!
//! The trainer never blocks. An external scheduler (a render loop, a test, or
//! [`run`](Trainer::run)) decides how often to tick; stopping means no longer
//! calling `tick`.
//!
//! ```rust
//! use qdrive::config::TrainingConfig;
//! use qdrive::environment::{Environment, StepResult};
//! use qdrive::error::Result;
//! use qdrive::persistence::{MemoryStore, ParameterStore};
//! use qdrive::trainer::Trainer;
//! use ndarray::{array, Array1};
//!
//! /// Reward 1 for action 1, episode ends after 5 steps.
//! struct Pick { t: usize }
//!
//! impl Environment for Pick {
//!     fn reset(&mut self) -> Array1<f32> { self.t = 0; array![1.0, 0.0] }
//!     fn step(&mut self, action: usize) -> Result<StepResult> {
//!         self.t += 1;
//!         Ok(StepResult {
//!             next_state: array![1.0, self.t as f32 / 5.0],
//!             reward: if action == 1 { 1.0 } else { 0.0 },
//!             done: self.t == 5,
//!         })
//!     }
//!     fn state_size(&self) -> usize { 2 }
//!     fn action_size(&self) -> usize { 2 }
//! }
//!
//! let config = TrainingConfig {
//!     layer_sizes: vec![2, 8, 2],
//!     episodes: 3,
//!     batch_size: 4,
//!     seed: Some(1),
//!     ..Default::default()
//! };
//! let mut trainer = Trainer::new(config, Pick { t: 0 }, MemoryStore::new()).unwrap();
//! let report = trainer.run().unwrap();
//! assert_eq!(report.episodes.len(), 3);
//! assert!(trainer.store().load("best_brain").unwrap().is_some());
//! ```

use log::{debug, info, trace, warn};
use ndarray::Array1;

use crate::agent::{Controller, DqnAgent};
use crate::config::{LearningMode, TrainingConfig};
use crate::environment::Environment;
use crate::error::{QDriveError, Result};
use crate::gradient::Gradient;
use crate::metrics::{EpisodeStats, EpisodeSummary, TrainingReport};
use crate::persistence::ParameterStore;
use crate::replay_buffer::{Experience, ReplayBuffer};

/// Where the session is in the RESET → STEP* → DONE cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The next tick starts a new episode
    Reset,
    /// Mid-episode
    Running,
    /// Episode budget exhausted, parameters exported
    Finished,
}

/// Per-run mutable state, owned by the [`Trainer`].
#[derive(Clone, Debug)]
pub struct TrainingSession {
    /// Episodes completed so far
    pub episode: usize,
    /// Steps taken in the current episode
    pub step: usize,
    pub episode_reward: f32,
    pub total_steps: usize,
    pub total_updates: usize,
    phase: Phase,
    state: Array1<f32>,
    accumulator: Gradient,
    pending: usize,
    pending_loss: f32,
    episode_loss: f32,
    episode_updates: usize,
}

impl TrainingSession {
    fn new(accumulator: Gradient) -> Self {
        TrainingSession {
            episode: 0,
            step: 0,
            episode_reward: 0.0,
            total_steps: 0,
            total_updates: 0,
            phase: Phase::Reset,
            state: Array1::zeros(0),
            accumulator,
            pending: 0,
            pending_loss: 0.0,
            episode_loss: 0.0,
            episode_updates: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current environment state (empty before the first episode starts).
    pub fn state(&self) -> &Array1<f32> {
        &self.state
    }

    /// Gradients accumulated but not yet applied.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn accumulator(&self) -> &Gradient {
        &self.accumulator
    }
}

/// What a single [`Trainer::tick`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// One environment step inside an episode
    Stepped { action: usize, reward: f32 },
    /// The step ended the episode
    EpisodeFinished(EpisodeSummary),
    /// Training is over; the tick did nothing
    Finished,
}

/// Drives an [`Environment`] with a [`DqnAgent`] and exports the trained
/// parameters to a [`ParameterStore`] when the episode budget is exhausted.
pub struct Trainer<E: Environment, S: ParameterStore> {
    config: TrainingConfig,
    agent: DqnAgent,
    env: E,
    store: S,
    replay: Option<ReplayBuffer>,
    session: TrainingSession,
    history: Vec<EpisodeSummary>,
}

impl<E: Environment, S: ParameterStore> Trainer<E, S> {
    /// Build the agent from `config` and check the environment matches it.
    pub fn new(config: TrainingConfig, env: E, store: S) -> Result<Self> {
        config.validate()?;
        let agent = DqnAgent::new(&config.layer_sizes, config.epsilon_start, config.seed)?;
        Self::with_agent(config, agent, env, store)
    }

    /// Use a pre-built agent. Its widths must equal `config.layer_sizes`.
    pub fn with_agent(config: TrainingConfig, agent: DqnAgent, env: E, store: S) -> Result<Self> {
        config.validate()?;
        if agent.q_network.widths() != config.layer_sizes.as_slice() {
            return Err(QDriveError::ArchitectureMismatch {
                expected: config.layer_sizes.clone(),
                actual: agent.q_network.widths().to_vec(),
            });
        }
        if env.state_size() != config.state_size() || env.action_size() != config.action_size() {
            return Err(QDriveError::ArchitectureMismatch {
                expected: vec![config.state_size(), config.action_size()],
                actual: vec![env.state_size(), env.action_size()],
            });
        }

        let replay = match config.mode {
            LearningMode::Online => None,
            LearningMode::Replay { capacity } => Some(ReplayBuffer::new(capacity)?),
        };
        let session = TrainingSession::new(agent.q_network.make_empty_grad());

        Ok(Trainer {
            config,
            agent,
            env,
            store,
            replay,
            session,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn agent(&self) -> &DqnAgent {
        &self.agent
    }

    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn replay_buffer(&self) -> Option<&ReplayBuffer> {
        self.replay.as_ref()
    }

    /// Completed episodes, oldest first.
    pub fn history(&self) -> &[EpisodeSummary] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.session.phase == Phase::Finished
    }

    /// Load previously exported parameters into the live network and restart
    /// the target from them. Returns `false` when the store has nothing under
    /// the configured key.
    pub fn resume_from_store(&mut self) -> Result<bool> {
        match self.store.load(&self.config.parameters_key)? {
            Some(params) => {
                self.agent.load_parameters(&params)?;
                self.session.accumulator = self.agent.q_network.make_empty_grad();
                self.session.pending = 0;
                self.session.pending_loss = 0.0;
                info!("restored parameters from store key '{}'", self.config.parameters_key);
                Ok(true)
            }
            None => {
                warn!("no stored parameters under key '{}', starting fresh", self.config.parameters_key);
                Ok(false)
            }
        }
    }

    /// Run exactly one unit of work.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        match self.session.phase {
            Phase::Finished => return Ok(TickOutcome::Finished),
            Phase::Reset => self.begin_episode(),
            Phase::Running => {}
        }
        self.step()
    }

    /// Tick until the episode budget is exhausted.
    pub fn run(&mut self) -> Result<TrainingReport> {
        while !self.is_finished() {
            self.tick()?;
        }
        Ok(self.report())
    }

    pub fn report(&self) -> TrainingReport {
        TrainingReport {
            episodes: self.history.clone(),
            total_steps: self.session.total_steps,
            total_updates: self.session.total_updates,
            final_epsilon: self.agent.epsilon,
        }
    }

    /// Play `episodes` episodes with `controller` without learning.
    ///
    /// An episode interrupted by the evaluation is abandoned: the next
    /// [`tick`](Self::tick) starts a fresh one.
    pub fn evaluate(&mut self, controller: Controller, episodes: usize) -> Result<Vec<EpisodeSummary>> {
        if episodes == 0 {
            return Err(QDriveError::invalid_parameter("episodes", "must be at least 1"));
        }
        if self.session.phase == Phase::Running {
            self.session.phase = Phase::Reset;
        }

        let mut summaries = Vec::with_capacity(episodes);
        for episode in 0..episodes {
            let mut state = self.env.reset();
            let mut steps = 0;
            let mut total_reward = 0.0;
            loop {
                let action = controller.select_action(&mut self.agent, state.view())?;
                let result = self.env.step(action)?;
                steps += 1;
                total_reward += result.reward;
                state = result.next_state;
                if result.done || steps >= self.config.max_steps_per_episode {
                    break;
                }
            }
            summaries.push(EpisodeSummary {
                episode,
                steps,
                total_reward,
                epsilon: self.agent.epsilon,
                mean_loss: None,
                updates: 0,
            });
        }

        if let Some(stats) = EpisodeStats::from_summaries(&summaries) {
            info!(
                "evaluated {:?} over {} episodes: mean reward {:.2}, mean steps {:.1}",
                controller, stats.episodes, stats.mean_reward, stats.mean_steps
            );
        }
        Ok(summaries)
    }

    fn begin_episode(&mut self) {
        let session = &mut self.session;
        session.state = self.env.reset();
        session.step = 0;
        session.episode_reward = 0.0;
        session.accumulator = self.agent.q_network.make_empty_grad();
        session.pending = 0;
        session.pending_loss = 0.0;
        session.episode_loss = 0.0;
        session.episode_updates = 0;
        session.phase = Phase::Running;
        debug!("episode {} started (epsilon {:.3})", session.episode, self.agent.epsilon);
    }

    fn step(&mut self) -> Result<TickOutcome> {
        let state = self.session.state.clone();
        let action = self.agent.act(state.view())?;
        let result = self.env.step(action)?;

        self.session.step += 1;
        self.session.total_steps += 1;
        self.session.episode_reward += result.reward;
        trace!("step {}: action {} reward {:.3}", self.session.step, action, result.reward);

        let episode_over = result.done || self.session.step >= self.config.max_steps_per_episode;
        let experience = Experience {
            state,
            action,
            reward: result.reward,
            next_state: result.next_state.clone(),
            done: result.done,
        };

        match self.replay.as_mut() {
            None => {
                let (gradient, loss) = self.agent.compute_gradient(&experience, self.config.gamma)?;
                self.session.accumulator.add(&gradient)?;
                self.session.pending += 1;
                self.session.pending_loss += loss;
                if self.session.pending >= self.config.batch_size || episode_over {
                    self.flush()?;
                }
            }
            Some(buffer) => {
                buffer.push(experience);
                if buffer.len() >= self.config.batch_size {
                    let (gradient, loss) = {
                        let batch = buffer.sample(self.config.batch_size, self.agent.rng_mut())?;
                        self.agent.compute_batch_gradient(&batch, self.config.gamma)?
                    };
                    self.apply_update(&gradient, loss)?;
                }
            }
        }

        self.session.state = result.next_state;

        if episode_over {
            return self.end_episode();
        }
        Ok(TickOutcome::Stepped { action, reward: result.reward })
    }

    /// Average the accumulated gradient and apply it.
    fn flush(&mut self) -> Result<()> {
        let pending = self.session.pending;
        if pending == 0 {
            return Ok(());
        }
        let empty = self.agent.q_network.make_empty_grad();
        let mut gradient = std::mem::replace(&mut self.session.accumulator, empty);
        gradient.divide(pending)?;
        let loss = self.session.pending_loss / pending as f32;
        self.session.pending = 0;
        self.session.pending_loss = 0.0;
        self.apply_update(&gradient, loss)
    }

    fn apply_update(&mut self, gradient: &Gradient, loss: f32) -> Result<()> {
        self.agent.apply_gradient(gradient, self.config.learning_rate)?;
        self.agent.soft_update_target(self.config.tau)?;

        self.session.total_updates += 1;
        self.session.episode_updates += 1;
        self.session.episode_loss += loss;
        debug!(
            "update {}: loss {:.5}, gradient norm {:.5}",
            self.session.total_updates,
            loss,
            gradient.l2_norm()
        );
        Ok(())
    }

    fn end_episode(&mut self) -> Result<TickOutcome> {
        let session = &mut self.session;
        let summary = EpisodeSummary {
            episode: session.episode,
            steps: session.step,
            total_reward: session.episode_reward,
            epsilon: self.agent.epsilon,
            mean_loss: if session.episode_updates > 0 {
                Some(session.episode_loss / session.episode_updates as f32)
            } else {
                None
            },
            updates: session.episode_updates,
        };
        info!(
            "episode {} finished: {} steps, reward {:.2}, epsilon {:.3}",
            summary.episode, summary.steps, summary.total_reward, summary.epsilon
        );

        self.history.push(summary.clone());
        self.agent.decay_epsilon(self.config.epsilon_decay, self.config.epsilon_min);
        self.session.episode += 1;

        if self.session.episode >= self.config.episodes {
            self.store.save(&self.config.parameters_key, &self.agent.q_network.get_parameters())?;
            self.session.phase = Phase::Finished;
            info!(
                "training finished after {} episodes, parameters saved under '{}'",
                self.session.episode, self.config.parameters_key
            );
        } else {
            self.session.phase = Phase::Reset;
        }

        Ok(TickOutcome::EpisodeFinished(summary))
    }
}
