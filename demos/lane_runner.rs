/***
# Lane Runner

* A car on a three-lane road learns to overtake a slower car and reach the finish line
* State: 5 values (own lane offset, own speed, gap to traffic in own lane, traffic lane offset, progress)
* Actions: Forward, Left, Right, Reverse (see `DriveAction`)
* Rewards: `RewardShaping` defaults (crash -100, finish +10000 plus time bonus, progress and lane shaping)
* Traffic is a scripted car that only ever drives forward
* Trained parameters are written to `./brains/best_brain.json`

Pass a JSON `TrainingConfig` path as the first argument to override the defaults.
***/

use qdrive::{
    agent::Controller,
    config::TrainingConfig,
    environment::{DriveAction, DriveOutcome, Environment, RewardShaping, StepResult},
    error::Result,
    persistence::{FileStore, StoreFormat},
    trainer::{TickOutcome, Trainer},
};
use ndarray::{array, Array1};

const LANE_WIDTH: f32 = 40.0;
const ROAD_HALF_WIDTH: f32 = 60.0;
const TRACK_LENGTH: f32 = 600.0;
const CAR_LENGTH: f32 = 8.0;
const MAX_SPEED: f32 = 4.0;
const TRAFFIC_SPEED: f32 = 1.5;

struct LaneRoad {
    x: f32,
    y: f32,
    speed: f32,
    traffic_x: f32,
    traffic_y: f32,
    traffic: DriveAction,
    step: usize,
    shaping: RewardShaping,
}

impl LaneRoad {
    fn new(max_steps: usize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            speed: 0.0,
            traffic_x: 0.0,
            traffic_y: 40.0,
            traffic: DriveAction::Forward,
            step: 0,
            shaping: RewardShaping { max_steps, ..Default::default() },
        }
    }

    fn same_lane(&self) -> bool {
        (self.x - self.traffic_x).abs() < LANE_WIDTH / 2.0
    }

    fn get_state(&self) -> Array1<f32> {
        let gap = if self.same_lane() && self.traffic_y > self.y {
            ((self.traffic_y - self.y) / 100.0).min(1.0)
        } else {
            1.0
        };
        array![
            self.x / ROAD_HALF_WIDTH,
            self.speed / MAX_SPEED,
            gap,
            (self.traffic_x - self.x) / ROAD_HALF_WIDTH,
            self.y / TRACK_LENGTH,
        ]
    }
}

impl Environment for LaneRoad {
    fn reset(&mut self) -> Array1<f32> {
        *self = LaneRoad::new(self.shaping.max_steps);
        self.get_state()
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        let controls = DriveAction::from_index(action)?.controls();
        if controls.forward {
            self.speed = (self.speed + 0.25).min(MAX_SPEED);
        } else if controls.reverse {
            self.speed = (self.speed - 0.25).max(-1.0);
        } else {
            self.speed *= 0.97;
        }
        if controls.left {
            self.x -= 4.0;
        }
        if controls.right {
            self.x += 4.0;
        }

        let before = self.y;
        self.y += self.speed;
        if self.traffic.controls().forward {
            self.traffic_y += TRAFFIC_SPEED;
        }
        self.step += 1;

        let crashed = self.x.abs() > ROAD_HALF_WIDTH
            || (self.same_lane() && (self.traffic_y - self.y).abs() < CAR_LENGTH);
        let outcome = DriveOutcome {
            progress: self.y - before,
            speed: self.speed,
            lane_offset: self.x - (self.x / LANE_WIDTH).round() * LANE_WIDTH,
            crashed,
            finished: self.y >= TRACK_LENGTH,
            step: self.step,
        };

        Ok(StepResult {
            next_state: self.get_state(),
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

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => TrainingConfig {
            episodes: 200,
            max_steps_per_episode: 1_000,
            batch_size: 32,
            learning_rate: 0.0005,
            epsilon_decay: 0.98,
            seed: Some(42),
            ..Default::default()
        },
    };
    println!("Training with:\n{}", config.to_json_string()?);

    let env = LaneRoad::new(config.max_steps_per_episode);
    let store = FileStore::new("brains", StoreFormat::Json)?;
    let mut trainer = Trainer::new(config, env, store)?;
    if trainer.resume_from_store()? {
        println!("Resuming from brains/{}.json", trainer.config().parameters_key);
    }

    while !trainer.is_finished() {
        if let TickOutcome::EpisodeFinished(summary) = trainer.tick()? {
            if (summary.episode + 1) % 20 == 0 {
                let recent = trainer.report().recent_stats(20);
                if let Some(stats) = recent {
                    println!(
                        "Episode {:>4}: mean reward {:>10.2}, mean steps {:>6.1}, epsilon {:.3}",
                        summary.episode + 1,
                        stats.mean_reward,
                        stats.mean_steps,
                        summary.epsilon
                    );
                }
            }
        }
    }

    let report = trainer.report();
    println!(
        "Finished {} episodes: {} steps, {} updates",
        report.episodes.len(),
        report.total_steps,
        report.total_updates
    );

    for controller in [Controller::Autonomous, Controller::Random] {
        let summaries = trainer.evaluate(controller, 5)?;
        let mean = summaries.iter().map(|s| s.total_reward).sum::<f32>() / summaries.len() as f32;
        println!("{:?}: mean reward {:.2} over {} episodes", controller, mean, summaries.len());
    }

    Ok(())
}
