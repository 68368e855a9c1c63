use serde::{Serialize, Deserialize};

/// What happened during one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Zero-based episode index
    pub episode: usize,
    pub steps: usize,
    pub total_reward: f32,
    /// Exploration rate the episode was played with
    pub epsilon: f32,
    /// Mean TD loss over the episode's parameter updates, if any happened
    pub mean_loss: Option<f32>,
    pub updates: usize,
}

/// Aggregate over a set of episodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episodes: usize,
    pub mean_reward: f32,
    pub mean_steps: f32,
    pub best_reward: f32,
    pub worst_reward: f32,
}

impl EpisodeStats {
    /// `None` for an empty slice.
    pub fn from_summaries(summaries: &[EpisodeSummary]) -> Option<Self> {
        if summaries.is_empty() {
            return None;
        }
        let n = summaries.len() as f32;
        let total_reward: f32 = summaries.iter().map(|s| s.total_reward).sum();
        let total_steps: usize = summaries.iter().map(|s| s.steps).sum();
        let best_reward = summaries.iter().map(|s| s.total_reward).fold(f32::NEG_INFINITY, f32::max);
        let worst_reward = summaries.iter().map(|s| s.total_reward).fold(f32::INFINITY, f32::min);

        Some(EpisodeStats {
            episodes: summaries.len(),
            mean_reward: total_reward / n,
            mean_steps: total_steps as f32 / n,
            best_reward,
            worst_reward,
        })
    }
}

/// Result of a full training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub episodes: Vec<EpisodeSummary>,
    pub total_steps: usize,
    pub total_updates: usize,
    pub final_epsilon: f32,
}

impl TrainingReport {
    pub fn stats(&self) -> Option<EpisodeStats> {
        EpisodeStats::from_summaries(&self.episodes)
    }

    /// Stats over the last `window` episodes.
    pub fn recent_stats(&self, window: usize) -> Option<EpisodeStats> {
        let start = self.episodes.len().saturating_sub(window);
        EpisodeStats::from_summaries(&self.episodes[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(episode: usize, steps: usize, total_reward: f32) -> EpisodeSummary {
        EpisodeSummary { episode, steps, total_reward, epsilon: 1.0, mean_loss: None, updates: 0 }
    }

    #[test]
    fn test_stats() {
        let summaries = vec![summary(0, 10, 1.0), summary(1, 20, -3.0), summary(2, 30, 5.0)];
        let stats = EpisodeStats::from_summaries(&summaries).unwrap();
        assert_eq!(stats.episodes, 3);
        assert!((stats.mean_reward - 1.0).abs() < 1e-6);
        assert!((stats.mean_steps - 20.0).abs() < 1e-6);
        assert_eq!(stats.best_reward, 5.0);
        assert_eq!(stats.worst_reward, -3.0);
    }

    #[test]
    fn test_empty_stats() {
        assert!(EpisodeStats::from_summaries(&[]).is_none());
    }

    #[test]
    fn test_recent_stats_window() {
        let report = TrainingReport {
            episodes: vec![summary(0, 1, 0.0), summary(1, 1, 10.0)],
            total_steps: 2,
            total_updates: 0,
            final_epsilon: 1.0,
        };
        assert_eq!(report.recent_stats(1).unwrap().mean_reward, 10.0);
        assert_eq!(report.recent_stats(5).unwrap().episodes, 2);
    }
}
