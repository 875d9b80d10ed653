use std::collections::VecDeque;

/// Result of a single training episode.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeResult {
    pub won: bool,
    pub steps: usize,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    training_errors: VecDeque<f64>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            training_errors: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_error(&mut self, error: f64) {
        self.training_errors.push_back(error);
        if self.training_errors.len() > self.capacity {
            self.training_errors.pop_front();
        }
    }

    /// Wins and losses over the last N episodes.
    pub fn tally(&self, last_n: usize) -> (usize, usize) {
        let n = self.episode_results.len().min(last_n);
        let wins = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .filter(|r| r.won)
            .count();
        (wins, n - wins)
    }

    /// Win rate over the last N episodes.
    pub fn win_rate(&self, last_n: usize) -> f64 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let (wins, _) = self.tally(last_n);
        wins as f64 / n as f64
    }

    /// Mean training error over the last N recorded updates.
    pub fn average_error(&self, last_n: usize) -> f64 {
        let n = self.training_errors.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = self.training_errors.iter().rev().take(n).sum();
        sum / n as f64
    }

    /// Mean episode length over the last N episodes.
    pub fn average_episode_length(&self, last_n: usize) -> f64 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .map(|r| r.steps)
            .sum();
        total as f64 / n as f64
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_and_win_rate() {
        let mut m = TrainingMetrics::new();
        for _ in 0..7 {
            m.record_episode(EpisodeResult {
                won: true,
                steps: 10,
            });
        }
        for _ in 0..3 {
            m.record_episode(EpisodeResult {
                won: false,
                steps: 10,
            });
        }
        assert_eq!(m.tally(10), (7, 3));
        assert!((m.win_rate(10) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_window_restricts_tally() {
        let mut m = TrainingMetrics::new();
        m.record_episode(EpisodeResult {
            won: true,
            steps: 5,
        });
        m.record_episode(EpisodeResult {
            won: false,
            steps: 5,
        });
        assert_eq!(m.tally(1), (0, 1));
    }

    #[test]
    fn test_average_error() {
        let mut m = TrainingMetrics::new();
        m.record_error(1.0);
        m.record_error(3.0);
        assert!((m.average_error(10) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_episode_length() {
        let mut m = TrainingMetrics::new();
        m.record_episode(EpisodeResult {
            won: false,
            steps: 20,
        });
        m.record_episode(EpisodeResult {
            won: false,
            steps: 30,
        });
        assert!((m.average_episode_length(10) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_windows_are_zero() {
        let m = TrainingMetrics::new();
        assert_eq!(m.win_rate(10), 0.0);
        assert_eq!(m.average_error(10), 0.0);
        assert_eq!(m.average_episode_length(10), 0.0);
    }

    #[test]
    fn test_total_episodes_is_lifetime() {
        let mut m = TrainingMetrics::with_capacity(2);
        for _ in 0..5 {
            m.record_episode(EpisodeResult {
                won: true,
                steps: 1,
            });
        }
        assert_eq!(m.total_episodes(), 5);
        assert_eq!(m.tally(10), (2, 0));
    }
}
