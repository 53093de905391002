//! Search configuration parameters.

use std::time::Duration;

/// Configuration for the tree search and its playouts.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Weight of the exploration term in the UCT score.
    pub exploration_constant: f64,

    /// Weight of the bonus for moves that leave the opponent with captures.
    pub threat_constant: f64,

    /// Plies after which a random playout is scored as a draw.
    pub max_playout_depth: usize,

    /// Wall-clock budget used by `Engine::find_best_move`.
    pub time_limit: Duration,

    /// Iteration budget used by `Engine::find_best_move`.
    pub iteration_limit: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            threat_constant: 1.0,
            max_playout_depth: 100,
            time_limit: Duration::from_millis(500),
            iteration_limit: u64::MAX,
        }
    }
}

impl SearchConfig {
    /// Iteration-bounded config with no practical time limit, for reproducible runs.
    pub fn for_testing(iterations: u64) -> Self {
        Self {
            time_limit: Duration::from_secs(24 * 60 * 60),
            iteration_limit: iterations,
            ..Self::default()
        }
    }

    /// Sets the weight of the UCT exploration term.
    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Sets the weight of the threat bonus.
    pub fn with_threat_constant(mut self, c: f64) -> Self {
        self.threat_constant = c;
        self
    }

    /// Sets the playout length scored as a draw.
    pub fn with_max_playout_depth(mut self, depth: usize) -> Self {
        self.max_playout_depth = depth;
        self
    }

    /// Sets the wall-clock budget per move.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the iteration budget per move.
    pub fn with_iteration_limit(mut self, n: u64) -> Self {
        self.iteration_limit = n;
        self
    }
}
