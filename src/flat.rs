//! Flat Monte Carlo search: random playouts for every root move, no tree.

use crate::board::{Board, Outcome};
use crate::config::SearchConfig;
use crate::playout::playout_with_length;
use crate::random::RandomGenerator;
use std::time::Instant;
use tracing::debug;

/// Playouts per root move when no other budget is given.
pub const DEFAULT_PLAYOUTS_PER_MOVE: u64 = 500;

#[derive(Debug, Default, Clone, Copy)]
struct MoveScore {
    score: f64,
    games: u64,
}

impl MoveScore {
    fn average(&self) -> f64 {
        self.score / self.games as f64
    }
}

/// Picks moves by comparing the average playout result of each legal move.
///
/// Playouts are run round-robin: one per move, then the next round, until
/// `playouts_per_move` rounds are done or the configured time limit passes.
/// A win scores one, a draw one half.
pub struct FlatMonteCarloSearch<T: Board, K: RandomGenerator> {
    position: T,
    random: K,
    config: SearchConfig,
    playouts_per_move: u64,
}

impl<T: Board, K: RandomGenerator> FlatMonteCarloSearch<T, K> {
    /// A searcher for `position` with the default playout budget.
    pub fn new(position: T, random: K, config: SearchConfig) -> Self {
        Self {
            position,
            random,
            config,
            playouts_per_move: DEFAULT_PLAYOUTS_PER_MOVE,
        }
    }

    /// Sets the number of playout rounds per move.
    pub fn with_playouts_per_move(mut self, playouts: u64) -> Self {
        self.playouts_per_move = playouts;
        self
    }

    /// The position searched by `find_best_move`.
    pub fn position(&self) -> &T {
        &self.position
    }

    /// Replaces the position searched by the next `find_best_move`.
    pub fn update_state(&mut self, position: T) {
        self.position = position;
    }

    /// Returns the move with the best average playout score, ties broken at
    /// random.
    ///
    /// A move after which a playout ends in our win on the very next reply is
    /// played at once.
    pub fn find_best_move(&mut self) -> Option<T::Move> {
        let mut moves = self.position.legal_moves();
        match moves.len() {
            0 => return None,
            1 => return moves.pop(),
            _ => {}
        }

        let me = self.position.side_to_move();
        let mut scores = vec![MoveScore::default(); moves.len()];
        let start = Instant::now();
        let deadline = start.checked_add(self.config.time_limit);
        let mut rounds = 0;

        while rounds < self.playouts_per_move && deadline.is_none_or(|d| Instant::now() < d) {
            for (b_move, entry) in moves.iter().zip(scores.iter_mut()) {
                let mut next = self.position.clone();
                next.perform_move(b_move);

                let (outcome, plies) =
                    playout_with_length(&next, &mut self.random, self.config.max_playout_depth);
                if outcome == Outcome::Win(me) && plies == 1 {
                    debug!(rounds, "playout found a win on the next move");
                    return Some(b_move.clone());
                }

                entry.games += 1;
                entry.score += match outcome {
                    Outcome::Win(side) if side == me => 1.0,
                    Outcome::Win(_) => 0.0,
                    Outcome::Draw => 0.5,
                };
            }
            rounds += 1;
        }

        debug!(
            rounds,
            moves = moves.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "flat search finished"
        );

        let played: Vec<(f64, &T::Move)> = scores
            .iter()
            .zip(moves.iter())
            .filter(|(s, _)| s.games > 0)
            .map(|(s, m)| (s.average(), m))
            .collect();
        let best_moves: Vec<&T::Move> = if played.is_empty() {
            moves.iter().collect()
        } else {
            let best = played.iter().map(|(a, _)| *a).fold(f64::NEG_INFINITY, f64::max);
            played
                .into_iter()
                .filter(|(a, _)| *a == best)
                .map(|(_, m)| m)
                .collect()
        };

        self.random.choose(&best_moves).map(|m| (*m).clone())
    }
}
