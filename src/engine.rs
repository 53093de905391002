//! Game-level facade over the board, the search tree and the opening book.

use crate::board::{Board, ChessMove};
use crate::book::{BookNodeId, OpeningBook};
use crate::config::SearchConfig;
use crate::error::{BoardError, EngineError};
use crate::mcts::MonteCarloTreeSearch;
use crate::random::RandomGenerator;
use shakmaty::Color;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Plays one side of a game.
///
/// Moves from the opening book are preferred while the game is still in it;
/// afterwards the tree search takes over. The book is shared read-only, so
/// several engines can hold the same `Arc`.
pub struct Engine<T: Board, K: RandomGenerator> {
    board: T,
    mcts: MonteCarloTreeSearch<T, K>,
    book: Option<Arc<OpeningBook>>,
    book_cursor: Option<BookNodeId>,
    my_side: Color,
}

impl<T: Board, K: RandomGenerator> Engine<T, K> {
    /// An engine for a game from `board`, playing the side to move there.
    pub fn new(board: T, random: K, config: SearchConfig) -> Self {
        Self {
            my_side: board.side_to_move(),
            mcts: MonteCarloTreeSearch::new(board.clone(), random, config),
            board,
            book: None,
            book_cursor: None,
        }
    }

    /// Attaches an opening book. It is consulted from the next `new_game`
    /// started from the initial position.
    pub fn with_book(mut self, book: Arc<OpeningBook>) -> Self {
        self.book = Some(book);
        self
    }

    /// Starts a new game, discarding the search tree and known forced lines.
    ///
    /// The book is only followed when `from_start` says `board` is the
    /// standard initial position.
    pub fn new_game(&mut self, board: T, my_side: Color, from_start: bool) {
        info!(fen = %board.fen(), ?my_side, from_start, "starting new game");
        self.mcts.reset(board.clone());
        self.board = board;
        self.my_side = my_side;
        self.book_cursor = match (&self.book, from_start) {
            (Some(book), true) => Some(book.root()),
            _ => None,
        };
    }

    /// The current game position.
    pub fn board(&self) -> &T {
        &self.board
    }

    /// The side this engine plays.
    pub fn my_side(&self) -> Color {
        self.my_side
    }

    /// The underlying tree search.
    pub fn search(&self) -> &MonteCarloTreeSearch<T, K> {
        &self.mcts
    }

    /// `true` while the game still follows the opening book.
    pub fn in_book(&self) -> bool {
        self.book_cursor.is_some()
    }

    /// Plays `chess_move` for whichever side is to move.
    pub fn apply_move(&mut self, chess_move: &ChessMove) -> Result<(), EngineError> {
        let b_move = self
            .board
            .resolve_move(chess_move)
            .ok_or_else(|| BoardError::IllegalMove(chess_move.to_string()))?;

        self.board.perform_move(&b_move);
        self.mcts.apply_move(&b_move);
        if let Some(book) = &self.book {
            let was_in_book = self.book_cursor.is_some();
            self.book_cursor = book.apply_move(self.book_cursor, chess_move);
            if was_in_book && self.book_cursor.is_none() {
                debug!(%chess_move, "left the opening book");
            }
        }
        Ok(())
    }

    /// Picks a move with the configured time and iteration budget.
    pub fn find_best_move(&mut self) -> Option<ChessMove> {
        let config = self.mcts.config();
        let (time_limit, iteration_limit) = (config.time_limit, config.iteration_limit);
        self.find_best_move_within(time_limit, iteration_limit)
    }

    /// Picks a move: the book's choice when it is legal here, otherwise the
    /// search result.
    pub fn find_best_move_within(&mut self, time_limit: Duration, iteration_limit: u64) -> Option<ChessMove> {
        if let Some(book_move) = self.book_move() {
            info!(%book_move, "playing book move");
            return Some(book_move);
        }

        let b_move = self.mcts.find_best_move(time_limit, iteration_limit)?;
        Some(self.board.to_chess_move(&b_move))
    }

    fn book_move(&self) -> Option<ChessMove> {
        let book = self.book.as_ref()?;
        let candidate = book.find_best_move(self.book_cursor)?;
        if self.board.resolve_move(&candidate).is_some() {
            Some(candidate)
        } else {
            debug!(%candidate, "book move is not legal here, searching instead");
            None
        }
    }

    /// Estimated probability, in `[0, 1]`, that `my_side` wins from here.
    pub fn win_probability(&self) -> f64 {
        let evaluation = self.mcts.evaluation();
        if self.board.side_to_move() == self.my_side {
            evaluation
        } else {
            1.0 - evaluation
        }
    }

    /// See `MonteCarloTreeSearch::is_game_going_to_end_soon`.
    pub fn is_game_going_to_end_soon(&self) -> bool {
        self.mcts.is_game_going_to_end_soon()
    }
}
