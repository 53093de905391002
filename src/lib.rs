//! Monte Carlo tree search for antichess.
//!
//! In antichess captures are compulsory and a player wins by running out of
//! legal moves. The search in this crate is tuned for that: selection adds a
//! bonus for moves that leave the opponent with captures, terminal positions
//! are recognised while expanding, and lines where the opponent never has a
//! choice are proven and cached as forced wins. An optional proof-number
//! opening book is consulted before searching.
//!
//! # Example
//!
//! ```rust
//! use antichess_mcts::board::Board;
//! use antichess_mcts::boards::antichess::AntichessBoard;
//! use antichess_mcts::config::SearchConfig;
//! use antichess_mcts::engine::Engine;
//! use antichess_mcts::random::SeededRandomGenerator;
//!
//! // White gives its last piece away
//! let board = AntichessBoard::from_fen("8/8/8/8/8/8/1N6/r7 w - -").unwrap();
//! let mut engine = Engine::new(board, SeededRandomGenerator::new(1), SearchConfig::for_testing(1000));
//!
//! let best_move = engine.find_best_move().unwrap();
//! engine.apply_move(&best_move).unwrap();
//!
//! println!("The best move is {best_move}, win probability {:.2}", engine.win_probability());
//! ```

/// The `Board` trait, the board-independent `ChessMove`, and game outcomes.
pub mod board;
/// Implementations of the `Board` trait.
pub mod boards;
/// The proof-number opening book.
pub mod book;
/// Search parameters.
pub mod config;
/// Game-level facade combining the board, the search and the book.
pub mod engine;
/// Error types for boards, books and the engine.
pub mod error;
/// Flat Monte Carlo search without a tree.
pub mod flat;
/// Cache of proven forced wins.
pub mod forced;
/// The core module of the library, containing the `MonteCarloTreeSearch` implementation.
pub mod mcts;
/// Contains the `MctsNode` struct, which represents a node in the search tree.
pub mod mcts_node;
/// Random playouts and the terminal rules they share with the search.
pub mod playout;
/// Contains traits and implementations for random number generation.
pub mod random;
