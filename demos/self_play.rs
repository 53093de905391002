//! Plays one antichess game between two engines and prints the moves.
//!
//! An opening book path may be passed as the first argument. Set `RUST_LOG`
//! (for example `RUST_LOG=antichess_mcts=debug`) to see the search logs.

use antichess_mcts::board::Board;
use antichess_mcts::book::OpeningBook;
use antichess_mcts::boards::antichess::AntichessBoard;
use antichess_mcts::config::SearchConfig;
use antichess_mcts::engine::Engine;
use antichess_mcts::random::StandardRandomGenerator;
use shakmaty::Color;
use std::sync::Arc;
use std::time::Duration;

const MAX_PLIES: usize = 300;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("antichess_mcts=info".parse().unwrap()),
        )
        .init();

    let book = std::env::args()
        .nth(1)
        .and_then(OpeningBook::load_or_none)
        .map(Arc::new);

    let config = SearchConfig::default().with_time_limit(Duration::from_millis(200));
    let mut engines = [Color::White, Color::Black].map(|side| {
        let mut engine = Engine::new(
            AntichessBoard::default(),
            StandardRandomGenerator::default(),
            config.clone(),
        );
        if let Some(book) = &book {
            engine = engine.with_book(Arc::clone(book));
        }
        engine.new_game(AntichessBoard::default(), side, true);
        engine
    });

    for ply in 0..MAX_PLIES {
        let mover = ply % 2;
        let Some(chess_move) = engines[mover].find_best_move() else {
            let winner = engines[mover].board().side_to_move();
            println!("{winner:?} has no moves left and wins");
            return;
        };

        println!(
            "{:>3}. {:<6} win probability {:.2}",
            ply / 2 + 1,
            chess_move.to_string(),
            engines[mover].win_probability()
        );
        for engine in engines.iter_mut() {
            engine.apply_move(&chess_move).unwrap();
        }
    }

    println!("no result after {MAX_PLIES} plies");
}
