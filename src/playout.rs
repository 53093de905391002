//! Random playouts and the terminal rules shared by search and playout.

use crate::board::{Board, Outcome};
use crate::random::RandomGenerator;
use shakmaty::{Color, Piece, Role};

/// Returns `true` when the side to move has no legal move, which in
/// antichess means that side has won.
pub fn is_winning_state<T: Board>(board: &T) -> bool {
    board.legal_moves().is_empty()
}

/// Number of capturing replies available to the side to move.
pub fn count_threats<T: Board>(board: &T) -> usize {
    board
        .legal_moves()
        .iter()
        .filter(|m| board.is_capture(m))
        .count()
}

/// The opposite-coloured bishops rule.
///
/// A position is dead drawn when each side owns exactly one bishop, the two
/// bishops stand on squares of different colours, and for both sides every
/// legal move is a bishop move. Both colours are checked, not only the side
/// to move.
pub fn is_dead_draw<T: Board>(board: &T) -> bool {
    let white = board.squares_of(bishop(Color::White));
    let black = board.squares_of(bishop(Color::Black));
    let ([white], [black]) = (white.as_slice(), black.as_slice()) else {
        return false;
    };
    if white.is_light() == black.is_light() {
        return false;
    }

    let moves = board.legal_moves();
    if moves.is_empty() || !only_bishop_moves(board, &moves) {
        return false;
    }

    match board.with_turn_swapped() {
        Some(swapped) => only_bishop_moves(board, &swapped.legal_moves()),
        None => false,
    }
}

fn only_bishop_moves<T: Board>(board: &T, moves: &[T::Move]) -> bool {
    moves.iter().all(|m| {
        let from = board.to_chess_move(m).from;
        board.piece_at(from).map(|p| p.role) == Some(Role::Bishop)
    })
}

fn bishop(color: Color) -> Piece {
    Piece {
        color,
        role: Role::Bishop,
    }
}

/// Plays uniformly random moves from `position` until somebody wins, the
/// position is a dead draw, or `max_depth` plies have been played.
pub fn playout<T: Board, K: RandomGenerator>(
    position: &T,
    random: &mut K,
    max_depth: usize,
) -> Outcome {
    playout_with_length(position, random, max_depth).0
}

/// Like `playout`, also returning the number of random plies played.
pub fn playout_with_length<T: Board, K: RandomGenerator>(
    position: &T,
    random: &mut K,
    max_depth: usize,
) -> (Outcome, usize) {
    let mut board = position.clone();
    let mut moves = board.legal_moves();
    if moves.is_empty() {
        return (Outcome::Win(board.side_to_move()), 0);
    }

    for ply in 1..=max_depth {
        let Some(random_move) = random.choose(&moves) else {
            break;
        };
        let random_move = random_move.clone();
        board.perform_move(&random_move);

        moves = board.legal_moves();
        if moves.is_empty() {
            return (Outcome::Win(board.side_to_move()), ply);
        }
        if is_dead_draw(&board) {
            return (Outcome::Draw, ply);
        }
    }

    (Outcome::Draw, max_depth)
}
