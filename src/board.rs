use crate::error::BoardError;
use shakmaty::{Color, Piece, Role, Square};
use std::fmt;
use std::fmt::Debug;

/// The capability interface the search consumes from a chess rules engine.
///
/// Implementations must follow the antichess move rules: when any capture is
/// available, `legal_moves` returns exactly the captures. A side with no legal
/// moves has won the game.
pub trait Board: Default + Clone + Debug {
    /// The rules engine's native move type.
    type Move: Clone + PartialEq + Debug;

    /// Loads a position from FEN.
    fn from_fen(fen: &str) -> Result<Self, BoardError>;

    /// Serializes the position as FEN.
    fn fen(&self) -> String;

    /// Returns the side whose turn it is.
    fn side_to_move(&self) -> Color;

    /// Returns the legal moves, filtered by the compulsory-capture rule.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// Returns `true` if `b_move` captures a piece in this position.
    fn is_capture(&self, b_move: &Self::Move) -> bool;

    /// Applies a move in place. The move must come from `legal_moves`.
    fn perform_move(&mut self, b_move: &Self::Move);

    /// Returns the piece standing on `square`, if any.
    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// Returns every square holding `piece`.
    fn squares_of(&self, piece: Piece) -> Vec<Square>;

    /// Returns a copy of this position with the other side to move, or `None`
    /// if such a position can not be represented.
    fn with_turn_swapped(&self) -> Option<Self>;

    /// Converts a native move into its board-independent form.
    fn to_chess_move(&self, b_move: &Self::Move) -> ChessMove;

    /// Identity of the position, independent of move counters.
    fn position_key(&self) -> String;

    /// Finds the legal move matching a board-independent move.
    fn resolve_move(&self, chess_move: &ChessMove) -> Option<Self::Move> {
        self.legal_moves()
            .into_iter()
            .find(|m| self.to_chess_move(m) == *chess_move)
    }
}

/// Result of a finished (or abandoned) game.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Outcome {
    /// The given side has won.
    Win(Color),
    /// Nobody can win, or the playout hit its depth cap.
    Draw,
}

/// A move described only by its squares and promotion piece.
///
/// This is the form used by the opening book and by callers outside the
/// search. The promotion piece carries the mover's colour.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct ChessMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl ChessMove {
    /// A move without promotion.
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Sets the piece a pawn promotes to.
    pub fn with_promotion(mut self, promotion: Piece) -> Self {
        self.promotion = Some(promotion);
        self
    }

    /// Parses long algebraic notation such as `e2e4` or `b7b8q`.
    ///
    /// `side` is the side making the move; it colours the promotion piece.
    pub fn from_uci(text: &str, side: Color) -> Result<Self, BoardError> {
        let invalid = || BoardError::InvalidMoveNotation(text.to_string());
        let text = text.trim();
        if !(4..=5).contains(&text.len()) || !text.is_ascii() {
            return Err(invalid());
        }

        let from: Square = text[0..2].parse().map_err(|_| invalid())?;
        let to: Square = text[2..4].parse().map_err(|_| invalid())?;
        let promotion = match text[4..].chars().next() {
            None => None,
            Some(ch) => {
                let role = Role::from_char(ch.to_ascii_lowercase()).ok_or_else(invalid)?;
                Some(Piece { color: side, role })
            }
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{}", piece.role.char())?;
        }
        Ok(())
    }
}
