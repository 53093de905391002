use crate::board::{Board, ChessMove};
use crate::error::BoardError;
use shakmaty::fen::{Epd, Fen};
use shakmaty::variant::Antichess;
use shakmaty::{CastlingMode, EnPassantMode, File, Move, Piece, Position, Square};

/// An implementation of the `Board` trait for antichess, backed by `shakmaty`.
///
/// Captures are compulsory and the king is an ordinary piece. A player who
/// has no legal move (usually because every piece has been given away) wins.
#[derive(Debug, Clone, Default)]
pub struct AntichessBoard {
    position: Antichess,
}

impl AntichessBoard {
    /// Wraps an existing `shakmaty` position.
    pub fn new(position: Antichess) -> Self {
        Self { position }
    }

    /// The underlying `shakmaty` position.
    pub fn position(&self) -> &Antichess {
        &self.position
    }
}

impl Board for AntichessBoard {
    type Move = Move;

    fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let invalid = |reason: String| BoardError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.parse().map_err(|e| invalid(format!("{e}")))?;
        let position = parsed
            .into_position::<Antichess>(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(Self { position })
    }

    fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    fn side_to_move(&self) -> shakmaty::Color {
        self.position.turn()
    }

    fn legal_moves(&self) -> Vec<Move> {
        self.position.legal_moves().into_iter().collect()
    }

    fn is_capture(&self, b_move: &Move) -> bool {
        b_move.is_capture()
    }

    fn perform_move(&mut self, b_move: &Move) {
        self.position.play_unchecked(b_move);
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    fn squares_of(&self, piece: Piece) -> Vec<Square> {
        self.position.board().by_piece(piece).into_iter().collect()
    }

    fn with_turn_swapped(&self) -> Option<Self> {
        self.position
            .clone()
            .swap_turn()
            .ok()
            .map(|position| Self { position })
    }

    fn to_chess_move(&self, b_move: &Move) -> ChessMove {
        let promotion = b_move.promotion().map(|role| Piece {
            color: self.position.turn(),
            role,
        });
        match *b_move {
            Move::Normal { from, to, .. } => ChessMove { from, to, promotion },
            Move::EnPassant { from, to } => ChessMove::new(from, to),
            Move::Castle { king, rook } => {
                let file = if rook.file() > king.file() {
                    File::G
                } else {
                    File::C
                };
                ChessMove::new(king, Square::from_coords(file, king.rank()))
            }
            Move::Put { to, .. } => ChessMove::new(to, to),
        }
    }

    fn position_key(&self) -> String {
        Epd::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }
}
