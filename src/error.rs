use thiserror::Error;

/// Errors raised by a `Board` implementation or while reading move notation.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("invalid move notation: {0:?}")]
    InvalidMoveNotation(String),

    #[error("illegal move {0} in this position")]
    IllegalMove(String),
}

/// Errors that prevent an opening book from being loaded at all.
///
/// Damage found after the first record is not an error: the book keeps
/// whatever was parsed up to that point.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("I/O error while reading opening book: {0}")]
    Io(#[from] std::io::Error),

    #[error("opening book stream contains no records")]
    Empty,

    #[error("malformed book record: square index {0} out of range")]
    InvalidSquare(u8),
}

/// Errors surfaced by the `Engine` facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Board(#[from] BoardError),
}
