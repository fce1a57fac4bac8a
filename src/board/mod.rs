//! Board representation and game rules.
//!
//! Bitboard-based position with incremental Zobrist hashing, pseudo-legal
//! move generation, static exchange evaluation and draw detection.

pub(crate) mod attacks;
mod error;
mod fen;
mod make_unmake;
mod movegen;
pub(crate) mod see;
mod state;
mod types;
mod zobrist;

#[cfg(test)]
mod tests;

pub use error::{FenError, MoveParseError, SquareError};
pub use fen::START_FEN;
pub use state::{DrawKind, NullUndo, Position, UndoRecord};
pub use types::{
    Bitboard, CastlingRights, Color, Move, MoveList, Piece, ScoredMove, ScoredMoveList, Square,
    MAX_PLY, PIECES, PROMOTION_PIECES,
};

pub(crate) use see::see_value;
