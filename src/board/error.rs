//! Error types for board construction and move parsing.

use std::fmt;

/// Failure while parsing a Forsyth position string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has too few whitespace-separated fields (needs 4).
    TooFewParts { found: usize },
    /// Invalid piece character in the placement field.
    InvalidPiece { char: char },
    /// Invalid castling character.
    InvalidCastling { char: char },
    /// Castling right named with no matching rook on the back rank.
    MissingCastlingRook { char: char },
    /// Invalid side to move (must be 'w' or 'b').
    InvalidSideToMove { found: String },
    /// Invalid en passant square.
    InvalidEnPassant { found: String },
    /// Placement field has the wrong number of ranks.
    BadRankCount { found: usize },
    /// A rank describes more than eight files.
    TooManyFiles { rank: usize },
    /// A side is missing its king, or has more than one.
    BadKingCount { color: &'static str, found: u32 },
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewParts { found } => {
                write!(f, "FEN needs at least 4 fields, found {found}")
            }
            FenError::InvalidPiece { char } => write!(f, "invalid piece character '{char}'"),
            FenError::InvalidCastling { char } => write!(f, "invalid castling character '{char}'"),
            FenError::MissingCastlingRook { char } => {
                write!(f, "castling right '{char}' has no matching rook")
            }
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidEnPassant { found } => {
                write!(f, "invalid en passant square '{found}'")
            }
            FenError::BadRankCount { found } => {
                write!(f, "placement field has {found} ranks, expected 8")
            }
            FenError::TooManyFiles { rank } => write!(f, "too many files in rank {rank}"),
            FenError::BadKingCount { color, found } => {
                write!(f, "{color} has {found} kings")
            }
        }
    }
}

impl std::error::Error for FenError {}

/// Failure while parsing a long-algebraic move string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move string has the wrong length (must be 4-5 characters).
    InvalidLength { len: usize },
    /// Invalid square notation.
    InvalidSquare { notation: String },
    /// Invalid promotion suffix.
    InvalidPromotion { char: char },
    /// The move is not legal in the current position.
    IllegalMove { notation: String },
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::InvalidLength { len } => {
                write!(f, "move must be 4-5 characters, found {len}")
            }
            MoveParseError::InvalidSquare { notation } => {
                write!(f, "invalid square in '{notation}'")
            }
            MoveParseError::InvalidPromotion { char } => {
                write!(f, "invalid promotion piece '{char}'")
            }
            MoveParseError::IllegalMove { notation } => write!(f, "illegal move '{notation}'"),
        }
    }
}

impl std::error::Error for MoveParseError {}

/// Failure while parsing a square name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    InvalidNotation { notation: String },
}

impl fmt::Display for SquareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquareError::InvalidNotation { notation } => {
                write!(f, "invalid square notation '{notation}'")
            }
        }
    }
}

impl std::error::Error for SquareError {}
