//! Forsyth notation parsing and printing, plus long-algebraic move
//! parsing.

use std::str::FromStr;

use super::error::{FenError, MoveParseError};
use super::state::Position;
use super::types::{CastlingRights, Color, Move, Piece, Square};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Position {
    /// Parse a position from a Forsyth string. Accepts classic `KQkq`
    /// castling letters as well as Shredder file letters for 960 setups.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        let mut pos = Position::empty();

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadRankCount { found: ranks.len() });
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    if file >= 8 {
                        return Err(FenError::TooManyFiles { rank });
                    }
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    pos.set_piece(Square::new(rank, file), color, piece);
                    file += 1;
                }
            }
            if file > 8 {
                return Err(FenError::TooManyFiles { rank });
            }
        }

        for color in [Color::White, Color::Black] {
            let kings = pos.pieces_of(color, Piece::King).count();
            if kings != 1 {
                return Err(FenError::BadKingCount {
                    color: match color {
                        Color::White => "white",
                        Color::Black => "black",
                    },
                    found: kings,
                });
            }
        }

        pos.stm = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        pos.castling = Self::parse_castling(&pos, parts[2])?;

        pos.en_passant = if parts[3] == "-" {
            None
        } else {
            Some(
                Square::from_str(parts[3]).map_err(|_| FenError::InvalidEnPassant {
                    found: parts[3].to_string(),
                })?,
            )
        };

        pos.halfmove_clock = parts
            .get(4)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        pos.fullmove_number = parts
            .get(5)
            .and_then(|s| s.parse().ok())
            .unwrap_or(1)
            .max(1);

        pos.hash = pos.compute_hash();
        pos.pawn_hash = pos.compute_pawn_hash();
        Ok(pos)
    }

    /// Resolve a castling field character to a right plus rook square.
    /// Classic letters pick the outermost rook on the appropriate wing;
    /// file letters name the rook directly.
    fn parse_castling(pos: &Position, field: &str) -> Result<CastlingRights, FenError> {
        let mut rights = CastlingRights::none();
        if field == "-" {
            return Ok(rights);
        }

        for c in field.chars() {
            let color = if c.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let back_rank = match color {
                Color::White => 0,
                Color::Black => 7,
            };
            let king_file = pos.king_square(color).file();
            let rooks = pos.pieces_of(color, Piece::Rook);

            let rook_file = match c.to_ascii_lowercase() {
                'k' => (king_file + 1..8)
                    .rev()
                    .find(|&f| rooks.contains(Square::new(back_rank, f))),
                'q' => (0..king_file).find(|&f| rooks.contains(Square::new(back_rank, f))),
                f @ 'a'..='h' => {
                    let file = f as usize - 'a' as usize;
                    rooks.contains(Square::new(back_rank, file)).then_some(file)
                }
                _ => return Err(FenError::InvalidCastling { char: c }),
            }
            .ok_or(FenError::MissingCastlingRook { char: c })?;

            let kingside = rook_file > king_file;
            rights.grant(
                CastlingRights::right(color, kingside),
                Square::new(back_rank, rook_file),
            );
        }
        Ok(rights)
    }

    /// Render the current position as a Forsyth string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.to_fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        format!(
            "{} {} {} {} {} {}",
            placement,
            match self.stm {
                Color::White => "w",
                Color::Black => "b",
            },
            self.castling.to_fen(),
            self.en_passant
                .map_or_else(|| "-".to_string(), |sq| sq.to_string()),
            self.halfmove_clock,
            self.fullmove_number,
        )
    }

    /// Parse a move in long algebraic coordinate form against the current
    /// position. Castling is accepted both as king-to-g/c (standard) and
    /// king-to-rook-square (960) notation.
    pub fn parse_uci_move(&mut self, s: &str) -> Result<Move, MoveParseError> {
        if s.len() < 4 || s.len() > 5 {
            return Err(MoveParseError::InvalidLength { len: s.len() });
        }
        let from = Square::from_str(&s[0..2]).map_err(|_| MoveParseError::InvalidSquare {
            notation: s.to_string(),
        })?;
        let to = Square::from_str(&s[2..4]).map_err(|_| MoveParseError::InvalidSquare {
            notation: s.to_string(),
        })?;
        let promotion = match s.chars().nth(4) {
            None => None,
            Some(c) => {
                let piece = Piece::from_char(c).ok_or(MoveParseError::InvalidPromotion {
                    char: c,
                })?;
                if matches!(piece, Piece::Pawn | Piece::King) {
                    return Err(MoveParseError::InvalidPromotion { char: c });
                }
                Some(piece)
            }
        };

        for &m in &self.legal_moves() {
            if m.from() != from || m.promotion_piece() != promotion {
                continue;
            }
            if m.to() == to {
                return Ok(m);
            }
            // Standard castling notation addresses the king's landing
            // square rather than the rook.
            if m.is_castle() {
                let (king_to, _) = Self::castle_destinations(m.from(), m.to());
                if king_to == to {
                    return Ok(m);
                }
            }
        }

        Err(MoveParseError::IllegalMove {
            notation: s.to_string(),
        })
    }
}
