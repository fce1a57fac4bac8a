//! Knight, bishop, rook, queen and king move generation from the attack
//! tables.

use super::super::attacks;
use super::super::state::Position;
use super::super::types::{Bitboard, Move, MoveList, Piece, Square};

impl Position {
    /// Attack set for a piece standing on `from` under the current
    /// occupancy.
    pub(crate) fn piece_attacks(&self, piece: Piece, from: Square) -> Bitboard {
        let occ = self.occupancy().0;
        Bitboard(match piece {
            Piece::Knight => attacks::knight_attacks(from),
            Piece::Bishop => attacks::bishop_attacks(from, occ),
            Piece::Rook => attacks::rook_attacks(from, occ),
            Piece::Queen => attacks::queen_attacks(from, occ),
            Piece::King => attacks::king_attacks(from),
            Piece::Pawn => attacks::pawn_attacks(self.stm, from),
        })
    }

    pub(crate) fn generate_piece_moves(&self, piece: Piece, list: &mut MoveList, captures_only: bool) {
        let us = self.stm;
        let enemies = self.occupied_by(us.opponent());
        for from in self.pieces_of(us, piece) {
            let targets = self.piece_attacks(piece, from) & !self.occupied_by(us);
            for to in targets {
                if enemies.contains(to) {
                    list.push(Move::capture(from, to));
                } else if !captures_only {
                    list.push(Move::quiet(from, to));
                }
            }
        }
    }
}
