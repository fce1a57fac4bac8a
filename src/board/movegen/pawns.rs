//! Pawn move generation: pushes, double pushes, captures, promotions and
//! en passant.

use super::super::attacks;
use super::super::state::Position;
use super::super::types::{Bitboard, Color, Move, MoveList, Piece, Square, PROMOTION_PIECES};

impl Position {
    fn push_pawn_move(list: &mut MoveList, from: Square, to: Square, is_capture: bool, promo_rank: usize) {
        if to.rank() == promo_rank {
            for piece in PROMOTION_PIECES {
                list.push(Move::promotion(from, to, piece, is_capture));
            }
        } else if is_capture {
            list.push(Move::capture(from, to));
        } else {
            list.push(Move::quiet(from, to));
        }
    }

    pub(crate) fn generate_pawn_moves(&self, from: Square, list: &mut MoveList, captures_only: bool) {
        let us = self.stm;
        let forward = us.forward();
        let promo_rank = us.promotion_rank();
        let start_rank = match us {
            Color::White => 1,
            Color::Black => 6,
        };

        // Captures, including capture-promotions.
        let targets = Bitboard(attacks::pawn_attacks(us, from)) & self.occupied_by(us.opponent());
        for to in targets {
            Self::push_pawn_move(list, from, to, true, promo_rank);
        }

        // En passant: the target square is empty by construction.
        if let Some(ep) = self.en_passant {
            if Bitboard(attacks::pawn_attacks(us, from)).contains(ep) {
                list.push(Move::en_passant(from, ep));
            }
        }

        if captures_only {
            return;
        }

        // Single push, then the double push from the home rank.
        let one = from.shift_ranks(forward);
        if !self.occupancy().contains(one) {
            Self::push_pawn_move(list, from, one, false, promo_rank);
            if from.rank() == start_rank {
                let two = one.shift_ranks(forward);
                if !self.occupancy().contains(two) {
                    list.push(Move::quiet(from, two));
                }
            }
        }
    }

    pub(crate) fn generate_all_pawn_moves(&self, list: &mut MoveList, captures_only: bool) {
        for from in self.pieces_of(self.stm, Piece::Pawn) {
            self.generate_pawn_moves(from, list, captures_only);
        }
    }
}
