//! Move application and reversal with incremental hash updates.

use super::state::{NullUndo, Position, UndoRecord};
use super::types::{Color, Move, Piece, Square};
use super::zobrist::ZOBRIST;

impl Position {
    /// Destination squares for king and rook when castling. `kingside` is
    /// derived from the rook's file relative to the king so the same code
    /// handles Chess960 setups.
    pub(crate) fn castle_destinations(king_from: Square, rook_from: Square) -> (Square, Square) {
        let rank = king_from.rank();
        if rook_from.file() > king_from.file() {
            (Square::new(rank, 6), Square::new(rank, 5))
        } else {
            (Square::new(rank, 2), Square::new(rank, 3))
        }
    }

    /// Apply a pseudo-legal move. Returns the record `unmake_move` needs to
    /// restore the position byte-for-byte.
    pub fn make_move(&mut self, m: Move) -> UndoRecord {
        let us = self.stm;
        let them = us.opponent();
        let from = m.from();
        let to = m.to();

        let (_, moving_piece) = self
            .piece_at(from)
            .expect("make_move: from-square is empty");

        let rec = UndoRecord {
            captured: None,
            moving_piece,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            hash: self.hash,
            pawn_hash: self.pawn_hash,
            eval_mg: self.eval_mg,
            eval_eg: self.eval_eg,
            phase_acc: self.phase_acc,
        };
        self.history.push(self.hash);

        let mut hash = self.hash;
        let mut pawn_hash = self.pawn_hash;

        // The old en-passant file leaves the hash no matter what follows.
        if let Some(ep) = self.en_passant {
            hash ^= ZOBRIST.ep_file[ep.file()];
        }
        self.en_passant = None;

        // Remove the victim from its actual square.
        let mut captured = None;
        if m.is_en_passant() {
            let victim_sq = Square::new(from.rank(), to.file());
            self.remove_piece(victim_sq, them, Piece::Pawn);
            let key = ZOBRIST.piece_key(them, Piece::Pawn, victim_sq);
            hash ^= key;
            pawn_hash ^= key;
            captured = Some(Piece::Pawn);
        } else if !m.is_castle() {
            if let Some((_, victim)) = self.piece_at(to) {
                self.remove_piece(to, them, victim);
                let key = ZOBRIST.piece_key(them, victim, to);
                hash ^= key;
                if victim == Piece::Pawn {
                    pawn_hash ^= key;
                }
                captured = Some(victim);
            }
        }

        if m.is_castle() {
            // `to` is the rook square. Remove both pieces first so squares
            // may overlap with the destinations (possible in 960 setups).
            let (king_to, rook_to) = Self::castle_destinations(from, to);
            self.remove_piece(from, us, Piece::King);
            self.remove_piece(to, us, Piece::Rook);
            self.set_piece(king_to, us, Piece::King);
            self.set_piece(rook_to, us, Piece::Rook);
            hash ^= ZOBRIST.piece_key(us, Piece::King, from)
                ^ ZOBRIST.piece_key(us, Piece::King, king_to)
                ^ ZOBRIST.piece_key(us, Piece::Rook, to)
                ^ ZOBRIST.piece_key(us, Piece::Rook, rook_to);
        } else {
            self.remove_piece(from, us, moving_piece);
            let from_key = ZOBRIST.piece_key(us, moving_piece, from);
            hash ^= from_key;
            if moving_piece == Piece::Pawn {
                pawn_hash ^= from_key;
            }

            let placed = m.promotion_piece().unwrap_or(moving_piece);
            self.set_piece(to, us, placed);
            let to_key = ZOBRIST.piece_key(us, placed, to);
            hash ^= to_key;
            if placed == Piece::Pawn {
                pawn_hash ^= to_key;
            }

            // A double pawn push sets the new en-passant target.
            if moving_piece == Piece::Pawn && from.rank().abs_diff(to.rank()) == 2 {
                let ep = Square::new(usize::midpoint(from.rank(), to.rank()), from.file());
                self.en_passant = Some(ep);
                hash ^= ZOBRIST.ep_file[ep.file()];
            }
        }

        // Castling rights.
        let old_mask = rec.castling.mask();
        if moving_piece == Piece::King {
            self.castling.revoke_color(us);
        } else if moving_piece == Piece::Rook {
            self.castling.revoke_rook_square(from);
        }
        if captured == Some(Piece::Rook) {
            self.castling.revoke_rook_square(to);
        }
        let new_mask = self.castling.mask();
        if new_mask != old_mask {
            hash ^= ZOBRIST.castle[old_mask as usize] ^ ZOBRIST.castle[new_mask as usize];
        }

        if moving_piece == Piece::Pawn || m.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }

        self.stm = them;
        hash ^= ZOBRIST.stm;
        self.hash = hash;
        self.pawn_hash = pawn_hash;

        UndoRecord { captured, ..rec }
    }

    /// Reverse a move made by `make_move`. The position afterwards is
    /// byte-identical to the one before, including both hashes.
    pub fn unmake_move(&mut self, m: Move, rec: UndoRecord) {
        self.history.pop();

        let us = self.stm.opponent();
        let them = self.stm;
        let from = m.from();
        let to = m.to();

        if m.is_castle() {
            let (king_to, rook_to) = Self::castle_destinations(from, to);
            self.remove_piece(king_to, us, Piece::King);
            self.remove_piece(rook_to, us, Piece::Rook);
            self.set_piece(from, us, Piece::King);
            self.set_piece(to, us, Piece::Rook);
        } else {
            let placed = m.promotion_piece().unwrap_or(rec.moving_piece);
            self.remove_piece(to, us, placed);
            self.set_piece(from, us, rec.moving_piece);

            if let Some(victim) = rec.captured {
                let victim_sq = if m.is_en_passant() {
                    Square::new(from.rank(), to.file())
                } else {
                    to
                };
                self.set_piece(victim_sq, them, victim);
            }
        }

        self.stm = us;
        self.castling = rec.castling;
        self.en_passant = rec.en_passant;
        self.halfmove_clock = rec.halfmove_clock;
        self.fullmove_number = rec.fullmove_number;
        self.hash = rec.hash;
        self.pawn_hash = rec.pawn_hash;
        self.eval_mg = rec.eval_mg;
        self.eval_eg = rec.eval_eg;
        self.phase_acc = rec.phase_acc;
    }

    /// Pass the move: flip the side to move and clear the en-passant
    /// target. Used by null-move pruning.
    pub fn make_null_move(&mut self) -> NullUndo {
        let rec = NullUndo {
            en_passant: self.en_passant,
            hash: self.hash,
            halfmove_clock: self.halfmove_clock,
        };
        self.history.push(self.hash);

        let mut hash = self.hash;
        if let Some(ep) = self.en_passant {
            hash ^= ZOBRIST.ep_file[ep.file()];
        }
        self.en_passant = None;
        self.halfmove_clock += 1;
        self.stm = self.stm.opponent();
        self.hash = hash ^ ZOBRIST.stm;
        rec
    }

    pub fn unmake_null_move(&mut self, rec: NullUndo) {
        self.history.pop();
        self.stm = self.stm.opponent();
        self.en_passant = rec.en_passant;
        self.halfmove_clock = rec.halfmove_clock;
        self.hash = rec.hash;
    }
}
