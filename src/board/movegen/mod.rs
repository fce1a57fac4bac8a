//! Pseudo-legal move generation with a separate legality check.
//!
//! `generate_all` and `generate_captures` enumerate pseudo-legal moves;
//! `is_legal` applies the move and tests whether the mover's king is left
//! attacked. Castling is the exception: its path conditions are checked at
//! generation time, so a generated castle is already legal.

mod pawns;
mod pieces;

use super::state::Position;
use super::types::{
    Bitboard, CastlingRights, Color, Move, MoveList, Piece, Square,
};

impl Position {
    /// All pseudo-legal moves: captures and quiets.
    #[must_use]
    pub fn generate_all(&self) -> MoveList {
        let mut list = MoveList::new();
        self.generate_all_pawn_moves(&mut list, false);
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King] {
            self.generate_piece_moves(piece, &mut list, false);
        }
        self.generate_castling(&mut list);
        list
    }

    /// Pseudo-legal captures only, including en passant and
    /// capture-promotions.
    #[must_use]
    pub fn generate_captures(&self) -> MoveList {
        let mut list = MoveList::new();
        self.generate_all_pawn_moves(&mut list, true);
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King] {
            self.generate_piece_moves(piece, &mut list, true);
        }
        list
    }

    /// Fully legal moves; convenience for the root, the UCI layer and
    /// tests.
    #[must_use]
    pub fn legal_moves(&mut self) -> MoveList {
        let pseudo = self.generate_all();
        let mut legal = MoveList::new();
        for &m in &pseudo {
            if self.is_legal(m) {
                legal.push(m);
            }
        }
        legal
    }

    /// Apply-and-test legality for a pseudo-legal move.
    #[must_use]
    pub fn is_legal(&mut self, m: Move) -> bool {
        let us = self.stm;
        let rec = self.make_move(m);
        let legal = !self.is_square_attacked(self.king_square(us), self.stm);
        self.unmake_move(m, rec);
        legal
    }

    /// Whether `m` could have been produced by the generator in this
    /// position. Used to vet hash and killer moves before trusting them.
    #[must_use]
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        if m.is_none() {
            return false;
        }
        let us = self.stm;
        let from = m.from();
        let to = m.to();
        let Some((color, piece)) = self.piece_at(from) else {
            return false;
        };
        if color != us {
            return false;
        }

        if m.is_castle() {
            return piece == Piece::King && self.castle_path_is_clear(from, to);
        }
        if m.is_en_passant() {
            return piece == Piece::Pawn
                && self.en_passant == Some(to)
                && Bitboard(super::attacks::pawn_attacks(us, from)).contains(to);
        }

        if piece == Piece::Pawn {
            if (to.rank() == us.promotion_rank()) != m.is_promotion() {
                return false;
            }
            if m.is_capture() {
                return Bitboard(super::attacks::pawn_attacks(us, from)).contains(to)
                    && self.occupied_by(us.opponent()).contains(to);
            }
            if self.occupancy().contains(to) {
                return false;
            }
            let one = from.shift_ranks(us.forward());
            if to == one {
                return true;
            }
            let start_rank = if us == Color::White { 1 } else { 6 };
            return from.rank() == start_rank
                && !self.occupancy().contains(one)
                && to == one.shift_ranks(us.forward());
        }

        if m.is_promotion() {
            return false;
        }
        let targets = self.piece_attacks(piece, from) & !self.occupied_by(us);
        targets.contains(to) && self.occupied_by(us.opponent()).contains(to) == m.is_capture()
    }

    // =====================================================================
    // Castling
    // =====================================================================

    fn generate_castling(&self, list: &mut MoveList) {
        let us = self.stm;
        if !self.castling.any_for(us) {
            return;
        }
        let king_from = self.king_square(us);
        for kingside in [true, false] {
            let right = CastlingRights::right(us, kingside);
            if !self.castling.has(right) {
                continue;
            }
            let rook_from = self.castling.rook_square(right);
            if self.castle_path_is_clear(king_from, rook_from) {
                list.push(Move::castle(king_from, rook_from));
            }
        }
    }

    /// Full castling conditions: the right is held with its rook present,
    /// both travel paths are empty of other pieces, the king is not in
    /// check, and no square the king crosses (destination included) is
    /// attacked.
    fn castle_path_is_clear(&self, king_from: Square, rook_from: Square) -> bool {
        let us = self.stm;
        let kingside = rook_from.file() > king_from.file();
        let right = CastlingRights::right(us, kingside);
        if !self.castling.has(right) || self.castling.rook_square(right) != rook_from {
            return false;
        }
        if !self.pieces_of(us, Piece::Rook).contains(rook_from) {
            return false;
        }

        let (king_to, rook_to) = Self::castle_destinations(king_from, rook_from);
        let rank = king_from.rank();

        // Travel squares must be empty, ignoring the two castling pieces
        // themselves (they may cross each other in 960 setups).
        let movers = Bitboard::from_square(king_from) | Bitboard::from_square(rook_from);
        let blockers = self.occupancy() & !movers;
        for path in [
            (king_from.file(), king_to.file()),
            (rook_from.file(), rook_to.file()),
        ] {
            let (lo, hi) = (path.0.min(path.1), path.0.max(path.1));
            for file in lo..=hi {
                if blockers.contains(Square::new(rank, file)) {
                    return false;
                }
            }
        }

        // King must not start in, pass through, or land on an attacked
        // square.
        let them = us.opponent();
        let (lo, hi) = (
            king_from.file().min(king_to.file()),
            king_from.file().max(king_to.file()),
        );
        for file in lo..=hi {
            if self.is_square_attacked(Square::new(rank, file), them) {
                return false;
            }
        }
        true
    }

    // =====================================================================
    // Perft
    // =====================================================================

    /// Leaf count of the legal move tree to `depth`.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.generate_all();
        let mut nodes = 0;
        for &m in &moves {
            let us = self.stm;
            let rec = self.make_move(m);
            if !self.is_square_attacked(self.king_square(us), self.stm) {
                nodes += if depth == 1 { 1 } else { self.perft(depth - 1) };
            }
            self.unmake_move(m, rec);
        }
        nodes
    }

    /// Whether the side to move has been checkmated.
    #[must_use]
    pub fn is_checkmate(&mut self) -> bool {
        self.in_check() && self.legal_moves().is_empty()
    }

    /// Whether the side to move has been stalemated.
    #[must_use]
    pub fn is_stalemate(&mut self) -> bool {
        !self.in_check() && self.legal_moves().is_empty()
    }
}
