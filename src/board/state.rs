//! Position state: piece bitboards, castling, hashes, repetition history.

use super::attacks;
use super::types::{
    Bitboard, CastlingRights, Color, Move, Piece, Square, DARK_SQUARES, LIGHT_SQUARES, PIECES,
};
use super::zobrist::ZOBRIST;
use crate::eval::pst::{piece_phase, tapered_bonus};

/// Why a position is a theoretical draw.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DrawKind {
    /// Half-move clock reached 100.
    FiftyMove,
    /// The current hash already occurred in the reversible history.
    Repetition,
    /// Neither side can deliver mate.
    InsufficientMaterial,
}

/// Everything `make_move` needs saved to restore the position exactly.
#[derive(Clone, Debug)]
pub struct UndoRecord {
    pub(crate) captured: Option<Piece>,
    pub(crate) moving_piece: Piece,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    pub(crate) hash: u64,
    pub(crate) pawn_hash: u64,
    pub(crate) eval_mg: [i32; 2],
    pub(crate) eval_eg: [i32; 2],
    pub(crate) phase_acc: [i32; 2],
}

/// Saved state for a null move.
pub struct NullUndo {
    pub(crate) en_passant: Option<Square>,
    pub(crate) hash: u64,
    pub(crate) halfmove_clock: u32,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    pub(crate) pieces: [[Bitboard; 6]; 2],
    pub(crate) occupied: [Bitboard; 2],
    pub(crate) all_occupied: Bitboard,
    pub(crate) stm: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    pub(crate) hash: u64,
    pub(crate) pawn_hash: u64,
    /// Hashes of earlier positions, oldest first. Pushed by `make_move`,
    /// popped by `unmake_move`; the UCI layer preloads game history here.
    pub(crate) history: Vec<u64>,
    // Incremental tapered-evaluation accumulators, per colour.
    pub(crate) eval_mg: [i32; 2],
    pub(crate) eval_eg: [i32; 2],
    pub(crate) phase_acc: [i32; 2],
}

impl Position {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        let mut pos = Position::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (file, piece) in back_rank.into_iter().enumerate() {
            pos.set_piece(Square::new(0, file), Color::White, piece);
            pos.set_piece(Square::new(1, file), Color::White, Piece::Pawn);
            pos.set_piece(Square::new(6, file), Color::Black, Piece::Pawn);
            pos.set_piece(Square::new(7, file), Color::Black, piece);
        }
        pos.castling = CastlingRights::standard();
        pos.hash = pos.compute_hash();
        pos.pawn_hash = pos.compute_pawn_hash();
        pos
    }

    pub(crate) fn empty() -> Self {
        Position {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            stm: Color::White,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            pawn_hash: 0,
            history: Vec::with_capacity(256),
            eval_mg: [0; 2],
            eval_eg: [0; 2],
            phase_acc: [0; 2],
        }
    }

    // =====================================================================
    // Piece placement. These keep occupancy and the evaluation accumulators
    // in sync; hashes are maintained by the callers.
    // =====================================================================

    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bit = Bitboard::from_square(sq);
        let c = color.index();
        self.pieces[c][piece.index()] |= bit;
        self.occupied[c] |= bit;
        self.all_occupied |= bit;

        let (mg, eg) = tapered_bonus(piece, sq, color);
        self.eval_mg[c] += mg;
        self.eval_eg[c] += eg;
        self.phase_acc[c] += piece_phase(piece);
    }

    pub(crate) fn remove_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bit = Bitboard::from_square(sq);
        let c = color.index();
        self.pieces[c][piece.index()] &= !bit;
        self.occupied[c] &= !bit;
        self.all_occupied &= !bit;

        let (mg, eg) = tapered_bonus(piece, sq, color);
        self.eval_mg[c] -= mg;
        self.eval_eg[c] -= eg;
        self.phase_acc[c] -= piece_phase(piece);
    }

    // =====================================================================
    // Queries
    // =====================================================================

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.stm
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    #[must_use]
    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[inline]
    #[must_use]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    #[must_use]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    #[must_use]
    pub(crate) fn pieces_of(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    #[inline]
    #[must_use]
    pub(crate) fn occupied_by(&self, color: Color) -> Bitboard {
        self.occupied[color.index()]
    }

    #[inline]
    #[must_use]
    pub(crate) fn occupancy(&self) -> Bitboard {
        self.all_occupied
    }

    /// Piece and colour on a square, or `None` when empty.
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        if !self.all_occupied.contains(sq) {
            return None;
        }
        let color = if self.occupied[0].contains(sq) {
            Color::White
        } else {
            Color::Black
        };
        for piece in PIECES {
            if self.pieces[color.index()][piece.index()].contains(sq) {
                return Some((color, piece));
            }
        }
        None
    }

    /// The king square for a side. A well-formed position always has one.
    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        self.pieces_of(color, Piece::King).lsb()
    }

    /// Bishops and queens of both sides.
    #[inline]
    pub(crate) fn diagonal_sliders(&self) -> Bitboard {
        self.pieces[0][Piece::Bishop.index()]
            | self.pieces[1][Piece::Bishop.index()]
            | self.pieces[0][Piece::Queen.index()]
            | self.pieces[1][Piece::Queen.index()]
    }

    /// Rooks and queens of both sides.
    #[inline]
    pub(crate) fn straight_sliders(&self) -> Bitboard {
        self.pieces[0][Piece::Rook.index()]
            | self.pieces[1][Piece::Rook.index()]
            | self.pieces[0][Piece::Queen.index()]
            | self.pieces[1][Piece::Queen.index()]
    }

    /// All pieces of either colour attacking `sq` under the given occupancy.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let mut attackers = Bitboard::EMPTY;

        // A pawn attacks sq if sq is in the pawn-attack set looking the
        // other way.
        attackers |= Bitboard(attacks::pawn_attacks(Color::White, sq))
            & self.pieces_of(Color::Black, Piece::Pawn);
        attackers |= Bitboard(attacks::pawn_attacks(Color::Black, sq))
            & self.pieces_of(Color::White, Piece::Pawn);

        attackers |= Bitboard(attacks::knight_attacks(sq))
            & (self.pieces[0][Piece::Knight.index()] | self.pieces[1][Piece::Knight.index()]);
        attackers |= Bitboard(attacks::king_attacks(sq))
            & (self.pieces[0][Piece::King.index()] | self.pieces[1][Piece::King.index()]);
        attackers |= Bitboard(attacks::bishop_attacks(sq, occupied.0)) & self.diagonal_sliders();
        attackers |= Bitboard(attacks::rook_attacks(sq, occupied.0)) & self.straight_sliders();

        attackers
    }

    /// Whether `by` attacks `sq` in the current occupancy.
    #[must_use]
    pub(crate) fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        let b = by.index();
        if Bitboard(attacks::pawn_attacks(by.opponent(), sq))
            .0
            & self.pieces[b][Piece::Pawn.index()].0
            != 0
        {
            return true;
        }
        if attacks::knight_attacks(sq) & self.pieces[b][Piece::Knight.index()].0 != 0 {
            return true;
        }
        if attacks::king_attacks(sq) & self.pieces[b][Piece::King.index()].0 != 0 {
            return true;
        }
        let occ = self.all_occupied.0;
        let diag = self.pieces[b][Piece::Bishop.index()].0 | self.pieces[b][Piece::Queen.index()].0;
        if attacks::bishop_attacks(sq, occ) & diag != 0 {
            return true;
        }
        let straight =
            self.pieces[b][Piece::Rook.index()].0 | self.pieces[b][Piece::Queen.index()].0;
        attacks::rook_attacks(sq, occ) & straight != 0
    }

    /// Whether the side to move is in check.
    #[must_use]
    pub fn in_check(&self) -> bool {
        let king = self.pieces_of(self.stm, Piece::King);
        if king.is_empty() {
            return false;
        }
        self.is_square_attacked(king.lsb(), self.stm.opponent())
    }

    /// Non-pawn, non-king material for a side; the null-move guard.
    #[must_use]
    pub(crate) fn non_pawn_pieces(&self, color: Color) -> u32 {
        let c = color.index();
        (self.pieces[c][Piece::Knight.index()]
            | self.pieces[c][Piece::Bishop.index()]
            | self.pieces[c][Piece::Rook.index()]
            | self.pieces[c][Piece::Queen.index()])
        .count()
    }

    /// Game phase in [0, 256]: 256 at the starting material, 0 in a bare
    /// endgame.
    #[must_use]
    pub fn phase(&self) -> i32 {
        const FULL_PHASE: i32 = 24;
        let total = self.phase_acc[0] + self.phase_acc[1];
        (total.min(FULL_PHASE) * 256) / FULL_PHASE
    }

    // =====================================================================
    // Draw predicates
    // =====================================================================

    /// The theoretical-draw check the search runs before any other work at
    /// a node; one repetition suffices (an upcoming threefold).
    #[must_use]
    pub fn draw_kind(&self) -> Option<DrawKind> {
        if self.halfmove_clock >= 100 {
            return Some(DrawKind::FiftyMove);
        }
        if self.has_repetition() {
            return Some(DrawKind::Repetition);
        }
        if self.insufficient_material() {
            return Some(DrawKind::InsufficientMaterial);
        }
        None
    }

    /// Whether the current hash already occurred since the last
    /// irreversible move.
    #[must_use]
    pub fn has_repetition(&self) -> bool {
        let window = (self.halfmove_clock as usize).min(self.history.len());
        self.history
            .iter()
            .rev()
            .take(window)
            .any(|&h| h == self.hash)
    }

    /// K vs K, K+minor vs K, and same-coloured-bishop endings.
    #[must_use]
    pub fn insufficient_material(&self) -> bool {
        let majors_or_pawns = self.pieces[0][Piece::Pawn.index()]
            | self.pieces[1][Piece::Pawn.index()]
            | self.straight_sliders();
        if majors_or_pawns.any() {
            return false;
        }

        let knights =
            self.pieces[0][Piece::Knight.index()] | self.pieces[1][Piece::Knight.index()];
        let bishops =
            self.pieces[0][Piece::Bishop.index()] | self.pieces[1][Piece::Bishop.index()];
        let minors = knights.count() + bishops.count();

        if minors <= 1 {
            return true;
        }
        // Any number of bishops all on one square colour cannot mate.
        if knights.is_empty() {
            return (bishops & LIGHT_SQUARES).is_empty() || (bishops & DARK_SQUARES).is_empty();
        }
        false
    }

    // =====================================================================
    // Hash reconstruction (the incremental updates are validated against
    // these in the board tests)
    // =====================================================================

    /// Zobrist hash rebuilt from scratch.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        let mut hash = 0u64;
        for color in [Color::White, Color::Black] {
            for piece in PIECES {
                for sq in self.pieces_of(color, piece) {
                    hash ^= ZOBRIST.piece_key(color, piece, sq);
                }
            }
        }
        hash ^= ZOBRIST.castle[self.castling.mask() as usize];
        if let Some(ep) = self.en_passant {
            hash ^= ZOBRIST.ep_file[ep.file()];
        }
        if self.stm == Color::Black {
            hash ^= ZOBRIST.stm;
        }
        hash
    }

    /// Pawn-only hash rebuilt from scratch.
    #[must_use]
    pub fn compute_pawn_hash(&self) -> u64 {
        let mut hash = 0u64;
        for color in [Color::White, Color::Black] {
            for sq in self.pieces_of(color, Piece::Pawn) {
                hash ^= ZOBRIST.piece_key(color, Piece::Pawn, sq);
            }
        }
        hash
    }

    /// Load prior game hashes so the search detects upcoming threefolds
    /// across the `position ... moves ...` replay boundary.
    pub fn load_history(&mut self, hashes: &[u64]) {
        self.history.clear();
        self.history.extend_from_slice(hashes);
    }

    /// Reconstruct a 16-bit transposition-table move into a full move, or
    /// `None` when it does not fit the current position. The flag bits are
    /// not stored in the table; they are re-derived from board context.
    #[must_use]
    pub(crate) fn expand_tt_move(&self, compact: u16) -> Option<Move> {
        if compact == 0 {
            return None;
        }
        let from = Move::compact_from(compact);
        let to = Move::compact_to(compact);
        let promo = Move::compact_promotion(compact);

        let (color, piece) = self.piece_at(from)?;
        if color != self.stm {
            return None;
        }

        let mv = match self.piece_at(to) {
            Some((victim_color, victim)) if victim_color == self.stm => {
                // Own piece on the target: only valid as castling onto the
                // rook square.
                if piece == Piece::King && victim == Piece::Rook {
                    Move::castle(from, to)
                } else {
                    return None;
                }
            }
            Some(_) => match promo {
                Some(p) => Move::promotion(from, to, p, true),
                None => Move::capture(from, to),
            },
            None => {
                if piece == Piece::Pawn && self.en_passant == Some(to) && from.file() != to.file() {
                    Move::en_passant(from, to)
                } else if let Some(p) = promo {
                    Move::promotion(from, to, p, false)
                } else {
                    Move::quiet(from, to)
                }
            }
        };

        self.is_pseudo_legal(mv).then_some(mv)
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}
