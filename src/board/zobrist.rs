//! Zobrist keys for incremental position hashing.
//!
//! All keys derive from a fixed seed so hashes are stable within a run and
//! across runs; test 11 (single-thread determinism) depends on this.

use once_cell::sync::Lazy;
use rand::prelude::*;

use super::types::{Color, Piece, Square};

pub(crate) struct ZobristKeys {
    /// `piece[colour][piece][square]`
    pub(crate) piece: [[[u64; 64]; 6]; 2],
    /// Indexed by the 4-bit castling-rights mask.
    pub(crate) castle: [u64; 16],
    /// Indexed by the en-passant file.
    pub(crate) ep_file: [u64; 8],
    /// XORed in when black is to move.
    pub(crate) stm: u64,
}

const ZOBRIST_SEED: u64 = 0x5ab1_e000_c0de;

impl ZobristKeys {
    fn derive() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut piece = [[[0u64; 64]; 6]; 2];
        for color in &mut piece {
            for kind in color.iter_mut() {
                for key in kind.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let mut castle = [0u64; 16];
        // Mask 0 contributes nothing so an empty-rights position hashes the
        // same with or without the castling term.
        for key in castle.iter_mut().skip(1) {
            *key = rng.gen();
        }

        let mut ep_file = [0u64; 8];
        for key in &mut ep_file {
            *key = rng.gen();
        }

        ZobristKeys {
            piece,
            castle,
            ep_file,
            stm: rng.gen(),
        }
    }

    #[inline]
    pub(crate) fn piece_key(&self, color: Color, piece: Piece, sq: Square) -> u64 {
        self.piece[color.index()][piece.index()][sq.index()]
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::derive);
