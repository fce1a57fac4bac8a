//! Property tests: random playouts must round-trip exactly and keep the
//! incremental hashes honest.

use proptest::prelude::*;

use crate::board::Position;

/// Play a pseudo-random legal game of up to `plies` moves driven by the
/// index stream, recording positions along the way.
fn random_playout(move_picks: &[usize]) -> (Position, Vec<(crate::board::Move, crate::board::UndoRecord)>) {
    let mut pos = Position::new();
    let mut trail = Vec::new();
    for &pick in move_picks {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            break;
        }
        let m = moves[pick % moves.len()];
        let rec = pos.make_move(m);
        trail.push((m, rec));
    }
    (pos, trail)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Unwinding any random game restores the exact starting position.
    #[test]
    fn playout_unwinds_to_start(picks in prop::collection::vec(0usize..1024, 1..60)) {
        let reference = Position::new();
        let (mut pos, trail) = random_playout(&picks);

        for (m, rec) in trail.into_iter().rev() {
            pos.unmake_move(m, rec);
        }

        prop_assert!(pos == reference);
        prop_assert_eq!(pos.hash(), reference.hash());
        prop_assert_eq!(pos.pawn_hash(), reference.pawn_hash());
    }

    /// At every point of a random game the incremental hashes agree with
    /// a from-scratch rebuild.
    #[test]
    fn incremental_hashes_stay_consistent(picks in prop::collection::vec(0usize..1024, 1..60)) {
        let (pos, _trail) = random_playout(&picks);
        prop_assert_eq!(pos.hash(), pos.compute_hash());
        prop_assert_eq!(pos.pawn_hash(), pos.compute_pawn_hash());
    }

    /// Occupancy is always the union of the piece maps.
    #[test]
    fn occupancy_matches_piece_maps(picks in prop::collection::vec(0usize..1024, 1..60)) {
        let (pos, _trail) = random_playout(&picks);
        let mut white = crate::board::Bitboard::EMPTY;
        let mut black = crate::board::Bitboard::EMPTY;
        for piece in crate::board::PIECES {
            white |= pos.pieces_of(crate::board::Color::White, piece);
            black |= pos.pieces_of(crate::board::Color::Black, piece);
        }
        prop_assert_eq!(pos.occupied_by(crate::board::Color::White), white);
        prop_assert_eq!(pos.occupied_by(crate::board::Color::Black), black);
        prop_assert_eq!(pos.occupancy(), white | black);
    }
}
