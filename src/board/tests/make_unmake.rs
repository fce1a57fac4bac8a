//! Apply/undo round trips and incremental hash consistency.

use crate::board::Position;

/// Every legal move from `fen` must round-trip to an identical position,
/// and the incrementally updated hashes must match a from-scratch
/// rebuild after the move.
fn check_round_trip_and_hashes(fen: &str) {
    let mut pos = Position::from_fen(fen).unwrap();
    let reference = pos.clone();
    let moves = pos.legal_moves();
    assert!(!moves.is_empty(), "no legal moves in {fen}");

    for &m in &moves {
        let rec = pos.make_move(m);

        assert_eq!(
            pos.hash(),
            pos.compute_hash(),
            "incremental hash diverged after {m:?} in {fen}"
        );
        assert_eq!(
            pos.pawn_hash(),
            pos.compute_pawn_hash(),
            "pawn hash diverged after {m:?} in {fen}"
        );

        pos.unmake_move(m, rec);

        assert!(pos == reference, "round trip failed for {m:?} in {fen}");
        assert_eq!(pos.hash(), reference.hash());
        assert_eq!(pos.pawn_hash(), reference.pawn_hash());
    }
}

#[test]
fn round_trip_from_standard_positions() {
    for fen in [
        crate::board::START_FEN,
        // Kiwipete: castling both ways, en passant potential, pins.
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R b KQkq - 0 1",
        // Rook endgame with a passed pawn race.
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        // Promotions in both directions.
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N w - - 0 1",
    ] {
        check_round_trip_and_hashes(fen);
    }
}

#[test]
fn en_passant_capture_round_trips() {
    // White just played d2d4; black may capture en passant with c4 or e4.
    let fen = "4k3/8/8/8/2pPp3/8/8/4K3 b - d3 0 1";
    check_round_trip_and_hashes(fen);

    let mut pos = Position::from_fen(fen).unwrap();
    let ep = pos.parse_uci_move("c4d3").unwrap();
    assert!(ep.is_en_passant());
    let rec = pos.make_move(ep);
    // The captured pawn disappears from d4, not d3.
    assert!(pos.piece_at("d4".parse().unwrap()).is_none());
    assert!(pos.piece_at("d3".parse().unwrap()).is_some());
    pos.unmake_move(ep, rec);
    assert!(pos.piece_at("d4".parse().unwrap()).is_some());
}

#[test]
fn castling_moves_king_and_rook() {
    let mut pos =
        Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let castle = pos.parse_uci_move("e1g1").unwrap();
    assert!(castle.is_castle());

    let rec = pos.make_move(castle);
    assert_eq!(
        pos.piece_at("g1".parse().unwrap()).map(|(_, p)| p),
        Some(crate::board::Piece::King)
    );
    assert_eq!(
        pos.piece_at("f1".parse().unwrap()).map(|(_, p)| p),
        Some(crate::board::Piece::Rook)
    );
    assert!(pos.piece_at("e1".parse().unwrap()).is_none());
    assert!(pos.piece_at("h1".parse().unwrap()).is_none());
    // Castling burns both white rights.
    assert!(!pos.castling().any_for(crate::board::Color::White));

    pos.unmake_move(castle, rec);
    assert_eq!(pos.to_fen(), "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
}

#[test]
fn rook_capture_revokes_castling_right() {
    let mut pos =
        Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let grab = pos.parse_uci_move("a1a8").unwrap();
    let rec = pos.make_move(grab);
    // Black lost queenside castling when its a8 rook fell; white lost its
    // own queenside right by moving the a1 rook.
    assert!(!pos
        .castling()
        .has(crate::board::CastlingRights::right(crate::board::Color::Black, false)));
    assert!(!pos
        .castling()
        .has(crate::board::CastlingRights::right(crate::board::Color::White, false)));
    assert_eq!(pos.hash(), pos.compute_hash());
    pos.unmake_move(grab, rec);
    assert_eq!(pos.hash(), pos.compute_hash());
}

#[test]
fn promotion_swaps_pawn_for_piece() {
    let mut pos = Position::from_fen("8/P3k3/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let promo = pos.parse_uci_move("a7a8q").unwrap();
    let rec = pos.make_move(promo);
    assert_eq!(
        pos.piece_at("a8".parse().unwrap()).map(|(_, p)| p),
        Some(crate::board::Piece::Queen)
    );
    // Pawn hash dropped the pawn; a queen leaves no pawn-hash trace.
    assert_eq!(pos.pawn_hash(), pos.compute_pawn_hash());
    pos.unmake_move(promo, rec);
    assert_eq!(
        pos.piece_at("a7".parse().unwrap()).map(|(_, p)| p),
        Some(crate::board::Piece::Pawn)
    );
}

#[test]
fn halfmove_clock_resets_on_pawn_moves_and_captures() {
    let mut pos = Position::from_fen(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 7 10",
    )
    .unwrap();
    assert_eq!(pos.halfmove_clock(), 7);

    let knight = pos.parse_uci_move("g1f3").unwrap();
    pos.make_move(knight);
    assert_eq!(pos.halfmove_clock(), 8);

    let pawn = pos.parse_uci_move("e7e5").unwrap();
    pos.make_move(pawn);
    assert_eq!(pos.halfmove_clock(), 0);
}

#[test]
fn null_move_round_trips() {
    let mut pos = Position::from_fen(
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
    )
    .unwrap();
    let reference = pos.clone();

    let rec = pos.make_null_move();
    assert_ne!(pos.hash(), reference.hash());
    assert_eq!(pos.side_to_move(), reference.side_to_move().opponent());
    assert_eq!(pos.en_passant(), None);
    assert_eq!(pos.hash(), pos.compute_hash());

    pos.unmake_null_move(rec);
    assert!(pos == reference);
}

#[test]
fn fullmove_number_advances_after_black() {
    let mut pos = Position::new();
    assert_eq!(pos.fullmove_number(), 1);
    let m1 = pos.parse_uci_move("e2e4").unwrap();
    pos.make_move(m1);
    assert_eq!(pos.fullmove_number(), 1);
    let m2 = pos.parse_uci_move("e7e5").unwrap();
    pos.make_move(m2);
    assert_eq!(pos.fullmove_number(), 2);
}

#[test]
fn tt_move_expansion_reconstructs_flags() {
    let mut pos = Position::from_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    for &m in &pos.legal_moves() {
        let expanded = pos.expand_tt_move(m.to_compact());
        assert_eq!(
            expanded,
            Some(m),
            "compact form of {m:?} did not round-trip"
        );
    }
    // Garbage never expands to a move.
    assert_eq!(Position::new().expand_tt_move(0), None);
}
