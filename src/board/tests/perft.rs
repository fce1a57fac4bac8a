//! Perft: exact leaf counts over the standard split positions.

use crate::board::Position;

struct PerftCase {
    name: &'static str,
    fen: &'static str,
    depths: &'static [(usize, u64)],
}

const CASES: &[PerftCase] = &[
    PerftCase {
        name: "startpos",
        fen: crate::board::START_FEN,
        depths: &[(1, 20), (2, 400), (3, 8_902), (4, 197_281), (5, 4_865_609)],
    },
    PerftCase {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        depths: &[(1, 48), (2, 2_039), (3, 97_862), (4, 4_085_603)],
    },
    PerftCase {
        name: "rook endgame",
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        depths: &[
            (1, 14),
            (2, 191),
            (3, 2_812),
            (4, 43_238),
            (5, 674_624),
            (6, 11_030_083),
        ],
    },
    PerftCase {
        name: "position 4",
        fen: "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        depths: &[(1, 6), (2, 264), (3, 9_467), (4, 422_333)],
    },
    PerftCase {
        name: "position 5",
        fen: "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        depths: &[(1, 44), (2, 1_486), (3, 62_379), (4, 2_103_487)],
    },
    PerftCase {
        name: "position 6",
        fen: "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        depths: &[(1, 46), (2, 2_079), (3, 89_890)],
    },
    PerftCase {
        name: "en passant pair",
        fen: "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        depths: &[(1, 31), (2, 707), (3, 21_637)],
    },
    PerftCase {
        name: "promotion frenzy",
        fen: "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
        depths: &[(1, 24), (2, 496), (3, 9_483)],
    },
    PerftCase {
        name: "bare castling",
        fen: "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
        depths: &[(1, 26), (2, 568), (3, 13_744)],
    },
];

fn run_case(case: &PerftCase, max_depth: usize) {
    let mut pos = Position::from_fen(case.fen).unwrap();
    for &(depth, expected) in case.depths {
        if depth > max_depth {
            continue;
        }
        let nodes = pos.perft(depth);
        assert_eq!(
            nodes, expected,
            "{} at depth {depth}: expected {expected}, got {nodes}",
            case.name
        );
    }
}

#[test]
fn perft_shallow_all_positions() {
    for case in CASES {
        run_case(case, 3);
    }
}

// The deep reference counts run as separate tests so the harness can
// spread them across threads.

#[test]
fn perft_deep_startpos() {
    run_case(&CASES[0], 5);
}

#[test]
fn perft_deep_kiwipete() {
    run_case(&CASES[1], 4);
}

#[test]
fn perft_deep_rook_endgame() {
    run_case(&CASES[2], 6);
}

#[test]
fn perft_deep_position_4() {
    run_case(&CASES[3], 4);
}

#[test]
fn perft_deep_position_5() {
    run_case(&CASES[4], 4);
}
