//! End-to-end search behaviour through the worker pool.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use sable::board::Position;
use sable::search::smp::{PoolConfig, SearchPool};
use sable::search::{mate_in, InfoCallback, SearchClock, SearchInfo, SearchLimits};
use sable::uci::format_move;

fn depth_limits(depth: i32) -> SearchLimits {
    SearchLimits::depth_only(depth)
}

fn timed_limits(budget_ms: u64) -> SearchLimits {
    let start = Instant::now();
    let soft = start + Duration::from_millis(budget_ms * 80 / 100);
    let hard = start + Duration::from_millis(budget_ms);
    SearchLimits {
        depth: 127,
        nodes: None,
        clock: Arc::new(SearchClock::new(start, Some(soft), Some(hard))),
        infinite: false,
        searchmoves: Vec::new(),
        multipv: 1,
    }
}

#[test]
fn finds_mate_in_one_at_depth_one() {
    // Qd7 is mate, protected by the king.
    let pos = Position::from_fen("3k4/8/3K4/3Q4/8/8/8/8 w - - 0 1").unwrap();
    let pool = SearchPool::new(1, 16);
    let report = pool.start_search(&pos, &depth_limits(1), None);

    assert_eq!(mate_in(report.score), Some(1), "score {}", report.score);
}

#[test]
fn back_rank_mate_in_one() {
    let mut pos = Position::from_fen("4k3/8/4K3/8/8/8/8/R7 w - - 0 1").unwrap();
    let pool = SearchPool::new(1, 16);
    let report = pool.start_search(&pos, &depth_limits(2), None);

    let best = report.best_move.expect("a move");
    assert_eq!(format_move(best, false), "a1a8");
    assert_eq!(mate_in(report.score), Some(1));

    pos.make_move(best);
    assert!(pos.is_checkmate());
}

#[test]
fn wins_the_undefended_pawn() {
    let pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
    let pool = SearchPool::new(1, 16);
    let report = pool.start_search(&pos, &depth_limits(4), None);

    let best = report.best_move.expect("a move");
    assert_eq!(format_move(best, false), "e4d5");
    assert!(report.score >= 80, "score {}", report.score);
}

#[test]
fn avoids_stalemating_a_won_position() {
    let pos = Position::from_fen("k7/8/1K6/8/8/8/8/Q7 w - - 0 1").unwrap();
    let pool = SearchPool::new(1, 16);
    let report = pool.start_search(&pos, &depth_limits(5), None);

    let mut after = pos.clone();
    after.make_move(report.best_move.expect("a move"));
    assert!(
        !after.is_stalemate(),
        "engine chose a stalemating move in a won position"
    );
    assert!(report.score > 400, "score {}", report.score);
}

#[test]
fn mate_and_stalemate_roots_return_no_move() {
    // Fool's mate delivered: white is checkmated, no move exists.
    let pos = Position::from_fen(
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
    )
    .unwrap();
    let pool = SearchPool::new(1, 16);
    let report = pool.start_search(&pos, &depth_limits(3), None);
    assert!(report.best_move.is_none());

    // Classic stalemate: black to move has nothing.
    let stale = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    let report = pool.start_search(&stale, &depth_limits(3), None);
    assert!(report.best_move.is_none());
}

#[test]
fn draws_score_zero_without_contempt_and_negative_with() {
    // King vs king: every line is a dead draw.
    let pos = Position::from_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();

    let pool = SearchPool::new(1, 4);
    let report = pool.start_search(&pos, &depth_limits(4), None);
    assert_eq!(report.score, 0);

    let contempt_pool = SearchPool::new(1, 4);
    contempt_pool.set_config(PoolConfig {
        contempt: 50,
        ..PoolConfig::default()
    });
    let report = contempt_pool.start_search(&pos, &depth_limits(4), None);
    assert_eq!(report.score, -50, "draws should displease a proud engine");
}

#[test]
fn repetition_line_is_scored_as_draw() {
    // Shuffle knights out and back twice; the resulting position has
    // already occurred, and one more revisit is an immediate draw.
    let mut pos = Position::new();
    for m in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
        let parsed = pos.parse_uci_move(m).unwrap();
        pos.make_move(parsed);
    }
    assert!(pos.has_repetition());
}

#[test]
fn cooperative_stop_honours_the_deadline() {
    let pos = Position::new();
    let pool = SearchPool::new(1, 16);

    let start = Instant::now();
    let report = pool.start_search(&pos, &timed_limits(100), None);
    let elapsed = start.elapsed();

    // 100 ms budget plus shutdown slack (generous for debug builds).
    assert!(
        elapsed < Duration::from_millis(250),
        "search overran its budget: {elapsed:?}"
    );
    let best = report.best_move.expect("a legal move");
    let mut check = Position::new();
    assert!(check.legal_moves().contains(best));
}

#[test]
fn fixed_depth_single_thread_is_deterministic() {
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";

    let run = || {
        let pos = Position::from_fen(fen).unwrap();
        let pool = SearchPool::new(1, 16);
        pool.start_search(&pos, &depth_limits(6), None)
    };

    let first = run();
    let second = run();
    assert_eq!(first.best_move, second.best_move);
    assert_eq!(first.score, second.score);
}

#[test]
fn timed_search_reports_progress_and_returns_in_time() {
    let pos = Position::new();
    let pool = SearchPool::new(1, 16);

    let depths = Arc::new(AtomicU32::new(0));
    let depths_cb = Arc::clone(&depths);
    let info: InfoCallback = Arc::new(move |info: &SearchInfo| {
        depths_cb.fetch_max(info.depth as u32, Ordering::Relaxed);
    });

    let start = Instant::now();
    let report = pool.start_search(&pos, &timed_limits(200), Some(info));
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    assert!(report.best_move.is_some());
    assert!(
        depths.load(Ordering::Relaxed) >= 1,
        "no info line was emitted before bestmove"
    );
}

#[test]
fn multipv_reports_distinct_lines() {
    let pos = Position::new();
    let pool = SearchPool::new(1, 16);

    let lines: Arc<Mutex<Vec<SearchInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let info: InfoCallback = Arc::new(move |info: &SearchInfo| {
        sink.lock().push(info.clone());
    });

    let mut limits = depth_limits(5);
    limits.multipv = 3;
    pool.start_search(&pos, &limits, Some(info));

    let lines = lines.lock();
    let deepest = lines.iter().map(|l| l.depth).max().unwrap();
    let last_round: Vec<&SearchInfo> =
        lines.iter().filter(|l| l.depth == deepest).collect();

    assert_eq!(last_round.len(), 3, "expected three lines per depth");
    let mut indices: Vec<u32> = last_round.iter().map(|l| l.multipv).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2, 3]);

    let mut firsts: Vec<_> = last_round
        .iter()
        .map(|l| *l.pv.first().expect("non-empty pv"))
        .collect();
    firsts.sort_by_key(|m| format_move(*m, false));
    firsts.dedup();
    assert_eq!(firsts.len(), 3, "multipv lines must lead with distinct moves");
}

#[test]
fn searchmoves_restricts_the_root() {
    let mut pos = Position::new();
    let only = pos.parse_uci_move("a2a3").unwrap();
    let pool = SearchPool::new(1, 16);

    let mut limits = depth_limits(4);
    limits.searchmoves = vec![only];
    let report = pool.start_search(&pos, &limits, None);
    assert_eq!(report.best_move, Some(only));
}

#[test]
fn two_workers_still_return_a_sane_move() {
    let pos = Position::new();
    let pool = SearchPool::new(2, 16);
    let report = pool.start_search(&pos, &depth_limits(5), None);
    let best = report.best_move.expect("a move");
    let mut check = Position::new();
    assert!(check.legal_moves().contains(best));
}
