//! Iterative-deepening PVS search.
//!
//! Layout: `alphabeta` holds the interior node loop, `quiescence` the
//! tactical leaf search, `iterative` the root loop with aspiration windows
//! and MultiPV, and `smp` the Lazy-SMP worker pool. Move ordering lives in
//! `picker` backed by the history tables in `tables`.

pub mod constants;
pub mod params;
pub mod smp;

mod alphabeta;
mod iterative;
mod picker;
mod quiescence;
mod tables;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::board::{Move, Position};
use crate::tablebase::Tablebases;
use crate::tt::TranspositionTable;

pub use params::{SearchParams, StyleParams};
pub use picker::{MovePicker, PickContext};
pub use tables::SearchTables;

pub(crate) use iterative::Searcher;

/// A root move with its bookkeeping across iterations.
#[derive(Clone, Debug)]
pub struct RootMove {
    pub mv: Move,
    pub score: i32,
    pub prev_score: i32,
    pub pv: Vec<Move>,
    pub nodes: u64,
    pub depth: i32,
}

impl RootMove {
    fn new(mv: Move) -> Self {
        RootMove {
            mv,
            score: -constants::SCORE_INFINITE,
            prev_score: -constants::SCORE_INFINITE,
            pv: Vec::new(),
            nodes: 0,
            depth: 0,
        }
    }
}

/// Wall-clock state for one search, shared between the UCI thread and the
/// main worker so a `ponderhit` can arm deadlines mid-search.
pub struct SearchClock {
    start: Mutex<Instant>,
    soft: Mutex<Option<Instant>>,
    hard: Mutex<Option<Instant>>,
}

impl SearchClock {
    #[must_use]
    pub fn new(start: Instant, soft: Option<Instant>, hard: Option<Instant>) -> Self {
        SearchClock {
            start: Mutex::new(start),
            soft: Mutex::new(soft),
            hard: Mutex::new(hard),
        }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        SearchClock::new(Instant::now(), None, None)
    }

    pub fn reset(&self, start: Instant, soft: Option<Instant>, hard: Option<Instant>) {
        *self.start.lock() = start;
        *self.soft.lock() = soft;
        *self.hard.lock() = hard;
    }

    #[must_use]
    pub fn snapshot(&self) -> (Instant, Option<Instant>, Option<Instant>) {
        (*self.start.lock(), *self.soft.lock(), *self.hard.lock())
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.lock().elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn hard_expired(&self) -> bool {
        self.hard.lock().is_some_and(|t| Instant::now() >= t)
    }

    #[must_use]
    pub fn soft_expired(&self) -> bool {
        self.soft.lock().is_some_and(|t| Instant::now() >= t)
    }
}

/// Limits for one `go` request.
#[derive(Clone)]
pub struct SearchLimits {
    pub depth: i32,
    pub nodes: Option<u64>,
    pub clock: Arc<SearchClock>,
    pub infinite: bool,
    /// Root restriction set; empty means every legal move.
    pub searchmoves: Vec<Move>,
    pub multipv: u32,
}

impl SearchLimits {
    #[must_use]
    pub fn depth_only(depth: i32) -> Self {
        SearchLimits {
            depth,
            nodes: None,
            clock: Arc::new(SearchClock::unbounded()),
            infinite: false,
            searchmoves: Vec::new(),
            multipv: 1,
        }
    }
}

/// State shared by every worker of one search: the transposition table,
/// the tablebase bridge, the stop flag, and aggregate counters.
pub struct SharedSearch {
    pub tt: TranspositionTable,
    pub tb: Arc<Tablebases>,
    pub stop: AtomicBool,
    pub nodes: AtomicU64,
    pub tb_hits: AtomicU64,
}

impl SharedSearch {
    #[must_use]
    pub fn new(tt_mb: usize) -> Self {
        SharedSearch::with_tablebases(tt_mb, Arc::new(Tablebases::empty()))
    }

    #[must_use]
    pub fn with_tablebases(tt_mb: usize, tb: Arc<Tablebases>) -> Self {
        SharedSearch {
            tt: TranspositionTable::new(tt_mb),
            tb,
            stop: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            tb_hits: AtomicU64::new(0),
        }
    }

    /// Arm for a fresh search: clear the stop flag and counters, age the
    /// table.
    pub fn begin_search(&self) {
        self.stop.store(false, Ordering::Relaxed);
        self.nodes.store(0, Ordering::Relaxed);
        self.tb_hits.store(0, Ordering::Relaxed);
        self.tt.new_search();
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn total_nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }
}

/// Per-worker persistent state; created when the pool is sized and kept
/// across searches so history heuristics carry over.
pub struct SearchState {
    pub tables: SearchTables,
    pub params: SearchParams,
    pub contempt: i32,
}

impl SearchState {
    #[must_use]
    pub fn new() -> Self {
        SearchState {
            tables: SearchTables::new(),
            params: SearchParams::default(),
            contempt: 0,
        }
    }
}

impl Default for SearchState {
    fn default() -> Self {
        SearchState::new()
    }
}

/// One iteration's report, streamed to the UCI layer.
#[derive(Clone, Debug)]
pub struct SearchInfo {
    pub depth: i32,
    pub seldepth: u32,
    pub multipv: u32,
    pub score: i32,
    pub mate_in: Option<i32>,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub tb_hits: u64,
    pub pv: Vec<Move>,
}

pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

/// Final outcome of a search.
#[derive(Clone, Debug, Default)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
}

/// Convert an internal score to a mate-in-N moves count when it encodes
/// one.
#[must_use]
pub fn mate_in(score: i32) -> Option<i32> {
    if score >= constants::MATE_BOUND {
        Some((constants::MATE_SCORE - score + 1) / 2)
    } else if score <= -constants::MATE_BOUND {
        Some(-(constants::MATE_SCORE + score + 1) / 2)
    } else {
        None
    }
}

/// Extract the expected reply from the table after the best move, for
/// pondering.
pub(crate) fn extract_ponder_move(
    pos: &mut Position,
    shared: &SharedSearch,
    best: Move,
) -> Option<Move> {
    let rec = pos.make_move(best);
    let mut ponder = shared
        .tt
        .probe(pos.hash(), 0)
        .and_then(|hit| pos.expand_tt_move(hit.best_move));
    if let Some(m) = ponder {
        if !pos.is_legal(m) {
            ponder = None;
        }
    }
    pos.unmake_move(best, rec);
    ponder
}
