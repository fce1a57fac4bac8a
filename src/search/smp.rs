//! Lazy-SMP worker pool.
//!
//! One pool owns the transposition table and N−1 persistent background
//! workers parked on a condition variable. `start_search` stamps every
//! worker's root position and wakes them; the calling thread doubles as
//! the main worker. Workers coordinate only through the shared table and
//! the stop flag; helpers diversify by advancing their target depth by
//! `worker_id % 3`.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::board::{Position, MAX_PLY};
use crate::tablebase::Tablebases;

use super::params::{SearchParams, StyleParams};
use super::{InfoCallback, SearchLimits, SearchReport, SearchState, Searcher, SharedSearch};

/// A helper only outvotes the main worker when its move scores at least
/// this much better.
const VOTE_MARGIN: i32 = 50;

/// Deep recursion plus per-node scratch wants a roomy stack.
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Everything a worker needs for one search.
#[derive(Clone)]
struct Job {
    shared: Arc<SharedSearch>,
    pos: Position,
    limits: SearchLimits,
    params: SearchParams,
    contempt: i32,
}

struct JobBoard {
    epoch: u64,
    quit: bool,
    job: Option<Job>,
    /// Helpers still working on the current epoch.
    running: usize,
    results: Vec<Option<SearchReport>>,
}

struct PoolInner {
    board: Mutex<JobBoard>,
    job_cv: Condvar,
    done_cv: Condvar,
}

/// Engine-wide search configuration applied at `start_search`.
#[derive(Clone)]
pub struct PoolConfig {
    pub params: SearchParams,
    pub style: StyleParams,
    pub contempt: i32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            params: SearchParams::default(),
            style: StyleParams::default(),
            contempt: 0,
        }
    }
}

pub struct SearchPool {
    inner: Arc<PoolInner>,
    shared: Mutex<Arc<SharedSearch>>,
    main_state: Mutex<SearchState>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    threads: Mutex<usize>,
    tt_mb: Mutex<usize>,
    config: Mutex<PoolConfig>,
}

impl SearchPool {
    /// Size the pool: N workers total (one being the caller) sharing a
    /// table of `tt_mb` megabytes.
    #[must_use]
    pub fn new(threads: usize, tt_mb: usize) -> Self {
        let pool = SearchPool {
            inner: Arc::new(PoolInner {
                board: Mutex::new(JobBoard {
                    epoch: 0,
                    quit: false,
                    job: None,
                    running: 0,
                    results: Vec::new(),
                }),
                job_cv: Condvar::new(),
                done_cv: Condvar::new(),
            }),
            shared: Mutex::new(Arc::new(SharedSearch::new(tt_mb))),
            main_state: Mutex::new(SearchState::new()),
            handles: Mutex::new(Vec::new()),
            threads: Mutex::new(threads.max(1)),
            tt_mb: Mutex::new(tt_mb),
            config: Mutex::new(PoolConfig::default()),
        };
        pool.spawn_helpers(threads.max(1));
        pool
    }

    fn spawn_helpers(&self, threads: usize) {
        let mut handles = self.handles.lock();
        for id in 1..threads {
            let inner = Arc::clone(&self.inner);
            let handle = std::thread::Builder::new()
                .name(format!("search-{id}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn(move || helper_loop(id, &inner))
                .expect("failed to spawn search worker");
            handles.push(handle);
        }
    }

    /// Retire the current helpers and spawn a new set.
    pub fn set_threads(&self, threads: usize) {
        let threads = threads.max(1);
        {
            let mut board = self.inner.board.lock();
            board.quit = true;
            self.inner.job_cv.notify_all();
        }
        for handle in self.handles.lock().drain(..) {
            let _ = handle.join();
        }
        {
            let mut board = self.inner.board.lock();
            board.quit = false;
            board.job = None;
        }
        *self.threads.lock() = threads;
        self.spawn_helpers(threads);
    }

    /// Replace the transposition table, keeping the tablebase bridge.
    pub fn set_hash(&self, tt_mb: usize) {
        let mut shared = self.shared.lock();
        let tb = Arc::clone(&shared.tb);
        *shared = Arc::new(SharedSearch::with_tablebases(tt_mb, tb));
        *self.tt_mb.lock() = tt_mb;
    }

    /// Install a tablebase bridge (e.g. after `setoption SyzygyPath`).
    /// The table starts fresh; changing tablebases mid-game is rare
    /// enough that losing cached entries does not matter.
    pub fn set_tablebases(&self, tb: Tablebases) {
        let tt_mb = *self.tt_mb.lock();
        *self.shared.lock() = Arc::new(SharedSearch::with_tablebases(tt_mb, Arc::new(tb)));
    }

    #[must_use]
    pub fn shared(&self) -> Arc<SharedSearch> {
        Arc::clone(&self.shared.lock())
    }

    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.config.lock().clone()
    }

    pub fn set_config(&self, config: PoolConfig) {
        *self.config.lock() = config;
    }

    /// Clear the table and the main worker's heuristics for a new game.
    pub fn new_game(&self) {
        self.shared.lock().tt.clear();
        self.main_state.lock().tables.clear();
    }

    /// Ask the running search (if any) to wind down.
    pub fn stop(&self) {
        self.shared.lock().request_stop();
    }

    /// Run a search to completion on the calling thread while the
    /// helpers race alongside, then join results and vote.
    pub fn start_search(
        &self,
        pos: &Position,
        limits: &SearchLimits,
        info: Option<InfoCallback>,
    ) -> SearchReport {
        let shared = self.shared();
        let threads = *self.threads.lock();
        let config = self.config();
        let styled_params = config.style.applied_to(&config.params);
        let contempt = config.contempt + config.style.contempt_shift();

        shared.begin_search();

        {
            let mut board = self.inner.board.lock();
            board.results = vec![None; threads];
            board.running = threads - 1;
            board.job = Some(Job {
                shared: Arc::clone(&shared),
                pos: pos.clone(),
                limits: limits.clone(),
                params: styled_params.clone(),
                contempt,
            });
            board.epoch += 1;
            self.inner.job_cv.notify_all();
        }

        // Main worker runs on the calling thread.
        let main_report = {
            let mut state = self.main_state.lock();
            state.params = styled_params;
            state.contempt = contempt;
            let mut root = pos.clone();
            Searcher::new(&mut root, &mut state, &shared, limits, true, info).run()
        };

        // Completion or deadline: everyone stops, and all workers are
        // joined (back to idle) before results are read.
        shared.request_stop();
        let mut board = self.inner.board.lock();
        while board.running > 0 {
            self.inner.done_cv.wait(&mut board);
        }
        board.job = None;

        let mut best = main_report;
        for helper in board.results.iter().skip(1).flatten() {
            let Some(helper_move) = helper.best_move else {
                continue;
            };
            if best.best_move.is_none()
                || (Some(helper_move) != best.best_move && helper.score >= best.score + VOTE_MARGIN)
            {
                best = helper.clone();
            }
        }
        best.nodes = shared.total_nodes();
        best
    }
}

impl Drop for SearchPool {
    fn drop(&mut self) {
        {
            let mut board = self.inner.board.lock();
            board.quit = true;
            self.inner.job_cv.notify_all();
        }
        for handle in self.handles.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

/// Background worker body: wait for a job epoch, search, publish, repeat.
fn helper_loop(id: usize, inner: &PoolInner) {
    let mut state = SearchState::new();
    let mut last_epoch = 0u64;

    loop {
        let job = {
            let mut board = inner.board.lock();
            loop {
                if board.quit {
                    return;
                }
                if board.epoch != last_epoch {
                    if let Some(job) = board.job.clone() {
                        last_epoch = board.epoch;
                        break job;
                    }
                }
                inner.job_cv.wait(&mut board);
            }
        };

        state.params = job.params.clone();
        state.contempt = job.contempt;
        let mut pos = job.pos.clone();
        let mut limits = job.limits.clone();
        // Helpers search a perturbed target depth and skip MultiPV.
        limits.depth = (limits.depth + (id % 3) as i32).min(MAX_PLY as i32 - 1);
        limits.multipv = 1;

        let report =
            Searcher::new(&mut pos, &mut state, &job.shared, &limits, false, None).run();

        let mut board = inner.board.lock();
        if board.epoch == last_epoch {
            board.results[id] = Some(report);
            board.running -= 1;
            if board.running == 0 {
                inner.done_cv.notify_all();
            }
        }
    }
}
