//! Engine orchestration behind the UCI command loop: position state,
//! search threads, option plumbing, and the bestmove guarantee.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::board::{Move, Position};
use crate::search::smp::{PoolConfig, SearchPool};
use crate::search::{
    InfoCallback, SearchClock, SearchInfo, SearchLimits, SearchParams,
};
use crate::tablebase::Tablebases;
use crate::timeman::{self, TimeAllocation, TimeControl};

use super::command::{GoParams, UciCommand};
use super::options::{OptionAction, UciOptions};
use super::{format_move, format_score};

/// Stack size for the thread hosting the main search worker.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

pub struct Engine {
    pos: Position,
    pool: Arc<SearchPool>,
    options: UciOptions,
    debug: bool,
    search_thread: Option<JoinHandle<()>>,
    /// Clock of the active search; `ponderhit` arms its deadlines.
    clock: Arc<SearchClock>,
    /// Budget computed at `go ponder` time, applied on `ponderhit`.
    ponder_alloc: Arc<Mutex<Option<TimeAllocation>>>,
    last_score: Arc<Mutex<i32>>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        let options = UciOptions::default();
        Engine {
            pos: Position::new(),
            pool: Arc::new(SearchPool::new(options.threads, options.hash_mb)),
            options,
            debug: false,
            search_thread: None,
            clock: Arc::new(SearchClock::unbounded()),
            ponder_alloc: Arc::new(Mutex::new(None)),
            last_score: Arc::new(Mutex::new(0)),
        }
    }

    /// Handle one command; `false` ends the session.
    pub fn handle(&mut self, cmd: UciCommand) -> bool {
        match cmd {
            UciCommand::Uci => {
                println!("id name Sable {}", env!("CARGO_PKG_VERSION"));
                println!("id author the Sable developers");
                self.options.print();
                println!("uciok");
            }
            UciCommand::Debug(enabled) => self.debug = enabled,
            UciCommand::IsReady => println!("readyok"),
            UciCommand::NewGame => {
                self.finish_search();
                self.pool.new_game();
            }
            UciCommand::SetOption { name, value } => {
                self.finish_search();
                self.apply_option(&name, value.as_deref());
            }
            UciCommand::Position { fen, moves } => {
                self.finish_search();
                self.load_position(fen.as_deref(), &moves);
            }
            UciCommand::Go(params) => {
                self.finish_search();
                self.go(params);
            }
            UciCommand::Stop => {
                self.pool.stop();
                self.join_search();
            }
            UciCommand::PonderHit => self.ponder_hit(),
            UciCommand::Display => {
                println!("{}", self.pos.to_fen());
                println!("eval: {} cp", crate::eval::evaluate(&self.pos));
            }
            UciCommand::Quit => {
                self.pool.stop();
                self.join_search();
                return false;
            }
        }
        true
    }

    /// Malformed input is reported only in debug mode and otherwise
    /// ignored.
    pub fn note_ignored(&self, line: &str) {
        if self.debug {
            println!("info string ignoring '{line}'");
        }
        log::debug!("ignoring unparsable line '{line}'");
    }

    fn apply_option(&mut self, name: &str, value: Option<&str>) {
        match self.options.apply(name, value) {
            Some(OptionAction::ResizeHash(mb)) => self.pool.set_hash(mb),
            Some(OptionAction::SetThreads(threads)) => self.pool.set_threads(threads),
            Some(OptionAction::ClearHash) => self.pool.new_game(),
            Some(OptionAction::SetSyzygyPath(path)) => {
                // File parsing is a provider concern; without one the
                // bridge stays empty and probes report unavailable.
                log::warn!("SyzygyPath set to '{path}' but no tablebase backend is built in");
                println!("info string tablebases at '{path}' not loaded (no backend)");
                self.pool.set_tablebases(Tablebases::empty());
            }
            None => {}
        }
    }

    fn load_position(&mut self, fen: Option<&str>, moves: &[String]) {
        let mut pos = match fen {
            Some(fen_str) => match Position::from_fen(fen_str) {
                Ok(pos) => pos,
                Err(err) => {
                    if self.debug {
                        println!("info string bad fen: {err}");
                    }
                    log::debug!("rejected fen '{fen_str}': {err}");
                    return;
                }
            },
            None => Position::new(),
        };

        for move_str in moves {
            match pos.parse_uci_move(move_str) {
                Ok(m) => {
                    pos.make_move(m);
                }
                Err(err) => {
                    if self.debug {
                        println!("info string bad move '{move_str}': {err}");
                    }
                    log::debug!("rejected move '{move_str}': {err}");
                    break;
                }
            }
        }
        self.pos = pos;
    }

    fn go(&mut self, params: GoParams) {
        let searchmoves: Vec<Move> = {
            let mut probe = self.pos.clone();
            params
                .searchmoves
                .iter()
                .filter_map(|s| probe.parse_uci_move(s).ok())
                .collect()
        };

        let control = TimeControl {
            wtime: params.wtime,
            btime: params.btime,
            winc: params.winc.unwrap_or(0),
            binc: params.binc.unwrap_or(0),
            movestogo: params.movestogo,
            movetime: params.movetime,
            infinite: params.infinite,
        };
        let allocation = timeman::allocate(
            &control,
            self.pos.side_to_move(),
            self.pos.phase(),
            *self.last_score.lock(),
            self.options.move_overhead,
            self.options.style.time_factor_percent(),
        );

        let start = Instant::now();
        let clock = if params.ponder {
            // Ponder searches run unbounded; the budget is armed on
            // ponderhit.
            *self.ponder_alloc.lock() = allocation;
            Arc::new(SearchClock::new(start, None, None))
        } else {
            *self.ponder_alloc.lock() = None;
            match allocation {
                Some(alloc) => Arc::new(SearchClock::new(
                    start,
                    Some(start + Duration::from_millis(alloc.optimal)),
                    Some(start + Duration::from_millis(alloc.max)),
                )),
                None => Arc::new(SearchClock::new(start, None, None)),
            }
        };
        self.clock = Arc::clone(&clock);

        let limits = SearchLimits {
            depth: params.depth.unwrap_or(self.options.depth).clamp(1, 127),
            nodes: params.nodes,
            clock,
            infinite: params.infinite,
            searchmoves,
            multipv: self.options.multipv,
        };

        self.pool.set_config(PoolConfig {
            params: SearchParams::default(),
            style: self.options.style,
            contempt: if self.options.analyse_mode {
                0
            } else {
                self.options.contempt
            },
        });

        let pool = Arc::clone(&self.pool);
        let mut root = self.pos.clone();
        let chess960 = self.options.chess960;
        let show_wdl = self.options.show_wdl;
        let last_score = Arc::clone(&self.last_score);

        let info_cb: InfoCallback = Arc::new(move |info: &SearchInfo| {
            print_info(info, chess960, show_wdl);
        });

        let handle = std::thread::Builder::new()
            .name("search-main".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let report = pool.start_search(&root, &limits, Some(info_cb));
                if report.depth > 0 {
                    // A search that never finished depth 1 has no score
                    // worth feeding back into time management.
                    *last_score.lock() = report.score;
                }

                let legal = root.legal_moves();
                let best = match report.best_move {
                    Some(m) if legal.contains(m) => Some(m),
                    Some(m) => {
                        // Should never happen; fall back to the first
                        // legal move rather than forfeit.
                        println!(
                            "info string search returned illegal move {}, substituting",
                            format_move(m, chess960)
                        );
                        log::warn!("illegal best move {m:?} at root");
                        legal.first()
                    }
                    None => legal.first(),
                };

                match best {
                    Some(m) => {
                        let ponder = report
                            .ponder_move
                            .filter(|_| report.best_move == best)
                            .map(|p| format!(" ponder {}", format_move(p, chess960)));
                        println!(
                            "bestmove {}{}",
                            format_move(m, chess960),
                            ponder.unwrap_or_default()
                        );
                    }
                    None => println!("bestmove 0000"),
                }
            })
            .expect("failed to spawn search thread");
        self.search_thread = Some(handle);
    }

    fn ponder_hit(&mut self) {
        if let Some(alloc) = self.ponder_alloc.lock().take() {
            let now = Instant::now();
            self.clock.reset(
                now,
                Some(now + Duration::from_millis(alloc.optimal)),
                Some(now + Duration::from_millis(alloc.max)),
            );
        }
    }

    /// Stop and join any running search so state mutations are safe.
    fn finish_search(&mut self) {
        if self.search_thread.is_some() {
            self.pool.stop();
            self.join_search();
        }
    }

    fn join_search(&mut self) {
        if let Some(handle) = self.search_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

/// Emit one `info` line for a completed iteration.
fn print_info(info: &SearchInfo, chess960: bool, show_wdl: bool) {
    let mut line = format!(
        "info depth {} seldepth {} multipv {} score {}",
        info.depth,
        info.seldepth,
        info.multipv,
        format_score(info.score, info.mate_in),
    );
    if show_wdl {
        let (w, d, l) = wdl_model(info.score);
        line.push_str(&format!(" wdl {w} {d} {l}"));
    }
    line.push_str(&format!(
        " nodes {} nps {} hashfull {} tbhits {} time {}",
        info.nodes, info.nps, info.hashfull, info.tb_hits, info.time_ms
    ));
    if !info.pv.is_empty() {
        line.push_str(" pv");
        for m in &info.pv {
            line.push(' ');
            line.push_str(&format_move(*m, chess960));
        }
    }
    println!("{line}");
}

/// Logistic win/draw/loss estimate in per mille from a centipawn score.
fn wdl_model(score: i32) -> (i32, i32, i32) {
    let s = f64::from(score.clamp(-2400, 2400));
    let win = (1000.0 / (1.0 + (-s / 168.0).exp())) as i32;
    let loss = (1000.0 / (1.0 + (s / 168.0).exp())) as i32;
    let draw = (1000 - win - loss).max(0);
    (win, draw, loss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wdl_is_symmetric_and_normalised() {
        let (w0, d0, l0) = wdl_model(0);
        assert_eq!(w0, l0);
        assert!(w0 + d0 + l0 <= 1000);

        let (w, _, l) = wdl_model(400);
        assert!(w > l);
        let (w_neg, _, l_neg) = wdl_model(-400);
        assert_eq!(w, l_neg);
        assert_eq!(l, w_neg);
    }
}
