//! Root search: iterative deepening, aspiration windows, MultiPV and
//! principal-variation extraction.

use std::sync::atomic::Ordering;

use crate::board::{Color, Move, Piece, Position, MAX_PLY};
use crate::tablebase::Wdl;
use crate::tt::Bound;

use super::constants::{score_to_tt, MATE_BOUND, SCORE_INFINITE, TB_WIN_SCORE};
use super::{
    InfoCallback, RootMove, SearchInfo, SearchLimits, SearchReport, SearchState, SharedSearch,
};

/// One worker's search driver. Owns the per-search scratch arrays; the
/// durable tables live in `SearchState`.
pub(crate) struct Searcher<'a> {
    pub(super) pos: &'a mut Position,
    pub(super) state: &'a mut SearchState,
    pub(super) shared: &'a SharedSearch,
    pub(super) limits: &'a SearchLimits,
    pub(super) is_main: bool,
    pub(super) info: Option<InfoCallback>,
    pub(super) root_color: Color,
    pub(super) nodes: u64,
    pub(super) flushed: u64,
    pub(super) seldepth: u32,
    pub(super) tb_hits: u64,
    pub(super) previous_move: [Move; MAX_PLY],
    pub(super) previous_piece: [Option<Piece>; MAX_PLY],
    pub(super) static_eval: [i32; MAX_PLY],
    score_ring: Vec<i32>,
}

impl<'a> Searcher<'a> {
    pub(crate) fn new(
        pos: &'a mut Position,
        state: &'a mut SearchState,
        shared: &'a SharedSearch,
        limits: &'a SearchLimits,
        is_main: bool,
        info: Option<InfoCallback>,
    ) -> Self {
        let root_color = pos.side_to_move();
        Searcher {
            pos,
            state,
            shared,
            limits,
            is_main,
            info,
            root_color,
            nodes: 0,
            flushed: 0,
            seldepth: 0,
            tb_hits: 0,
            previous_move: [Move::NONE; MAX_PLY],
            previous_piece: [None; MAX_PLY],
            static_eval: [0; MAX_PLY],
            score_ring: Vec::with_capacity(8),
        }
    }

    /// Run the full iterative-deepening loop and return this worker's
    /// verdict.
    pub(crate) fn run(&mut self) -> SearchReport {
        self.state.tables.new_search();

        let mut root_moves = self.build_root_moves();
        if root_moves.is_empty() {
            return SearchReport::default();
        }

        // A root tablebase hit bypasses the search entirely.
        if let Some(probe) = self.shared.tb.probe_root(self.pos) {
            if let Some(best) = probe.best_move {
                let score = match probe.wdl {
                    Wdl::Win => TB_WIN_SCORE,
                    Wdl::Loss => -TB_WIN_SCORE,
                    _ => self.draw_score(),
                };
                return SearchReport {
                    best_move: Some(best),
                    ponder_move: None,
                    score,
                    depth: 0,
                    nodes: 0,
                };
            }
        }

        let max_depth = self.limits.depth.clamp(1, MAX_PLY as i32 - 1);
        let multipv = (self.limits.multipv.max(1) as usize).min(root_moves.len());

        // Safety net: a search that never finishes depth 1 still answers
        // with the first legal move.
        let mut best_move = root_moves[0].mv;
        let mut best_score = -SCORE_INFINITE;
        let mut completed_depth = 0;

        for depth in 1..=max_depth {
            if self.should_stop() {
                break;
            }
            // Soft deadline: do not begin another deep iteration late in
            // the budget.
            if self.is_main && depth > 1 && self.limits.clock.soft_expired() {
                break;
            }

            for rm in root_moves.iter_mut() {
                rm.prev_score = rm.score;
                rm.score = -SCORE_INFINITE;
            }

            let mut iteration_complete = true;
            for pv_index in 0..multipv {
                let score = self.aspiration(depth, pv_index, &mut root_moves);
                Self::sort_tail(&mut root_moves, pv_index);
                if self.should_stop() && score.is_none() {
                    iteration_complete = false;
                    break;
                }
            }

            if !iteration_complete {
                break;
            }

            completed_depth = depth;
            best_move = root_moves[0].mv;
            best_score = root_moves[0].score;
            self.push_ring(best_score);

            self.shared.tt.store(
                self.pos.hash(),
                score_to_tt(best_score, 0),
                best_move.to_compact(),
                depth,
                Bound::Exact,
            );

            for (line, rm) in root_moves.iter().take(multipv).enumerate() {
                self.emit_info(depth, line as u32 + 1, rm);
            }

            // No point iterating past a forced mate.
            if best_score.abs() >= MATE_BOUND && depth >= 3 {
                break;
            }
        }

        // Flush the node remainder into the shared counter.
        self.shared
            .nodes
            .fetch_add(self.nodes - self.flushed, Ordering::Relaxed);
        self.flushed = self.nodes;

        let ponder_move = super::extract_ponder_move(self.pos, self.shared, best_move);
        SearchReport {
            best_move: Some(best_move),
            ponder_move,
            score: best_score,
            depth: completed_depth,
            nodes: self.nodes,
        }
    }

    /// Legal root moves, honouring a `searchmoves` restriction, with the
    /// hash move rotated to the front.
    fn build_root_moves(&mut self) -> Vec<RootMove> {
        let legal = self.pos.legal_moves();
        let mut moves: Vec<RootMove> = legal
            .iter()
            .filter(|m| {
                self.limits.searchmoves.is_empty() || self.limits.searchmoves.contains(m)
            })
            .map(|&m| RootMove::new(m))
            .collect();

        if let Some(hit) = self.shared.tt.probe(self.pos.hash(), 0) {
            if let Some(tt_move) = self.pos.expand_tt_move(hit.best_move) {
                if let Some(idx) = moves.iter().position(|rm| rm.mv == tt_move) {
                    moves.swap(0, idx);
                }
            }
        }
        moves
    }

    /// Aspiration-window loop around one root search. Returns the
    /// settled score, or `None` when the search was stopped first.
    fn aspiration(
        &mut self,
        depth: i32,
        pv_index: usize,
        root_moves: &mut [RootMove],
    ) -> Option<i32> {
        let params = &self.state.params;
        let prev = root_moves[pv_index].prev_score;

        let use_window =
            pv_index == 0 && depth >= params.aspiration_min_depth && prev.abs() < SCORE_INFINITE;

        let mut delta = params.aspiration_delta + self.volatility();
        let (mut alpha, mut beta) = if use_window {
            (prev - delta, prev + delta)
        } else {
            (-SCORE_INFINITE, SCORE_INFINITE)
        };
        let mut failures = 0u32;

        loop {
            let score = self.search_root(depth, alpha, beta, pv_index, root_moves);
            if self.should_stop() {
                return None;
            }

            // A mate score is accepted as-is.
            if score.abs() >= MATE_BOUND {
                return Some(score);
            }

            if score <= alpha {
                failures += 1;
                if failures >= 2 {
                    alpha = -SCORE_INFINITE;
                    beta = SCORE_INFINITE;
                } else {
                    alpha -= delta;
                    delta += delta / 2;
                }
            } else if score >= beta {
                failures += 1;
                if failures >= 2 {
                    alpha = -SCORE_INFINITE;
                    beta = SCORE_INFINITE;
                } else {
                    beta += delta;
                    delta += delta / 2;
                }
            } else {
                return Some(score);
            }
        }
    }

    /// Search the root moves from `pv_index` on. The first one gets a
    /// full window; the rest are probed with a null window and
    /// re-searched on improvement.
    fn search_root(
        &mut self,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        pv_index: usize,
        root_moves: &mut [RootMove],
    ) -> i32 {
        let mut best = -SCORE_INFINITE;

        for i in pv_index..root_moves.len() {
            let m = root_moves[i].mv;
            let moving_piece = self.pos.piece_at(m.from()).map(|(_, p)| p);
            let nodes_before = self.nodes;

            let rec = self.pos.make_move(m);
            self.previous_move[0] = m;
            self.previous_piece[0] = moving_piece;

            let score = if i == pv_index {
                -self.negamax(depth - 1, -beta, -alpha, 1, true, Move::NONE)
            } else {
                let probe = -self.negamax(depth - 1, -alpha - 1, -alpha, 1, true, Move::NONE);
                if probe > alpha && !self.should_stop() {
                    -self.negamax(depth - 1, -beta, -alpha, 1, true, Move::NONE)
                } else {
                    probe
                }
            };

            self.pos.unmake_move(m, rec);
            root_moves[i].nodes += self.nodes - nodes_before;

            if self.should_stop() {
                break;
            }

            if i == pv_index || score > alpha {
                root_moves[i].score = score;
                root_moves[i].depth = depth;
                root_moves[i].pv = self.extract_pv(m, depth as usize + 8);
            }
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
                if alpha >= beta {
                    break;
                }
            }
        }

        best
    }

    /// Stable sort of the still-open tail so settled lines stay put.
    fn sort_tail(root_moves: &mut [RootMove], from: usize) {
        root_moves[from..].sort_by(|a, b| {
            (b.score, b.prev_score).cmp(&(a.score, a.prev_score))
        });
    }

    /// Walk the principal variation out of the table, guarding against
    /// hash loops.
    fn extract_pv(&mut self, first: Move, max_len: usize) -> Vec<Move> {
        let mut pv = vec![first];
        let mut seen = vec![self.pos.hash()];
        let mut undo_stack = Vec::with_capacity(max_len);

        let rec = self.pos.make_move(first);
        undo_stack.push((first, rec));

        while pv.len() < max_len {
            if seen.contains(&self.pos.hash()) {
                break;
            }
            seen.push(self.pos.hash());

            let Some(hit) = self.shared.tt.probe(self.pos.hash(), 0) else {
                break;
            };
            let Some(m) = self.pos.expand_tt_move(hit.best_move) else {
                break;
            };
            if !self.pos.is_legal(m) {
                break;
            }
            pv.push(m);
            let rec = self.pos.make_move(m);
            undo_stack.push((m, rec));
        }

        for (m, rec) in undo_stack.into_iter().rev() {
            self.pos.unmake_move(m, rec);
        }
        pv
    }

    /// Max swing between consecutive completed iterations, feeding the
    /// aspiration half-width.
    fn volatility(&self) -> i32 {
        self.score_ring
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .max()
            .unwrap_or(0)
            .min(100)
    }

    fn push_ring(&mut self, score: i32) {
        if self.score_ring.len() == 8 {
            self.score_ring.remove(0);
        }
        self.score_ring.push(score);
    }

    fn emit_info(&self, depth: i32, multipv: u32, rm: &RootMove) {
        let Some(cb) = &self.info else {
            return;
        };
        let time_ms = self.limits.clock.elapsed_ms();
        let nodes = self.shared.total_nodes() + (self.nodes - self.flushed);
        let nps = if time_ms > 0 {
            nodes * 1000 / time_ms
        } else {
            0
        };
        cb(&SearchInfo {
            depth,
            seldepth: self.seldepth,
            multipv,
            score: rm.score,
            mate_in: super::mate_in(rm.score),
            nodes,
            nps,
            time_ms,
            hashfull: self.shared.tt.hashfull(),
            tb_hits: self.shared.tb_hits.load(Ordering::Relaxed),
            pv: rm.pv.clone(),
        });
    }
}
