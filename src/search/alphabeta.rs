//! Interior alpha-beta (negamax) search with the pruning, extension and
//! reduction heuristics.

use std::sync::atomic::Ordering;
use std::sync::OnceLock;

use crate::board::{Move, Piece, MAX_PLY};
use crate::eval::evaluate;
use crate::tablebase::Wdl;
use crate::tt::Bound;

use super::constants::{
    score_from_tt, score_to_tt, MATE_BOUND, MATE_SCORE, NODE_POLL_MASK, SCORE_INFINITE,
    SCORE_NEAR_MATE, TB_WIN_SCORE,
};
use super::iterative::Searcher;
use super::picker::{MovePicker, PickContext};

/// Logarithmic late-move-reduction table, indexed `[depth][move index]`.
fn lmr_table() -> &'static [[u8; 64]; 64] {
    static TABLE: OnceLock<[[u8; 64]; 64]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0u8; 64]; 64];
        for (depth, row) in table.iter_mut().enumerate().skip(1) {
            for (idx, cell) in row.iter_mut().enumerate().skip(1) {
                let r = ((depth as f64).ln() * (idx as f64).ln() / 2.0).round();
                *cell = r.max(0.0) as u8;
            }
        }
        table
    })
}

impl Searcher<'_> {
    /// Cooperative stop check. The main worker is the only one that
    /// watches the clock; everyone polls the shared flag.
    pub(super) fn should_stop(&mut self) -> bool {
        if self.shared.stop.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(limit) = self.limits.nodes {
            if self.nodes >= limit {
                self.shared.request_stop();
                return true;
            }
        }
        if self.nodes & NODE_POLL_MASK == 0 && self.is_main && self.limits.clock.hard_expired() {
            self.shared.request_stop();
            return true;
        }
        false
    }

    /// Count a visited node, batching updates of the shared counter.
    #[inline]
    pub(super) fn count_node(&mut self, ply: usize) {
        self.nodes += 1;
        if self.nodes & NODE_POLL_MASK == 0 {
            self.shared
                .nodes
                .fetch_add(NODE_POLL_MASK + 1, Ordering::Relaxed);
            self.flushed += NODE_POLL_MASK + 1;
        }
        if ply as u32 + 1 > self.seldepth {
            self.seldepth = ply as u32 + 1;
        }
    }

    /// Contempt-adjusted draw score: positive contempt makes draws look
    /// bad for the engine's own side.
    pub(super) fn draw_score(&self) -> i32 {
        if self.pos.side_to_move() == self.root_color {
            -self.state.contempt
        } else {
            self.state.contempt
        }
    }

    /// Ordering context handed to the move picker at `ply`.
    pub(super) fn pick_context(&self, ply: usize, tt_move: Move) -> PickContext {
        let prev = (ply >= 1)
            .then(|| {
                self.previous_piece[ply - 1].map(|p| (p, self.previous_move[ply - 1].to()))
            })
            .flatten();
        let follow_up = (ply >= 2)
            .then(|| {
                self.previous_piece[ply - 2].map(|p| (p, self.previous_move[ply - 2].to()))
            })
            .flatten();
        let counter = prev.map_or(Move::NONE, |(p, sq)| self.state.tables.counters.get(p, sq));

        PickContext {
            tt_move,
            killers: self.state.tables.killers.get(ply),
            counter,
            prev,
            follow_up,
            stm: self.pos.side_to_move(),
        }
    }

    /// Interior node search. `excluded` carries the move a singular
    /// verification must skip; `Move::NONE` otherwise.
    #[allow(clippy::too_many_lines)]
    pub(super) fn negamax(
        &mut self,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: usize,
        allow_null: bool,
        excluded: Move,
    ) -> i32 {
        // Runaway extension guard.
        if ply >= MAX_PLY - 1 {
            return evaluate(self.pos);
        }

        let excluded_active = !excluded.is_none();

        // Draw detection before any other work at a non-root node.
        if ply > 0 && !excluded_active && self.pos.draw_kind().is_some() {
            return self.draw_score();
        }

        if depth <= 0 {
            return self.quiesce(alpha, beta, ply, 0);
        }

        self.count_node(ply);
        if self.should_stop() {
            return 0;
        }

        let is_pv = beta > alpha + 1;

        // Mate distance pruning: a shorter mate elsewhere bounds this
        // subtree.
        if ply > 0 {
            alpha = alpha.max(-MATE_SCORE + ply as i32);
            beta = beta.min(MATE_SCORE - ply as i32 - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        // Transposition probe: the move always seeds ordering, the score
        // cuts only at non-PV nodes with sufficient depth.
        let tt_hit = if excluded_active {
            None
        } else {
            self.shared.tt.probe(self.pos.hash(), depth)
        };
        let mut tt_move = tt_hit
            .and_then(|hit| self.pos.expand_tt_move(hit.best_move))
            .unwrap_or(Move::NONE);

        if !is_pv {
            if let Some(hit) = tt_hit {
                if let Some(raw) = hit.score {
                    let score = score_from_tt(raw, ply);
                    let cuts = match hit.bound {
                        Bound::Exact => true,
                        Bound::Lower => score >= beta,
                        Bound::Upper => score <= alpha,
                        Bound::None => false,
                    };
                    if cuts {
                        return score;
                    }
                }
            }
        }

        // Endgame tablebases resolve eligible interior nodes outright.
        if ply > 0 && !excluded_active && self.shared.tb.available() {
            let wdl = self.shared.tb.probe_wdl(self.pos);
            if wdl != Wdl::Unknown {
                self.tb_hits += 1;
                self.shared.tb_hits.fetch_add(1, Ordering::Relaxed);
                let score = match wdl {
                    Wdl::Win => TB_WIN_SCORE - ply as i32,
                    Wdl::Loss => -(TB_WIN_SCORE - ply as i32),
                    _ => self.draw_score(),
                };
                // Depth offset keeps later visits from re-probing.
                self.shared.tt.store(
                    self.pos.hash(),
                    score_to_tt(score, ply),
                    0,
                    depth + 6,
                    Bound::Exact,
                );
                return score;
            }
        }

        let in_check = self.pos.in_check();
        let eval = if in_check {
            -SCORE_INFINITE
        } else {
            evaluate(self.pos)
        };
        self.static_eval[ply] = eval;
        let phase = self.pos.phase();

        let params = self.state.params.clone();

        // ================================================================
        // Node-level pruning
        // ================================================================
        if !is_pv && !in_check && !excluded_active && ply > 0 {
            // Reverse futility: eval is so far above beta that a margin
            // per ply of depth cannot bring it back.
            if depth <= params.rfp_depth
                && beta.abs() < SCORE_NEAR_MATE
                && eval - params.rfp_margin * depth >= beta
            {
                return eval;
            }

            // Razoring: hopeless static eval drops straight into
            // quiescence for confirmation.
            if depth <= params.razor_depth
                && eval + params.razor_base + params.razor_per_depth * depth < alpha
            {
                let score = self.quiesce(alpha - 1, alpha, ply, 0);
                if score < alpha {
                    return score;
                }
            }

            // Null move: hand over the turn; a reduced search still
            // reaching beta means the position is too good to need a
            // move.
            if allow_null
                && depth >= params.null_min_depth
                && eval >= beta
                && beta.abs() < SCORE_NEAR_MATE
                && self.pos.non_pawn_pieces(self.pos.side_to_move()) >= 2
            {
                let mut r = 3 + depth / 6 + ((eval - beta) / 200).min(3);
                if phase < 64 {
                    r -= 1;
                }
                let null_depth = depth - r - 1;

                self.previous_move[ply] = Move::NONE;
                self.previous_piece[ply] = None;
                let rec = self.pos.make_null_move();
                let score =
                    -self.negamax(null_depth, -beta, -beta + 1, ply + 1, false, Move::NONE);
                self.pos.unmake_null_move(rec);

                if self.should_stop() {
                    return 0;
                }
                if score >= beta {
                    // Verify at depth to guard against zugzwang.
                    if depth > params.null_verify_depth {
                        let verify =
                            self.negamax(null_depth, beta - 1, beta, ply, false, Move::NONE);
                        if verify >= beta {
                            return beta;
                        }
                    } else {
                        return beta;
                    }
                }
            }

            // ProbCut: a winning capture that beats beta by a wide margin
            // at reduced depth will usually hold at full depth.
            if depth >= params.probcut_min_depth && beta.abs() < SCORE_NEAR_MATE {
                let prob_beta = beta + params.probcut_margin;
                if let Some(score) = self.probcut(depth, prob_beta, ply) {
                    return score;
                }
            }
        }

        // Internal iterative deepening: no hash move at high depth means
        // a reduced search first to populate the table.
        if tt_move.is_none()
            && !excluded_active
            && ((is_pv && depth >= params.iid_pv_depth)
                || (!is_pv && depth >= params.iid_non_pv_depth))
        {
            self.negamax(depth / 2, alpha, beta, ply, false, Move::NONE);
            tt_move = self
                .shared
                .tt
                .probe(self.pos.hash(), depth)
                .and_then(|hit| self.pos.expand_tt_move(hit.best_move))
                .unwrap_or(Move::NONE);
        }

        // Singular extension test: search every other move below a margin
        // under the hash score; failing that bar means the hash move is
        // the position's single good try.
        let mut singular_extension = 0;
        if let Some(hit) = tt_hit {
            let tt_score = score_from_tt(hit.stored_score, ply);
            if !excluded_active
                && ply > 0
                && depth >= params.singular_min_depth
                && !tt_move.is_none()
                && hit.depth >= depth - 3
                && matches!(hit.bound, Bound::Lower | Bound::Exact)
                && tt_score.abs() < MATE_BOUND
            {
                let singular_beta = tt_score - params.singular_margin * depth;
                let singular_depth = if depth > 10 { depth - 3 } else { (depth - 1) / 2 };
                let score = self.negamax(
                    singular_depth,
                    singular_beta - 1,
                    singular_beta,
                    ply,
                    false,
                    tt_move,
                );
                if score < singular_beta {
                    singular_extension = 1;
                }
            }
        }

        let check_extension = u32::from(in_check && ply + 2 < MAX_PLY);

        // ================================================================
        // Move loop
        // ================================================================
        let alpha_orig = alpha;
        let mut best_score = -SCORE_INFINITE;
        let mut best_move = Move::NONE;
        let mut moves_searched: usize = 0;
        let mut quiets_tried: [Move; 64] = [Move::NONE; 64];
        let mut quiets_count = 0usize;
        let mut captures_tried: [Move; 32] = [Move::NONE; 32];
        let mut captures_count = 0usize;

        let mut picker = MovePicker::new(self.pick_context(ply, tt_move));
        while let Some(m) = picker.next(self.pos, &self.state.tables, &params) {
            if m == excluded {
                continue;
            }
            if self.should_stop() {
                break;
            }

            let is_quiet = m.is_quiet();

            // Move-count and margin pruning, never on the first move so a
            // legal move always gets searched.
            if !is_pv && !in_check && moves_searched >= 1 && best_score > -MATE_BOUND {
                if is_quiet
                    && depth <= params.futility_depth
                    && eval + params.futility_margin(depth, phase) <= alpha
                {
                    continue;
                }
                if is_quiet
                    && depth <= params.lmp_depth
                    && moves_searched > super::params::SearchParams::lmp_threshold(depth)
                {
                    continue;
                }
                if is_quiet
                    && depth <= params.see_prune_depth
                    && self.pos.see(m) < -params.see_prune_margin * depth
                {
                    continue;
                }
            }

            let moving_piece = self.pos.piece_at(m.from()).map(|(_, p)| p);
            let victim = if m.is_en_passant() {
                Some(Piece::Pawn)
            } else {
                self.pos.piece_at(m.to()).map(|(_, p)| p)
            };

            // Extensions.
            let mut extension = check_extension;
            if m == tt_move && singular_extension > 0 {
                extension += singular_extension;
            }
            if extension == 0
                && depth < 8
                && m.is_capture()
                && ply >= 1
                && self.previous_move[ply - 1].to() == m.to()
                && self.previous_piece[ply - 1].is_some()
            {
                extension += 1;
            }
            if moving_piece == Some(Piece::Pawn) && Self::is_seventh_rank_push(self.pos, m) {
                extension += 1;
            }
            let extension = extension.min(2);

            if is_quiet && quiets_count < quiets_tried.len() {
                quiets_tried[quiets_count] = m;
                quiets_count += 1;
            } else if m.is_capture() && captures_count < captures_tried.len() {
                captures_tried[captures_count] = m;
                captures_count += 1;
            }

            let rec = self.pos.make_move(m);
            debug_assert!(
                !self
                    .pos
                    .is_square_attacked(self.pos.king_square(self.pos.side_to_move().opponent()), self.pos.side_to_move()),
                "picker emitted an illegal move"
            );
            self.shared.tt.prefetch(self.pos.hash());
            let gives_check = self.pos.in_check();
            self.previous_move[ply] = m;
            self.previous_piece[ply] = moving_piece;
            moves_searched += 1;

            let new_depth = depth - 1 + extension as i32;
            let mut score;
            if moves_searched == 1 {
                score = -self.negamax(new_depth, -beta, -alpha, ply + 1, true, Move::NONE);
            } else {
                // Late move reductions for the tail of the list.
                let r = self.lmr_reduction(
                    depth,
                    moves_searched,
                    is_pv,
                    in_check,
                    gives_check,
                    m,
                    moving_piece,
                    ply,
                );
                score =
                    -self.negamax(new_depth - r, -alpha - 1, -alpha, ply + 1, true, Move::NONE);
                if score > alpha && r > 0 {
                    score =
                        -self.negamax(new_depth, -alpha - 1, -alpha, ply + 1, true, Move::NONE);
                }
                if score > alpha && score < beta && is_pv {
                    score = -self.negamax(new_depth, -beta, -alpha, ply + 1, true, Move::NONE);
                }
            }
            self.pos.unmake_move(m, rec);

            if self.should_stop() {
                break;
            }

            if score > best_score {
                best_score = score;
                best_move = m;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        self.note_cutoff(
                            m,
                            moving_piece,
                            victim,
                            ply,
                            depth,
                            &quiets_tried[..quiets_count],
                            &captures_tried[..captures_count],
                        );
                        break;
                    }
                }
            }
        }

        if moves_searched == 0 {
            if excluded_active {
                // Only the excluded move was available; report failure
                // against the singular bar.
                return alpha;
            }
            return if in_check {
                -MATE_SCORE + ply as i32
            } else {
                0
            };
        }

        if !excluded_active && !self.should_stop() {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > alpha_orig {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.shared.tt.store(
                self.pos.hash(),
                score_to_tt(best_score, ply),
                best_move.to_compact(),
                depth,
                bound,
            );
        }

        best_score
    }

    /// ProbCut: try winning captures at `depth - 4` against a raised
    /// beta; any that hold prune the node.
    fn probcut(&mut self, depth: i32, prob_beta: i32, ply: usize) -> Option<i32> {
        let captures = self.pos.generate_captures();
        for &m in &captures {
            if !self.pos.is_legal(m) || self.pos.see(m) < 0 {
                continue;
            }
            let moving_piece = self.pos.piece_at(m.from()).map(|(_, p)| p);
            let rec = self.pos.make_move(m);
            self.previous_move[ply] = m;
            self.previous_piece[ply] = moving_piece;

            // Cheap quiescence gate before the reduced verification.
            let mut score = -self.quiesce(-prob_beta, -prob_beta + 1, ply + 1, 0);
            if score >= prob_beta {
                score = -self.negamax(
                    depth - 4,
                    -prob_beta,
                    -prob_beta + 1,
                    ply + 1,
                    false,
                    Move::NONE,
                );
            }
            self.pos.unmake_move(m, rec);

            if self.should_stop() {
                return None;
            }
            if score >= prob_beta {
                return Some(score);
            }
        }
        None
    }

    /// Reduction for a late move: the log-log table, nudged by history
    /// and node character, clamped to `[0, depth - 2]`.
    #[allow(clippy::too_many_arguments)]
    fn lmr_reduction(
        &self,
        depth: i32,
        move_index: usize,
        is_pv: bool,
        in_check: bool,
        gives_check: bool,
        m: Move,
        moving_piece: Option<Piece>,
        ply: usize,
    ) -> i32 {
        if depth < 2 || in_check {
            return 0;
        }
        let table = lmr_table();
        let mut r = i32::from(table[depth.min(63) as usize][move_index.min(63)]);

        if is_pv {
            r -= 1;
        }
        if m.is_capture() || m.is_promotion() {
            r -= 1;
        }
        if gives_check {
            r -= 1;
        }

        // Well-regarded quiet moves reduce less, poorly regarded ones
        // more.
        if let Some(piece) = moving_piece {
            if m.is_quiet() {
                let mut hist = self
                    .state
                    .tables
                    .history
                    .score(self.pos.side_to_move(), piece, m.to());
                if ply >= 1 {
                    if let Some((prev_piece, prev_to)) =
                        self.previous_piece[ply - 1].map(|p| (p, self.previous_move[ply - 1].to()))
                    {
                        hist += self
                            .state
                            .tables
                            .continuation
                            .score(prev_piece, prev_to, piece, m.to());
                    }
                }
                r -= (hist / 8192).clamp(-2, 2);
            }
        }

        r.clamp(0, depth - 2)
    }

    fn is_seventh_rank_push(pos: &crate::board::Position, m: Move) -> bool {
        match pos.side_to_move() {
            crate::board::Color::White => m.to().rank() == 6,
            crate::board::Color::Black => m.to().rank() == 1,
        }
    }

    /// Beta-cutoff bookkeeping: killers, counter move, history gravity
    /// with a `±depth²` pulse, and the capture history symmetrically.
    #[allow(clippy::too_many_arguments)]
    fn note_cutoff(
        &mut self,
        m: Move,
        moving_piece: Option<Piece>,
        victim: Option<Piece>,
        ply: usize,
        depth: i32,
        quiets_tried: &[Move],
        captures_tried: &[Move],
    ) {
        let bonus = depth * depth;
        let us = self.pos.side_to_move();
        let prev = (ply >= 1)
            .then(|| self.previous_piece[ply - 1].map(|p| (p, self.previous_move[ply - 1].to())))
            .flatten();
        let follow = (ply >= 2)
            .then(|| self.previous_piece[ply - 2].map(|p| (p, self.previous_move[ply - 2].to())))
            .flatten();

        if m.is_quiet() {
            self.state.tables.killers.update(ply, m);
            if let Some((prev_piece, prev_to)) = prev {
                self.state.tables.counters.set(prev_piece, prev_to, m);
            }
            if let Some(piece) = moving_piece {
                self.state.tables.history.update(us, piece, m.to(), bonus);
                if let Some((prev_piece, prev_to)) = prev {
                    self.state
                        .tables
                        .continuation
                        .update(prev_piece, prev_to, piece, m.to(), bonus);
                }
                if let Some((fu_piece, fu_to)) = follow {
                    self.state
                        .tables
                        .follow_up
                        .update(fu_piece, fu_to, piece, m.to(), bonus);
                }
            }

            // Quiets tried before the cutoff move pulled their weight
            // down.
            for &quiet in quiets_tried {
                if quiet == m {
                    continue;
                }
                if let Some((_, piece)) = self.pos.piece_at(quiet.from()) {
                    self.state.tables.history.update(us, piece, quiet.to(), -bonus);
                    if let Some((prev_piece, prev_to)) = prev {
                        self.state
                            .tables
                            .continuation
                            .update(prev_piece, prev_to, piece, quiet.to(), -bonus);
                    }
                    if let Some((fu_piece, fu_to)) = follow {
                        self.state
                            .tables
                            .follow_up
                            .update(fu_piece, fu_to, piece, quiet.to(), -bonus);
                    }
                }
            }
        } else if let (Some(attacker), Some(victim)) = (moving_piece, victim) {
            self.state
                .tables
                .capture_history
                .update(attacker, m.to(), victim, bonus);
            for &capture in captures_tried {
                if capture == m {
                    continue;
                }
                if let Some((_, att)) = self.pos.piece_at(capture.from()) {
                    let vic = if capture.is_en_passant() {
                        Piece::Pawn
                    } else {
                        self.pos.piece_at(capture.to()).map_or(Piece::Pawn, |(_, p)| p)
                    };
                    self.state
                        .tables
                        .capture_history
                        .update(att, capture.to(), vic, -bonus);
                }
            }
        }
    }

}
