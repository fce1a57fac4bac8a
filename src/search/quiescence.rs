//! Quiescence search: play out winning captures (and check evasions)
//! until the position is quiet enough to trust the static evaluation.

use crate::board::{Move, MAX_PLY};
use crate::eval::evaluate;
use crate::tt::Bound;

use super::constants::{
    score_from_tt, score_to_tt, MATE_SCORE, MAX_QSEARCH_PLY, SCORE_INFINITE,
};
use super::iterative::Searcher;
use super::picker::{MovePicker, PickContext};

/// Delta-pruning margin: even winning a queen cannot rescue alpha.
const DELTA_MARGIN: i32 = 900;

impl Searcher<'_> {
    pub(super) fn quiesce(&mut self, mut alpha: i32, beta: i32, ply: usize, qply: i32) -> i32 {
        self.count_node(ply);
        // Deadline polling never skips quiescence leaves.
        if self.should_stop() {
            return 0;
        }
        if ply >= MAX_PLY - 1 {
            return evaluate(self.pos);
        }

        let in_check = self.pos.in_check();
        let stand_pat = if in_check {
            -SCORE_INFINITE
        } else {
            evaluate(self.pos)
        };

        if qply >= MAX_QSEARCH_PLY {
            return if in_check { 0 } else { stand_pat };
        }

        if !in_check {
            if stand_pat >= beta {
                return stand_pat;
            }
            if stand_pat + DELTA_MARGIN < alpha {
                return stand_pat;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        }

        let is_pv = beta > alpha + 1;

        // Table lookup at depth zero: a cut for non-PV nodes, ordering
        // for everyone.
        let tt_hit = self.shared.tt.probe(self.pos.hash(), 0);
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
        let tt_move = tt_hit
            .and_then(|hit| self.pos.expand_tt_move(hit.best_move))
            .unwrap_or(Move::NONE);

        let mut best_score = stand_pat;
        let mut best_move = Move::NONE;
        let mut moves_searched = 0usize;

        if in_check {
            // Evasions: all legal moves, ordered by the full picker.
            let mut picker = MovePicker::new(self.pick_context(ply, tt_move));
            let params = self.state.params.clone();
            while let Some(m) = picker.next(self.pos, &self.state.tables, &params) {
                let moving_piece = self.pos.piece_at(m.from()).map(|(_, p)| p);
                let rec = self.pos.make_move(m);
                self.previous_move[ply] = m;
                self.previous_piece[ply] = moving_piece;
                moves_searched += 1;
                let score = -self.quiesce(-beta, -alpha, ply + 1, qply + 1);
                self.pos.unmake_move(m, rec);

                if self.should_stop() {
                    return 0;
                }
                if score > best_score {
                    best_score = score;
                    best_move = m;
                    if score > alpha {
                        alpha = score;
                        if alpha >= beta {
                            break;
                        }
                    }
                }
            }
            if moves_searched == 0 {
                return -MATE_SCORE + ply as i32;
            }
        } else {
            // Winning captures only; the quiescence picker filters SEE < 0.
            let mut picker =
                MovePicker::new_quiescence(PickContext::bare(tt_move, self.pos.side_to_move()));
            let params = self.state.params.clone();
            while let Some(m) = picker.next(self.pos, &self.state.tables, &params) {
                let moving_piece = self.pos.piece_at(m.from()).map(|(_, p)| p);
                let rec = self.pos.make_move(m);
                self.shared.tt.prefetch(self.pos.hash());
                self.previous_move[ply] = m;
                self.previous_piece[ply] = moving_piece;
                let score = -self.quiesce(-beta, -alpha, ply + 1, qply + 1);
                self.pos.unmake_move(m, rec);

                if self.should_stop() {
                    return 0;
                }
                if score > best_score {
                    best_score = score;
                    best_move = m;
                    if score > alpha {
                        alpha = score;
                        if alpha >= beta {
                            break;
                        }
                    }
                }
            }
        }

        if !self.should_stop() {
            let bound = if best_score >= beta {
                Bound::Lower
            } else {
                Bound::Upper
            };
            self.shared.tt.store(
                self.pos.hash(),
                score_to_tt(best_score, ply),
                best_move.to_compact(),
                0,
                bound,
            );
        }

        best_score
    }
}
