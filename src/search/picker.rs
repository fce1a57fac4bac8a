//! Staged move picker.
//!
//! Yields one legal move at a time, generating lazily: the hash move goes
//! out before any list exists, winning captures before quiet moves are
//! generated at all, and losing captures last. Each emitted move has been
//! legality-checked exactly once, and no move is emitted twice.

use crate::board::{see_value, Color, Move, Piece, Position, ScoredMoveList, Square};

use super::params::SearchParams;
use super::tables::SearchTables;

/// Bonus for a quiet move that lands on the opponent's previous
/// destination square, challenging the piece that just moved.
const DEFENSIVE_BONUS: i32 = 60;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    TtMove,
    GenCaptures,
    GoodCaptures,
    Killers,
    GenQuiets,
    Quiets,
    BadCaptures,
    Done,
}

/// Ordering context borrowed from the search node.
#[derive(Clone, Copy)]
pub struct PickContext {
    pub tt_move: Move,
    pub killers: [Move; 2],
    pub counter: Move,
    /// Opponent's previous move (piece, destination), for the
    /// countermove-history and the defensive bonus.
    pub prev: Option<(Piece, Square)>,
    /// Our move two plies back, for the follow-up history.
    pub follow_up: Option<(Piece, Square)>,
    pub stm: Color,
}

impl PickContext {
    /// Context with no ordering hints, as used in quiescence.
    #[must_use]
    pub fn bare(tt_move: Move, stm: Color) -> Self {
        PickContext {
            tt_move,
            killers: [Move::NONE; 2],
            counter: Move::NONE,
            prev: None,
            follow_up: None,
            stm,
        }
    }
}

pub struct MovePicker {
    stage: Stage,
    ctx: PickContext,
    quiescence: bool,
    good_captures: ScoredMoveList,
    good_idx: usize,
    bad_captures: ScoredMoveList,
    bad_idx: usize,
    quiets: ScoredMoveList,
    quiet_idx: usize,
    killer_idx: usize,
    /// Killer-stage moves actually emitted, to be skipped again in the
    /// quiet stage.
    emitted_killers: [Move; 3],
    emitted_killer_count: usize,
}

impl MovePicker {
    #[must_use]
    pub fn new(ctx: PickContext) -> Self {
        MovePicker {
            stage: Stage::TtMove,
            ctx,
            quiescence: false,
            good_captures: ScoredMoveList::new(),
            good_idx: 0,
            bad_captures: ScoredMoveList::new(),
            bad_idx: 0,
            quiets: ScoredMoveList::new(),
            quiet_idx: 0,
            killer_idx: 0,
            emitted_killers: [Move::NONE; 3],
            emitted_killer_count: 0,
        }
    }

    /// Quiescence variant: hash move and winning captures only.
    #[must_use]
    pub fn new_quiescence(ctx: PickContext) -> Self {
        let mut picker = MovePicker::new(ctx);
        picker.quiescence = true;
        picker
    }

    /// Next legal move, or `None` when exhausted.
    pub fn next(
        &mut self,
        pos: &mut Position,
        tables: &SearchTables,
        params: &SearchParams,
    ) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::GenCaptures;
                    let tt = self.ctx.tt_move;
                    if !tt.is_none() && pos.is_pseudo_legal(tt) && pos.is_legal(tt) {
                        return Some(tt);
                    }
                }

                Stage::GenCaptures => {
                    self.generate_captures(pos);
                    self.stage = Stage::GoodCaptures;
                }

                Stage::GoodCaptures => {
                    if let Some(scored) = self.good_captures.get(self.good_idx) {
                        self.good_idx += 1;
                        return Some(scored.mv);
                    }
                    if self.quiescence {
                        self.stage = Stage::Done;
                        return None;
                    }
                    self.stage = Stage::Killers;
                }

                Stage::Killers => {
                    if let Some(m) = self.next_killer(pos) {
                        return Some(m);
                    }
                    self.stage = Stage::GenQuiets;
                }

                Stage::GenQuiets => {
                    self.generate_quiets(pos, tables, params);
                    self.stage = Stage::Quiets;
                }

                Stage::Quiets => {
                    if let Some(scored) = self.quiets.get(self.quiet_idx) {
                        self.quiet_idx += 1;
                        return Some(scored.mv);
                    }
                    self.bad_captures.sort_desc();
                    self.stage = Stage::BadCaptures;
                }

                Stage::BadCaptures => {
                    if let Some(scored) = self.bad_captures.get(self.bad_idx) {
                        self.bad_idx += 1;
                        return Some(scored.mv);
                    }
                    self.stage = Stage::Done;
                }

                Stage::Done => return None,
            }
        }
    }

    /// Enumerate captures once, split by SEE sign. Winning captures score
    /// `victim*10 - attacker + see`; losing ones keep their raw SEE so the
    /// least damaging come back first.
    fn generate_captures(&mut self, pos: &mut Position) {
        let captures = pos.generate_captures();
        for &m in &captures {
            if m == self.ctx.tt_move || !pos.is_legal(m) {
                continue;
            }
            let see = pos.see(m);
            if see >= 0 {
                let victim = if m.is_en_passant() {
                    Piece::Pawn
                } else {
                    pos.piece_at(m.to()).map_or(Piece::Pawn, |(_, p)| p)
                };
                let attacker = pos.piece_at(m.from()).map_or(Piece::Pawn, |(_, p)| p);
                let score = see_value(victim) * 10 - see_value(attacker) + see;
                self.good_captures.push(m, score);
            } else {
                self.bad_captures.push(m, see);
            }
        }
        self.good_captures.sort_desc();
    }

    /// Up to two killers then the counter move, each emitted at most once,
    /// quiet only, and vetted for legality.
    fn next_killer(&mut self, pos: &mut Position) -> Option<Move> {
        while self.killer_idx < 3 {
            let candidate = match self.killer_idx {
                0 => self.ctx.killers[0],
                1 => self.ctx.killers[1],
                _ => self.ctx.counter,
            };
            self.killer_idx += 1;

            if candidate.is_none()
                || candidate == self.ctx.tt_move
                || candidate.is_capture()
                || self.emitted_killers[..self.emitted_killer_count].contains(&candidate)
            {
                continue;
            }
            if pos.is_pseudo_legal(candidate) && pos.is_legal(candidate) {
                self.emitted_killers[self.emitted_killer_count] = candidate;
                self.emitted_killer_count += 1;
                return Some(candidate);
            }
        }
        None
    }

    /// Enumerate quiets, skipping everything an earlier stage may have
    /// emitted, and order by combined history.
    fn generate_quiets(&mut self, pos: &mut Position, tables: &SearchTables, params: &SearchParams) {
        let all = pos.generate_all();
        for &m in &all {
            if m.is_capture()
                || m == self.ctx.tt_move
                || self.emitted_killers[..self.emitted_killer_count].contains(&m)
                || !pos.is_legal(m)
            {
                continue;
            }
            self.quiets.push(m, self.score_quiet(pos, tables, params, m));
        }
        self.quiets.sort_desc();
    }

    fn score_quiet(
        &self,
        pos: &Position,
        tables: &SearchTables,
        params: &SearchParams,
        m: Move,
    ) -> i32 {
        let piece = pos.piece_at(m.from()).map_or(Piece::Pawn, |(_, p)| p);
        let to = m.to();

        let mut score =
            tables.history.score(self.ctx.stm, piece, to) * params.history_weight / 100;
        if let Some((prev_piece, prev_to)) = self.ctx.prev {
            score += tables.continuation.score(prev_piece, prev_to, piece, to) / 3;
            if to == prev_to {
                score += DEFENSIVE_BONUS;
            }
        }
        if let Some((fu_piece, fu_to)) = self.ctx.follow_up {
            score += tables.follow_up.score(fu_piece, fu_to, piece, to) / 3;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{MoveList, Position};
    use std::collections::HashSet;

    fn drain(pos: &mut Position, picker: &mut MovePicker) -> Vec<Move> {
        let tables = SearchTables::new();
        let params = SearchParams::default();
        let mut out = Vec::new();
        while let Some(m) = picker.next(pos, &tables, &params) {
            out.push(m);
        }
        out
    }

    fn as_set(moves: &MoveList) -> HashSet<Move> {
        moves.iter().copied().collect()
    }

    #[test]
    fn yields_exactly_the_legal_moves_once() {
        for fen in [
            crate::board::START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1",
        ] {
            let mut pos = Position::from_fen(fen).unwrap();
            let legal = as_set(&pos.legal_moves());

            let mut picker = MovePicker::new(PickContext::bare(Move::NONE, pos.side_to_move()));
            let picked = drain(&mut pos, &mut picker);
            let picked_set: HashSet<Move> = picked.iter().copied().collect();

            assert_eq!(picked.len(), picked_set.len(), "duplicate move in {fen}");
            assert_eq!(picked_set, legal, "move set mismatch in {fen}");
        }
    }

    #[test]
    fn tt_move_comes_first() {
        let mut pos = Position::new();
        let tt_move = pos.parse_uci_move("e2e4").unwrap();
        let mut picker = MovePicker::new(PickContext::bare(tt_move, pos.side_to_move()));
        let picked = drain(&mut pos, &mut picker);
        assert_eq!(picked[0], tt_move);
        assert_eq!(picked.iter().filter(|&&m| m == tt_move).count(), 1);
    }

    #[test]
    fn illegal_tt_move_is_ignored() {
        let mut pos = Position::new();
        // A move that is not even pseudo-legal here.
        let bogus = Move::quiet("e2".parse().unwrap(), "e5".parse().unwrap());
        let mut picker = MovePicker::new(PickContext::bare(bogus, pos.side_to_move()));
        let picked = drain(&mut pos, &mut picker);
        let legal = as_set(&pos.legal_moves());
        assert_eq!(picked.len(), legal.len());
        assert!(!picked.contains(&bogus));
    }

    #[test]
    fn winning_captures_precede_quiets() {
        // White can win a pawn with exd5.
        let mut pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let capture = pos.parse_uci_move("e4d5").unwrap();
        let mut picker = MovePicker::new(PickContext::bare(Move::NONE, pos.side_to_move()));
        let picked = drain(&mut pos, &mut picker);
        assert_eq!(picked[0], capture);
    }

    #[test]
    fn losing_captures_come_last() {
        // Rxd5 loses the rook to exd5; every quiet rook/king move should
        // come back before it.
        let mut pos = Position::from_fen("4k3/8/4p3/3p4/8/8/8/3RK3 w - - 0 1").unwrap();
        let bad_capture = pos.parse_uci_move("d1d5").unwrap();
        let mut picker = MovePicker::new(PickContext::bare(Move::NONE, pos.side_to_move()));
        let picked = drain(&mut pos, &mut picker);
        assert_eq!(*picked.last().unwrap(), bad_capture);
    }

    #[test]
    fn killer_is_emitted_after_captures_and_not_repeated() {
        let mut pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let killer = pos.parse_uci_move("e1d2").unwrap();
        let ctx = PickContext {
            tt_move: Move::NONE,
            killers: [killer, Move::NONE],
            counter: Move::NONE,
            prev: None,
            follow_up: None,
            stm: pos.side_to_move(),
        };
        let mut picker = MovePicker::new(ctx);
        let picked = drain(&mut pos, &mut picker);

        let capture = pos.parse_uci_move("e4d5").unwrap();
        assert_eq!(picked[0], capture);
        assert_eq!(picked[1], killer);
        assert_eq!(picked.iter().filter(|&&m| m == killer).count(), 1);
        // The full legal set is still produced.
        assert_eq!(picked.len(), pos.legal_moves().len());
    }

    #[test]
    fn quiescence_variant_stops_after_good_captures() {
        let mut pos = Position::from_fen("4k3/8/4p3/3p4/4P3/8/8/3RK3 w - - 0 1").unwrap();
        let mut picker =
            MovePicker::new_quiescence(PickContext::bare(Move::NONE, pos.side_to_move()));
        let picked = drain(&mut pos, &mut picker);
        // exd5 is the only non-losing capture; Rxd5 loses the exchange.
        assert_eq!(picked, vec![pos.parse_uci_move("e4d5").unwrap()]);
    }
}
