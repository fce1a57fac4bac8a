//! Time management: turn the clock state into per-move budgets.

use crate::board::Color;

/// Clock state as handed over by the `go` command.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeControl {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: u64,
    pub binc: u64,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub infinite: bool,
}

/// Budgets in milliseconds for one move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeAllocation {
    /// Nominal target for this move.
    pub allocated: u64,
    /// Soft deadline: no new iteration is started past this point. Sits
    /// at 80% of `max`.
    pub optimal: u64,
    /// Hard deadline; the search is stopped here.
    pub max: u64,
    /// Remaining-time threshold below which emergency scaling applied.
    pub panic: u64,
}

/// Emergency threshold in milliseconds of absolute remaining time.
const EMERGENCY_FLOOR_MS: u64 = 30_000;

/// Smallest budget ever allocated.
const MIN_BUDGET_MS: u64 = 50;

/// Phase-dependent moves-to-go estimate: opening positions still have a
/// long game ahead of them.
fn movestogo_estimate(phase: i32) -> u64 {
    if phase >= 176 {
        35
    } else if phase >= 64 {
        25
    } else {
        15
    }
}

/// Phase scaling in percent: spend less out of the opening, more in the
/// endgame where precision pays.
fn phase_scale_percent(phase: i32) -> u64 {
    if phase >= 176 {
        80
    } else if phase >= 64 {
        100
    } else {
        120
    }
}

/// Score scaling in percent: bank time when clearly winning, dig in when
/// worse.
fn score_scale_percent(last_score: i32) -> u64 {
    match last_score {
        s if s > 300 => 80,
        s if s > 100 => 90,
        s if s < -300 => 125,
        s if s < -100 => 110,
        _ => 100,
    }
}

/// Compute the budgets for this move, or `None` when the search is not
/// time-bound (infinite, pondering, or no clock given).
///
/// `time_factor_percent` comes from the TimePressure style slider; 100 is
/// neutral.
#[must_use]
pub fn allocate(
    tc: &TimeControl,
    stm: Color,
    phase: i32,
    last_score: i32,
    move_overhead: u64,
    time_factor_percent: u64,
) -> Option<TimeAllocation> {
    if tc.infinite {
        return None;
    }

    if let Some(movetime) = tc.movetime {
        let budget = movetime.saturating_sub(move_overhead).max(1);
        return Some(TimeAllocation {
            allocated: budget,
            optimal: budget,
            max: budget,
            panic: budget,
        });
    }

    let (remaining, inc) = match stm {
        Color::White => (tc.wtime?, tc.winc),
        Color::Black => (tc.btime?, tc.binc),
    };
    let remaining = remaining.saturating_sub(move_overhead).max(1);

    let emergency = remaining < 30 * inc.max(1) || remaining < EMERGENCY_FLOOR_MS;
    let sudden_death = inc == 0 && tc.movestogo.is_none();

    let mut allocated = if emergency && inc == 0 {
        remaining / 10
    } else if emergency {
        remaining / 10 + inc / 2
    } else if sudden_death {
        remaining / 40
    } else {
        let togo = tc.movestogo.unwrap_or_else(|| movestogo_estimate(phase));
        let base = remaining / (togo + 3) + inc * 3 / 4;
        base * phase_scale_percent(phase) / 100
    };

    allocated = allocated * score_scale_percent(last_score) / 100;
    allocated = allocated * time_factor_percent / 100;

    // Never below the floor, never more than half the clock.
    let cap = (remaining / 2).max(1);
    allocated = allocated.clamp(MIN_BUDGET_MS.min(cap), cap);

    let max = (allocated * 3)
        .min(cap)
        .min(remaining.saturating_sub(50))
        .max(allocated);
    let optimal = max * 80 / 100;

    Some(TimeAllocation {
        allocated,
        optimal: optimal.max(1),
        max: max.max(1),
        panic: remaining / 10,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(wtime: u64, winc: u64) -> TimeControl {
        TimeControl {
            wtime: Some(wtime),
            winc,
            ..TimeControl::default()
        }
    }

    #[test]
    fn infinite_has_no_budget() {
        let control = TimeControl {
            infinite: true,
            ..TimeControl::default()
        };
        assert!(allocate(&control, Color::White, 128, 0, 10, 100).is_none());
    }

    #[test]
    fn fixed_movetime_overrides_the_clock() {
        let control = TimeControl {
            movetime: Some(200),
            wtime: Some(1000),
            ..TimeControl::default()
        };
        let alloc = allocate(&control, Color::White, 128, 0, 10, 100).unwrap();
        assert_eq!(alloc.allocated, 190);
        assert_eq!(alloc.max, 190);
    }

    #[test]
    fn budget_stays_within_caps() {
        for (remaining, inc) in [(60_000, 600), (300_000, 2_000), (5_000, 0), (100, 0)] {
            let alloc = allocate(&tc(remaining, inc), Color::White, 128, 0, 0, 100).unwrap();
            assert!(alloc.allocated >= 1);
            assert!(alloc.allocated <= remaining / 2, "alloc {alloc:?}");
            assert!(alloc.max <= remaining.saturating_sub(50).max(1));
            assert!(alloc.optimal <= alloc.max);
        }
    }

    #[test]
    fn endgame_budgets_run_longer_than_opening() {
        let control = tc(120_000, 1_000);
        let opening = allocate(&control, Color::White, 256, 0, 0, 100).unwrap();
        let endgame = allocate(&control, Color::White, 0, 0, 0, 100).unwrap();
        assert!(endgame.allocated > opening.allocated);
    }

    #[test]
    fn winning_big_spends_less() {
        let control = tc(120_000, 1_000);
        let level = allocate(&control, Color::White, 128, 0, 0, 100).unwrap();
        let winning = allocate(&control, Color::White, 128, 500, 0, 100).unwrap();
        let losing = allocate(&control, Color::White, 128, -500, 0, 100).unwrap();
        assert!(winning.allocated < level.allocated);
        assert!(losing.allocated > level.allocated);
    }

    #[test]
    fn emergency_mode_shrinks_hard() {
        let normal = allocate(&tc(120_000, 1_000), Color::White, 128, 0, 0, 100).unwrap();
        let panicked = allocate(&tc(8_000, 0), Color::White, 128, 0, 0, 100).unwrap();
        assert!(panicked.allocated < normal.allocated);
        assert!(panicked.allocated <= 8_000 / 10 + 1);
    }

    #[test]
    fn sudden_death_divides_by_forty() {
        let alloc = allocate(&tc(400_000, 0), Color::White, 128, 0, 0, 100).unwrap();
        assert_eq!(alloc.allocated, 400_000 / 40);
    }

    #[test]
    fn black_reads_its_own_clock() {
        let control = TimeControl {
            wtime: Some(1_000),
            btime: Some(200_000),
            binc: 2_000,
            ..TimeControl::default()
        };
        let alloc = allocate(&control, Color::Black, 128, 0, 0, 100).unwrap();
        assert!(alloc.allocated > 1_000);
    }
}
