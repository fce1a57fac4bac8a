//! Endgame tablebase probe bridge.
//!
//! Only the probe contract lives here; reading Syzygy files from disk is a
//! provider concern behind the `TablebaseProvider` trait. With no provider
//! installed every probe reports unavailable and the search carries on.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::board::{Move, Position};

/// Five-valued win/draw/loss verdict.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Wdl {
    Win,
    /// Win spoiled by the 50-move rule.
    CursedWin,
    Draw,
    /// Loss saved by the 50-move rule.
    BlessedLoss,
    Loss,
    Unknown,
}

impl Wdl {
    /// Decisive verdicts map to interior scores; the rest are draws.
    #[inline]
    #[must_use]
    pub fn is_decisive(self) -> bool {
        matches!(self, Wdl::Win | Wdl::Loss)
    }
}

/// Root probe result: verdict, distance to zeroing, and the preferred
/// move when the provider knows one.
#[derive(Clone, Copy, Debug)]
pub struct RootProbe {
    pub wdl: Wdl,
    pub dtz: i32,
    pub best_move: Option<Move>,
}

/// Implemented by a concrete tablebase backend.
pub trait TablebaseProvider: Send + Sync {
    /// Largest total piece count the backend covers.
    fn max_pieces(&self) -> u32;
    fn probe_wdl(&self, pos: &Position) -> Wdl;
    fn probe_root(&self, pos: &Position) -> Option<RootProbe>;
}

/// The search-facing bridge; counts probes and hits with relaxed atomics.
#[derive(Default)]
pub struct Tablebases {
    provider: Option<Box<dyn TablebaseProvider>>,
    probes: AtomicU64,
    hits: AtomicU64,
}

impl Tablebases {
    #[must_use]
    pub fn empty() -> Self {
        Tablebases::default()
    }

    #[must_use]
    pub fn with_provider(provider: Box<dyn TablebaseProvider>) -> Self {
        Tablebases {
            provider: Some(provider),
            probes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn available(&self) -> bool {
        self.provider.is_some()
    }

    #[inline]
    #[must_use]
    pub fn max_pieces(&self) -> u32 {
        self.provider.as_ref().map_or(0, |p| p.max_pieces())
    }

    /// Probe eligibility: few enough pieces, no castling rights, both
    /// kings on the board.
    #[must_use]
    pub fn eligible(&self, pos: &Position) -> bool {
        self.available()
            && pos.occupancy().count() <= self.max_pieces()
            && pos.castling().is_empty()
    }

    /// WDL probe for an interior node. `Unknown` when unavailable or
    /// ineligible.
    #[must_use]
    pub fn probe_wdl(&self, pos: &Position) -> Wdl {
        let Some(provider) = &self.provider else {
            return Wdl::Unknown;
        };
        if !self.eligible(pos) {
            return Wdl::Unknown;
        }
        self.probes.fetch_add(1, Ordering::Relaxed);
        let wdl = provider.probe_wdl(pos);
        if wdl != Wdl::Unknown {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        wdl
    }

    /// Root probe; a returned move bypasses the search entirely.
    #[must_use]
    pub fn probe_root(&self, pos: &Position) -> Option<RootProbe> {
        let provider = self.provider.as_ref()?;
        if !self.eligible(pos) {
            return None;
        }
        self.probes.fetch_add(1, Ordering::Relaxed);
        let probe = provider.probe_root(pos);
        if probe.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        probe
    }

    #[inline]
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    struct AlwaysDraw;

    impl TablebaseProvider for AlwaysDraw {
        fn max_pieces(&self) -> u32 {
            5
        }
        fn probe_wdl(&self, _pos: &Position) -> Wdl {
            Wdl::Draw
        }
        fn probe_root(&self, _pos: &Position) -> Option<RootProbe> {
            Some(RootProbe {
                wdl: Wdl::Draw,
                dtz: 0,
                best_move: None,
            })
        }
    }

    #[test]
    fn empty_bridge_reports_unavailable() {
        let tb = Tablebases::empty();
        assert!(!tb.available());
        assert_eq!(tb.max_pieces(), 0);
        assert_eq!(tb.probe_wdl(&Position::new()), Wdl::Unknown);
        assert!(tb.probe_root(&Position::new()).is_none());
        assert_eq!(tb.probes(), 0);
    }

    #[test]
    fn eligibility_gates_probes() {
        let tb = Tablebases::with_provider(Box::new(AlwaysDraw));

        // Startpos: 32 pieces plus castling rights, not eligible.
        assert!(!tb.eligible(&Position::new()));
        assert_eq!(tb.probe_wdl(&Position::new()), Wdl::Unknown);
        assert_eq!(tb.probes(), 0);

        let kqk = Position::from_fen("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1").unwrap();
        assert!(tb.eligible(&kqk));
        assert_eq!(tb.probe_wdl(&kqk), Wdl::Draw);
        assert_eq!(tb.probes(), 1);
        assert_eq!(tb.hits(), 1);
    }

    #[test]
    fn decisive_classification() {
        assert!(Wdl::Win.is_decisive());
        assert!(Wdl::Loss.is_decisive());
        assert!(!Wdl::CursedWin.is_decisive());
        assert!(!Wdl::Draw.is_decisive());
        assert!(!Wdl::Unknown.is_decisive());
    }
}
