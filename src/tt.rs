//! Shared transposition table.
//!
//! Clusters of four 16-byte entries, one cache line each. Entries are
//! written as two racing 64-bit atomic stores with the key slot holding
//! `key ^ data`: a reader XORs the two halves back together and rejects
//! the entry unless the reconstructed key matches, so a torn read can only
//! surface as a miss. Every probe result is therefore a hint, never an
//! invariant the search may rely on.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// What a stored score means relative to the search window.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
    None,
    /// Score is a lower bound (fail high).
    Lower,
    /// Score is an upper bound (fail low).
    Upper,
    Exact,
}

impl Bound {
    const fn from_bits(bits: u64) -> Bound {
        match bits & 0b11 {
            1 => Bound::Lower,
            2 => Bound::Upper,
            3 => Bound::Exact,
            _ => Bound::None,
        }
    }

    const fn bits(self) -> u64 {
        match self {
            Bound::None => 0,
            Bound::Lower => 1,
            Bound::Upper => 2,
            Bound::Exact => 3,
        }
    }
}

/// A verified table hit.
#[derive(Clone, Copy, Debug)]
pub struct TtHit {
    /// Present only when the stored depth meets the requested depth; this
    /// is the score the search may cut on (subject to the bound).
    pub score: Option<i32>,
    /// The stored score regardless of depth, for ordering heuristics and
    /// the singular-extension margin.
    pub stored_score: i32,
    pub bound: Bound,
    /// Compressed best move; zero when none was stored.
    pub best_move: u16,
    pub depth: i32,
}

// Entry data layout (64 bits):
//   0..16  best move (compressed)
//  16..32  score (i16)
//  32..48  depth (i16)
//  48..56  generation
//  56..58  bound
#[inline]
fn pack(best_move: u16, score: i32, depth: i32, generation: u8, bound: Bound) -> u64 {
    u64::from(best_move)
        | (u64::from(score as i16 as u16) << 16)
        | (u64::from(depth as i16 as u16) << 32)
        | (u64::from(generation) << 48)
        | (bound.bits() << 56)
}

#[inline]
const fn unpack_move(data: u64) -> u16 {
    data as u16
}

#[inline]
const fn unpack_score(data: u64) -> i32 {
    (data >> 16) as u16 as i16 as i32
}

#[inline]
const fn unpack_depth(data: u64) -> i32 {
    (data >> 32) as u16 as i16 as i32
}

#[inline]
const fn unpack_generation(data: u64) -> u8 {
    (data >> 48) as u8
}

#[inline]
const fn unpack_bound(data: u64) -> Bound {
    Bound::from_bits(data >> 56)
}

#[derive(Default)]
struct Entry {
    /// `key ^ data`; zero together with `data` marks an empty slot.
    key: AtomicU64,
    data: AtomicU64,
}

impl Entry {
    fn write(&self, key: u64, data: u64) {
        self.key.store(key ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }
}

const ENTRIES_PER_CLUSTER: usize = 4;

#[repr(align(64))]
#[derive(Default)]
struct Cluster {
    entries: [Entry; ENTRIES_PER_CLUSTER],
}

pub struct TranspositionTable {
    clusters: Box<[Cluster]>,
    mask: usize,
    generation: AtomicU8,
}

/// Smallest table accepted when sizing fails or goes out of range.
pub const MIN_TT_MB: usize = 4;

impl TranspositionTable {
    /// Allocate `floor_pow2(size_mb MiB / cluster size)` zeroed clusters.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let bytes = size_mb.max(1).saturating_mul(1024 * 1024);
        let want = bytes / std::mem::size_of::<Cluster>();
        let count = if want == 0 {
            1
        } else {
            // Round down to a power of two so `key & mask` indexes.
            1usize << (usize::BITS - 1 - want.leading_zeros())
        };

        let mut clusters = Vec::new();
        if clusters.try_reserve_exact(count).is_err() {
            log::warn!("hash allocation of {size_mb} MB failed, shrinking to {MIN_TT_MB} MB");
            return TranspositionTable::new(MIN_TT_MB);
        }
        clusters.resize_with(count, Cluster::default);

        TranspositionTable {
            clusters: clusters.into_boxed_slice(),
            mask: count - 1,
            generation: AtomicU8::new(1),
        }
    }

    #[inline]
    fn cluster(&self, key: u64) -> &Cluster {
        &self.clusters[(key as usize) & self.mask]
    }

    #[inline]
    fn current_generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Advance the generation for a new root search. Wraps past 255 by
    /// skipping zero, which is reserved for never-written entries.
    pub fn new_search(&self) {
        let next = match self.current_generation().wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.generation.store(next, Ordering::Relaxed);
    }

    /// Drop every entry (ucinewgame).
    pub fn clear(&self) {
        for cluster in self.clusters.iter() {
            for entry in &cluster.entries {
                entry.key.store(0, Ordering::Relaxed);
                entry.data.store(0, Ordering::Relaxed);
            }
        }
        self.generation.store(1, Ordering::Relaxed);
    }

    /// Best-effort prefetch of the cluster for `key`.
    #[inline]
    pub fn prefetch(&self, key: u64) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            let cluster: *const Cluster = self.cluster(key);
            _mm_prefetch::<_MM_HINT_T0>(cluster.cast());
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = key;
        }
    }

    /// Look up `key`. On a verified match the entry's generation is
    /// refreshed and the hit is returned; the cut score is present only
    /// when the stored depth covers `depth`.
    #[must_use]
    pub fn probe(&self, key: u64, depth: i32) -> Option<TtHit> {
        let generation = self.current_generation();
        let cluster = self.cluster(key);

        for entry in &cluster.entries {
            let data = entry.data.load(Ordering::Relaxed);
            let stored_key = entry.key.load(Ordering::Relaxed) ^ data;
            if stored_key != key || data == 0 {
                continue;
            }

            if unpack_generation(data) != generation {
                let refreshed = (data & !(0xFF << 48)) | (u64::from(generation) << 48);
                entry.write(key, refreshed);
            }

            let stored_depth = unpack_depth(data);
            let stored_score = unpack_score(data);
            return Some(TtHit {
                score: (stored_depth >= depth).then_some(stored_score),
                stored_score,
                bound: unpack_bound(data),
                best_move: unpack_move(data),
                depth: stored_depth,
            });
        }
        None
    }

    /// Store a search result.
    pub fn store(&self, key: u64, score: i32, best_move: u16, depth: i32, bound: Bound) {
        let generation = self.current_generation();
        let cluster = self.cluster(key);

        // A matching key updates in place when the new entry is at least as
        // deep, or upgrades a non-exact bound to exact. A NONE move never
        // clobbers a stored one.
        for entry in &cluster.entries {
            let data = entry.data.load(Ordering::Relaxed);
            if data == 0 {
                continue;
            }
            if entry.key.load(Ordering::Relaxed) ^ data != key {
                continue;
            }
            let keep_move = if best_move == 0 {
                unpack_move(data)
            } else {
                best_move
            };
            if depth >= unpack_depth(data)
                || (bound == Bound::Exact && unpack_bound(data) != Bound::Exact)
            {
                entry.write(key, pack(keep_move, score, depth, generation, bound));
            }
            return;
        }

        // Otherwise evict the entry with the lowest replacement value,
        // except that a current-generation exact entry more than 3 plies
        // deeper than a non-exact incomer is protected.
        let mut order: [(i64, usize); ENTRIES_PER_CLUSTER] = [(0, 0); ENTRIES_PER_CLUSTER];
        for (idx, entry) in cluster.entries.iter().enumerate() {
            let data = entry.data.load(Ordering::Relaxed);
            let value = if data == 0 {
                i64::MIN
            } else {
                let age = i64::from(generation.wrapping_sub(unpack_generation(data)));
                let exact_bonus = if unpack_bound(data) == Bound::Exact { 16 } else { 0 };
                i64::from(unpack_depth(data)) * 4 + exact_bonus - age * 2
            };
            order[idx] = (value, idx);
        }
        order.sort_unstable();

        for (_, idx) in order {
            let data = cluster.entries[idx].data.load(Ordering::Relaxed);
            let protected = data != 0
                && bound != Bound::Exact
                && unpack_bound(data) == Bound::Exact
                && unpack_generation(data) == generation
                && unpack_depth(data) > depth + 3;
            if !protected {
                cluster.entries[idx].write(key, pack(best_move, score, depth, generation, bound));
                return;
            }
        }
        // Every slot held a protected deep exact entry; keep them.
    }

    /// Permille fill estimate over a sample of up to 1000 clusters,
    /// counting current-generation entries only.
    #[must_use]
    pub fn hashfull(&self) -> u32 {
        let generation = self.current_generation();
        let sample = self.clusters.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let mut filled = 0u32;
        for cluster in self.clusters.iter().take(sample) {
            for entry in &cluster.entries {
                let data = entry.data.load(Ordering::Relaxed);
                if data != 0 && unpack_generation(data) == generation {
                    filled += 1;
                }
            }
        }
        filled * 1000 / (sample as u32 * ENTRIES_PER_CLUSTER as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn store_then_probe_round_trip() {
        let tt = TranspositionTable::new(1);
        tt.store(0xDEAD_BEEF, 42, 0x1234, 8, Bound::Exact);

        let hit = tt.probe(0xDEAD_BEEF, 8).expect("hit");
        assert_eq!(hit.score, Some(42));
        assert_eq!(hit.best_move, 0x1234);
        assert_eq!(hit.bound, Bound::Exact);
        assert_eq!(hit.depth, 8);
    }

    #[test]
    fn shallow_probe_hides_score_but_keeps_move() {
        let tt = TranspositionTable::new(1);
        tt.store(7, -120, 0x0F0F, 4, Bound::Lower);

        let hit = tt.probe(7, 10).expect("hit");
        assert_eq!(hit.score, None);
        assert_eq!(hit.stored_score, -120);
        assert_eq!(hit.best_move, 0x0F0F);
        assert_eq!(hit.bound, Bound::Lower);
    }

    #[test]
    fn miss_on_unknown_key() {
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(99, 0).is_none());
    }

    #[test]
    fn same_key_update_respects_depth() {
        let tt = TranspositionTable::new(1);
        tt.store(5, 10, 0x0101, 10, Bound::Lower);
        // Shallower non-exact store is ignored.
        tt.store(5, 77, 0x0202, 3, Bound::Lower);
        assert_eq!(tt.probe(5, 0).unwrap().stored_score, 10);

        // Exact upgrades regardless of depth.
        tt.store(5, 77, 0x0202, 3, Bound::Exact);
        let hit = tt.probe(5, 0).unwrap();
        assert_eq!(hit.stored_score, 77);
        assert_eq!(hit.bound, Bound::Exact);
    }

    #[test]
    fn none_move_preserves_existing_move() {
        let tt = TranspositionTable::new(1);
        tt.store(5, 10, 0x0101, 4, Bound::Lower);
        tt.store(5, 30, 0, 6, Bound::Lower);
        let hit = tt.probe(5, 0).unwrap();
        assert_eq!(hit.best_move, 0x0101);
        assert_eq!(hit.stored_score, 30);
    }

    #[test]
    fn generation_skips_zero_on_wrap() {
        let tt = TranspositionTable::new(1);
        for _ in 0..600 {
            tt.new_search();
        }
        assert_ne!(tt.current_generation(), 0);
    }

    #[test]
    fn negative_scores_survive_packing() {
        let tt = TranspositionTable::new(1);
        tt.store(1, -30_000, 1, 0, Bound::Upper);
        assert_eq!(tt.probe(1, 0).unwrap().score, Some(-30_000));
    }

    #[test]
    fn hashfull_starts_empty_and_grows() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.hashfull(), 0);
        for key in 0..4000u64 {
            tt.store(key, 0, 1, 1, Bound::Exact);
        }
        assert!(tt.hashfull() > 0);
        assert!(tt.hashfull() <= 1000);
    }

    /// Key discipline: a successful probe only ever returns the value last
    /// stored under that exact key, never another key's data.
    #[test]
    fn random_key_discipline() {
        let tt = TranspositionTable::new(2);
        let mut rng = StdRng::seed_from_u64(42);

        let entries: Vec<(u64, i32, u16, i32, Bound)> = (0..1_000_000)
            .map(|_| {
                let bound = match rng.gen_range(0..3) {
                    0 => Bound::Lower,
                    1 => Bound::Upper,
                    _ => Bound::Exact,
                };
                (
                    rng.gen::<u64>() | 1,
                    i32::from(rng.gen::<i16>()),
                    rng.gen::<u16>(),
                    rng.gen_range(0..100),
                    bound,
                )
            })
            .collect();

        for &(key, score, mv, depth, bound) in &entries {
            tt.store(key, score, mv, depth, bound);
        }

        for &(key, score, mv, depth, bound) in &entries {
            if let Some(hit) = tt.probe(key, depth) {
                assert_eq!(hit.stored_score, score, "score mismatch for key {key:#x}");
                assert_eq!(hit.depth, depth);
                assert_eq!(hit.bound, bound);
                // The move may have been preserved only if we stored one.
                assert_eq!(hit.best_move, mv);
            }
        }
    }
}
