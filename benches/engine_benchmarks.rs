//! Criterion benchmarks: raw move generation throughput via perft, and a
//! fixed-depth search of the starting position.

use criterion::{criterion_group, criterion_main, Criterion};

use sable::board::Position;
use sable::search::smp::SearchPool;
use sable::search::SearchLimits;

fn perft_bench(c: &mut Criterion) {
    c.bench_function("perft startpos depth 4", |b| {
        let mut pos = Position::new();
        b.iter(|| {
            let nodes = pos.perft(4);
            assert_eq!(nodes, 197_281);
            nodes
        });
    });

    c.bench_function("perft kiwipete depth 3", |b| {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        b.iter(|| pos.perft(3));
    });
}

fn search_bench(c: &mut Criterion) {
    c.bench_function("search startpos depth 6", |b| {
        let pos = Position::new();
        b.iter(|| {
            // Fresh pool per run so table state does not leak between
            // samples.
            let pool = SearchPool::new(1, 16);
            pool.start_search(&pos, &SearchLimits::depth_only(6), None)
        });
    });
}

criterion_group!(benches, perft_bench, search_bench);
criterion_main!(benches);
