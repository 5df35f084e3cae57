//! NodeDB query benchmarks.
//!
//! Closest-node lookups over tables of random identities.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use myriadmesh_nodedb::{DiskExecutor, DiskJob, NodeTable, RouterContact, K};
use myriadmesh_protocol::NodeId;
use std::sync::Arc;

fn table_with(size: usize) -> NodeTable {
    let disk: Arc<dyn DiskExecutor> = Arc::new(|job: DiskJob| job());
    let mut table = NodeTable::new(None, disk, 0, 0);
    for _ in 0..size {
        table.put(RouterContact::new(NodeId::random(), "bench", 0, u64::MAX), 0);
    }
    table
}

fn bench_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nodedb/closest_to");

    for size in [100usize, 1_000, 10_000] {
        let table = table_with(size);
        let target = NodeId::random();
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| table.closest_to(black_box(&target)).map(|rc| rc.pubkey));
        });
    }

    group.finish();
}

fn bench_many_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nodedb/many_closest_to");

    for size in [100usize, 1_000, 10_000] {
        let table = table_with(size);
        let target = NodeId::random();
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| table.many_closest_to(black_box(&target), K));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_closest, bench_many_closest);
criterion_main!(benches);
