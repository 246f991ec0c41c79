//! Benchmarks for the fair semaphore, both pool strategies and full runs.
//!
//! Benchmarks cover:
//! - Uncontended semaphore acquire/release
//! - Pool acquire/release per strategy and pool size
//! - Contended gazer loops through the controller

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use palantir_pool::builders::{build_pool, build_simulation};
use palantir_pool::config::SimulationConfig;
use palantir_pool::core::Stone;
use palantir_pool::sync::{FairSemaphore, Interrupt, PermitSemaphore};
use palantir_pool::util::{GazerId, PoolStrategy};

// ============================================================================
// Semaphore
// ============================================================================

fn bench_semaphore_uncontended(c: &mut Criterion) {
    let semaphore = FairSemaphore::new(1);
    let interrupt = Interrupt::new();
    c.bench_function("semaphore_uncontended", |b| {
        b.iter(|| {
            semaphore.acquire(black_box(&interrupt)).unwrap();
            semaphore.release().unwrap();
        });
    });
}

// ============================================================================
// Pools
// ============================================================================

fn bench_pool_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_acquire_release");
    for strategy in [PoolStrategy::Locked, PoolStrategy::Concurrent] {
        for size in [1usize, 16, 256] {
            let pool = build_pool(strategy, Arc::new(FairSemaphore::new(0)));
            pool.build_model(Stone::forge(size)).unwrap();
            let interrupt = Interrupt::new();
            // Hold all but one so every acquire scans to the last stone.
            let held: Vec<_> = (0..size - 1)
                .map(|i| pool.acquire(GazerId(i), &interrupt).unwrap())
                .collect();

            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let stone = pool.acquire(GazerId(size), &interrupt).unwrap();
                        pool.release(GazerId(size), Some(black_box(&stone))).unwrap();
                    });
                },
            );
            drop(held);
        }
    }
    group.finish();
}

// ============================================================================
// End-to-end
// ============================================================================

fn bench_simulation_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_run");
    group.sample_size(10);
    for strategy in [PoolStrategy::Locked, PoolStrategy::Concurrent] {
        let iterations = 200u64;
        let gazers = 8usize;
        group.throughput(Throughput::Elements(iterations * gazers as u64));
        let cfg = SimulationConfig::default()
            .with_strategy(strategy)
            .with_stone_count(3)
            .with_gazer_count(gazers)
            .with_iterations(iterations)
            .with_gaze_ms(0, 0);
        let controller = build_simulation(&cfg).unwrap();

        group.bench_function(BenchmarkId::from_parameter(format!("{strategy:?}")), |b| {
            b.iter(|| {
                black_box(controller.start().unwrap());
                controller.reset().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_semaphore_uncontended,
    bench_pool_acquire_release,
    bench_simulation_run
);
criterion_main!(benches);
