//! Benchmarks for submission throughput under backpressure

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ringsched::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn drain(scheduler: &Scheduler, expected: u64) {
    while scheduler.metrics().tasks_dispatched < expected {
        std::thread::yield_now();
    }
}

fn bench_submit_by_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_by_capacity");

    for capacity in [1usize, 16, 256] {
        let scheduler = create(capacity, 4, "bench", None).unwrap();
        let submitted = AtomicU64::new(0);

        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                for _ in 0..1000 {
                    scheduler.execute(|| {
                        black_box(0u64);
                    })
                    .unwrap();
                }
                let total = submitted.fetch_add(1000, Ordering::Relaxed) + 1000;
                drain(&scheduler, total);
            });
        });

        destroy(Some(scheduler));
    }

    group.finish();
}

fn bench_multi_producer(c: &mut Criterion) {
    let scheduler = Arc::new(create(64, 4, "bench", None).unwrap());
    let submitted = AtomicU64::new(0);

    c.bench_function("four_producers", |b| {
        b.iter(|| {
            let producers: Vec<_> = (0..4)
                .map(|_| {
                    let scheduler = scheduler.clone();
                    std::thread::spawn(move || {
                        for i in 0..250u64 {
                            scheduler.execute(move || {
                                black_box(i * i);
                            })
                            .unwrap();
                        }
                    })
                })
                .collect();
            for producer in producers {
                producer.join().unwrap();
            }
            let total = submitted.fetch_add(1000, Ordering::Relaxed) + 1000;
            drain(&scheduler, total);
        });
    });
}

criterion_group!(benches, bench_submit_by_capacity, bench_multi_producer);
criterion_main!(benches);
