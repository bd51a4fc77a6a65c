use basalt_perf::{ThroughputConfig, run_throughput};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::time::Duration;

const VALUES_PER_ITER: u64 = 100_000;

fn bench_two_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_cross_thread");
    group.throughput(Throughput::Elements(VALUES_PER_ITER));
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    for &slots in &[16usize, 1000, 1024, 65536] {
        let cfg = ThroughputConfig::new(slots, VALUES_PER_ITER);
        group.bench_function(format!("transfer_slots_{slots}"), |b| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let report = run_throughput(&cfg).expect("throughput run failed");
                    total += Duration::from_nanos(report.elapsed_ns);
                }
                total
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_two_threads);
criterion_main!(benches);
