use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lockstep::{put, rmw, Protocol, TxnProcessor};
use std::collections::BTreeMap;
use std::time::Duration;

const TXNS_PER_BATCH: usize = 256;
const WORKER_THREADS: usize = 16;
const TASK_QUEUES: usize = 4;

fn protocol_label(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Serial => "serial",
        Protocol::LockingExclusive => "locking_a",
        Protocol::Locking => "locking_b",
        Protocol::Occ => "occ",
        Protocol::ParallelOcc => "occ_p",
    }
}

fn seeded_processor(protocol: Protocol, db_size: u64) -> TxnProcessor {
    let processor = TxnProcessor::with_pool(protocol, WORKER_THREADS, TASK_QUEUES);
    let mut init = BTreeMap::new();
    for key in 0..db_size {
        init.insert(key, 0);
    }
    processor.submit(put(init)).expect("seed submit");
    processor.get_txn_result().expect("seed result");
    processor
}

/// Submits one batch of load transactions and awaits every result, keeping
/// the processor saturated for the whole measurement.
fn run_batch(processor: &TxnProcessor, db_size: u64, reads: usize, writes: usize) {
    for _ in 0..TXNS_PER_BATCH {
        processor
            .submit(rmw(db_size, reads, writes, Duration::ZERO))
            .expect("submit");
    }
    for _ in 0..TXNS_PER_BATCH {
        processor.get_txn_result().expect("result");
    }
}

fn bench_contention(c: &mut Criterion) {
    // (label, db_size, keys read, keys written); smaller databases mean more
    // key overlap between concurrent transactions.
    let loads: [(&str, u64, usize, usize); 4] = [
        ("read_only", 10_000, 10, 0),
        ("low_contention", 10_000, 5, 5),
        ("high_contention", 100, 5, 5),
        ("write_hotspot", 16, 0, 4),
    ];

    for (label, db_size, reads, writes) in loads {
        let mut group = c.benchmark_group(format!("contention/{label}"));
        group.throughput(Throughput::Elements(TXNS_PER_BATCH as u64));
        for protocol in Protocol::ALL {
            group.bench_with_input(
                BenchmarkId::from_parameter(protocol_label(protocol)),
                &protocol,
                |b, &protocol| {
                    let processor = seeded_processor(protocol, db_size);
                    b.iter(|| run_batch(&processor, db_size, reads, writes));
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_contention);
criterion_main!(benches);
