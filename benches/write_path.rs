//! Benchmarks for the manager write path over an in-memory transport.

use std::sync::Arc;

use cloudlogging::test_utils::doubles::{RecordingTransport, StaticMetadata};
use cloudlogging::{CloudLoggingManager, Credentials, EnvironmentOverrides, LogLevel, LogRecord};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn manager() -> CloudLoggingManager {
    CloudLoggingManager::resolve(
        "bench",
        &EnvironmentOverrides::default(),
        &Credentials::Ambient,
        "log_name",
        &StaticMetadata::compute(),
        Box::new(Arc::new(RecordingTransport::new())),
    )
    .expect("resolve manager")
}

fn bench_buffered_write(c: &mut Criterion) {
    let record = LogRecord::new(LogLevel::Info, "buffered message");
    c.bench_function("write_buffered", |b| {
        b.iter_batched_ref(
            manager,
            |manager| manager.write(black_box(&record)),
            BatchSize::SmallInput,
        );
    });
}

fn bench_batch_of_128(c: &mut Criterion) {
    let records: Vec<LogRecord> = (0..128)
        .map(|i| LogRecord::new(LogLevel::Info, format!("message {i}")).with_end_of_batch(i == 127))
        .collect();
    c.bench_function("write_batch_128", |b| {
        b.iter_batched_ref(
            manager,
            |manager| {
                for record in &records {
                    let _ = manager.write(black_box(record));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_buffered_write, bench_batch_of_128);
criterion_main!(benches);
