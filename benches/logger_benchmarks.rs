//! Criterion benchmarks for rust_secure_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_secure_logger::prelude::*;
use rust_secure_logger::{BufferPool, Encoder, LogSampler, SharedMaskConfig};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn request_fields() -> Vec<Field> {
    vec![
        Field::string("user", "alice"),
        Field::int("status", 200),
        Field::bool("cached", false),
        Field::string("password", "hunter2"),
        Field::object(
            "payment",
            vec![
                Field::string("cardNumber", "4111111111111111"),
                Field::string("currency", "EUR"),
            ],
        ),
    ]
}

fn null_logger(mask: MaskConfig) -> Logger {
    Logger::builder()
        .mask(mask)
        .sink(WriterSink::new("null", io::sink()))
        .build()
        .expect("Failed to build logger")
}

fn card_mask() -> MaskConfig {
    MaskConfig::new()
        .with_key("password")
        .with_pattern(".*cardNumber$")
        .expect("valid pattern")
}

// ============================================================================
// Encoding Benchmarks
// ============================================================================

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    group.throughput(Throughput::Elements(1));

    let fields = request_fields();
    let entry = LogEntry::new(LogLevel::Info, "request handled").with_fields(&fields);

    let plain = Encoder::new(
        OutputFormat::Json,
        SharedMaskConfig::default(),
        BufferPool::new(),
    );
    group.bench_function("json_no_mask", |b| {
        b.iter(|| black_box(plain.encode(black_box(&entry)).unwrap()));
    });

    let masked = Encoder::new(
        OutputFormat::Json,
        SharedMaskConfig::new(card_mask()),
        BufferPool::new(),
    );
    group.bench_function("json_masked", |b| {
        b.iter(|| black_box(masked.encode(black_box(&entry)).unwrap()));
    });

    let text = Encoder::new(
        OutputFormat::Text,
        SharedMaskConfig::new(card_mask()),
        BufferPool::new(),
    );
    group.bench_function("text_masked", |b| {
        b.iter(|| black_box(text.encode(black_box(&entry)).unwrap()));
    });

    group.finish();
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_sync_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_logging");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(card_mask());
    let fields = request_fields();

    group.bench_function("info_no_fields", |b| {
        b.iter(|| logger.info(black_box("Info message"), &[]));
    });

    group.bench_function("info_with_fields", |b| {
        b.iter(|| logger.info(black_box("request handled"), black_box(&fields)));
    });

    let child = logger.with([
        Field::string("service", "checkout"),
        Field::string("request_id", "r-1234"),
    ]);
    group.bench_function("child_with_fields", |b| {
        b.iter(|| child.info(black_box("request handled"), black_box(&fields)));
    });

    group.bench_function("macro_formatted", |b| {
        b.iter(|| {
            rust_secure_logger::info!(logger, "status {}", black_box(200); "user" => "alice");
        });
    });

    group.finish();
}

fn bench_async_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_logging");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::builder()
        .mask(card_mask())
        .sink(WriterSink::new("null", io::sink()))
        .async_mode(10_000)
        .overflow_policy(OverflowPolicy::Block)
        .build()
        .expect("Failed to build logger");
    let fields = request_fields();

    group.bench_function("info_with_fields", |b| {
        b.iter(|| logger.info(black_box("request handled"), black_box(&fields)));
    });

    group.finish();
    let _ = logger.close(Duration::from_secs(10));
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * 100) as u64));
        let logger = null_logger(card_mask());

        group.bench_function(format!("{}_threads", threads), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let logger = logger.clone();
                        thread::spawn(move || {
                            let fields = request_fields();
                            for _ in 0..100 {
                                logger.info("concurrent", &fields);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Level Filtering Benchmarks
// ============================================================================

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(MaskConfig::new());
    logger.set_level(LogLevel::Error);
    let fields = request_fields();

    group.bench_function("filtered_debug", |b| {
        b.iter(|| logger.debug(black_box("filtered"), black_box(&fields)));
    });

    group.bench_function("filtered_macro", |b| {
        b.iter(|| {
            rust_secure_logger::debug!(logger, "never formatted {:?}", black_box(&fields));
        });
    });

    group.finish();
}

// ============================================================================
// Pool Benchmarks
// ============================================================================

fn bench_buffer_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_pool");
    group.throughput(Throughput::Elements(1));

    let pool = BufferPool::new();
    group.bench_function("acquire_release_small", |b| {
        b.iter(|| {
            let buf = pool.acquire(black_box(200));
            black_box(&buf);
        });
    });

    group.bench_function("acquire_release_large", |b| {
        b.iter(|| {
            let buf = pool.acquire(black_box(12 * 1024));
            black_box(&buf);
        });
    });

    group.bench_function("unpooled_vec", |b| {
        b.iter(|| black_box(Vec::<u8>::with_capacity(black_box(1024))));
    });

    group.finish();
}

// ============================================================================
// Sampling Benchmarks
// ============================================================================

fn bench_sampler_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler_direct");
    group.throughput(Throughput::Elements(1));

    let sampler = Arc::new(
        LogSampler::new(SamplingConfig::new(100, 100, Duration::from_secs(1)))
            .expect("valid sampling config"),
    );

    group.bench_function("same_key", |b| {
        b.iter(|| black_box(sampler.decide(black_box("hot message"))));
    });

    let keys: Vec<String> = (0..1000).map(|i| format!("message {}", i)).collect();
    let mut next = 0;
    group.bench_function("rotating_keys", |b| {
        b.iter(|| {
            next = (next + 1) % keys.len();
            black_box(sampler.decide(&keys[next]))
        });
    });

    group.finish();
}

fn bench_sampling_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling_overhead");
    group.throughput(Throughput::Elements(1));

    let sampled = Logger::builder()
        .sink(WriterSink::new("null", io::sink()))
        .sampling(SamplingConfig::new(10, 100, Duration::from_secs(1)))
        .build()
        .expect("Failed to build logger");

    group.bench_function("sampled_info", |b| {
        b.iter(|| sampled.info(black_box("repeated"), &[]));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_encoding,
    bench_sync_logging,
    bench_async_logging,
    bench_concurrent_logging,
    bench_level_filtering,
    bench_buffer_pool,
    bench_sampler_direct,
    bench_sampling_overhead
);

criterion_main!(benches);
