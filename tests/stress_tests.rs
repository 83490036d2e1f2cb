//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - Every line written under contention is one complete JSON object
//! - Concurrent `with` calls do not disturb each other's fields
//! - Error-level entries are never dropped when the async queue overflows
//! - Close while other threads are logging loses no accepted entry

use rust_secure_logger::prelude::*;
use rust_secure_logger::{BufferPool, FieldPool, LoggerState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

/// Sink that takes a while per write, forcing the queue to back up
#[derive(Clone, Default)]
struct SlowSink {
    inner: MemorySink,
    writes: Arc<AtomicUsize>,
}

impl Sink for SlowSink {
    fn write(&mut self, buf: &[u8]) -> rust_secure_logger::Result<usize> {
        thread::sleep(Duration::from_micros(200));
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.write(buf)
    }

    fn sync(&mut self) -> rust_secure_logger::Result<()> {
        self.inner.sync()
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn run_writers(logger: &Logger) {
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(
                        "stress",
                        &[
                            Field::int("thread", t as i64),
                            Field::int("seq", i as i64),
                            Field::string("password", "never-visible"),
                            Field::string("payload", "x".repeat(i % 300)),
                        ],
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}

fn assert_complete(lines: &[String]) {
    assert_eq!(lines.len(), THREADS * PER_THREAD);

    let mut seen = HashSet::new();
    for line in lines {
        let value: serde_json::Value =
            serde_json::from_str(line).unwrap_or_else(|e| panic!("bad line {line:?}: {e}"));
        assert_eq!(value["password"], "****");
        let key = (
            value["thread"].as_i64().unwrap(),
            value["seq"].as_i64().unwrap(),
        );
        assert!(seen.insert(key), "duplicate entry {key:?}");
    }
}

#[test]
fn test_concurrent_sync_writes_are_whole_lines() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .mask(MaskConfig::new().with_key("password"))
        .sink(sink.clone())
        .buffer_pool(BufferPool::with_shards(4, 16))
        .field_pool(FieldPool::new())
        .build()
        .expect("Failed to build logger");

    run_writers(&logger);
    logger.sync(Duration::from_secs(10)).unwrap();

    assert_complete(&sink.lines());
    assert_eq!(
        logger.metrics().total_logged(),
        (THREADS * PER_THREAD) as u64
    );
    assert!(!sink.contents_string().contains("never-visible"));
}

#[test]
fn test_concurrent_async_writes_are_whole_lines() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .mask(MaskConfig::new().with_key("password"))
        .sink(sink.clone())
        .async_mode(128)
        .overflow_policy(OverflowPolicy::Block)
        .build()
        .expect("Failed to build logger");

    run_writers(&logger);
    logger.close(Duration::from_secs(10)).unwrap();

    assert_complete(&sink.lines());
    assert_eq!(logger.metrics().dropped_count(), 0);
}

#[test]
fn test_concurrent_with_children() {
    let sink = MemorySink::new();
    let root = Logger::builder()
        .sink(sink.clone())
        .fields([Field::string("app", "stress")])
        .build()
        .unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let root = root.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let child = root
                        .with([Field::int("thread", t as i64)])
                        .with([Field::int("depth", i as i64)]);
                    assert_eq!(child.ancestors().len(), 3);
                    child.info("child", &[]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let lines = sink.lines();
    assert_eq!(lines.len(), THREADS * 50);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["app"], "stress");
        assert!(value["thread"].is_i64());
        assert!(value["depth"].is_i64());
    }
    assert_eq!(root.ancestors().len(), 1);
}

#[test]
fn test_critical_logs_never_dropped() {
    let sink = SlowSink::default();
    // Very small buffer to force overflow
    let logger = Logger::builder()
        .min_level(LogLevel::Debug)
        .sink(sink.clone())
        .async_mode(4)
        .overflow_policy(OverflowPolicy::DropNewest)
        .build()
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    logger.debug("flood", &[Field::int("i", i)]);
                    if i % 20 == 0 {
                        logger
                            .error("critical", &[Field::int("thread", t), Field::int("i", i)])
                            .expect("error-level call failed");
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    logger.close(Duration::from_secs(30)).unwrap();

    let critical = sink
        .inner
        .lines()
        .into_iter()
        .filter(|line| line.contains("\"msg\":\"critical\""))
        .count();
    assert_eq!(critical, 4 * 10, "every error-level entry must be written");

    let metrics = logger.metrics();
    assert!(metrics.dropped_count() > 0, "queue never overflowed");
    assert_eq!(
        sink.writes.load(Ordering::Relaxed) as u64,
        metrics.total_logged()
    );
}

#[test]
fn test_close_during_concurrent_logging() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .sink(sink.clone())
        .async_mode(64)
        .overflow_policy(OverflowPolicy::Block)
        .build()
        .unwrap();

    let accepted = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let logger = logger.clone();
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    if logger.error("race", &[]).is_ok() {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    logger.close(Duration::from_secs(10)).unwrap();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(logger.state(), LoggerState::Closed);
    assert_eq!(sink.lines().len(), accepted.load(Ordering::SeqCst));
}
