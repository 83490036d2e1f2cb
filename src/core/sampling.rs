//! Log sampling for repetitive messages
//!
//! Bounds the volume of identical messages: within each tumbling time window,
//! the first `initial` occurrences of a message are logged, then only every
//! `thereafter`-th occurrence. Counters are kept per message in shards
//! selected by hash, so unrelated messages rarely touch the same lock.
//!
//! # Example
//!
//! ```
//! use rust_secure_logger::{LogSampler, SamplingConfig, SamplingDecision};
//! use std::time::Duration;
//!
//! let sampler = LogSampler::new(SamplingConfig::new(2, 5, Duration::from_secs(1))).unwrap();
//!
//! let decisions: Vec<_> = (0..7).map(|_| sampler.decide("cache miss")).collect();
//! assert_eq!(decisions[0], SamplingDecision::Sample);
//! assert_eq!(decisions[1], SamplingDecision::Sample);
//! assert_eq!(decisions[2], SamplingDecision::Drop);
//! assert_eq!(decisions[6], SamplingDecision::Sample);
//! ```

use super::error::{LoggerError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of counter shards; a power of two
pub const SAMPLER_SHARDS: usize = 32;

/// Distinct messages tracked per shard before stale counters are pruned
pub const MAX_KEYS_PER_SHARD: usize = 4096;

/// Configuration for log sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Occurrences per window always logged
    pub initial: u64,

    /// After `initial`, log every `thereafter`-th occurrence; must be non-zero
    pub thereafter: u64,

    /// Length of the tumbling window, in milliseconds when serialized
    #[serde(rename = "window_ms", with = "duration_ms")]
    pub window: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            initial: 100,
            thereafter: 100,
            window: Duration::from_secs(1),
        }
    }
}

impl SamplingConfig {
    pub fn new(initial: u64, thereafter: u64, window: Duration) -> Self {
        Self {
            initial,
            thereafter,
            window,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.thereafter == 0 {
            return Err(LoggerError::config(
                "SamplingConfig",
                "thereafter must be greater than zero",
            ));
        }
        if self.window.is_zero() {
            return Err(LoggerError::config(
                "SamplingConfig",
                "window must be greater than zero",
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Outcome of a sampling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingDecision {
    Sample,
    Drop,
}

/// Monotonic time source for sampling windows
pub trait Clock: Send + Sync + fmt::Debug {
    /// Nanoseconds since an arbitrary fixed origin
    fn now_nanos(&self) -> u64;
}

#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Clock advanced by hand, for tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

/// Metrics for sampling observability
#[derive(Debug)]
pub struct SamplerMetrics {
    /// Number of logs that passed sampling (were logged)
    sampled_count: AtomicU64,

    /// Number of logs dropped by sampling
    dropped_count: AtomicU64,

    /// Total number of logs processed by sampler
    total_count: AtomicU64,
}

impl SamplerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            total_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    /// Occurrences suppressed by sampling
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_sampled(&self) {
        self.sampled_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the effective sample rate based on actual sampling
    ///
    /// Returns 1.0 if no logs have been processed yet.
    pub fn effective_sample_rate(&self) -> f64 {
        let sampled = self.sampled_count() as f64;
        let total = self.total_count() as f64;

        if total == 0.0 {
            1.0
        } else {
            sampled / total
        }
    }

    pub fn reset(&self) {
        self.sampled_count.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.total_count.store(0, Ordering::Relaxed);
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Window id in the high half, occurrence count in the low half.
///
/// Packing both into one word makes rollover and increment a single
/// compare-and-swap, so no increment is lost across a window boundary.
#[derive(Debug)]
struct WindowCounter(AtomicU64);

/// Whether window id `a` is later than `b`, allowing for wraparound
#[inline]
fn is_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

impl WindowCounter {
    fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    fn unpack(word: u64) -> (u32, u32) {
        ((word >> 32) as u32, word as u32)
    }

    #[inline]
    fn pack(window: u32, count: u32) -> u64 {
        ((window as u64) << 32) | count as u64
    }

    fn window(&self) -> u32 {
        Self::unpack(self.0.load(Ordering::Acquire)).0
    }

    /// Count one occurrence in `window`; returns its 1-based position.
    ///
    /// A caller that read the clock before another caller rolled the counter
    /// forward is counted in the newer window.
    fn increment(&self, window: u32) -> u64 {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let (seen_window, count) = Self::unpack(current);
            let (target, next_count) = if seen_window == window || is_newer(seen_window, window)
            {
                (seen_window, count.saturating_add(1))
            } else {
                (window, 1)
            };
            match self.0.compare_exchange_weak(
                current,
                Self::pack(target, next_count),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_count as u64,
                Err(actual) => current = actual,
            }
        }
    }
}

#[derive(Debug)]
struct SamplerShard {
    counters: RwLock<HashMap<Box<str>, WindowCounter>>,
    /// Shared by messages arriving while the shard is full of live counters
    overflow: WindowCounter,
}

/// Counting sampler for repetitive log messages
///
/// # Thread Safety
///
/// Counters live in [`SAMPLER_SHARDS`] shards. A known message only takes a
/// shard read lock; the first occurrence of a message takes the write lock once.
pub struct LogSampler {
    config: SamplingConfig,
    window_nanos: u64,
    shards: Box<[SamplerShard]>,
    hasher: RandomState,
    clock: Arc<dyn Clock>,
    metrics: SamplerMetrics,
}

impl LogSampler {
    /// Create a sampler; fails on invalid configuration
    pub fn new(config: SamplingConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: SamplingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let window_nanos = (config.window.as_nanos() as u64).max(1);
        Ok(Self {
            config,
            window_nanos,
            shards: (0..SAMPLER_SHARDS)
                .map(|_| SamplerShard {
                    counters: RwLock::new(HashMap::new()),
                    overflow: WindowCounter::new(),
                })
                .collect(),
            hasher: RandomState::new(),
            clock,
            metrics: SamplerMetrics::new(),
        })
    }

    #[inline]
    fn current_window(&self) -> u32 {
        (self.clock.now_nanos() / self.window_nanos) as u32
    }

    fn occurrence(&self, key: &str, window: u32) -> u64 {
        let shard = &self.shards[self.hasher.hash_one(key) as usize & (SAMPLER_SHARDS - 1)];

        if let Some(counter) = shard.counters.read().get(key) {
            return counter.increment(window);
        }

        let mut counters = shard.counters.write();
        if !counters.contains_key(key) && counters.len() >= MAX_KEYS_PER_SHARD {
            counters.retain(|_, c| c.window() == window);
            if counters.len() >= MAX_KEYS_PER_SHARD {
                return shard.overflow.increment(window);
            }
        }
        counters
            .entry(Box::from(key))
            .or_insert_with(WindowCounter::new)
            .increment(window)
    }

    /// Decide whether this occurrence of `key` is logged
    pub fn decide(&self, key: &str) -> SamplingDecision {
        let n = self.occurrence(key, self.current_window());

        let sample = n <= self.config.initial
            || (n - self.config.initial) % self.config.thereafter == 0;

        if sample {
            self.metrics.record_sampled();
            SamplingDecision::Sample
        } else {
            self.metrics.record_dropped();
            SamplingDecision::Drop
        }
    }

    #[inline]
    pub fn should_sample(&self, key: &str) -> bool {
        self.decide(key) == SamplingDecision::Sample
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Distinct messages currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.shards.iter().map(|s| s.counters.read().len()).sum()
    }
}

impl fmt::Debug for LogSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSampler")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}
