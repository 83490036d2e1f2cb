//! Sharded pools of reusable encode buffers and field arenas
//!
//! Buffers are grouped in size classes, and every class is split into shards
//! so threads that never share data never share a lock either. A thread is
//! pinned to one shard on first use.
//!
//! Pool misses never block: a fresh buffer is allocated, and on release it is
//! kept only if its shard still has room.
//!
//! # Example
//!
//! ```
//! use rust_secure_logger::BufferPool;
//! use std::io::Write;
//!
//! let pool = BufferPool::new();
//! let mut buf = pool.acquire(100);
//! assert!(buf.is_empty());
//! assert!(buf.capacity() >= 256);
//! write!(buf, "hello").unwrap();
//! // returned to the pool on drop
//! ```

use super::field::Field;
use parking_lot::Mutex;
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Buffer capacities handed out by the pool, smallest first
pub const SIZE_CLASSES: [usize; 4] = [256, 1024, 4096, 16 * 1024];

/// Released buffers larger than this are freed instead of pooled
pub const MAX_RETAINED_CAPACITY: usize = 4 * SIZE_CLASSES[SIZE_CLASSES.len() - 1];

/// Default number of idle buffers kept per shard and size class
pub const DEFAULT_MAX_PER_SHARD: usize = 64;

static NEXT_SHARD: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static SHARD_HINT: usize = NEXT_SHARD.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn shard_hint() -> usize {
    SHARD_HINT.with(|hint| *hint)
}

fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
        .next_power_of_two()
}

/// Size class of a pooled buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeClass {
    Small = 0,
    Medium = 1,
    Large = 2,
    Huge = 3,
}

impl SizeClass {
    const ALL: [SizeClass; 4] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::Huge,
    ];

    pub fn capacity(self) -> usize {
        SIZE_CLASSES[self as usize]
    }

    /// Smallest class able to hold `size_hint` bytes
    pub fn for_request(size_hint: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.capacity() >= size_hint)
    }

    /// Largest class whose capacity fits in `capacity`
    fn for_release(capacity: usize) -> Option<Self> {
        Self::ALL.into_iter().rev().find(|c| c.capacity() <= capacity)
    }
}

/// A stack of idle items split into independently locked shards
#[derive(Debug)]
struct ShardedStack<T> {
    shards: Box<[Mutex<Vec<T>>]>,
    mask: usize,
    max_per_shard: usize,
}

impl<T> ShardedStack<T> {
    fn new(shards: usize, max_per_shard: usize) -> Self {
        let shards = shards.max(1).next_power_of_two();
        Self {
            shards: (0..shards).map(|_| Mutex::new(Vec::new())).collect(),
            mask: shards - 1,
            max_per_shard,
        }
    }

    /// Shard the calling thread is pinned to
    #[inline]
    fn local(&self) -> usize {
        shard_hint() & self.mask
    }

    fn pop(&self) -> Option<T> {
        self.pop_from(self.local())
    }

    fn pop_from(&self, shard: usize) -> Option<T> {
        self.shards[shard & self.mask].lock().pop()
    }

    /// Returns the item back when the shard is full
    fn push(&self, item: T) -> Option<T> {
        self.push_to(self.local(), item)
    }

    fn push_to(&self, shard: usize, item: T) -> Option<T> {
        let mut stack = self.shards[shard & self.mask].lock();
        if stack.len() < self.max_per_shard {
            stack.push(item);
            None
        } else {
            Some(item)
        }
    }

    fn idle(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }
}

/// Concurrency-safe pool of byte buffers, sharded by size class and thread
#[derive(Debug)]
pub struct BufferPool {
    classes: [ShardedStack<Vec<u8>>; 4],
    hits: AtomicU64,
    misses: AtomicU64,
    discarded: AtomicU64,
}

impl BufferPool {
    /// Create a pool sized for the machine's parallelism
    pub fn new() -> Arc<Self> {
        Self::with_shards(default_shard_count(), DEFAULT_MAX_PER_SHARD)
    }

    pub fn with_shards(shards: usize, max_per_shard: usize) -> Arc<Self> {
        Arc::new(Self {
            classes: std::array::from_fn(|_| ShardedStack::new(shards, max_per_shard)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    /// Process-wide pool used when a logger is built without one
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<BufferPool>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(BufferPool::new))
    }

    /// Take an empty buffer with capacity for at least `size_hint` bytes
    ///
    /// The buffer goes back to the acquiring thread's shard on release, even
    /// when another thread (such as the async writer) drops it.
    pub fn acquire(self: &Arc<Self>, size_hint: usize) -> PooledBuffer {
        let shard = shard_hint();
        let buf = match SizeClass::for_request(size_hint) {
            Some(class) => match self.classes[class as usize].pop_from(shard) {
                Some(buf) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    buf
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    Vec::with_capacity(class.capacity())
                }
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(size_hint)
            }
        };

        PooledBuffer {
            buf,
            shard,
            pool: Some(Arc::clone(self)),
        }
    }

    fn put(&self, shard: usize, mut buf: Vec<u8>) {
        let capacity = buf.capacity();
        let class = match SizeClass::for_release(capacity) {
            Some(class) if capacity <= MAX_RETAINED_CAPACITY => class,
            _ => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        buf.clear();
        if self.classes[class as usize].push_to(shard, buf).is_some() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Buffers freed on release because they were oversized or their shard was full
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Idle buffers currently held for a size class
    pub fn idle(&self, class: SizeClass) -> usize {
        self.classes[class as usize].idle()
    }
}

/// RAII guard that returns its buffer to the pool on drop.
///
/// Release consumes the guard, so a buffer cannot be returned twice.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    /// Shard of the acquiring thread
    shard: usize,
    pool: Option<Arc<BufferPool>>,
}

impl PooledBuffer {
    /// Return the buffer to its pool now
    pub fn release(self) {
        drop(self);
    }

    /// Take the bytes out of pool management
    #[must_use]
    pub fn detach(mut self) -> Vec<u8> {
        self.pool = None;
        std::mem::take(&mut self.buf)
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl io::Write for PooledBuffer {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    #[inline]
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(self.shard, std::mem::take(&mut self.buf));
        }
    }
}

/// Pool of `Vec<Field>` arenas used when a processor pipeline needs owned fields
#[derive(Debug)]
pub struct FieldPool {
    stack: ShardedStack<Vec<Field>>,
}

/// Arenas with more slots than this are freed instead of pooled
pub const MAX_RETAINED_FIELDS: usize = 256;

impl FieldPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stack: ShardedStack::new(default_shard_count(), DEFAULT_MAX_PER_SHARD),
        })
    }

    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<FieldPool>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(FieldPool::new))
    }

    /// An empty arena with room for at least `size_hint` fields
    pub fn acquire(&self, size_hint: usize) -> Vec<Field> {
        let mut fields = self.stack.pop().unwrap_or_default();
        fields.reserve(size_hint);
        fields
    }

    pub fn release(&self, mut fields: Vec<Field>) {
        if fields.capacity() == 0 || fields.capacity() > MAX_RETAINED_FIELDS {
            return;
        }
        fields.clear();
        let _ = self.stack.push(fields);
    }

    pub fn idle(&self) -> usize {
        self.stack.idle()
    }
}
