//! Overflow policies for the async writer queue
//!
//! When the bounded queue between callers and the writer thread is full,
//! the policy decides what happens to the new entry. Entries with
//! [`LogPriority::Critical`] bypass the policy and are written on the
//! caller's thread.

use super::log_level::LogLevel;
use std::fmt;
use std::time::Duration;

/// Policy for handling queue overflow in async mode
///
/// # Example
///
/// ```
/// use rust_secure_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
///
/// // Block with timeout
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the new entry; only metrics record it
    DropNewest,

    /// Block the caller until space is available
    ///
    /// Applies backpressure to the application.
    Block,

    /// Wait up to the given duration for space, then drop
    BlockWithTimeout(Duration),

    /// Drop the new entry and report it through the error hook
    /// (first drop and every 1000th after)
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Priority of an entry when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogPriority {
    /// Debug, Info
    #[default]
    Normal = 0,
    /// Warn
    High = 1,
    /// Error: never dropped on overflow
    Critical = 2,
}

impl From<LogLevel> for LogPriority {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug | LogLevel::Info => LogPriority::Normal,
            LogLevel::Warn => LogPriority::High,
            LogLevel::Error => LogPriority::Critical,
        }
    }
}
