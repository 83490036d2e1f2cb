//! Error types for the logger system

use std::sync::Arc;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Observer for errors swallowed on the logging hot path.
///
/// Log calls never return sink failures to the caller. Instead every such
/// failure is counted in [`LoggerMetrics`](super::LoggerMetrics) and handed to
/// this hook, if one is installed.
pub type ErrorHook = Arc<dyn Fn(&LoggerError) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Logger closed
    #[error("Logger is closed")]
    Closed,

    /// Sink write, sync or close failure
    #[error("Sink '{sink}' failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    /// Sync deadline exceeded before pending entries were written
    #[error("Timed out after {waited:?} waiting for pending log entries")]
    Timeout { waited: Duration },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Queue overflow with dropped message count
    #[error("Log queue overflow: dropped {dropped_count} messages")]
    QueueOverflow { dropped_count: u64 },

    /// A sink or processor panicked; the logger isolated it
    #[error("{component} panicked: {message}")]
    Panicked { component: String, message: String },
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::Sink {
            sink: sink.into(),
            source,
        }
    }

    /// Create a timeout error
    pub fn timeout(waited: Duration) -> Self {
        LoggerError::Timeout { waited }
    }

    /// Create a queue overflow error
    pub fn queue_overflow(dropped_count: u64) -> Self {
        LoggerError::QueueOverflow { dropped_count }
    }

    /// Describe a caught panic payload
    pub(crate) fn panicked(component: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        LoggerError::Panicked {
            component: component.to_string(),
            message,
        }
    }

    /// Wrap an arbitrary error as a sink failure, keeping IO errors intact.
    pub(crate) fn into_sink(self, sink: &str) -> Self {
        match self {
            LoggerError::IoError(source) => LoggerError::sink(sink, source),
            LoggerError::Sink { .. } => self,
            other => LoggerError::sink(sink, std::io::Error::other(other.to_string())),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, LoggerError::InvalidConfiguration { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, LoggerError::Closed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LoggerError::Timeout { .. })
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, LoggerError::Sink { .. })
    }
}
