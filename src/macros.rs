//! Logging macros with `format!`-style messages and inline fields.
//!
//! Fields follow the format arguments after a `;` as `key => value` pairs.
//! Nothing is formatted when the level is filtered out.
//!
//! # Examples
//!
//! ```
//! use rust_secure_logger::{info, Logger, MemorySink};
//!
//! let sink = MemorySink::new();
//! let logger = Logger::builder().sink(sink.clone()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments and fields
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port; "port" => port, "tls" => true);
//!
//! assert_eq!(sink.lines().len(), 2);
//! ```

/// Log at an explicit level; evaluates to the call's `Result<()>`.
///
/// # Examples
///
/// ```
/// # use rust_secure_logger::{Logger, LogLevel};
/// # let logger = Logger::builder().build().unwrap();
/// use rust_secure_logger::log;
/// log!(logger, LogLevel::Info, "Simple message").unwrap();
/// log!(logger, LogLevel::Error, "Error code: {}", 500; "code" => 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* ; $($key:expr => $value:expr),+ $(,)?) => {
        $logger.log_fmt(
            $level,
            format_args!($fmt $(, $arg)*),
            &[$($crate::Field::new($key, $value)),+],
        )
    };
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $logger.log_fmt($level, format_args!($fmt $(, $arg)*), &[])
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_secure_logger::{Logger, LogLevel};
/// # let logger = Logger::builder().min_level(LogLevel::Debug).build().unwrap();
/// use rust_secure_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10; "counter" => 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {{
        let _ = $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+);
    }};
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {{
        let _ = $crate::log!($logger, $crate::LogLevel::Info, $($arg)+);
    }};
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_secure_logger::Logger;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_secure_logger::warn;
/// warn!(logger, "Low memory");
/// warn!(logger, "Disk usage at {}%", 85; "mount" => "/var");
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {{
        let _ = $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+);
    }};
}

/// Log an error-level message; evaluates to `Result<()>`, which is
/// `Err(Closed)` once the logger has started closing.
///
/// # Examples
///
/// ```
/// # use rust_secure_logger::Logger;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_secure_logger::error;
/// error!(logger, "Connection failed").unwrap();
/// error!(logger, "Failed to open {}", "config.json"; "errno" => 2).unwrap();
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
