//! # Rust Secure Logger
//!
//! A structured logging core with masking of sensitive values.
//!
//! ## Features
//!
//! - **Structured fields**: typed key/value pairs, nested objects, raw bytes
//! - **Masking**: exact key paths and anchored patterns, applied at encode time
//! - **Low allocation**: pooled output buffers and borrowed per-call fields
//! - **Sampling**: first N, then every Mth occurrence per message and window
//! - **Async writes**: bounded queue with explicit overflow policies
//!
//! ## Example
//!
//! ```
//! use rust_secure_logger::prelude::*;
//!
//! let sink = MemorySink::new();
//! let mask = MaskConfig::new()
//!     .with_key("password")
//!     .with_pattern(".*cardNumber$")
//!     .unwrap();
//! let logger = Logger::builder().mask(mask).sink(sink.clone()).build().unwrap();
//!
//! let request = logger.with([Field::string("request_id", "r-42")]);
//! request.info(
//!     "payment accepted",
//!     &[Field::object("payment", vec![Field::string("cardNumber", "4111111111111111")])],
//! );
//!
//! assert!(!sink.contents_string().contains("4111111111111111"));
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Field, FieldValue, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError,
        LoggerMetrics, MaskConfig, OutputFormat, OverflowPolicy, ProcessContext, Processor,
        Result, SamplingConfig, Sink, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, MemorySink, WriterSink};
}

pub use crate::core::*;
pub use sinks::{ConsoleSink, ConsoleTarget, FileSink, MemorySink, WriterSink};
