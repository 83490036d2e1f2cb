//! Core logger types and traits

pub mod buffer_pool;
pub mod config;
pub mod encoder;
pub mod error;
pub mod field;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod masking;
pub mod metrics;
pub mod overflow_policy;
pub mod pattern;
pub mod processor;
pub mod sampling;
pub mod sink;

pub use buffer_pool::{BufferPool, FieldPool, PooledBuffer, SizeClass};
pub use config::{LoggerConfig, MaskSettings, OutputTarget};
pub use encoder::{Encoder, OutputFormat, TIMESTAMP_FORMAT};
pub use error::{ErrorHook, LoggerError, Result};
pub use field::{BytesField, Field, FieldKey, FieldKind, FieldText, FieldValue};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, LoggerState, DEFAULT_SHUTDOWN_TIMEOUT};
pub use masking::{MaskConfig, SharedMaskConfig, DEFAULT_REPLACEMENT};
pub use metrics::LoggerMetrics;
pub use overflow_policy::{LogPriority, OverflowPolicy};
pub use pattern::MaskPattern;
pub use processor::{
    DropFieldsProcessor, ProcessContext, Processor, StaticFieldsProcessor, ThreadInfoProcessor,
};
pub use sampling::{
    Clock, LogSampler, ManualClock, SamplerMetrics, SamplingConfig, SamplingDecision, SystemClock,
};
pub use sink::Sink;
