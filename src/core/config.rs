//! Construction-time configuration
//!
//! ```json
//! { "level": "info", "json_output": true,
//!   "sampling": { "initial": 100, "thereafter": 100, "window_ms": 1000 },
//!   "mask": { "exact_keys": ["password"], "patterns": [".*cardNumber$"], "replacement": "****" },
//!   "output_paths": ["stdout", "/var/log/app.jsonl"],
//!   "async_buffer": 4096 }
//! ```
//!
//! Every option is optional. Everything that can be wrong with a
//! configuration is reported when the logger is built, never at log time.

use super::encoder::OutputFormat;
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::logger::LoggerBuilder;
use super::masking::{MaskConfig, DEFAULT_REPLACEMENT};
use super::sampling::SamplingConfig;
use super::sink::Sink;
use crate::sinks::{ConsoleSink, FileSink};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub level: LogLevel,

    /// JSON lines when true, text otherwise
    pub json_output: bool,

    /// Absent means every entry is logged
    pub sampling: Option<SamplingConfig>,

    pub mask: MaskSettings,

    pub output_paths: Vec<OutputTarget>,

    /// Queue capacity for async mode; absent means synchronous writes
    pub async_buffer: Option<usize>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_output: true,
            sampling: None,
            mask: MaskSettings::default(),
            output_paths: vec![OutputTarget::Stdout],
            async_buffer: None,
        }
    }
}

impl LoggerConfig {
    /// Parse and validate.
    ///
    /// Well-formed JSON with a bad value (unknown level, empty output path,
    /// unknown option, wrong type) is an `InvalidConfiguration`; malformed
    /// JSON stays a `JsonError`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_str(json).map_err(|e| match e.classify() {
            Category::Data => LoggerError::config("LoggerConfig", e.to_string()),
            _ => LoggerError::from(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks everything that does not require touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if let Some(ref sampling) = self.sampling {
            sampling.validate()?;
        }
        self.mask.build()?;
        if self.async_buffer == Some(0) {
            return Err(LoggerError::config(
                "LoggerConfig",
                "async_buffer must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json_output {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// A builder carrying every option; output targets are opened here
    pub fn builder(&self) -> Result<LoggerBuilder> {
        let mut builder = LoggerBuilder::new()
            .min_level(self.level)
            .output_format(self.output_format())
            .mask(self.mask.build()?);

        if let Some(ref sampling) = self.sampling {
            builder = builder.sampling(sampling.clone());
        }
        if let Some(capacity) = self.async_buffer {
            builder = builder.async_mode(capacity);
        }
        for target in &self.output_paths {
            builder = builder.boxed_sink(target.open()?);
        }
        Ok(builder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaskSettings {
    pub exact_keys: Vec<String>,
    pub patterns: Vec<String>,
    pub replacement: String,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            exact_keys: Vec::new(),
            patterns: Vec::new(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
        }
    }
}

impl MaskSettings {
    /// Compile into a [`MaskConfig`]; the first malformed pattern is the error
    pub fn build(&self) -> Result<MaskConfig> {
        let mut mask = MaskConfig::new().with_replacement(self.replacement.as_str());
        for key in &self.exact_keys {
            mask.add_key(key.as_str());
        }
        for pattern in &self.patterns {
            mask.add_pattern(pattern)?;
        }
        Ok(mask)
    }
}

/// Where a configured logger writes: `"stdout"`, `"stderr"`, or a file path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputTarget {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl OutputTarget {
    pub fn open(&self) -> Result<Box<dyn Sink>> {
        Ok(match self {
            OutputTarget::Stdout => Box::new(ConsoleSink::stdout()),
            OutputTarget::Stderr => Box::new(ConsoleSink::stderr()),
            OutputTarget::File(path) => Box::new(FileSink::open(path)?),
        })
    }
}

impl TryFrom<String> for OutputTarget {
    type Error = LoggerError;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "" => Err(LoggerError::config("OutputTarget", "empty output path")),
            "stdout" => Ok(OutputTarget::Stdout),
            "stderr" => Ok(OutputTarget::Stderr),
            _ => Ok(OutputTarget::File(PathBuf::from(value))),
        }
    }
}

impl From<OutputTarget> for String {
    fn from(target: OutputTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => write!(f, "stdout"),
            OutputTarget::Stderr => write!(f, "stderr"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}
