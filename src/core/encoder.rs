//! Entry encoding with masking applied on the way out
//!
//! The encoder renders a [`LogEntry`] into a pooled buffer, one line per
//! entry. Values whose key path is masked are written as the replacement
//! token; the entry itself is only read.
//!
//! JSON layout:
//!
//! ```text
//! {"level":"info","ts":"2025-01-08T10:30:45.123456789Z","msg":"login","service":"api","user":{"name":"bob","password":"****"}}
//! ```
//!
//! - `level`, `ts` and `msg` always come first.
//! - Ancestor fields precede per-call fields, each in the order given.
//! - When two fields share a key, the later one wins and the earlier one is
//!   not rendered (the same applies inside nested objects).
//! - A field named `level`, `ts` or `msg` is rendered as `fields.<key>`.
//! - Timestamps use RFC 3339 in UTC with nanosecond precision.
//! - Byte values are standard base64 strings.
//! - String values that are not valid UTF-8 are rendered with U+FFFD
//!   replacement characters.

use super::buffer_pool::{BufferPool, PooledBuffer};
use super::error::Result;
use super::field::{Field, FieldValue};
use super::log_entry::LogEntry;
use super::masking::{MaskConfig, SharedMaskConfig};
use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;

/// strftime profile for every rendered timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

const RESERVED_KEYS: [&str; 3] = ["level", "ts", "msg"];
const RESERVED_PREFIX: &str = "fields.";

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,

    /// Human-readable text
    ///
    /// Example: `2025-01-08T10:30:45.123456789Z INFO  login user=bob password=****`
    Text,
}

/// Renders entries into pooled buffers, masking as it goes
#[derive(Debug, Clone)]
pub struct Encoder {
    format: OutputFormat,
    use_colors: bool,
    mask: SharedMaskConfig,
    pool: Arc<BufferPool>,
}

impl Encoder {
    pub fn new(format: OutputFormat, mask: SharedMaskConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            format,
            use_colors: false,
            mask,
            pool,
        }
    }

    /// Color the level in text output
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn mask(&self) -> &SharedMaskConfig {
        &self.mask
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Render an entry into a buffer from the pool, terminated by `\n`
    pub fn encode(&self, entry: &LogEntry<'_>) -> Result<PooledBuffer> {
        let mut buf = self.pool.acquire(size_hint(entry));
        self.encode_into(entry, &mut buf)?;
        Ok(buf)
    }

    /// Render an entry into any byte vector
    pub fn encode_into(&self, entry: &LogEntry<'_>, out: &mut Vec<u8>) -> Result<()> {
        let mask = self.mask.snapshot();
        match self.format {
            OutputFormat::Json => write_json(entry, &mask, out)?,
            OutputFormat::Text => write_text(entry, &mask, self.use_colors, out)?,
        }
        Ok(())
    }
}

/// Rough rendered size, so typical entries land in a large enough class
fn size_hint(entry: &LogEntry<'_>) -> usize {
    let fields: usize = entry
        .all_fields()
        .map(|f| {
            f.key().len()
                + match f.value() {
                    FieldValue::String(s) => s.len() + 8,
                    FieldValue::Bytes(b) => b.len() * 4 / 3 + 8,
                    FieldValue::Object(inner) => inner.len() * 32,
                    _ => 32,
                }
        })
        .sum();
    64 + entry.message.len() + fields
}

/// Whether a later field in the combined sequence has the same key
#[inline]
fn is_shadowed(key: &str, later: &[Field], rest: &[Field]) -> bool {
    later.iter().chain(rest).any(|f| f.key() == key)
}

/// Visit the fields of `first` then `second`, skipping shadowed duplicates
fn for_each_rendered<F>(first: &[Field], second: &[Field], mut visit: F) -> io::Result<()>
where
    F: FnMut(&Field) -> io::Result<()>,
{
    for (i, field) in first.iter().enumerate() {
        if !is_shadowed(field.key(), &first[i + 1..], second) {
            visit(field)?;
        }
    }
    for (i, field) in second.iter().enumerate() {
        if !is_shadowed(field.key(), &second[i + 1..], &[]) {
            visit(field)?;
        }
    }
    Ok(())
}

#[inline]
fn masked(mask: &MaskConfig, path: &str) -> bool {
    !mask.is_empty() && mask.is_masked(path)
}

#[inline]
fn write_json_str(out: &mut Vec<u8>, s: &str) -> io::Result<()> {
    serde_json::to_writer(&mut *out, s)?;
    Ok(())
}

fn write_timestamp(out: &mut Vec<u8>, ts: &DateTime<Utc>) -> io::Result<()> {
    write!(out, "{}", ts.format(TIMESTAMP_FORMAT))
}

fn write_base64(out: &mut Vec<u8>, bytes: &[u8]) {
    let start = out.len();
    let Some(len) = base64::encoded_len(bytes.len(), true) else {
        return;
    };
    out.resize(start + len, 0);
    match BASE64_STANDARD.encode_slice(bytes, &mut out[start..]) {
        Ok(written) => out.truncate(start + written),
        Err(_) => out.truncate(start),
    }
}

fn write_json(entry: &LogEntry<'_>, mask: &MaskConfig, out: &mut Vec<u8>) -> io::Result<()> {
    out.extend_from_slice(b"{\"level\":\"");
    out.extend_from_slice(entry.level.as_json_str().as_bytes());
    out.extend_from_slice(b"\",\"ts\":\"");
    write_timestamp(out, &entry.timestamp)?;
    out.extend_from_slice(b"\",\"msg\":");
    write_json_str(out, &entry.message)?;

    for_each_rendered(entry.ancestors(), entry.fields(), |field| {
        out.push(b',');
        let key = field.key();
        if RESERVED_KEYS.contains(&key) {
            // reserved names need no escaping
            out.push(b'"');
            out.extend_from_slice(RESERVED_PREFIX.as_bytes());
            out.extend_from_slice(key.as_bytes());
            out.push(b'"');
        } else {
            write_json_str(out, key)?;
        }
        out.push(b':');

        if masked(mask, key) {
            return write_json_str(out, mask.replacement());
        }
        match field.value() {
            FieldValue::Object(children) => {
                let mut path = String::from(key);
                write_json_object(children, &mut path, mask, out)
            }
            scalar => write_json_scalar(scalar, out),
        }
    })?;

    out.extend_from_slice(b"}\n");
    Ok(())
}

/// `path` holds the dotted path of the object and is restored before returning
fn write_json_object(
    children: &[Field],
    path: &mut String,
    mask: &MaskConfig,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    out.push(b'{');
    let mut first = true;
    for_each_rendered(children, &[], |child| {
        if !first {
            out.push(b',');
        }
        first = false;
        write_json_str(out, child.key())?;
        out.push(b':');

        let parent_len = path.len();
        path.push('.');
        path.push_str(child.key());
        let result = if masked(mask, path) {
            write_json_str(out, mask.replacement())
        } else {
            match child.value() {
                FieldValue::Object(inner) => write_json_object(inner, path, mask, out),
                scalar => write_json_scalar(scalar, out),
            }
        };
        path.truncate(parent_len);
        result
    })?;
    out.push(b'}');
    Ok(())
}

fn write_json_scalar(value: &FieldValue, out: &mut Vec<u8>) -> io::Result<()> {
    match value {
        FieldValue::String(text) => match text.as_str() {
            Some(s) => write_json_str(out, s),
            None => write_json_str(out, &String::from_utf8_lossy(text.as_bytes())),
        },
        FieldValue::Int(i) => {
            serde_json::to_writer(&mut *out, i)?;
            Ok(())
        }
        FieldValue::Bool(b) => {
            out.extend_from_slice(if *b { b"true" } else { b"false" });
            Ok(())
        }
        FieldValue::Time(ts) => {
            out.push(b'"');
            write_timestamp(out, ts)?;
            out.push(b'"');
            Ok(())
        }
        FieldValue::Bytes(bytes) => {
            out.push(b'"');
            write_base64(out, bytes);
            out.push(b'"');
            Ok(())
        }
        // objects go through write_json_object, which knows the path
        FieldValue::Object(_) => {
            out.extend_from_slice(b"{}");
            Ok(())
        }
    }
}

/// Escape control characters so one entry stays on one line
fn write_sanitized(out: &mut Vec<u8>, message: &str) {
    for c in message.chars() {
        match c {
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c => {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"' || c.is_control())
}

fn write_text_str(out: &mut Vec<u8>, s: &str) -> io::Result<()> {
    if needs_quotes(s) {
        write_json_str(out, s)
    } else {
        out.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

fn write_text(
    entry: &LogEntry<'_>,
    mask: &MaskConfig,
    use_colors: bool,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    write_timestamp(out, &entry.timestamp)?;
    out.push(b' ');
    write_level(out, entry, use_colors)?;
    out.push(b' ');
    write_sanitized(out, &entry.message);

    let mut path = String::new();
    for_each_rendered(entry.ancestors(), entry.fields(), |field| {
        path.clear();
        path.push_str(field.key());
        write_text_field(field, &mut path, mask, out)
    })?;

    out.push(b'\n');
    Ok(())
}

#[cfg(feature = "console")]
fn write_level(out: &mut Vec<u8>, entry: &LogEntry<'_>, use_colors: bool) -> io::Result<()> {
    use colored::Colorize;
    if use_colors {
        let padded = format!("{:5}", entry.level.to_str());
        write!(out, "{}", padded.color(entry.level.color_code()))
    } else {
        write!(out, "{:5}", entry.level.to_str())
    }
}

#[cfg(not(feature = "console"))]
fn write_level(out: &mut Vec<u8>, entry: &LogEntry<'_>, _use_colors: bool) -> io::Result<()> {
    write!(out, "{:5}", entry.level.to_str())
}

/// Nested objects flatten to dotted keys in text output
fn write_text_field(
    field: &Field,
    path: &mut String,
    mask: &MaskConfig,
    out: &mut Vec<u8>,
) -> io::Result<()> {
    let is_masked = masked(mask, path);

    if let (FieldValue::Object(children), false) = (field.value(), is_masked) {
        return for_each_rendered(children, &[], |child| {
            let parent_len = path.len();
            path.push('.');
            path.push_str(child.key());
            let result = write_text_field(child, path, mask, out);
            path.truncate(parent_len);
            result
        });
    }

    out.push(b' ');
    write_text_str(out, path)?;
    out.push(b'=');
    if is_masked {
        return write_text_str(out, mask.replacement());
    }

    match field.value() {
        FieldValue::String(text) => match text.as_str() {
            Some(s) => write_text_str(out, s),
            None => write_text_str(out, &String::from_utf8_lossy(text.as_bytes())),
        },
        FieldValue::Int(i) => write!(out, "{}", i),
        FieldValue::Bool(b) => write!(out, "{}", b),
        FieldValue::Time(ts) => write_timestamp(out, ts),
        FieldValue::Bytes(bytes) => {
            write_base64(out, bytes);
            Ok(())
        }
        FieldValue::Object(_) => Ok(()),
    }
}
