//! Typed key/value fields for structured log entries
//!
//! A [`Field`] pairs a key with a value drawn from a closed set of kinds.
//! Integers, booleans, timestamps and short strings are stored without any
//! heap allocation beyond the field itself; keys given as `&'static str` are
//! borrowed rather than copied.
//!
//! # Example
//!
//! ```
//! use rust_secure_logger::{Field, FieldKind};
//!
//! let user = Field::string("user", "alice");
//! let attempts = Field::int("attempts", 3);
//! let nested = Field::object("payment", vec![Field::string("cardNumber", "4111111111111111")]);
//!
//! assert_eq!(user.kind(), FieldKind::String);
//! assert_eq!(attempts.kind(), FieldKind::Int);
//! assert_eq!(nested.kind(), FieldKind::Object);
//! ```

use super::error::{LoggerError, Result};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;

/// Field key; static keys are borrowed, dynamic keys owned
pub type FieldKey = Cow<'static, str>;

/// Longest string value stored inline, without a heap allocation
pub const INLINE_CAPACITY: usize = 23;

/// Raw bytes of a string value.
///
/// Values are kept as bytes so that a non-UTF-8 input is stored as-is; the
/// encoder decides how to escape it.
#[derive(Clone)]
pub struct FieldText(TextRepr);

#[derive(Clone)]
enum TextRepr {
    Inline { len: u8, buf: [u8; INLINE_CAPACITY] },
    Heap(Box<[u8]>),
}

impl FieldText {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() <= INLINE_CAPACITY {
            let mut buf = [0u8; INLINE_CAPACITY];
            buf[..bytes.len()].copy_from_slice(bytes);
            FieldText(TextRepr::Inline {
                len: bytes.len() as u8,
                buf,
            })
        } else {
            FieldText(TextRepr::Heap(bytes.into()))
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            TextRepr::Inline { len, buf } => &buf[..*len as usize],
            TextRepr::Heap(bytes) => bytes,
        }
    }

    /// The value as `&str`, or `None` when it is not valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.0, TextRepr::Inline { .. })
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for FieldText {
    fn from(s: &str) -> Self {
        FieldText::from_bytes(s.as_bytes())
    }
}

impl From<String> for FieldText {
    fn from(s: String) -> Self {
        if s.len() <= INLINE_CAPACITY {
            FieldText::from_bytes(s.as_bytes())
        } else {
            FieldText(TextRepr::Heap(s.into_bytes().into_boxed_slice()))
        }
    }
}

impl From<&[u8]> for FieldText {
    fn from(bytes: &[u8]) -> Self {
        FieldText::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for FieldText {
    fn from(bytes: Vec<u8>) -> Self {
        if bytes.len() <= INLINE_CAPACITY {
            FieldText::from_bytes(&bytes)
        } else {
            FieldText(TextRepr::Heap(bytes.into_boxed_slice()))
        }
    }
}

impl PartialEq for FieldText {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for FieldText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Tag of a [`FieldValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    Time,
    Bytes,
    Object,
}

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(FieldText),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
    Bytes(Vec<u8>),
    /// Nested fields, rendered as a JSON object
    Object(Vec<Field>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Time(_) => FieldKind::Time,
            FieldValue::Bytes(_) => FieldKind::Bytes,
            FieldValue::Object(_) => FieldKind::Object,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.into())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s.into())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Time(t)
    }
}

impl From<Vec<Field>> for FieldValue {
    fn from(fields: Vec<Field>) -> Self {
        FieldValue::Object(fields)
    }
}

/// An immutable key/value pair attached to a log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: FieldKey,
    value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<FieldKey>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn string(key: impl Into<FieldKey>, value: impl Into<FieldText>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::String(value.into()),
        }
    }

    #[inline]
    pub fn int(key: impl Into<FieldKey>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Int(value),
        }
    }

    #[inline]
    pub fn bool(key: impl Into<FieldKey>, value: bool) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Bool(value),
        }
    }

    #[inline]
    pub fn time(key: impl Into<FieldKey>, value: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Time(value),
        }
    }

    #[inline]
    pub fn bytes(key: impl Into<FieldKey>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Bytes(value.into()),
        }
    }

    pub fn object(key: impl Into<FieldKey>, fields: Vec<Field>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Object(fields),
        }
    }

    /// Convert a dynamic JSON value into a field.
    ///
    /// Strings, integers that fit in `i64`, booleans and objects map onto the
    /// closed set of kinds. Floats, nulls and arrays have no counterpart and
    /// are rejected here rather than stringified at encode time.
    pub fn try_from_json(key: impl Into<FieldKey>, value: serde_json::Value) -> Result<Self> {
        let key = key.into();
        let value = match value {
            serde_json::Value::String(s) => FieldValue::String(s.into()),
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => {
                    return Err(LoggerError::config(
                        "Field",
                        format!("unsupported numeric value {} for key '{}'", n, key),
                    ))
                }
            },
            serde_json::Value::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (sub_key, sub_value) in map {
                    fields.push(Field::try_from_json(sub_key, sub_value)?);
                }
                FieldValue::Object(fields)
            }
            serde_json::Value::Null | serde_json::Value::Array(_) => {
                return Err(LoggerError::config(
                    "Field",
                    format!("unsupported value kind for key '{}'", key),
                ))
            }
        };
        Ok(Self { key, value })
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.value.kind()
    }
}

/// A byte field whose buffer is reused across log calls.
///
/// `set_bytes` overwrites the value in place, keeping the allocation once it
/// has grown large enough. The field is not safe for concurrent reuse by two
/// loggers: the caller must finish one log call before refilling it for the
/// next. `&mut self` on `set_bytes` enforces this within safe code.
///
/// ```
/// use rust_secure_logger::BytesField;
///
/// let mut payload = BytesField::new("payload");
/// payload.set_bytes(b"first");
/// payload.set_bytes(b"second");
/// assert_eq!(payload.field().key(), "payload");
/// ```
#[derive(Debug, Clone)]
pub struct BytesField {
    field: Field,
}

impl BytesField {
    pub fn new(key: impl Into<FieldKey>) -> Self {
        Self::with_capacity(key, 0)
    }

    pub fn with_capacity(key: impl Into<FieldKey>, capacity: usize) -> Self {
        Self {
            field: Field {
                key: key.into(),
                value: FieldValue::Bytes(Vec::with_capacity(capacity)),
            },
        }
    }

    pub fn set_bytes(&mut self, data: &[u8]) {
        if let FieldValue::Bytes(buf) = &mut self.field.value {
            buf.clear();
            buf.extend_from_slice(data);
        }
    }

    pub fn capacity(&self) -> usize {
        match &self.field.value {
            FieldValue::Bytes(buf) => buf.capacity(),
            _ => 0,
        }
    }

    #[inline]
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// The field as a one-element slice, ready to pass to a log call
    #[inline]
    pub fn as_slice(&self) -> &[Field] {
        std::slice::from_ref(&self.field)
    }
}

impl AsRef<Field> for BytesField {
    fn as_ref(&self) -> &Field {
        &self.field
    }
}
