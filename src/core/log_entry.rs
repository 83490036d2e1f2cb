//! Log entry structure

use super::buffer_pool::FieldPool;
use super::field::Field;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::sync::Arc;

/// One log record, alive only for the duration of a log call.
///
/// Per-call fields are borrowed from the caller until a processor needs to
/// change them, at which point they are copied (`Cow`). Ancestor fields come
/// from [`Logger::with`](super::Logger::with) and are shared, read-only.
#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    pub level: LogLevel,
    pub message: Cow<'a, str>,
    pub timestamp: DateTime<Utc>,
    fields: Cow<'a, [Field]>,
    ancestors: Option<Arc<[Field]>>,
}

impl<'a> LogEntry<'a> {
    pub fn new(level: LogLevel, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            fields: Cow::Borrowed(&[]),
            ancestors: None,
        }
    }

    pub fn with_fields(mut self, fields: &'a [Field]) -> Self {
        self.fields = Cow::Borrowed(fields);
        self
    }

    pub fn with_owned_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = Cow::Owned(fields);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn with_ancestors(mut self, ancestors: Arc<[Field]>) -> Self {
        self.ancestors = Some(ancestors);
        self
    }

    /// Per-call fields, in call order
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields inherited from the logger, in `with` order
    #[inline]
    pub fn ancestors(&self) -> &[Field] {
        self.ancestors.as_deref().unwrap_or(&[])
    }

    /// Mutable access to the per-call fields; copies borrowed fields first.
    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        self.fields.to_mut()
    }

    /// Like [`fields_mut`](Self::fields_mut), but borrowed fields are copied
    /// into an arena from `pool` instead of a fresh allocation.
    pub fn fields_mut_in(&mut self, pool: &FieldPool) -> &mut Vec<Field> {
        if let Cow::Borrowed(borrowed) = self.fields {
            let mut arena = pool.acquire(borrowed.len() + 1);
            arena.extend_from_slice(borrowed);
            self.fields = Cow::Owned(arena);
        }
        self.fields.to_mut()
    }

    /// The per-call fields if this entry owns them, so the arena can go back to a pool
    pub fn into_owned_fields(self) -> Option<Vec<Field>> {
        match self.fields {
            Cow::Owned(fields) => Some(fields),
            Cow::Borrowed(_) => None,
        }
    }

    /// Append a per-call field
    pub fn push_field(&mut self, field: Field) {
        self.fields.to_mut().push(field);
    }

    /// Remove every per-call field with the given key; returns how many were removed.
    pub fn remove_field(&mut self, key: &str) -> usize {
        if !self.fields.iter().any(|f| f.key() == key) {
            return 0;
        }
        let fields = self.fields.to_mut();
        let before = fields.len();
        fields.retain(|f| f.key() != key);
        before - fields.len()
    }

    /// Every field in render order: ancestors first, then per-call fields
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.ancestors().iter().chain(self.fields.iter())
    }
}
