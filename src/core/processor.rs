//! Processor pipeline: enrich or scrub entries before they are encoded
//!
//! Processors run in registration order after the sampler has admitted an
//! entry. Each one receives the entry by value and hands it back, so a
//! processor can add fields, drop fields, or rewrite the message. Ancestor
//! fields are read-only and keep their order.

use super::buffer_pool::FieldPool;
use super::field::{Field, FieldKey, FieldText};
use super::log_entry::LogEntry;
use std::cell::RefCell;
use std::fmt;

thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<FieldText>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<FieldText>>> = const { RefCell::new(None) };
}

/// Cached thread ID, computed on first access per thread
fn current_thread_id() -> FieldText {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                FieldText::from(format!("{:?}", std::thread::current().id()))
            })
            .clone()
    })
}

/// Cached thread name, computed on first access per thread
fn current_thread_name() -> Option<FieldText> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(FieldText::from))
            .clone()
    })
}

/// Per-call state handed to every processor
pub struct ProcessContext<'c> {
    field_pool: &'c FieldPool,
}

impl<'c> ProcessContext<'c> {
    pub fn new(field_pool: &'c FieldPool) -> Self {
        Self { field_pool }
    }

    /// Arena pool for processors that need owned per-call fields
    pub fn field_pool(&self) -> &FieldPool {
        self.field_pool
    }

    pub fn thread_id(&self) -> FieldText {
        current_thread_id()
    }

    pub fn thread_name(&self) -> Option<FieldText> {
        current_thread_name()
    }

    /// Mutable per-call fields, copied into a pooled arena if still borrowed
    pub fn fields_mut<'e>(&self, entry: &'e mut LogEntry<'_>) -> &'e mut Vec<Field> {
        entry.fields_mut_in(self.field_pool)
    }
}

impl fmt::Debug for ProcessContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext").finish_non_exhaustive()
    }
}

/// An enrich/scrub step in the logging pipeline.
///
/// A processor that panics is isolated by the logger: the entry is dropped,
/// counted, and reported to the error hook.
///
/// # Example
///
/// ```
/// use rust_secure_logger::{Field, LogEntry, ProcessContext, Processor};
///
/// struct Region;
///
/// impl Processor for Region {
///     fn process<'a>(&self, ctx: &ProcessContext<'_>, mut entry: LogEntry<'a>) -> LogEntry<'a> {
///         ctx.fields_mut(&mut entry).push(Field::string("region", "eu-west-1"));
///         entry
///     }
/// }
/// ```
pub trait Processor: Send + Sync {
    fn process<'a>(&self, ctx: &ProcessContext<'_>, entry: LogEntry<'a>) -> LogEntry<'a>;

    fn name(&self) -> &str {
        "processor"
    }
}

/// Adds the calling thread's ID and, when set, its name
#[derive(Debug, Clone)]
pub struct ThreadInfoProcessor {
    id_key: FieldKey,
    name_key: FieldKey,
}

impl ThreadInfoProcessor {
    pub fn new() -> Self {
        Self {
            id_key: FieldKey::Borrowed("thread_id"),
            name_key: FieldKey::Borrowed("thread_name"),
        }
    }

    #[must_use]
    pub fn with_keys(mut self, id_key: impl Into<FieldKey>, name_key: impl Into<FieldKey>) -> Self {
        self.id_key = id_key.into();
        self.name_key = name_key.into();
        self
    }
}

impl Default for ThreadInfoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ThreadInfoProcessor {
    fn process<'a>(&self, ctx: &ProcessContext<'_>, mut entry: LogEntry<'a>) -> LogEntry<'a> {
        let id = ctx.thread_id();
        let name = ctx.thread_name();
        let fields = ctx.fields_mut(&mut entry);
        fields.push(Field::string(self.id_key.clone(), id));
        if let Some(name) = name {
            fields.push(Field::string(self.name_key.clone(), name));
        }
        entry
    }

    fn name(&self) -> &str {
        "thread_info"
    }
}

/// Removes per-call fields by key before they reach the encoder
#[derive(Debug, Clone, Default)]
pub struct DropFieldsProcessor {
    keys: Vec<String>,
}

impl DropFieldsProcessor {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Processor for DropFieldsProcessor {
    fn process<'a>(&self, _ctx: &ProcessContext<'_>, mut entry: LogEntry<'a>) -> LogEntry<'a> {
        for key in &self.keys {
            entry.remove_field(key);
        }
        entry
    }

    fn name(&self) -> &str {
        "drop_fields"
    }
}

/// Appends a fixed set of fields to every entry
#[derive(Debug, Clone, Default)]
pub struct StaticFieldsProcessor {
    fields: Vec<Field>,
}

impl StaticFieldsProcessor {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

impl Processor for StaticFieldsProcessor {
    fn process<'a>(&self, ctx: &ProcessContext<'_>, mut entry: LogEntry<'a>) -> LogEntry<'a> {
        if !self.fields.is_empty() {
            ctx.fields_mut(&mut entry).extend_from_slice(&self.fields);
        }
        entry
    }

    fn name(&self) -> &str {
        "static_fields"
    }
}
