//! Main logger implementation
//!
//! Per-call sequence: level check, sampler, processors, mask and encode
//! into a pooled buffer, sink write, buffer release. In async mode the
//! encoded buffer travels to a single writer thread instead of being
//! written on the caller's thread.
//!
//! A logger and every child derived with [`Logger::with`] share one core:
//! level, mask, sampler, encoder, sinks, pools and metrics. The core is
//! closed when [`Logger::close`] is called or when the last handle is
//! dropped.

use super::{
    buffer_pool::{BufferPool, FieldPool, PooledBuffer},
    config::LoggerConfig,
    encoder::{Encoder, OutputFormat},
    error::{ErrorHook, LoggerError, Result},
    field::Field,
    log_entry::LogEntry,
    log_level::LogLevel,
    masking::{MaskConfig, SharedMaskConfig},
    metrics::LoggerMetrics,
    overflow_policy::{LogPriority, OverflowPolicy},
    processor::{ProcessContext, Processor},
    sampling::{Clock, LogSampler, SamplingConfig},
    sink::Sink,
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// This timeout is used when the last handle is dropped without an explicit
/// [`Logger::close`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Entries the writer thread takes off the queue before writing
const BATCH_SIZE: usize = 50;

/// Swallowed errors are echoed to stderr on the first event and every Nth after
const ALERT_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoggerState {
    /// Accepting calls
    Active = 0,
    /// Close in progress: in-flight calls finish, new calls are rejected
    Draining = 1,
    /// Sinks closed
    Closed = 2,
}

impl LoggerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LoggerState::Active,
            1 => LoggerState::Draining,
            _ => LoggerState::Closed,
        }
    }
}

#[inline]
fn should_alert(previous: u64) -> bool {
    previous == 0 || (previous + 1) % ALERT_INTERVAL == 0
}

struct SinkSlot {
    name: String,
    sink: Mutex<Box<dyn Sink>>,
}

impl SinkSlot {
    fn new(sink: Box<dyn Sink>) -> Self {
        Self {
            name: sink.name().to_string(),
            sink: Mutex::new(sink),
        }
    }
}

/// The part of the core the writer thread needs
struct Output {
    sinks: Vec<SinkSlot>,
    metrics: LoggerMetrics,
    error_hook: Option<ErrorHook>,
    /// Lines accepted by the queue
    submitted: AtomicU64,
    /// Lines the writer thread has finished with, successfully or not
    written: AtomicU64,
    /// Set once the writer thread has left its loop
    writer_exited: AtomicBool,
    progress_lock: Mutex<()>,
    progress: Condvar,
}

impl Output {
    fn new(sinks: Vec<Box<dyn Sink>>, error_hook: Option<ErrorHook>) -> Self {
        Self {
            sinks: sinks.into_iter().map(SinkSlot::new).collect(),
            metrics: LoggerMetrics::new(),
            error_hook,
            submitted: AtomicU64::new(0),
            written: AtomicU64::new(0),
            writer_exited: AtomicBool::new(false),
            progress_lock: Mutex::new(()),
            progress: Condvar::new(),
        }
    }

    /// Write one encoded line to every sink.
    ///
    /// **Per-sink panic isolation**: each sink call is wrapped in
    /// `catch_unwind`, so one failing sink does not keep the line from the
    /// others.
    fn write_line(&self, line: &[u8]) {
        let mut failed = false;

        for slot in &self.sinks {
            let mut sink = slot.sink.lock();
            let result = panic::catch_unwind(AssertUnwindSafe(|| sink.write(line)));
            drop(sink);

            let err = match result {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => e.into_sink(&slot.name),
                Err(payload) => {
                    LoggerError::panicked(&format!("sink '{}'", slot.name), payload.as_ref())
                }
            };
            failed = true;
            let previous = self.metrics.record_sink_error();
            self.report(&err, previous);
        }

        if failed {
            self.metrics.record_dropped();
        } else {
            self.metrics.record_logged();
        }
    }

    /// Pass a swallowed error to the hook, or to stderr (throttled)
    fn report(&self, err: &LoggerError, previous: u64) {
        if let Some(ref hook) = self.error_hook {
            hook(err);
        } else if should_alert(previous) {
            eprintln!("[LOGGER ERROR] {} ({} so far)", err, previous + 1);
        }
    }

    /// Pass an error to the hook, or to stderr, unthrottled
    fn notify(&self, err: &LoggerError) {
        match self.error_hook {
            Some(ref hook) => hook(err),
            None => eprintln!("[LOGGER WARNING] {}", err),
        }
    }

    fn mark_written(&self, count: u64) {
        self.written.fetch_add(count, Ordering::SeqCst);
        let _guard = self.progress_lock.lock();
        self.progress.notify_all();
    }

    /// Wait until `target` lines have been written; false on deadline
    fn wait_written(&self, target: u64, deadline: Instant) -> bool {
        let mut guard = self.progress_lock.lock();
        while self.written.load(Ordering::SeqCst) < target {
            if self.progress.wait_until(&mut guard, deadline).timed_out() {
                return self.written.load(Ordering::SeqCst) >= target;
            }
        }
        true
    }

    fn mark_writer_exited(&self) {
        self.writer_exited.store(true, Ordering::SeqCst);
        let _guard = self.progress_lock.lock();
        self.progress.notify_all();
    }

    /// Wait for the writer thread to leave its loop; false on deadline
    fn wait_writer_exited(&self, deadline: Instant) -> bool {
        let mut guard = self.progress_lock.lock();
        while !self.writer_exited.load(Ordering::SeqCst) {
            if self.progress.wait_until(&mut guard, deadline).timed_out() {
                return self.writer_exited.load(Ordering::SeqCst);
            }
        }
        true
    }
}

/// Marks the writer as exited when dropped, including on unwind
struct WriterExit<'a>(&'a Output);

impl Drop for WriterExit<'_> {
    fn drop(&mut self) {
        self.0.mark_writer_exited();
    }
}

enum Message {
    Line(PooledBuffer),
    Shutdown,
}

struct Worker {
    handle: Option<thread::JoinHandle<()>>,
    shutdown_sent: bool,
}

struct AsyncQueue {
    sender: Sender<Message>,
    worker: Mutex<Worker>,
    policy: OverflowPolicy,
}

impl AsyncQueue {
    fn spawn(capacity: usize, policy: OverflowPolicy, output: Arc<Output>) -> Result<Self> {
        let (sender, receiver) = bounded(capacity);
        let handle = thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || run_writer(&output, &receiver))?;

        Ok(Self {
            sender,
            worker: Mutex::new(Worker {
                handle: Some(handle),
                shutdown_sent: false,
            }),
            policy,
        })
    }
}

/// Writer thread: drain the queue in batches until a shutdown message
fn run_writer(output: &Output, receiver: &Receiver<Message>) {
    let _exit = WriterExit(output);
    let mut batch: Vec<PooledBuffer> = Vec::with_capacity(BATCH_SIZE);

    loop {
        let mut shutdown = false;
        match receiver.recv() {
            Ok(Message::Line(line)) => batch.push(line),
            Ok(Message::Shutdown) | Err(_) => shutdown = true,
        }

        // Collect more entries without blocking
        while !shutdown && batch.len() < BATCH_SIZE {
            match receiver.try_recv() {
                Ok(Message::Line(line)) => batch.push(line),
                Ok(Message::Shutdown) => shutdown = true,
                Err(_) => break,
            }
        }

        let count = batch.len() as u64;
        for line in batch.drain(..) {
            output.write_line(&line);
        }
        if count > 0 {
            output.mark_written(count);
        }

        if shutdown {
            break;
        }
    }
}

/// Decrements the in-flight count when a log call finishes and wakes a
/// pending close once the count reaches zero
struct InFlight<'a>(&'a Core);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let core = self.0;
        let previous = core.in_flight.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 && core.state.load(Ordering::SeqCst) != LoggerState::Active as u8 {
            let _guard = core.idle_lock.lock();
            core.idle.notify_all();
        }
    }
}

/// State shared by a logger and all of its children
struct Core {
    level: AtomicU8,
    state: AtomicU8,
    in_flight: AtomicUsize,
    idle_lock: Mutex<()>,
    idle: Condvar,
    encoder: Encoder,
    field_pool: Arc<FieldPool>,
    sampler: Option<LogSampler>,
    processors: Vec<Box<dyn Processor>>,
    output: Arc<Output>,
    queue: Option<AsyncQueue>,
    close_lock: Mutex<()>,
}

impl Core {
    #[inline]
    fn state(&self) -> LoggerState {
        LoggerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Register an in-flight call; `None` once close has started
    fn enter(&self) -> Option<InFlight<'_>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self);
        if self.state.load(Ordering::SeqCst) != LoggerState::Active as u8 {
            return None;
        }
        Some(guard)
    }

    fn dispatch(&self, entry: LogEntry<'_>, ancestors: Option<&Arc<[Field]>>) -> Result<()> {
        let level = entry.level;
        let metrics = &self.output.metrics;

        let Some(_in_flight) = self.enter() else {
            metrics.record_rejected();
            return if level == LogLevel::Error {
                Err(LoggerError::Closed)
            } else {
                Ok(())
            };
        };

        if let Some(ref sampler) = self.sampler {
            if !sampler.should_sample(&entry.message) {
                metrics.record_sampled_out();
                return Ok(());
            }
        }

        let mut entry = match ancestors {
            Some(ancestors) => entry.with_ancestors(Arc::clone(ancestors)),
            None => entry,
        };

        if !self.processors.is_empty() {
            let ctx = ProcessContext::new(&self.field_pool);
            for processor in &self.processors {
                match panic::catch_unwind(AssertUnwindSafe(|| processor.process(&ctx, entry))) {
                    Ok(next) => entry = next,
                    Err(payload) => {
                        let err = LoggerError::panicked(
                            &format!("processor '{}'", processor.name()),
                            payload.as_ref(),
                        );
                        let previous = metrics.record_dropped();
                        self.output.report(&err, previous);
                        return Ok(());
                    }
                }
            }
        }

        let encoded = self.encoder.encode(&entry);
        if let Some(arena) = entry.into_owned_fields() {
            self.field_pool.release(arena);
        }
        match encoded {
            Ok(line) => self.submit(level, line),
            Err(err) => {
                let previous = metrics.record_dropped();
                self.output.report(&err, previous);
            }
        }
        Ok(())
    }

    fn submit(&self, level: LogLevel, line: PooledBuffer) {
        let Some(ref queue) = self.queue else {
            self.output.write_line(&line);
            return;
        };

        match queue.sender.try_send(Message::Line(line)) {
            Ok(()) => {
                self.output.submitted.fetch_add(1, Ordering::SeqCst);
            }
            Err(TrySendError::Full(message)) => self.handle_overflow(queue, level, message),
            Err(TrySendError::Disconnected(message)) => self.write_direct(message),
        }
    }

    /// Write on the caller's thread when the queue cannot take the line
    fn write_direct(&self, message: Message) {
        if let Message::Line(line) = message {
            self.output.write_line(&line);
        }
    }

    /// Handle queue overflow based on configured policy and log priority
    fn handle_overflow(&self, queue: &AsyncQueue, level: LogLevel, message: Message) {
        let metrics = &self.output.metrics;
        metrics.record_queue_full();

        // Critical logs are never dropped: force write synchronously
        if LogPriority::from(level) == LogPriority::Critical {
            metrics.record_critical_preserved();
            self.write_direct(message);
            return;
        }

        match queue.policy {
            OverflowPolicy::DropNewest => {
                metrics.record_dropped();
            }
            OverflowPolicy::AlertAndDrop => self.alert_and_drop(),
            OverflowPolicy::Block => {
                metrics.record_block();
                match queue.sender.send(message) {
                    Ok(()) => {
                        self.output.submitted.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => self.write_direct(err.into_inner()),
                }
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                metrics.record_block();
                match queue.sender.send_timeout(message, timeout) {
                    Ok(()) => {
                        self.output.submitted.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(SendTimeoutError::Timeout(_)) => self.alert_and_drop(),
                    Err(SendTimeoutError::Disconnected(message)) => self.write_direct(message),
                }
            }
        }
    }

    /// Drop an entry, alerting on the first drop and periodically thereafter
    fn alert_and_drop(&self) {
        let previous = self.output.metrics.record_dropped();
        if should_alert(previous) {
            self.output
                .notify(&LoggerError::queue_overflow(previous + 1));
        }
    }

    fn sync_until(&self, deadline: Instant) -> Result<()> {
        let start = Instant::now();
        if self.state() == LoggerState::Closed {
            return Err(LoggerError::Closed);
        }

        if self.queue.is_some() {
            let target = self.output.submitted.load(Ordering::SeqCst);
            if !self.output.wait_written(target, deadline) {
                return Err(LoggerError::timeout(start.elapsed()));
            }
        }

        let mut first_error = None;
        for slot in &self.output.sinks {
            let Some(mut sink) = slot.sink.try_lock_until(deadline) else {
                return Err(LoggerError::timeout(start.elapsed()));
            };
            let result = panic::catch_unwind(AssertUnwindSafe(|| sink.sync()));
            drop(sink);

            let err = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.into_sink(&slot.name),
                Err(payload) => {
                    LoggerError::panicked(&format!("sink '{}'", slot.name), payload.as_ref())
                }
            };
            self.output.metrics.record_sink_error();
            first_error.get_or_insert(err);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close_until(&self, deadline: Instant) -> Result<()> {
        let start = Instant::now();
        let timed_out = || LoggerError::timeout(start.elapsed());

        let Some(_closing) = self.close_lock.try_lock_until(deadline) else {
            return Err(timed_out());
        };
        match self.state.compare_exchange(
            LoggerState::Active as u8,
            LoggerState::Draining as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {}
            Err(current) if current == LoggerState::Draining as u8 => {}
            // already closed
            Err(_) => return Ok(()),
        }

        // Let in-flight calls finish
        {
            let mut idle = self.idle_lock.lock();
            while self.in_flight.load(Ordering::SeqCst) > 0 {
                if self.idle.wait_until(&mut idle, deadline).timed_out()
                    && self.in_flight.load(Ordering::SeqCst) > 0
                {
                    return Err(timed_out());
                }
            }
        }

        if let Some(ref queue) = self.queue {
            let mut worker = queue.worker.lock();
            if !worker.shutdown_sent {
                match queue.sender.send_deadline(Message::Shutdown, deadline) {
                    Ok(()) | Err(SendTimeoutError::Disconnected(_)) => worker.shutdown_sent = true,
                    Err(SendTimeoutError::Timeout(_)) => return Err(timed_out()),
                }
            }

            // Wait for the writer thread to drain everything queued before the shutdown
            if worker.handle.is_some() {
                if !self.output.wait_writer_exited(deadline) {
                    return Err(timed_out());
                }
                if let Some(handle) = worker.handle.take() {
                    if let Err(payload) = handle.join() {
                        self.output
                            .notify(&LoggerError::panicked("writer thread", payload.as_ref()));
                    }
                }
            }
        }

        let mut first_error = None;
        for slot in &self.output.sinks {
            let result = panic::catch_unwind(AssertUnwindSafe(|| slot.sink.lock().close()));
            let err = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.into_sink(&slot.name),
                Err(payload) => {
                    LoggerError::panicked(&format!("sink '{}'", slot.name), payload.as_ref())
                }
            };
            self.output.metrics.record_sink_error();
            first_error.get_or_insert(err);
        }

        self.state
            .store(LoggerState::Closed as u8, Ordering::SeqCst);

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        if self.state() != LoggerState::Closed {
            if let Err(e) = self.close_until(Instant::now() + DEFAULT_SHUTDOWN_TIMEOUT) {
                self.output.notify(&e);
            }
        }

        // Report any dropped logs
        let metrics = &self.output.metrics;
        let dropped = metrics.dropped_count();
        if dropped > 0 && self.output.error_hook.is_none() {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped logs (drop rate: {:.2}%)",
                dropped,
                metrics.drop_rate()
            );
        }
    }
}

/// Structured logger handle.
///
/// Cloning is cheap and clones share everything, including ancestor fields.
///
/// # Example
///
/// ```
/// use rust_secure_logger::{Field, Logger, MaskConfig, MemorySink};
///
/// let sink = MemorySink::new();
/// let logger = Logger::builder()
///     .mask(MaskConfig::new().with_key("password"))
///     .sink(sink.clone())
///     .build()
///     .unwrap();
///
/// logger.info("login", &[Field::string("user", "bob"), Field::string("password", "hunter2")]);
///
/// let line = &sink.lines()[0];
/// assert!(line.contains("\"password\":\"****\""));
/// assert!(!line.contains("hunter2"));
/// ```
#[derive(Clone)]
pub struct Logger {
    core: Arc<Core>,
    ancestors: Option<Arc<[Field]>>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build a logger from a parsed configuration
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        config.validate()?;
        config.builder()?.build()
    }

    /// Like [`from_config`](Self::from_config), with processors attached
    pub fn from_config_with<I>(config: &LoggerConfig, processors: I) -> Result<Self>
    where
        I: IntoIterator<Item = Box<dyn Processor>>,
    {
        config.validate()?;
        let mut builder = config.builder()?;
        for processor in processors {
            builder = builder.boxed_processor(processor);
        }
        builder.build()
    }

    /// Whether an entry at `level` would pass the level check
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level as u8 >= self.core.level.load(Ordering::Relaxed)
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.core.level.load(Ordering::Relaxed))
    }

    /// Change the minimum level for this logger and every related handle
    pub fn set_level(&self, level: LogLevel) {
        self.core.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn state(&self) -> LoggerState {
        self.core.state()
    }

    /// Log with per-call fields.
    ///
    /// Failures past the level check never surface here: they are counted
    /// and reported to the error hook. The only error is `Closed`, for an
    /// `Error`-level call made after close has started.
    pub fn log_fields(&self, level: LogLevel, message: &str, fields: &[Field]) -> Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        self.core.dispatch(
            LogEntry::new(level, message).with_fields(fields),
            self.ancestors.as_ref(),
        )
    }

    pub fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        self.log_fields(level, message, &[])
    }

    /// Log preformatted arguments; nothing is formatted below the minimum level
    pub fn log_fmt(
        &self,
        level: LogLevel,
        args: fmt::Arguments<'_>,
        fields: &[Field],
    ) -> Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        let message = match args.as_str() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(args.to_string()),
        };
        self.core.dispatch(
            LogEntry::new(level, message).with_fields(fields),
            self.ancestors.as_ref(),
        )
    }

    #[inline]
    pub fn debug(&self, message: &str, fields: &[Field]) {
        let _ = self.log_fields(LogLevel::Debug, message, fields);
    }

    #[inline]
    pub fn info(&self, message: &str, fields: &[Field]) {
        let _ = self.log_fields(LogLevel::Info, message, fields);
    }

    #[inline]
    pub fn warn(&self, message: &str, fields: &[Field]) {
        let _ = self.log_fields(LogLevel::Warn, message, fields);
    }

    /// Error-level calls report `Closed` once close has started
    #[inline]
    pub fn error(&self, message: &str, fields: &[Field]) -> Result<()> {
        self.log_fields(LogLevel::Error, message, fields)
    }

    /// Child logger whose entries carry this logger's fields followed by `fields`
    #[must_use]
    pub fn with<I>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = Field>,
    {
        let mut combined: Vec<Field> = self.ancestors().to_vec();
        combined.extend(fields);
        Logger {
            core: Arc::clone(&self.core),
            ancestors: if combined.is_empty() {
                None
            } else {
                Some(Arc::from(combined))
            },
        }
    }

    /// Fields inherited from `with`, in order
    pub fn ancestors(&self) -> &[Field] {
        self.ancestors.as_deref().unwrap_or(&[])
    }

    /// Current masking configuration
    pub fn mask(&self) -> Arc<MaskConfig> {
        self.core.encoder.mask().load()
    }

    /// Copy-on-write update of the masking configuration.
    ///
    /// In-flight calls see either the old or the new configuration. If `f`
    /// fails, the old configuration stays in place.
    pub fn update_mask<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(&mut MaskConfig) -> Result<()>,
    {
        self.core.encoder.mask().update(f)
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.core.output.metrics
    }

    pub fn sampler(&self) -> Option<&LogSampler> {
        self.core.sampler.as_ref()
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        self.core.encoder.pool()
    }

    /// Wait for submitted entries to be written, then sync every sink.
    ///
    /// On timeout, pending entries stay queued; a later call can succeed.
    pub fn sync(&self, timeout: Duration) -> Result<()> {
        self.sync_until(Instant::now() + timeout)
    }

    pub fn sync_until(&self, deadline: Instant) -> Result<()> {
        self.core.sync_until(deadline)
    }

    /// Stop accepting calls, drain the queue, and close every sink.
    ///
    /// Calling it again after it completed is a no-op. If it times out the
    /// logger stays `Draining` and a later call resumes the drain.
    pub fn close(&self, timeout: Duration) -> Result<()> {
        self.core.close_until(Instant::now() + timeout)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("state", &self.state())
            .field("ancestors", &self.ancestors().len())
            .field("sinks", &self.core.output.sinks.len())
            .field("async", &self.core.queue.is_some())
            .finish()
    }
}

pub struct LoggerBuilder {
    min_level: LogLevel,
    format: OutputFormat,
    use_colors: bool,
    mask: MaskConfig,
    sampling: Option<SamplingConfig>,
    clock: Option<Arc<dyn Clock>>,
    processors: Vec<Box<dyn Processor>>,
    sinks: Vec<Box<dyn Sink>>,
    fields: Vec<Field>,
    async_buffer: Option<usize>,
    overflow_policy: OverflowPolicy,
    error_hook: Option<ErrorHook>,
    pool: Option<Arc<BufferPool>>,
    field_pool: Option<Arc<FieldPool>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Info,
            format: OutputFormat::Json,
            use_colors: false,
            mask: MaskConfig::new(),
            sampling: None,
            clock: None,
            processors: Vec::new(),
            sinks: Vec::new(),
            fields: Vec::new(),
            async_buffer: None,
            overflow_policy: OverflowPolicy::AlertAndDrop,
            error_hook: None,
            pool: None,
            field_pool: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Color the level in text output
    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn mask(mut self, mask: MaskConfig) -> Self {
        self.mask = mask;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sampling(mut self, config: SamplingConfig) -> Self {
        self.sampling = Some(config);
        self
    }

    /// Time source for the sampler's windows
    #[must_use = "builder methods return a new value"]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn processor<P: Processor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_processor(mut self, processor: Box<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Fields carried by every entry of the built logger
    #[must_use = "builder methods return a new value"]
    pub fn fields<I: IntoIterator<Item = Field>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Write from a dedicated thread fed by a queue of `capacity` lines
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, capacity: usize) -> Self {
        self.async_buffer = Some(capacity);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    /// Use this pool instead of the process-wide one
    #[must_use = "builder methods return a new value"]
    pub fn buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn field_pool(mut self, pool: Arc<FieldPool>) -> Self {
        self.field_pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<Logger> {
        let sampler = match self.sampling {
            Some(config) => Some(match self.clock {
                Some(clock) => LogSampler::with_clock(config, clock)?,
                None => LogSampler::new(config)?,
            }),
            None => None,
        };
        if self.async_buffer == Some(0) {
            return Err(LoggerError::config(
                "LoggerBuilder",
                "async queue capacity must be greater than zero",
            ));
        }

        let pool = self.pool.unwrap_or_else(BufferPool::global);
        let encoder = Encoder::new(self.format, SharedMaskConfig::new(self.mask), pool)
            .with_colors(self.use_colors);

        let output = Arc::new(Output::new(self.sinks, self.error_hook));
        let queue = match self.async_buffer {
            Some(capacity) => Some(AsyncQueue::spawn(
                capacity,
                self.overflow_policy,
                Arc::clone(&output),
            )?),
            None => None,
        };

        let core = Core {
            level: AtomicU8::new(self.min_level as u8),
            state: AtomicU8::new(LoggerState::Active as u8),
            in_flight: AtomicUsize::new(0),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
            encoder,
            field_pool: self.field_pool.unwrap_or_else(FieldPool::global),
            sampler,
            processors: self.processors,
            output,
            queue,
            close_lock: Mutex::new(()),
        };

        Ok(Logger {
            core: Arc::new(core),
            ancestors: if self.fields.is_empty() {
                None
            } else {
                Some(Arc::from(self.fields))
            },
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
