//! Main logger implementation

use super::{
    error::Result,
    handler::Handler,
    log_level::LogLevel,
    record::{Location, LogRecord},
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, long-lived reference to a logger
pub type LoggerHandle = Arc<Logger>;

/// A named sink application code emits records to.
///
/// Emission is synchronous: a record at or above the effective level is
/// handed to every attached handler in attachment order, then, while
/// propagation is on, to the handlers of each ancestor.
pub struct Logger {
    name: String,
    level: RwLock<LogLevel>,
    propagate: AtomicBool,
    disabled: AtomicBool,
    handlers: RwLock<Vec<Arc<Handler>>>,
    parent: RwLock<Option<LoggerHandle>>,
}

impl Logger {
    /// Create a standalone logger at `NOTSET` with propagation on.
    ///
    /// Loggers that take part in a hierarchy are created through a
    /// [`Registry`](super::Registry).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: RwLock::new(LogLevel::NotSet),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            handlers: RwLock::new(Vec::new()),
            parent: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level set on this logger, which may be `NOTSET`
    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    /// The threshold records are compared against.
    ///
    /// `OFF` when the logger is disabled; otherwise the first level that is
    /// not `NOTSET` walking from this logger up through its ancestors.
    pub fn effective_level(&self) -> LogLevel {
        if self.is_disabled() {
            return LogLevel::Off;
        }

        let own = self.level();
        if own != LogLevel::NotSet {
            return own;
        }

        let mut current = self.parent();
        while let Some(logger) = current {
            let level = logger.level();
            if level != LogLevel::NotSet {
                return level;
            }
            current = logger.parent();
        }
        LogLevel::NotSet
    }

    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.effective_level()
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Acquire)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Release);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Disable or re-enable the logger. A disabled logger keeps its level
    /// and handlers but emits nothing.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }

    pub fn parent(&self) -> Option<LoggerHandle> {
        self.parent.read().clone()
    }

    pub(crate) fn set_parent(&self, parent: Option<LoggerHandle>) {
        *self.parent.write() = parent;
    }

    /// Attach a handler. Attaching the same handler twice is a no-op.
    pub fn add_handler(&self, handler: Arc<Handler>) {
        let mut handlers = self.handlers.write();
        if !handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            handlers.push(handler);
        }
    }

    /// Detach a handler without closing it. Returns whether it was attached.
    pub fn remove_handler(&self, handler: &Arc<Handler>) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        handlers.len() != before
    }

    /// Snapshot of the attachment list, in attachment order
    pub fn handlers(&self) -> Vec<Arc<Handler>> {
        self.handlers.read().clone()
    }

    pub fn has_handlers(&self) -> bool {
        !self.handlers.read().is_empty()
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if !self.is_enabled_for(level) {
            return;
        }
        let record = LogRecord::new(self.name.as_str(), level, message);
        self.call_handlers(&record);
    }

    /// Log with call-site information; used by the logging macros
    pub fn log_at(&self, level: LogLevel, message: impl AsRef<str>, location: Location) {
        if !self.is_enabled_for(level) {
            return;
        }
        let record = LogRecord::new(self.name.as_str(), level, message).with_location(location);
        self.call_handlers(&record);
    }

    /// Dispatch an already built record, bypassing the level check.
    ///
    /// Ancestors that are disabled are passed over: their handlers see
    /// nothing, but their propagate flag still decides whether the walk goes
    /// on. Returns how many handlers wrote the record.
    pub fn call_handlers(&self, record: &LogRecord) -> usize {
        let mut written = dispatch(&self.handlers(), record);
        if !self.propagate() {
            return written;
        }

        let mut current = self.parent();
        while let Some(logger) = current {
            if !logger.is_disabled() {
                written += dispatch(&logger.handlers(), record);
            }
            if !logger.propagate() {
                break;
            }
            current = logger.parent();
        }
        written
    }

    pub fn flush(&self) -> Result<()> {
        for handler in self.handlers() {
            handler.flush()?;
        }
        Ok(())
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Critical, message);
    }
}

fn dispatch(handlers: &[Arc<Handler>], record: &LogRecord) -> usize {
    handlers
        .iter()
        .filter(|handler| handler.handle(record))
        .count()
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("propagate", &self.propagate())
            .field("disabled", &self.is_disabled())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Handlers still attached may be shared; flush, never close
        if let Err(e) = self.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush logger '{}' on drop: {}", self.name, e);
        }
    }
}
