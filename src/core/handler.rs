//! Handler: a severity threshold, a formatter and filters in front of an appender

use super::{
    appender::Appender,
    error::{LoggerError, Result},
    filter::Filter,
    formatter::Formatter,
    log_level::LogLevel,
    record::LogRecord,
};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A sink attached to a logger.
///
/// Handlers are shared as `Arc<Handler>`: the logger's attachment list owns
/// them, and callers may hold clones to inspect or reconfigure them.
///
/// # Example
///
/// ```
/// use rust_logutils::appenders::{SharedBuffer, StreamAppender};
/// use rust_logutils::core::{Handler, LogLevel, LogRecord};
///
/// let buffer = SharedBuffer::new();
/// let handler = Handler::new(StreamAppender::shared(buffer.clone()))
///     .with_level(LogLevel::Warning);
///
/// handler.handle(&LogRecord::new("app", LogLevel::Info, "quiet"));
/// handler.handle(&LogRecord::new("app", LogLevel::Error, "loud"));
/// assert!(!buffer.contents().contains("quiet"));
/// assert!(buffer.contents().contains("loud"));
/// ```
pub struct Handler {
    kind: String,
    level: RwLock<LogLevel>,
    formatter: RwLock<Arc<Formatter>>,
    filters: RwLock<Vec<Arc<dyn Filter>>>,
    appender: Mutex<Box<dyn Appender>>,
    closed: AtomicBool,
}

impl Handler {
    /// Wrap an appender. The handler starts at `NOTSET` (handles every
    /// record) with the default formatter and no filters.
    pub fn new<A: Appender + 'static>(appender: A) -> Self {
        Self::from_boxed(Box::new(appender))
    }

    pub fn from_boxed(appender: Box<dyn Appender>) -> Self {
        Self {
            kind: appender.name().to_string(),
            level: RwLock::new(LogLevel::NotSet),
            formatter: RwLock::new(Arc::new(Formatter::default())),
            filters: RwLock::new(Vec::new()),
            appender: Mutex::new(appender),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_level(self, level: LogLevel) -> Self {
        self.set_level(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_formatter(self, formatter: Formatter) -> Self {
        self.set_formatter(formatter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filter<F: Filter + 'static>(self, filter: F) -> Self {
        self.add_filter(Arc::new(filter));
        self
    }

    /// Name of the appender kind behind this handler
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    pub fn formatter(&self) -> Arc<Formatter> {
        Arc::clone(&self.formatter.read())
    }

    pub fn set_formatter(&self, formatter: Formatter) {
        *self.formatter.write() = Arc::new(formatter);
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().push(filter);
    }

    pub fn filters(&self) -> Vec<Arc<dyn Filter>> {
        self.filters.read().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether the record passes this handler's threshold and filters
    pub fn accepts(&self, record: &LogRecord) -> bool {
        if record.level < self.level() {
            return false;
        }
        self.filters
            .read()
            .iter()
            .all(|filter| filter.decide(record).is_allowed())
    }

    /// Process a record: threshold, filters, format, write.
    ///
    /// Returns whether the record was written. Write failures and appender
    /// panics are reported on stderr and never reach the caller.
    pub fn handle(&self, record: &LogRecord) -> bool {
        if self.is_closed() || !self.accepts(record) {
            return false;
        }

        let line = self.formatter().format(record);
        let mut appender = self.appender.lock();
        let result = catch_unwind(AssertUnwindSafe(|| appender.append(record, &line)));

        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                eprintln!("[LOGGER ERROR] Handler '{}' failed: {}", self.kind, e);
                false
            }
            Err(panic_info) => {
                eprintln!(
                    "[LOGGER CRITICAL] Handler '{}' panicked: {}. \
                     Other handlers continue to function.",
                    self.kind,
                    panic_message(&panic_info)
                );
                false
            }
        }
    }

    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.appender.lock().flush()
    }

    /// Flush and release the appender's resource. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the appender's close error, or a writer error if the appender
    /// panicked while closing.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut appender = self.appender.lock();
        match catch_unwind(AssertUnwindSafe(|| appender.close())) {
            Ok(result) => result,
            Err(panic_info) => Err(LoggerError::writer(format!(
                "handler '{}' panicked while closing: {}",
                self.kind,
                panic_message(&panic_info)
            ))),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &self.kind)
            .field("level", &self.level())
            .field("template", &self.formatter().template())
            .field("filters", &self.filters.read().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub(crate) fn panic_message(panic_info: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Decision;

    #[derive(Default)]
    struct Collect {
        lines: Arc<Mutex<Vec<String>>>,
        closes: Arc<Mutex<usize>>,
    }

    impl Appender for Collect {
        fn append(&mut self, _record: &LogRecord, formatted: &str) -> Result<()> {
            self.lines.lock().push(formatted.to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            *self.closes.lock() += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            "collect"
        }
    }

    #[derive(Debug)]
    struct DenyAll;

    impl Filter for DenyAll {
        fn decide(&self, _record: &LogRecord) -> Decision {
            Decision::Deny
        }

        fn name(&self) -> &str {
            "DenyAll"
        }
    }

    struct Panicking;

    impl Appender for Panicking {
        fn append(&mut self, _record: &LogRecord, _formatted: &str) -> Result<()> {
            panic!("appender exploded");
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            panic!("close exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn test_threshold() {
        let appender = Collect::default();
        let lines = Arc::clone(&appender.lines);
        let handler = Handler::new(appender)
            .with_level(LogLevel::Warning)
            .with_formatter(Formatter::new("%(levelname)s %(message)s").unwrap());

        assert!(!handler.handle(&LogRecord::new("a", LogLevel::Info, "info")));
        assert!(handler.handle(&LogRecord::new("a", LogLevel::Warning, "warn")));
        assert_eq!(*lines.lock(), vec!["WARNING warn".to_string()]);
    }

    #[test]
    fn test_filters_must_all_allow() {
        let appender = Collect::default();
        let lines = Arc::clone(&appender.lines);
        let handler = Handler::new(appender).with_filter(DenyAll);

        assert!(!handler.handle(&LogRecord::new("a", LogLevel::Critical, "x")));
        assert!(lines.lock().is_empty());
        assert_eq!(handler.filters().len(), 1);
        assert_eq!(handler.filters()[0].name(), "DenyAll");
    }

    #[test]
    fn test_close_is_idempotent() {
        let appender = Collect::default();
        let closes = Arc::clone(&appender.closes);
        let handler = Handler::new(appender);

        handler.close().unwrap();
        handler.close().unwrap();
        assert_eq!(*closes.lock(), 1);
        assert!(handler.is_closed());
        assert!(!handler.handle(&LogRecord::new("a", LogLevel::Critical, "late")));
    }

    #[test]
    fn test_panics_are_isolated() {
        let handler = Handler::new(Panicking);
        assert!(!handler.handle(&LogRecord::new("a", LogLevel::Error, "boom")));
        assert!(handler.close().is_err());
        assert!(handler.close().is_ok());
    }

    #[test]
    fn test_default_handler_settings() {
        let handler = Handler::new(Collect::default());
        assert_eq!(handler.kind(), "collect");
        assert_eq!(handler.level(), LogLevel::NotSet);
        assert_eq!(handler.formatter().template(), crate::core::DEFAULT_FORMAT);
        assert!(handler.filters().is_empty());
    }
}
