//! Turning a configuration document into a configured logger
//!
//! Resolution is collect-then-commit: the document is validated, then every
//! enabled handler is constructed, and only when all of that succeeded are
//! the logger settings applied and the handlers attached. A failure at any
//! step closes the handlers already constructed in the call and leaves the
//! logger exactly as it was.

use super::document::LoggerConfig;
use super::validate::validate;
use crate::appenders::SharedStream;
use crate::core::{Handler, LoggerHandle, LoggerRegistry, Registry, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Creates loggers from [`LoggerConfig`] documents
///
/// # Example
///
/// ```
/// use rust_logutils::appenders::SharedBuffer;
/// use rust_logutils::config::{HandlerConfig, LoggerConfig, Resolver};
/// use rust_logutils::core::Registry;
/// use rust_logutils::LogLevel;
/// use std::sync::Arc;
///
/// let output = SharedBuffer::new();
/// let resolver = Resolver::with_registry(Arc::new(Registry::new()))
///     .with_stream("capture", output.clone());
///
/// let config = LoggerConfig::new("t1").with_level("INFO").with_handler(
///     HandlerConfig::new("StreamHandler")
///         .with_level("WARNING")
///         .with_arg("capture")
///         .with_format("%(levelname)s %(message)s"),
/// );
/// let logger = resolver.create_logger(&config, None).unwrap();
///
/// logger.info("not shown");
/// logger.error("disk full");
/// assert_eq!(output.lines(), vec!["ERROR disk full"]);
/// assert_eq!(logger.effective_level(), LogLevel::Info);
/// ```
pub struct Resolver {
    registry: Arc<dyn LoggerRegistry>,
    streams: HashMap<String, SharedStream>,
}

impl Resolver {
    /// A resolver over the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(Registry::global())
    }

    pub fn with_registry(registry: Arc<dyn LoggerRegistry>) -> Self {
        Self {
            registry,
            streams: HashMap::new(),
        }
    }

    /// Register a writer that `StreamHandler` entries can select by name
    #[must_use]
    pub fn with_stream(self, name: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        self.with_shared_stream(name, Arc::new(Mutex::new(writer)))
    }

    #[must_use]
    pub fn with_shared_stream(mut self, name: impl Into<String>, stream: SharedStream) -> Self {
        self.streams.insert(name.into(), stream);
        self
    }

    pub fn registry(&self) -> &Arc<dyn LoggerRegistry> {
        &self.registry
    }

    /// Configure a logger from `config`.
    ///
    /// With `existing` the document is applied to that logger and
    /// `config.name` is ignored; otherwise the logger is looked up by name
    /// (created if needed, a unique name generated if absent). Handlers are
    /// appended after any the logger already has.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid document and a
    /// construction error when a handler's resource cannot be opened. In
    /// both cases nothing is attached and the logger settings are unchanged.
    pub fn create_logger(&self, config: &LoggerConfig, existing: Option<&LoggerHandle>) -> Result<LoggerHandle> {
        let validated = validate(config, &self.streams)?;

        let mut handlers: Vec<Handler> = Vec::with_capacity(validated.handlers.len());
        for entry in validated.handlers {
            match entry.into_handler(&self.streams) {
                Ok(handler) => handlers.push(handler),
                Err(e) => {
                    discard(&handlers);
                    return Err(e);
                }
            }
        }

        let logger = match existing {
            Some(logger) => Arc::clone(logger),
            None => self.registry.lookup_or_create(&validated.name),
        };

        logger.set_level(validated.level);
        logger.set_propagate(validated.propagate);
        logger.set_disabled(!validated.enabled);
        for handler in handlers {
            logger.add_handler(Arc::new(handler));
        }

        Ok(logger)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut streams: Vec<&String> = self.streams.keys().collect();
        streams.sort();
        f.debug_struct("Resolver").field("streams", &streams).finish()
    }
}

/// Close handlers built by a failed call
fn discard(handlers: &[Handler]) {
    for handler in handlers {
        if let Err(e) = handler.close() {
            eprintln!("[LOGGER ERROR] Failed to close handler '{}' after a failed configuration: {}", handler.kind(), e);
        }
    }
}

/// [`Resolver::create_logger`] against the process-wide registry
pub fn create_logger(config: &LoggerConfig, existing: Option<&LoggerHandle>) -> Result<LoggerHandle> {
    Resolver::new().create_logger(config, existing)
}
