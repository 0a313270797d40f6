//! # Rust Logutils
//!
//! Declarative logger configuration. A JSON or TOML document names a
//! logger, its level and the handlers it writes to; [`create_logger`] turns
//! it into a configured logger and [`close_logger`] releases the handlers.
//!
//! ## Features
//!
//! - **Ten handler kinds**: console stream, plain, watched, size-rotating and
//!   time-rotating files, TCP socket, UDP datagram, syslog, Windows event log
//!   and SMTP
//! - **Eager validation**: the whole document is checked before any file or
//!   socket is opened, and a failed call changes nothing
//! - **Name filters**: restrict a handler to records from loggers under
//!   given name prefixes
//! - **Logger hierarchy**: dotted names, propagation to ancestors
//!
//! ## Example
//!
//! ```
//! use rust_logutils::{close_logger, LoggerConfig, Resolver, Registry};
//! use std::sync::Arc;
//!
//! let config = LoggerConfig::from_json_str(r#"{
//!     "name": "svc",
//!     "level": "INFO",
//!     "handlers": [{"type": "StreamHandler", "level": "WARNING"}]
//! }"#).unwrap();
//!
//! let resolver = Resolver::with_registry(Arc::new(Registry::new()));
//! let logger = resolver.create_logger(&config, None).unwrap();
//! logger.warning("configured");
//!
//! close_logger(&logger);
//! assert!(!logger.has_handlers());
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod filters;
pub mod macros;

pub mod prelude {
    pub use crate::config::{close_logger, create_logger, HandlerConfig, LoggerConfig, Resolver};
    pub use crate::core::{
        Appender, Filter, Formatter, Handler, LogLevel, LogRecord, Logger, LoggerError,
        LoggerHandle, LoggerRegistry, Registry, Result,
    };
    pub use crate::filters::OrFilter;
}

pub use config::{close_logger, create_logger, HandlerConfig, LoggerConfig, Resolver};
pub use core::{
    Appender, Filter, Formatter, Handler, LogLevel, LogRecord, Logger, LoggerError, LoggerHandle,
    LoggerRegistry, Registry, Result, DEFAULT_FORMAT,
};
pub use filters::OrFilter;
