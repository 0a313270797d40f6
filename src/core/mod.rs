//! Core logging runtime: records, levels, formatters, filters, handlers,
//! loggers and the registry that links them into a hierarchy

pub mod appender;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod handler;
pub mod log_level;
pub mod logger;
pub mod record;
pub mod registry;
pub mod timestamp;

pub use appender::Appender;
pub use error::{LoggerError, Result};
pub use filter::{Decision, Filter};
pub use formatter::{Formatter, DEFAULT_FORMAT, MAX_FIELD_WIDTH};
pub use handler::Handler;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerHandle};
pub use record::{Location, LogRecord};
pub use registry::{LoggerRegistry, Registry};
pub use timestamp::TimestampFormat;
