//! Appender trait for log output destinations

use super::{error::Result, record::LogRecord};

/// The I/O side of a handler: receives an already formatted line together
/// with the record it was rendered from.
pub trait Appender: Send {
    fn append(&mut self, record: &LogRecord, formatted: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;

    /// Release the underlying resource. Called once, when the handler is
    /// closed; the appender is not used afterwards.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}
