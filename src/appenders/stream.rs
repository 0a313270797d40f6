//! Stream appender: stdout, stderr or a caller-supplied writer

use crate::core::{Appender, LogRecord, Result};
#[cfg(feature = "console")]
use colored::Colorize;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// A writer shared between the caller and a stream appender
pub type SharedStream = Arc<Mutex<dyn Write + Send>>;

/// In-memory writer, handy for capturing output.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum StreamTarget {
    Stdout,
    Stderr,
    Writer(SharedStream),
}

/// Writes one formatted line per record to a stream.
///
/// The process streams are flushed after every record and are never closed.
pub struct StreamAppender {
    target: StreamTarget,
    use_colors: bool,
}

impl StreamAppender {
    pub fn stdout() -> Self {
        Self::with_target(StreamTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::with_target(StreamTarget::Stderr)
    }

    pub fn writer(writer: SharedStream) -> Self {
        Self::with_target(StreamTarget::Writer(writer))
    }

    pub fn shared(buffer: SharedBuffer) -> Self {
        Self::writer(Arc::new(Mutex::new(buffer)))
    }

    fn with_target(target: StreamTarget) -> Self {
        Self {
            target,
            use_colors: false,
        }
    }

    /// Color whole lines by severity. Has no effect without the `console`
    /// feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[cfg(feature = "console")]
    fn render(&self, record: &LogRecord, formatted: &str) -> String {
        if self.use_colors {
            formatted.color(record.level.color_code()).to_string()
        } else {
            formatted.to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn render(&self, _record: &LogRecord, formatted: &str) -> String {
        formatted.to_string()
    }
}

impl Appender for StreamAppender {
    fn append(&mut self, record: &LogRecord, formatted: &str) -> Result<()> {
        let line = self.render(record, formatted);
        match &self.target {
            StreamTarget::Stdout => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", line)?;
                out.flush()?;
            }
            StreamTarget::Stderr => {
                let mut out = io::stderr().lock();
                writeln!(out, "{}", line)?;
                out.flush()?;
            }
            StreamTarget::Writer(writer) => {
                let mut out = writer.lock();
                writeln!(out, "{}", line)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match &self.target {
            StreamTarget::Stdout => io::stdout().flush()?,
            StreamTarget::Stderr => io::stderr().flush()?,
            StreamTarget::Writer(writer) => writer.lock().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "StreamHandler"
    }
}
