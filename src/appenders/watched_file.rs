//! File appender that follows external log rotation
//!
//! Before each write the path is checked against the file that is open. If
//! the file was moved or deleted (by `logrotate`, for example) it is closed
//! and the path is opened again. Identity is the device and inode pair, so
//! the check is a no-op on platforms without them.

use super::file::{open_error, open_log_file, FileMode};
use crate::core::{Appender, LogRecord, LoggerError, Result};
use std::fs::{self, File, Metadata};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
fn identity(metadata: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn identity(_metadata: &Metadata) -> Option<(u64, u64)> {
    None
}

pub struct WatchedFileAppender {
    path: PathBuf,
    mode: FileMode,
    writer: Option<BufWriter<File>>,
    opened: Option<(u64, u64)>,
}

impl WatchedFileAppender {
    pub fn new(path: impl Into<PathBuf>, mode: FileMode, delay: bool) -> Result<Self> {
        let mut appender = Self {
            path: path.into(),
            mode,
            writer: None,
            opened: None,
        };
        if !delay {
            appender.open()?;
        }
        Ok(appender)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&mut self) -> Result<()> {
        let file =
            open_log_file(&self.path, self.mode).map_err(|e| open_error("WatchedFileHandler", &self.path, e))?;
        self.opened = file.metadata().ok().as_ref().and_then(identity);
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Reopen the path if it no longer points at the open file
    fn reopen_if_needed(&mut self) -> Result<()> {
        let current = fs::metadata(&self.path).ok();
        let changed = match current {
            None => true,
            Some(ref metadata) => identity(metadata) != self.opened,
        };

        if changed || self.writer.is_none() {
            if let Some(mut writer) = self.writer.take() {
                // The old file may already be gone
                let _ = writer.flush();
            }
            self.open()?;
        }
        Ok(())
    }
}

impl Appender for WatchedFileAppender {
    fn append(&mut self, _record: &LogRecord, formatted: &str) -> Result<()> {
        self.reopen_if_needed()?;
        let path = self.path.display().to_string();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))?;
        writeln!(writer, "{}", formatted)
            .and_then(|_| writer.flush())
            .map_err(|e| LoggerError::file_appender(path, e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "WatchedFileHandler"
    }
}
