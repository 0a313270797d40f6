//! File appender implementation

use crate::core::{Appender, LogRecord, LoggerError, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How an existing log file is treated when it is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// `"a"`: keep existing content
    #[default]
    Append,
    /// `"w"`: truncate on open
    Truncate,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Append => "a",
            FileMode::Truncate => "w",
        }
    }
}

impl FromStr for FileMode {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "a" | "at" | "a+" => Ok(FileMode::Append),
            "w" | "wt" | "w+" => Ok(FileMode::Truncate),
            other => Err(LoggerError::config(
                "mode",
                format!("unsupported file mode '{}', expected 'a' or 'w'", other),
            )),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn open_log_file(path: &Path, mode: FileMode) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        FileMode::Append => options.append(true),
        FileMode::Truncate => options.write(true).truncate(true),
    };
    options.open(path)
}

pub(crate) fn open_error(kind: &str, path: &Path, source: std::io::Error) -> LoggerError {
    LoggerError::construction(
        kind,
        format!("cannot open log file '{}'", path.display()),
        source,
    )
}

/// Appends formatted lines to a file.
///
/// With `delay` the file is opened on the first record instead of at
/// construction. Every record is flushed to the file before `append`
/// returns.
pub struct FileAppender {
    path: PathBuf,
    mode: FileMode,
    writer: Option<BufWriter<File>>,
}

impl FileAppender {
    /// Open `path` for appending
    ///
    /// # Errors
    ///
    /// Returns a construction error if the file cannot be opened
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(path, FileMode::Append, false)
    }

    pub fn with_options(path: impl Into<PathBuf>, mode: FileMode, delay: bool) -> Result<Self> {
        let mut appender = Self {
            path: path.into(),
            mode,
            writer: None,
        };
        if !delay {
            appender.open("FileHandler")?;
        }
        Ok(appender)
    }

    fn open(&mut self, kind: &str) -> Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let file = open_log_file(&self.path, self.mode)
                .map_err(|e| open_error(kind, &self.path, e))?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Whether the file is currently open
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

impl Appender for FileAppender {
    fn append(&mut self, _record: &LogRecord, formatted: &str) -> Result<()> {
        let path = self.path.display().to_string();
        let writer = self.open("FileHandler")?;
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
        "FileHandler"
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use tempfile::tempdir;

    fn record() -> LogRecord {
        LogRecord::new("app", LogLevel::Info, "m")
    }

    #[test]
    fn test_append_mode_keeps_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "old\n").unwrap();

        let mut appender = FileAppender::new(&path).unwrap();
        appender.append(&record(), "new").unwrap();
        appender.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_truncate_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "old\n").unwrap();

        let mut appender = FileAppender::with_options(&path, FileMode::Truncate, false).unwrap();
        appender.append(&record(), "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_delay_opens_on_first_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("late.log");

        let mut appender = FileAppender::with_options(&path, FileMode::Append, true).unwrap();
        assert!(!appender.is_open());
        assert!(!path.exists());

        appender.append(&record(), "first").unwrap();
        assert!(appender.is_open());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\n");
    }

    #[test]
    fn test_missing_directory_is_construction_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("app.log");
        let err = FileAppender::new(&path).err().unwrap();
        assert!(err.is_construction());
    }

    #[test]
    fn test_file_mode_parsing() {
        assert_eq!("a".parse::<FileMode>().unwrap(), FileMode::Append);
        assert_eq!("w".parse::<FileMode>().unwrap(), FileMode::Truncate);
        assert!("r".parse::<FileMode>().unwrap_err().is_configuration());
    }
}
