//! Size-based rotating file appender
//!
//! When the next record would push the file past `max_bytes`, the file is
//! renamed to `<file>.1`, existing backups shift up by one, and the oldest
//! backup beyond `backup_count` is discarded. Backups can be gzip compressed
//! (`<file>.N.gz`). Rollover needs both a size limit and at least one
//! backup; with either at zero the file simply grows.

use super::file::{open_error, open_log_file, FileMode};
use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::record::LogRecord;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Rotation settings for [`RotatingFileAppender`]
///
/// # Examples
///
/// ```
/// use rust_logutils::appenders::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(50 * 1024 * 1024)
///     .with_backup_count(7)
///     .with_compression(true);
/// assert!(policy.rotates());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size threshold in bytes; zero disables rotation
    pub max_bytes: u64,
    /// Number of rotated files to keep; zero disables rotation
    pub backup_count: usize,
    /// Whether to gzip rotated files
    pub compress: bool,
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Whether a full file is ever rolled over
    pub fn rotates(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }
}

/// `path` with `suffix` appended to its file name
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

pub(crate) fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            eprintln!("[WARN] Failed to remove old backup {}: {}", path.display(), e);
        }
    }
}

/// Gzip `path` into `<path>.gz` and remove the original.
///
/// The compressed file is written to a temporary name first, so a failure
/// never leaves a truncated archive or loses the uncompressed backup.
pub(crate) fn compress_file(path: &Path) -> Result<()> {
    let gz_path = with_suffix(path, ".gz");
    let temp_gz_path = with_suffix(path, ".gz.tmp");

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp_gz_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let streamed = std::io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush());
    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    fs::rename(&temp_gz_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_gz_path);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", gz_path.display()),
            e,
        )
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[WARN] Compression succeeded but failed to remove original file {}: {}. \
             Both compressed and uncompressed versions exist.",
            path.display(),
            e
        );
    }
    Ok(())
}

/// File appender that rotates on size
///
/// # Examples
///
/// ```no_run
/// use rust_logutils::appenders::{FileMode, RotatingFileAppender, RotationPolicy};
///
/// let policy = RotationPolicy::new().with_max_bytes(10 * 1024 * 1024).with_backup_count(5);
/// let appender =
///     RotatingFileAppender::with_policy("/var/log/app.log", policy, FileMode::Append, false).unwrap();
/// ```
pub struct RotatingFileAppender {
    base_path: PathBuf,
    policy: RotationPolicy,
    mode: FileMode,
    writer: Option<BufWriter<File>>,
    current_size: u64,
}

impl RotatingFileAppender {
    /// Create a rotating file appender.
    ///
    /// With a size limit set the file is always opened for appending, so a
    /// restart does not wipe the current file.
    ///
    /// # Errors
    ///
    /// Returns a construction error if the file cannot be opened
    pub fn with_policy<P: AsRef<Path>>(
        path: P,
        policy: RotationPolicy,
        mode: FileMode,
        delay: bool,
    ) -> Result<Self> {
        let mode = if policy.max_bytes > 0 { FileMode::Append } else { mode };
        let mut appender = Self {
            base_path: path.as_ref().to_path_buf(),
            policy,
            mode,
            writer: None,
            current_size: 0,
        };
        if !delay {
            appender.open(appender.mode)?;
        }
        Ok(appender)
    }

    fn open(&mut self, mode: FileMode) -> Result<()> {
        let file = open_log_file(&self.base_path, mode)
            .map_err(|e| open_error("RotatingFileHandler", &self.base_path, e))?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        self.policy.rotates()
            && self.current_size > 0
            && self.current_size + incoming >= self.policy.max_bytes
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let oldest = self.backup_path(self.policy.backup_count);
        remove_if_exists(&oldest);
        remove_if_exists(&with_suffix(&oldest, ".gz"));

        for i in (1..self.policy.backup_count).rev() {
            let old_path = self.backup_path(i);
            let new_path = self.backup_path(i + 1);
            for (from, to) in [
                (with_suffix(&old_path, ".gz"), with_suffix(&new_path, ".gz")),
                (old_path, new_path),
            ] {
                if from.exists() {
                    remove_if_exists(&to);
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("Failed to rotate backup files: {}", e),
                        )
                    })?;
                }
            }
        }

        let first_backup = self.backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &first_backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                compress_file(&first_backup)?;
            }
        }

        self.open(FileMode::Append)
    }

    /// Path of the `index`-th backup, without the compression suffix
    pub fn backup_path(&self, index: usize) -> PathBuf {
        with_suffix(&self.base_path, &format!(".{}", index))
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}

impl Appender for RotatingFileAppender {
    fn name(&self) -> &str {
        "RotatingFileHandler"
    }

    fn append(&mut self, _record: &LogRecord, formatted: &str) -> Result<()> {
        if self.writer.is_none() {
            self.open(self.mode)?;
        }

        let line = format!("{}\n", formatted);
        let bytes = line.len() as u64;

        if self.should_rotate(bytes) {
            if let Err(e) = self.rotate() {
                eprintln!("[WARN] Log rotation failed: {}. Continuing with current file.", e);
                if self.writer.is_none() {
                    self.open(FileMode::Append)?;
                }
                // Let the file grow past the limit rather than retrying on every record
                self.current_size = 0;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Writer not initialized"))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| {
                LoggerError::file_appender(
                    self.base_path.display().to_string(),
                    format!("Failed to write log record: {}", e),
                )
            })?;
        self.current_size += bytes;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.writer = None;
        Ok(())
    }
}

impl Drop for RotatingFileAppender {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use std::io::Read;
    use tempfile::tempdir;

    fn record() -> LogRecord {
        LogRecord::new("app", LogLevel::Info, "m")
    }

    fn log_files(dir: &Path, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_policy_builder() {
        let policy = RotationPolicy::new()
            .with_max_bytes(1024)
            .with_backup_count(3)
            .with_compression(true);

        assert_eq!(policy.max_bytes, 1024);
        assert_eq!(policy.backup_count, 3);
        assert!(policy.compress);
        assert!(!RotationPolicy::new().rotates());
    }

    #[test]
    fn test_size_rotation_shifts_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rotation.log");
        let policy = RotationPolicy::new().with_max_bytes(10).with_backup_count(2);
        let mut appender =
            RotatingFileAppender::with_policy(&path, policy, FileMode::Append, false).unwrap();

        // Each line is 7 bytes, so every record after the first rotates
        for line in ["line-1", "line-2", "line-3", "line-4"] {
            appender.append(&record(), line).unwrap();
        }
        appender.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line-4\n");
        assert_eq!(fs::read_to_string(dir.path().join("rotation.log.1")).unwrap(), "line-3\n");
        assert_eq!(fs::read_to_string(dir.path().join("rotation.log.2")).unwrap(), "line-2\n");
        assert_eq!(
            log_files(dir.path(), "rotation.log"),
            vec!["rotation.log", "rotation.log.1", "rotation.log.2"]
        );
    }

    #[test]
    fn test_zero_max_bytes_never_rotates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never.log");
        let policy = RotationPolicy::new().with_backup_count(3);
        let mut appender =
            RotatingFileAppender::with_policy(&path, policy, FileMode::Append, false).unwrap();

        for i in 0..100 {
            appender.append(&record(), &format!("Test message number {}", i)).unwrap();
        }
        appender.flush().unwrap();

        assert_eq!(log_files(dir.path(), "never.log"), vec!["never.log"]);
    }

    #[test]
    fn test_zero_backup_count_keeps_every_record() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("grow.log"), "earlier\n").unwrap();
        let path = dir.path().join("grow.log");
        let policy = RotationPolicy::new().with_max_bytes(10);
        assert!(!policy.rotates());

        let mut appender =
            RotatingFileAppender::with_policy(&path, policy, FileMode::Truncate, false).unwrap();
        appender.append(&record(), "first!").unwrap();
        appender.append(&record(), "second").unwrap();
        appender.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nfirst!\nsecond\n");
        assert_eq!(log_files(dir.path(), "grow.log"), vec!["grow.log"]);
    }

    #[test]
    fn test_compressed_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gz.log");
        let policy = RotationPolicy::new()
            .with_max_bytes(10)
            .with_backup_count(2)
            .with_compression(true);
        let mut appender =
            RotatingFileAppender::with_policy(&path, policy, FileMode::Append, false).unwrap();

        appender.append(&record(), "line-1").unwrap();
        appender.append(&record(), "line-2").unwrap();
        appender.close().unwrap();

        let gz = dir.path().join("gz.log.1.gz");
        assert!(gz.exists());
        assert!(!dir.path().join("gz.log.1").exists());

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "line-1\n");
    }

    #[test]
    fn test_existing_size_counts_toward_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.log");
        fs::write(&path, "0123456789\n").unwrap();

        let policy = RotationPolicy::new().with_max_bytes(12).with_backup_count(1);
        let mut appender =
            RotatingFileAppender::with_policy(&path, policy, FileMode::Truncate, false).unwrap();
        assert_eq!(appender.current_size(), 11);

        appender.append(&record(), "next").unwrap();
        appender.close().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("existing.log.1")).unwrap(), "0123456789\n");
    }
}
