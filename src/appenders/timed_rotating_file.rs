//! Time-based rotating file appender
//!
//! The file is rolled over at fixed intervals (seconds, minutes, hours or
//! days), at midnight, or weekly on a given weekday. A rolled file is
//! renamed to `<file>.<timestamp>` where the timestamp marks the start of
//! the period it covers, e.g. `app.log.2024-03-05` for daily rotation.

use super::file::{open_error, open_log_file, FileMode};
use super::rotating_file::{compress_file, remove_if_exists, with_suffix};
use crate::core::{Appender, LogRecord, LoggerError, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Rollover schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    Seconds,
    Minutes,
    Hours,
    Days,
    /// Roll over once a day at `at_time` (midnight by default)
    Midnight,
    /// Roll over once a week on the given day, 0 = Monday
    Weekday(u8),
}

impl When {
    fn unit_seconds(&self) -> i64 {
        match self {
            When::Seconds => 1,
            When::Minutes => 60,
            When::Hours => 60 * 60,
            When::Days | When::Midnight => 24 * 60 * 60,
            When::Weekday(_) => 7 * 24 * 60 * 60,
        }
    }

    /// strftime pattern of the rolled file suffix
    pub fn suffix_format(&self) -> &'static str {
        match self {
            When::Seconds => "%Y-%m-%d_%H-%M-%S",
            When::Minutes => "%Y-%m-%d_%H-%M",
            When::Hours => "%Y-%m-%d_%H",
            When::Days | When::Midnight | When::Weekday(_) => "%Y-%m-%d",
        }
    }
}

impl FromStr for When {
    type Err = LoggerError;

    /// Parse `S`, `M`, `H`, `D`, `MIDNIGHT` or `W0`-`W6`, ignoring case
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.to_ascii_uppercase();
        let when = match upper.as_str() {
            "S" => When::Seconds,
            "M" => When::Minutes,
            "H" => When::Hours,
            "D" => When::Days,
            "MIDNIGHT" => When::Midnight,
            weekly if weekly.len() == 2 && weekly.starts_with('W') => {
                match weekly[1..].parse::<u8>() {
                    Ok(day) if day <= 6 => When::Weekday(day),
                    _ => {
                        return Err(LoggerError::config(
                            "when",
                            format!("invalid weekday rollover '{}', expected W0-W6", s),
                        ))
                    }
                }
            }
            _ => {
                return Err(LoggerError::config(
                    "when",
                    format!("invalid rollover interval '{}'", s),
                ))
            }
        };
        Ok(when)
    }
}

/// Longest rotation period accepted, in seconds (a hundred years)
pub const MAX_PERIOD_SECS: i64 = 100 * 366 * 24 * 60 * 60;

/// Settings for [`TimedRotatingFileAppender`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedRotationPolicy {
    pub when: When,
    /// Multiplier for `when`; ignored for midnight and weekly rollover
    pub interval: u32,
    pub backup_count: usize,
    /// Compute rollover times and suffixes in UTC instead of local time
    pub utc: bool,
    /// Time of day for midnight and weekly rollover
    pub at_time: Option<NaiveTime>,
    pub compress: bool,
}

impl Default for TimedRotationPolicy {
    fn default() -> Self {
        Self {
            when: When::Hours,
            interval: 1,
            backup_count: 0,
            utc: false,
            at_time: None,
            compress: false,
        }
    }
}

impl TimedRotationPolicy {
    #[must_use]
    pub fn new(when: When) -> Self {
        Self {
            when,
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_at_time(mut self, at_time: NaiveTime) -> Self {
        self.at_time = Some(at_time);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    fn period_secs(&self) -> i64 {
        let multiplier = match self.when {
            When::Midnight | When::Weekday(_) => 1,
            _ => i64::from(self.interval.max(1)),
        };
        self.when.unit_seconds().saturating_mul(multiplier)
    }

    /// Length of one rotation period, capped at [`MAX_PERIOD_SECS`]
    pub fn period(&self) -> Duration {
        Duration::seconds(self.period_secs().min(MAX_PERIOD_SECS))
    }

    /// Reject a period longer than [`MAX_PERIOD_SECS`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming `interval`
    pub fn check_period(&self) -> Result<()> {
        if self.period_secs() > MAX_PERIOD_SECS {
            return Err(LoggerError::config(
                "interval",
                format!(
                    "interval {} with when {:?} exceeds the longest rotation period of {} seconds",
                    self.interval, self.when, MAX_PERIOD_SECS
                ),
            ));
        }
        Ok(())
    }

    fn to_naive(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        if self.utc {
            instant.naive_utc()
        } else {
            instant.with_timezone(&Local).naive_local()
        }
    }

    fn to_instant(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        if self.utc {
            return Utc.from_utc_datetime(&naive);
        }
        match Local.from_local_datetime(&naive).earliest() {
            Some(local) => local.with_timezone(&Utc),
            // Skipped by a DST change; roll an hour later
            None => Local
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
        }
    }

    /// First rollover instant strictly after `from`
    pub fn next_rollover(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let at_time = self.at_time.unwrap_or(NaiveTime::MIN);
        match self.when {
            When::Midnight => {
                let local = self.to_naive(from);
                let mut candidate = local.date().and_time(at_time);
                if candidate <= local {
                    candidate += Duration::days(1);
                }
                self.to_instant(candidate)
            }
            When::Weekday(day) => {
                let local = self.to_naive(from);
                let today = local.weekday().num_days_from_monday();
                let ahead = (u32::from(day) + 7 - today) % 7;
                let mut candidate = (local.date() + Duration::days(i64::from(ahead))).and_time(at_time);
                if candidate <= local {
                    candidate += Duration::days(7);
                }
                self.to_instant(candidate)
            }
            _ => later(from, self.period()),
        }
    }

    fn suffix(&self, period_start: DateTime<Utc>) -> String {
        self.to_naive(period_start)
            .format(self.when.suffix_format())
            .to_string()
    }
}

/// `instant + period`, saturating at the latest representable instant
fn later(instant: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    instant
        .checked_add_signed(period)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whether `candidate` has the shape produced by a strftime `pattern` made
/// of `%Y`, `%m`, `%d`, `%H`, `%M`, `%S` and literal characters
fn matches_suffix(candidate: &str, pattern: &str) -> bool {
    let mut chars = candidate.chars();
    let mut spec = pattern.chars();
    while let Some(p) = spec.next() {
        if p == '%' {
            let digits = match spec.next() {
                Some('Y') => 4,
                Some(_) => 2,
                None => return false,
            };
            for _ in 0..digits {
                if !chars.next().is_some_and(|c| c.is_ascii_digit()) {
                    return false;
                }
            }
        } else if chars.next() != Some(p) {
            return false;
        }
    }
    chars.next().is_none()
}

/// File appender that rotates on a schedule
pub struct TimedRotatingFileAppender {
    base_path: PathBuf,
    policy: TimedRotationPolicy,
    writer: Option<BufWriter<File>>,
    rollover_at: DateTime<Utc>,
}

impl TimedRotatingFileAppender {
    /// # Errors
    ///
    /// Returns a construction error if the file cannot be opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: TimedRotationPolicy, delay: bool) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        // An existing file continues the period it was last written in
        let start = fs::metadata(&base_path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let rollover_at = policy.next_rollover(start);

        let mut appender = Self {
            base_path,
            policy,
            writer: None,
            rollover_at,
        };
        if !delay {
            appender.open()?;
        }
        Ok(appender)
    }

    fn open(&mut self) -> Result<()> {
        let file = open_log_file(&self.base_path, FileMode::Append)
            .map_err(|e| open_error("TimedRotatingFileHandler", &self.base_path, e))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    pub fn policy(&self) -> &TimedRotationPolicy {
        &self.policy
    }

    /// When the current file will be rolled over
    pub fn rollover_at(&self) -> DateTime<Utc> {
        self.rollover_at
    }

    fn rotate(&mut self, now: DateTime<Utc>) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let period_start = self
            .rollover_at
            .checked_sub_signed(self.policy.period())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let destination = with_suffix(&self.base_path, &format!(".{}", self.policy.suffix(period_start)));
        remove_if_exists(&destination);
        remove_if_exists(&with_suffix(&destination, ".gz"));

        if self.base_path.exists() {
            fs::rename(&self.base_path, &destination).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;
            if self.policy.compress {
                compress_file(&destination)?;
            }
        }

        if self.policy.backup_count > 0 {
            for stale in self.files_to_delete() {
                remove_if_exists(&stale);
            }
        }

        let mut next = self.policy.next_rollover(now);
        while next <= now {
            next = later(next, self.policy.period());
        }
        self.rollover_at = next;
        self.open()
    }

    /// Rolled files beyond the backup count, oldest first
    fn files_to_delete(&self) -> Vec<PathBuf> {
        let (Some(dir), Some(name)) = (
            self.base_path.parent(),
            self.base_path.file_name().and_then(|n| n.to_str()),
        ) else {
            return Vec::new();
        };
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        let prefix = format!("{}.", name);
        let pattern = self.policy.when.suffix_format();

        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut rolled: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .filter(|file| {
                file.strip_prefix(&prefix)
                    .map(|rest| rest.strip_suffix(".gz").unwrap_or(rest))
                    .is_some_and(|suffix| matches_suffix(suffix, pattern))
            })
            .collect();
        rolled.sort();

        let excess = rolled.len().saturating_sub(self.policy.backup_count);
        rolled.truncate(excess);
        rolled.into_iter().map(|file| dir.join(file)).collect()
    }

    fn append_at(&mut self, formatted: &str, now: DateTime<Utc>) -> Result<()> {
        if now >= self.rollover_at {
            if let Err(e) = self.rotate(now) {
                eprintln!("[WARN] Log rotation failed: {}. Continuing with current file.", e);
                self.rollover_at = later(now, self.policy.period());
            }
        }
        if self.writer.is_none() {
            self.open()?;
        }

        let path = self.base_path.display().to_string();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Writer not initialized"))?;
        writeln!(writer, "{}", formatted)
            .and_then(|_| writer.flush())
            .map_err(|e| LoggerError::file_appender(path, e.to_string()))
    }
}

impl Appender for TimedRotatingFileAppender {
    fn append(&mut self, _record: &LogRecord, formatted: &str) -> Result<()> {
        self.append_at(formatted, Utc::now())
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
        "TimedRotatingFileHandler"
    }
}

impl Drop for TimedRotatingFileAppender {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
