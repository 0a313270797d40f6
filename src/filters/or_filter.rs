//! Logger-name prefix filter

use crate::core::{Decision, Filter, LogRecord};

/// Allows a record when its logger name starts with at least one of the
/// configured prefixes.
///
/// Matching is a plain string prefix test, so `svc.a` also admits
/// `svc.api`. A filter with no prefixes denies every record.
///
/// # Example
///
/// ```
/// use rust_logutils::core::{Filter, LogLevel, LogRecord};
/// use rust_logutils::filters::OrFilter;
///
/// let filter = OrFilter::from_names(["svc.a", "svc.b"]);
/// let record = LogRecord::new("svc.a.worker", LogLevel::Info, "tick");
/// assert!(filter.decide(&record).is_allowed());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrFilter {
    names: Vec<String>,
}

impl OrFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::new();
        for name in names {
            filter.add_name(name);
        }
        filter
    }

    /// Add a prefix. Empty strings and prefixes already present are ignored.
    pub fn add_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() && !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    /// Remove a prefix. Returns whether it was present.
    pub fn remove_name(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matches(&self, logger_name: &str) -> bool {
        self.names.iter().any(|prefix| logger_name.starts_with(prefix.as_str()))
    }
}

impl Filter for OrFilter {
    fn decide(&self, record: &LogRecord) -> Decision {
        self.matches(&record.logger_name).into()
    }

    fn name(&self) -> &str {
        "OrFilter"
    }
}
