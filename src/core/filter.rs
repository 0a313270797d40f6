//! Filter trait for record admission decisions

use super::record::LogRecord;
use std::fmt;

/// Outcome of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[inline]
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Decides whether a handler processes a record. Every filter attached to a
/// handler must allow the record for it to be written.
pub trait Filter: Send + Sync + fmt::Debug {
    fn decide(&self, record: &LogRecord) -> Decision;
    fn name(&self) -> &str;
}
