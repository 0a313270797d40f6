//! Appender implementations, one per handler kind

pub mod file;
pub mod network;
pub mod nt_event_log;
pub mod rotating_file;
#[cfg(feature = "smtp")]
pub mod smtp;
pub mod stream;
pub mod syslog;
pub mod timed_rotating_file;
pub mod watched_file;

pub use file::{FileAppender, FileMode};
pub use network::{DatagramAppender, SocketAppender};
pub use nt_event_log::NtEventLogAppender;
pub use rotating_file::{RotatingFileAppender, RotationPolicy};
#[cfg(feature = "smtp")]
pub use smtp::{SmtpAppender, SmtpSettings};
pub use stream::{SharedBuffer, SharedStream, StreamAppender};
pub use syslog::{Facility, Protocol, SyslogAddress, SyslogAppender};
pub use timed_rotating_file::{TimedRotatingFileAppender, TimedRotationPolicy, When};
pub use watched_file::WatchedFileAppender;

pub use crate::core::Appender;
