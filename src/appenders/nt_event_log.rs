//! Windows event log appender
//!
//! Records are reported through an event source registered under the
//! application name, using the `winapi` bindings for `advapi32`. On other
//! platforms construction fails with an
//! `Unsupported` construction error.

use crate::core::{Appender, LogLevel, LogRecord, LoggerError, Result};

#[cfg(windows)]
use winapi::um::winnt::{EVENTLOG_ERROR_TYPE, EVENTLOG_INFORMATION_TYPE, EVENTLOG_WARNING_TYPE};

#[cfg(not(windows))]
const EVENTLOG_ERROR_TYPE: u16 = 0x0001;
#[cfg(not(windows))]
const EVENTLOG_WARNING_TYPE: u16 = 0x0002;
#[cfg(not(windows))]
const EVENTLOG_INFORMATION_TYPE: u16 = 0x0004;

/// Event type reported for a record level
pub fn event_type(level: LogLevel) -> u16 {
    match level {
        LogLevel::Warning => EVENTLOG_WARNING_TYPE,
        LogLevel::Error | LogLevel::Critical => EVENTLOG_ERROR_TYPE,
        _ => EVENTLOG_INFORMATION_TYPE,
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::OsStr;
    use std::io;
    use std::os::windows::ffi::OsStrExt;
    use std::ptr;
    use winapi::um::winbase::{DeregisterEventSource, RegisterEventSourceW, ReportEventW};
    use winapi::um::winnt::HANDLE;

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(Some(0)).collect()
    }

    /// Registered event source, deregistered on drop.
    ///
    /// The handle is kept as an address so the source can move between
    /// threads with the handler that owns it.
    pub struct EventSource(usize);

    impl EventSource {
        pub fn register(appname: &str) -> io::Result<Self> {
            let name = wide(appname);
            // SAFETY: `name` is a NUL-terminated UTF-16 string that outlives the call
            let handle = unsafe { RegisterEventSourceW(ptr::null(), name.as_ptr()) };
            if handle.is_null() {
                return Err(io::Error::last_os_error());
            }
            Ok(EventSource(handle as usize))
        }

        fn handle(&self) -> HANDLE {
            self.0 as HANDLE
        }

        pub fn report(&self, event_type: u16, message: &str) -> io::Result<()> {
            let text = wide(message);
            let mut strings = [text.as_ptr()];
            // SAFETY: the handle is live and `strings` points at one NUL-terminated string
            let ok = unsafe {
                ReportEventW(
                    self.handle(),
                    event_type,
                    0,
                    1,
                    ptr::null_mut(),
                    1,
                    0,
                    strings.as_mut_ptr(),
                    ptr::null_mut(),
                )
            };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl Drop for EventSource {
        fn drop(&mut self) {
            // SAFETY: the handle came from RegisterEventSourceW and is released once
            unsafe {
                DeregisterEventSource(self.handle());
            }
        }
    }
}

pub struct NtEventLogAppender {
    appname: String,
    dllname: Option<String>,
    logtype: String,
    #[cfg(windows)]
    source: Option<sys::EventSource>,
}

impl NtEventLogAppender {
    /// Register an event source named `appname`
    ///
    /// # Errors
    ///
    /// Returns a construction error if the source cannot be registered, or
    /// always when not running on Windows
    #[cfg(windows)]
    pub fn new(appname: impl Into<String>, dllname: Option<String>, logtype: impl Into<String>) -> Result<Self> {
        let appname = appname.into();
        let source = sys::EventSource::register(&appname).map_err(|e| {
            LoggerError::construction("NTEventLogHandler", format!("cannot register event source '{}'", appname), e)
        })?;
        Ok(Self {
            appname,
            dllname,
            logtype: logtype.into(),
            source: Some(source),
        })
    }

    #[cfg(not(windows))]
    pub fn new(appname: impl Into<String>, _dllname: Option<String>, _logtype: impl Into<String>) -> Result<Self> {
        Err(LoggerError::construction(
            "NTEventLogHandler",
            format!("cannot register event source '{}'", appname.into()),
            std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "the event log is only available on Windows",
            ),
        ))
    }

    pub fn appname(&self) -> &str {
        &self.appname
    }

    pub fn dllname(&self) -> Option<&str> {
        self.dllname.as_deref()
    }

    pub fn logtype(&self) -> &str {
        &self.logtype
    }
}

impl Appender for NtEventLogAppender {
    #[cfg(windows)]
    fn append(&mut self, record: &LogRecord, formatted: &str) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| LoggerError::writer("Event source deregistered"))?;
        source.report(event_type(record.level), formatted)?;
        Ok(())
    }

    #[cfg(not(windows))]
    fn append(&mut self, _record: &LogRecord, _formatted: &str) -> Result<()> {
        Err(LoggerError::writer("the event log is only available on Windows"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    #[cfg(windows)]
    fn close(&mut self) -> Result<()> {
        self.source = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "NTEventLogHandler"
    }
}
