//! Syslog appender
//!
//! Frames follow the BSD syslog convention used by most local daemons:
//! `<PRI>` followed by the formatted line and a NUL byte, where
//! `PRI = facility * 8 + severity`.

use super::network::resolve;
use crate::core::{Appender, LogLevel, LogRecord, LoggerError, Result};
use fasyslog::sender::SyslogSender;
use fasyslog::Severity;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

/// Default syslog port
pub const SYSLOG_PORT: u16 = 514;

/// Syslog facility code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facility(u8);

impl Facility {
    pub const KERN: Facility = Facility(0);
    pub const USER: Facility = Facility(1);
    pub const MAIL: Facility = Facility(2);
    pub const DAEMON: Facility = Facility(3);
    pub const AUTH: Facility = Facility(4);
    pub const SYSLOG: Facility = Facility(5);
    pub const LOCAL0: Facility = Facility(16);
    pub const LOCAL7: Facility = Facility(23);

    const NAMES: [(&'static str, u8); 24] = [
        ("kern", 0),
        ("user", 1),
        ("mail", 2),
        ("daemon", 3),
        ("auth", 4),
        ("syslog", 5),
        ("lpr", 6),
        ("news", 7),
        ("uucp", 8),
        ("cron", 9),
        ("authpriv", 10),
        ("ftp", 11),
        ("ntp", 12),
        ("security", 13),
        ("console", 14),
        ("solaris-cron", 15),
        ("local0", 16),
        ("local1", 17),
        ("local2", 18),
        ("local3", 19),
        ("local4", 20),
        ("local5", 21),
        ("local6", 22),
        ("local7", 23),
    ];

    /// Facility from its numeric code
    pub fn from_code(code: u8) -> Result<Self> {
        if usize::from(code) < Self::NAMES.len() {
            Ok(Facility(code))
        } else {
            Err(LoggerError::config(
                "facility",
                format!("facility code {} out of range 0-23", code),
            ))
        }
    }

    pub fn code(&self) -> u8 {
        self.0
    }
}

impl Default for Facility {
    fn default() -> Self {
        Facility::USER
    }
}

impl FromStr for Facility {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, code)| Facility(*code))
            .ok_or_else(|| LoggerError::config("facility", format!("unknown syslog facility '{}'", s)))
    }
}

/// Syslog severity for a record level
pub fn severity(level: LogLevel) -> Severity {
    match level {
        LogLevel::Debug => Severity::DEBUG,
        LogLevel::Info => Severity::INFORMATIONAL,
        LogLevel::Error => Severity::ERROR,
        LogLevel::Critical => Severity::CRITICAL,
        _ => Severity::WARNING,
    }
}

/// `PRI` field value
pub fn priority(facility: Facility, level: LogLevel) -> u16 {
    u16::from(facility.code()) * 8 + severity(level) as u16
}

/// Transport for syslog over IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl FromStr for Protocol {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            _ => Err(LoggerError::config(
                "proto",
                format!("unsupported syslog protocol '{}', expected TCP or UDP", s),
            )),
        }
    }
}

/// Where the syslog daemon listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyslogAddress {
    Inet { host: String, port: u16 },
    /// Local socket such as `/dev/log`
    Unix(PathBuf),
}

impl Default for SyslogAddress {
    fn default() -> Self {
        SyslogAddress::Inet {
            host: "localhost".to_string(),
            port: SYSLOG_PORT,
        }
    }
}

impl fmt::Display for SyslogAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyslogAddress::Inet { host, port } => write!(f, "{}:{}", host, port),
            SyslogAddress::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

fn connect(address: &SyslogAddress, protocol: Protocol) -> io::Result<SyslogSender> {
    match address {
        SyslogAddress::Inet { host, port } => {
            let targets = resolve(host, *port)?;
            match protocol {
                Protocol::Tcp => {
                    let mut sender = fasyslog::sender::tcp(targets.as_slice())?;
                    // Frames carry their own NUL terminator
                    sender.set_postfix("");
                    Ok(SyslogSender::Tcp(sender))
                }
                Protocol::Udp => {
                    let target = targets[0];
                    let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                    Ok(SyslogSender::Udp(fasyslog::sender::udp(local, target)?))
                }
            }
        }
        // Picks a datagram or a stream socket, whichever the daemon listens on
        #[cfg(unix)]
        SyslogAddress::Unix(path) => fasyslog::sender::unix(path),
        #[cfg(not(unix))]
        SyslogAddress::Unix(path) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unix socket {} not supported on this platform", path.display()),
        )),
    }
}

/// Sends formatted lines to a syslog daemon
pub struct SyslogAppender {
    sender: Option<SyslogSender>,
    address: SyslogAddress,
    facility: Facility,
    protocol: Protocol,
}

impl SyslogAppender {
    /// Connect to the daemon at `address`
    ///
    /// # Errors
    ///
    /// Returns a construction error if the daemon cannot be reached
    pub fn new(address: SyslogAddress, facility: Facility, protocol: Protocol) -> Result<Self> {
        let sender = connect(&address, protocol).map_err(|e| {
            LoggerError::construction("SysLogHandler", format!("cannot reach syslog at {}", address), e)
        })?;
        Ok(Self {
            sender: Some(sender),
            address,
            facility,
            protocol,
        })
    }

    pub fn address(&self) -> &SyslogAddress {
        &self.address
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn frame(&self, level: LogLevel, formatted: &str) -> Vec<u8> {
        let mut frame = format!("<{}>{}", priority(self.facility, level), formatted).into_bytes();
        frame.push(0);
        frame
    }
}

impl Appender for SyslogAppender {
    fn append(&mut self, record: &LogRecord, formatted: &str) -> Result<()> {
        let frame = self.frame(record.level, formatted);
        let sender = self
            .sender
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Syslog sender closed"))?;
        sender.send_formatted(&frame)?;
        // TCP senders buffer; push each record out as it is logged
        sender.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut sender) = self.sender {
            sender.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.sender = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "SysLogHandler"
    }
}
