//! Eager validation of a configuration document
//!
//! [`validate`] checks every severity name, handler type, template and
//! construction argument of a document without performing any I/O. The
//! result describes each handler completely, so building it afterwards can
//! only fail for runtime reasons (missing directory, refused connection).

use super::args::{bind, BoundArgs};
use super::document::{HandlerConfig, LoggerConfig};
#[cfg(feature = "smtp")]
use crate::appenders::smtp::{SmtpSettings, SMTP_PORT};
use crate::appenders::{
    syslog::SYSLOG_PORT, DatagramAppender, Facility, FileAppender, FileMode, NtEventLogAppender,
    Protocol, RotatingFileAppender, RotationPolicy, SharedStream, SocketAppender, StreamAppender,
    SyslogAddress, SyslogAppender, TimedRotatingFileAppender, TimedRotationPolicy,
    WatchedFileAppender, When,
};
use crate::core::{
    Appender, Formatter, Handler, LogLevel, LoggerError, Result, TimestampFormat, DEFAULT_FORMAT,
};
use crate::filters::OrFilter;
use chrono::NaiveTime;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
#[cfg(feature = "smtp")]
use std::time::Duration;

/// Level used when a logger or handler does not name one
pub const DEFAULT_LEVEL: LogLevel = LogLevel::Debug;

const FILE_PARAMS: &[&str] = &["filename", "mode", "encoding", "delay", "errors"];

/// The fixed set of handler kinds a document can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerType {
    Stream,
    File,
    WatchedFile,
    RotatingFile,
    TimedRotatingFile,
    Socket,
    Datagram,
    SysLog,
    NtEventLog,
    Smtp,
}

impl HandlerType {
    pub const ALL: [HandlerType; 10] = [
        HandlerType::Stream,
        HandlerType::File,
        HandlerType::WatchedFile,
        HandlerType::RotatingFile,
        HandlerType::TimedRotatingFile,
        HandlerType::Socket,
        HandlerType::Datagram,
        HandlerType::SysLog,
        HandlerType::NtEventLog,
        HandlerType::Smtp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerType::Stream => "StreamHandler",
            HandlerType::File => "FileHandler",
            HandlerType::WatchedFile => "WatchedFileHandler",
            HandlerType::RotatingFile => "RotatingFileHandler",
            HandlerType::TimedRotatingFile => "TimedRotatingFileHandler",
            HandlerType::Socket => "SocketHandler",
            HandlerType::Datagram => "DatagramHandler",
            HandlerType::SysLog => "SysLogHandler",
            HandlerType::NtEventLog => "NTEventLogHandler",
            HandlerType::Smtp => "SMTPHandler",
        }
    }

    /// Constructor parameters in positional order
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            HandlerType::Stream => &["stream", "colors"],
            HandlerType::File | HandlerType::WatchedFile => FILE_PARAMS,
            HandlerType::RotatingFile => &[
                "filename",
                "mode",
                "maxBytes",
                "backupCount",
                "encoding",
                "delay",
                "errors",
                "compress",
            ],
            HandlerType::TimedRotatingFile => &[
                "filename",
                "when",
                "interval",
                "backupCount",
                "encoding",
                "delay",
                "utc",
                "atTime",
                "errors",
                "compress",
            ],
            HandlerType::Socket | HandlerType::Datagram => &["host", "port"],
            HandlerType::SysLog => &["address", "facility"],
            HandlerType::NtEventLog => &["appname", "dllname", "logtype"],
            HandlerType::Smtp => &[
                "mailhost",
                "fromaddr",
                "toaddrs",
                "subject",
                "credentials",
                "secure",
                "timeout",
            ],
        }
    }

    /// Whether the handler writes to a file under `path`
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            HandlerType::File
                | HandlerType::WatchedFile
                | HandlerType::RotatingFile
                | HandlerType::TimedRotatingFile
        )
    }

    fn defaults(&self) -> Vec<(&'static str, Value)> {
        match self {
            HandlerType::Stream => vec![("stream", json!("stderr")), ("colors", json!(false))],
            HandlerType::Socket => vec![("host", json!("localhost")), ("port", json!(9020))],
            HandlerType::Datagram => vec![("host", json!("localhost")), ("port", json!(9021))],
            HandlerType::SysLog => vec![
                ("address", json!(["localhost", SYSLOG_PORT])),
                ("facility", json!("user")),
            ],
            HandlerType::NtEventLog => vec![("logtype", json!("Application"))],
            HandlerType::Smtp => vec![("timeout", json!(1.0))],
            HandlerType::TimedRotatingFile => vec![("when", json!("h")), ("interval", json!(1))],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerType {
    type Err = LoggerError;

    /// Names are case-sensitive
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LoggerError::config("type", format!("unrecognized handler type '{}'", s)))
    }
}

/// Console target of a stream handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    Stdout,
    Stderr,
    /// A stream registered on the resolver
    Named(String),
}

/// Fully checked construction arguments of one handler
#[derive(Debug, Clone)]
pub enum HandlerKind {
    Stream {
        target: StreamTarget,
        colors: bool,
    },
    File {
        path: PathBuf,
        mode: FileMode,
        delay: bool,
    },
    WatchedFile {
        path: PathBuf,
        mode: FileMode,
        delay: bool,
    },
    RotatingFile {
        path: PathBuf,
        mode: FileMode,
        delay: bool,
        policy: RotationPolicy,
    },
    TimedRotatingFile {
        path: PathBuf,
        delay: bool,
        policy: TimedRotationPolicy,
    },
    Socket {
        host: String,
        port: u16,
    },
    Datagram {
        host: String,
        port: u16,
    },
    SysLog {
        address: SyslogAddress,
        facility: Facility,
        protocol: Protocol,
    },
    NtEventLog {
        appname: String,
        dllname: Option<String>,
        logtype: String,
    },
    #[cfg(feature = "smtp")]
    Smtp(SmtpSettings),
}

impl HandlerKind {
    /// Target file of file kinds
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            HandlerKind::File { path, .. }
            | HandlerKind::WatchedFile { path, .. }
            | HandlerKind::RotatingFile { path, .. }
            | HandlerKind::TimedRotatingFile { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A handler entry that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedHandler {
    pub handler_type: HandlerType,
    pub kind: HandlerKind,
    pub level: LogLevel,
    pub formatter: Formatter,
    pub filter: Option<OrFilter>,
}

/// A document that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedLogger {
    /// Configured name, or a generated token
    pub name: String,
    pub level: LogLevel,
    pub enabled: bool,
    pub propagate: bool,
    /// Enabled handlers only, in document order
    pub handlers: Vec<ValidatedHandler>,
}

/// A fresh 32 hex digit token for generated logger and file names
pub fn unique_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Prefix the component of a configuration error with where it occurred
fn within(scope: &str, err: LoggerError) -> LoggerError {
    match err {
        LoggerError::Configuration { component, message } => LoggerError::Configuration {
            component: format!("{}.{}", scope, component),
            message,
        },
        other => other,
    }
}

fn parse_level(level: Option<&str>) -> Result<LogLevel> {
    level.map_or(Ok(DEFAULT_LEVEL), |name| name.parse())
}

/// Validate a whole document.
///
/// Disabled handlers are skipped without being looked at. `streams` holds
/// the names a `StreamHandler` may write to besides `stdout` and `stderr`.
///
/// # Errors
///
/// Returns the first configuration error found; its component names the
/// offending entry, e.g. `handlers[1].level`.
pub fn validate(config: &LoggerConfig, streams: &HashMap<String, SharedStream>) -> Result<ValidatedLogger> {
    let token = unique_token();
    let level = parse_level(config.level.as_deref()).map_err(|e| within("logger", e))?;

    let handlers = config
        .handlers
        .iter()
        .enumerate()
        .filter(|(_, handler)| handler.enabled)
        .map(|(index, handler)| {
            validate_handler(config, handler, &token, streams)
                .map_err(|e| within(&format!("handlers[{}]", index), e))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ValidatedLogger {
        name: config.name.clone().unwrap_or_else(|| token.clone()),
        level,
        enabled: config.enabled,
        propagate: config.propagate,
        handlers,
    })
}

fn validate_handler(
    logger: &LoggerConfig,
    config: &HandlerConfig,
    token: &str,
    streams: &HashMap<String, SharedStream>,
) -> Result<ValidatedHandler> {
    if let Some(key) = config.unrecognized.keys().next() {
        return Err(LoggerError::config(key.as_str(), format!("unknown handler key '{}'", key)));
    }

    let handler_type = match config.kind.as_deref() {
        Some(name) => name.parse()?,
        None => HandlerType::File,
    };

    let level = parse_level(config.level.as_deref())?;

    let template = config
        .format
        .as_deref()
        .or(logger.format.as_deref())
        .unwrap_or(DEFAULT_FORMAT);
    let mut formatter = Formatter::new(template)?;
    if let Some(datefmt) = config.datefmt.as_deref().or(logger.datefmt.as_deref()) {
        formatter = formatter.with_timestamp_format(TimestampFormat::custom(datefmt)?);
    }

    let filter = if config.filters.is_empty() {
        None
    } else {
        if config.filters.iter().any(String::is_empty) {
            return Err(LoggerError::config("filters", "filter prefixes must not be empty"));
        }
        Some(OrFilter::from_names(config.filters.iter().cloned()))
    };

    let mut defaults = handler_type.defaults();
    if handler_type.is_file() {
        if let Some(dir) = &config.path {
            let filename = config
                .filename
                .clone()
                .unwrap_or_else(|| format!("{}.log", token));
            let path = Path::new(dir).join(filename);
            defaults.push(("filename", Value::String(path.to_string_lossy().into_owned())));
        }
    }

    let args = bind(
        handler_type.as_str(),
        handler_type.params(),
        defaults,
        &config.args,
        &config.handler_kwargs,
    )?;
    let kind = handler_kind(handler_type, &args, config, streams)?;

    Ok(ValidatedHandler {
        handler_type,
        kind,
        level,
        formatter,
        filter,
    })
}

fn handler_kind(
    handler_type: HandlerType,
    args: &BoundArgs,
    config: &HandlerConfig,
    streams: &HashMap<String, SharedStream>,
) -> Result<HandlerKind> {
    let kind = match handler_type {
        HandlerType::Stream => {
            let target = match args.required_str("stream")?.as_str() {
                "stdout" => StreamTarget::Stdout,
                "stderr" => StreamTarget::Stderr,
                name if streams.contains_key(name) => StreamTarget::Named(name.to_string()),
                name => {
                    return Err(LoggerError::config("stream", format!("unknown stream '{}'", name)))
                }
            };
            HandlerKind::Stream {
                target,
                colors: args.bool("colors", false)?,
            }
        }
        HandlerType::File => {
            let (path, mode, delay) = file_args(args)?;
            HandlerKind::File { path, mode, delay }
        }
        HandlerType::WatchedFile => {
            let (path, mode, delay) = file_args(args)?;
            HandlerKind::WatchedFile { path, mode, delay }
        }
        HandlerType::RotatingFile => {
            let (path, mode, delay) = file_args(args)?;
            let policy = RotationPolicy::new()
                .with_max_bytes(args.u64("maxBytes", 0)?)
                .with_backup_count(count(args, "backupCount")?)
                .with_compression(args.bool("compress", false)?);
            HandlerKind::RotatingFile {
                path,
                mode,
                delay,
                policy,
            }
        }
        HandlerType::TimedRotatingFile => {
            let path = file_path(args)?;
            check_encoding(args)?;
            let when: When = args.required_str("when")?.parse()?;
            let interval = match args.u64("interval", 1)? {
                0 => return Err(LoggerError::config("interval", "interval must be at least 1")),
                n => u32::try_from(n)
                    .map_err(|_| LoggerError::config("interval", format!("interval {} is too large", n)))?,
            };
            let mut policy = TimedRotationPolicy::new(when)
                .with_interval(interval)
                .with_backup_count(count(args, "backupCount")?)
                .with_utc(args.bool("utc", false)?)
                .with_compression(args.bool("compress", false)?);
            if let Some(at_time) = args.str("atTime")? {
                policy = policy.with_at_time(parse_at_time(&at_time)?);
            }
            policy.check_period()?;
            HandlerKind::TimedRotatingFile {
                path,
                delay: args.bool("delay", false)?,
                policy,
            }
        }
        HandlerType::Socket => HandlerKind::Socket {
            host: args.required_str("host")?,
            port: args.port("port", 9020)?,
        },
        HandlerType::Datagram => HandlerKind::Datagram {
            host: args.required_str("host")?,
            port: args.port("port", 9021)?,
        },
        HandlerType::SysLog => {
            let address = match args.value("address") {
                Some(Value::String(path)) => SyslogAddress::Unix(PathBuf::from(path)),
                _ => match args.host_port("address", SYSLOG_PORT)? {
                    Some((host, port)) => SyslogAddress::Inet { host, port },
                    None => SyslogAddress::default(),
                },
            };
            let facility = match args.value("facility") {
                None => Facility::default(),
                Some(Value::String(name)) => name.parse()?,
                Some(value) => match value.as_u64().and_then(|code| u8::try_from(code).ok()) {
                    Some(code) => Facility::from_code(code)?,
                    None => {
                        return Err(LoggerError::config(
                            "facility",
                            format!("invalid syslog facility {}", value),
                        ))
                    }
                },
            };
            let protocol = match config.proto.as_deref() {
                Some(proto) => proto.parse()?,
                None => Protocol::default(),
            };
            HandlerKind::SysLog {
                address,
                facility,
                protocol,
            }
        }
        HandlerType::NtEventLog => HandlerKind::NtEventLog {
            appname: args.required_str("appname")?,
            dllname: args.str("dllname")?,
            logtype: args.required_str("logtype")?,
        },
        HandlerType::Smtp => smtp_kind(args)?,
    };
    Ok(kind)
}

#[cfg(feature = "smtp")]
fn smtp_kind(args: &BoundArgs) -> Result<HandlerKind> {
    let (host, port) = args
        .host_port("mailhost", SMTP_PORT)?
        .ok_or_else(|| LoggerError::config("mailhost", "missing required argument 'mailhost'"))?;
    let mut settings = SmtpSettings::new(
        host,
        port,
        &args.required_str("fromaddr")?,
        &args.str_list("toaddrs")?,
        args.required_str("subject")?,
    )?;

    match args.value("credentials") {
        None => {}
        Some(Value::Array(pair)) => match pair.as_slice() {
            [Value::String(user), Value::String(password)] => {
                settings = settings.with_credentials(user.clone(), password.clone());
            }
            _ => {
                return Err(LoggerError::config(
                    "credentials",
                    "credentials must be a [username, password] pair",
                ))
            }
        },
        Some(other) => {
            return Err(LoggerError::config(
                "credentials",
                format!("credentials must be a [username, password] pair, got {}", other),
            ))
        }
    }

    let timeout = args.f64("timeout", 1.0)?;
    if !(timeout.is_finite() && timeout > 0.0) {
        return Err(LoggerError::config("timeout", format!("timeout must be positive, got {}", timeout)));
    }

    Ok(HandlerKind::Smtp(
        settings
            .with_secure(args.value("secure").is_some())
            .with_timeout(Duration::from_secs_f64(timeout)),
    ))
}

#[cfg(not(feature = "smtp"))]
fn smtp_kind(_args: &BoundArgs) -> Result<HandlerKind> {
    Err(LoggerError::construction(
        HandlerType::Smtp.as_str(),
        "SMTP support is not compiled in",
        io::Error::new(io::ErrorKind::Unsupported, "crate built without the `smtp` feature"),
    ))
}

fn file_path(args: &BoundArgs) -> Result<PathBuf> {
    args.str("filename")?
        .map(PathBuf::from)
        .ok_or_else(|| LoggerError::config("path", "'path' is required unless args supply the filename"))
}

fn check_encoding(args: &BoundArgs) -> Result<()> {
    match args.str("encoding")? {
        Some(encoding)
            if !encoding.eq_ignore_ascii_case("utf-8") && !encoding.eq_ignore_ascii_case("utf8") =>
        {
            Err(LoggerError::config(
                "encoding",
                format!("unsupported encoding '{}', only utf-8 is written", encoding),
            ))
        }
        _ => {
            // `errors` only matters for lossy encodings
            args.str("errors")?;
            Ok(())
        }
    }
}

fn file_args(args: &BoundArgs) -> Result<(PathBuf, FileMode, bool)> {
    let path = file_path(args)?;
    check_encoding(args)?;
    let mode = match args.str("mode")? {
        Some(mode) => mode.parse()?,
        None => FileMode::default(),
    };
    Ok((path, mode, args.bool("delay", false)?))
}

fn count(args: &BoundArgs, name: &str) -> Result<usize> {
    let value = args.u64(name, 0)?;
    usize::try_from(value).map_err(|_| LoggerError::config(name, format!("{} is too large", value)))
}

fn parse_at_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| LoggerError::config("atTime", format!("invalid time of day '{}', expected HH:MM[:SS]", value)))
}

fn missing_directory(handler_type: HandlerType, dir: &Path) -> LoggerError {
    LoggerError::construction(
        handler_type.as_str(),
        format!("logger path '{}' doesn't exist", dir.display()),
        io::Error::new(io::ErrorKind::NotFound, format!("{} not found", dir.display())),
    )
}

impl ValidatedHandler {
    /// Open the handler's resource.
    ///
    /// # Errors
    ///
    /// Returns a construction error when the target directory is missing or
    /// the file, socket or event source cannot be opened.
    pub fn build(&self, streams: &HashMap<String, SharedStream>) -> Result<Box<dyn Appender>> {
        if let Some(dir) = self.kind.file_path().and_then(Path::parent) {
            if !dir.as_os_str().is_empty() && !dir.is_dir() {
                return Err(missing_directory(self.handler_type, dir));
            }
        }

        let appender: Box<dyn Appender> = match &self.kind {
            HandlerKind::Stream { target, colors } => {
                let appender = match target {
                    StreamTarget::Stdout => StreamAppender::stdout(),
                    StreamTarget::Stderr => StreamAppender::stderr(),
                    StreamTarget::Named(name) => {
                        let stream = streams.get(name).cloned().ok_or_else(|| {
                            LoggerError::config("stream", format!("unknown stream '{}'", name))
                        })?;
                        StreamAppender::writer(stream)
                    }
                };
                Box::new(appender.with_colors(*colors))
            }
            HandlerKind::File { path, mode, delay } => {
                Box::new(FileAppender::with_options(path.clone(), *mode, *delay)?)
            }
            HandlerKind::WatchedFile { path, mode, delay } => {
                Box::new(WatchedFileAppender::new(path.clone(), *mode, *delay)?)
            }
            HandlerKind::RotatingFile {
                path,
                mode,
                delay,
                policy,
            } => Box::new(RotatingFileAppender::with_policy(path, policy.clone(), *mode, *delay)?),
            HandlerKind::TimedRotatingFile { path, delay, policy } => {
                Box::new(TimedRotatingFileAppender::with_policy(path, policy.clone(), *delay)?)
            }
            HandlerKind::Socket { host, port } => Box::new(SocketAppender::new(host.clone(), *port)?),
            HandlerKind::Datagram { host, port } => Box::new(DatagramAppender::new(host, *port)?),
            HandlerKind::SysLog {
                address,
                facility,
                protocol,
            } => Box::new(SyslogAppender::new(address.clone(), *facility, *protocol)?),
            HandlerKind::NtEventLog {
                appname,
                dllname,
                logtype,
            } => Box::new(NtEventLogAppender::new(appname.clone(), dllname.clone(), logtype.clone())?),
            #[cfg(feature = "smtp")]
            HandlerKind::Smtp(settings) => {
                Box::new(crate::appenders::SmtpAppender::new(settings.clone())?)
            }
        };
        Ok(appender)
    }

    /// Build the appender and wrap it with level, formatter and filter
    pub fn into_handler(self, streams: &HashMap<String, SharedStream>) -> Result<Handler> {
        let appender = self.build(streams)?;
        let handler = Handler::from_boxed(appender)
            .with_level(self.level)
            .with_formatter(self.formatter);
        Ok(match self.filter {
            Some(filter) => handler.with_filter(filter),
            None => handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_streams() -> HashMap<String, SharedStream> {
        HashMap::new()
    }

    fn single(handler: HandlerConfig) -> Result<ValidatedHandler> {
        let config = LoggerConfig::new("v").with_handler(handler);
        validate(&config, &no_streams()).map(|mut logger| logger.handlers.remove(0))
    }

    #[test]
    fn test_handler_type_names_are_exact() {
        for kind in HandlerType::ALL {
            assert_eq!(kind.as_str().parse::<HandlerType>().unwrap(), kind);
        }
        assert!("streamhandler".parse::<HandlerType>().is_err());
        assert!("BogusHandler".parse::<HandlerType>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_defaults() {
        let logger = validate(&LoggerConfig::default(), &no_streams()).unwrap();
        assert_eq!(logger.level, LogLevel::Debug);
        assert_eq!(logger.name.len(), 32);
        assert!(logger.name.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!logger.propagate);

        let handler = single(HandlerConfig::new("StreamHandler")).unwrap();
        assert_eq!(handler.level, LogLevel::Debug);
        assert_eq!(handler.formatter.template(), DEFAULT_FORMAT);
        assert!(handler.filter.is_none());
        assert!(matches!(
            handler.kind,
            HandlerKind::Stream {
                target: StreamTarget::Stderr,
                colors: false
            }
        ));
    }

    #[test]
    fn test_format_falls_back_to_logger() {
        let config = LoggerConfig::new("v")
            .with_format("%(name)s: %(message)s")
            .with_handler(HandlerConfig::new("StreamHandler"))
            .with_handler(HandlerConfig::new("StreamHandler").with_format("%(message)s"));
        let logger = validate(&config, &no_streams()).unwrap();
        assert_eq!(logger.handlers[0].formatter.template(), "%(name)s: %(message)s");
        assert_eq!(logger.handlers[1].formatter.template(), "%(message)s");
    }

    #[test]
    fn test_errors_name_the_entry() {
        let config = LoggerConfig::new("v")
            .with_handler(HandlerConfig::new("StreamHandler"))
            .with_handler(HandlerConfig::new("StreamHandler").with_level("LOUD"));
        let err = validate(&config, &no_streams()).unwrap_err();
        assert!(err.to_string().contains("handlers[1].level"), "{}", err);

        let err = validate(&LoggerConfig::new("v").with_level("info"), &no_streams()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_disabled_handlers_are_not_validated() {
        let config = LoggerConfig::new("v")
            .with_handler(HandlerConfig::new("BogusHandler").with_enabled(false))
            .with_handler(HandlerConfig::new("StreamHandler"));
        let logger = validate(&config, &no_streams()).unwrap();
        assert_eq!(logger.handlers.len(), 1);
    }

    #[test]
    fn test_unknown_handler_keys() {
        let config = LoggerConfig::from_json_value(json!({
            "name": "v",
            "handlers": [
                {"type": "StreamHandler", "enabled": false, "colour": "red"},
                {"type": "StreamHandler"}
            ]
        }))
        .unwrap();
        assert_eq!(validate(&config, &no_streams()).unwrap().handlers.len(), 1);

        let config = LoggerConfig::from_json_value(json!({
            "name": "v",
            "handlers": [{"type": "StreamHandler"}, {"type": "StreamHandler", "colour": "red"}]
        }))
        .unwrap();
        let err = validate(&config, &no_streams()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("handlers[1].colour"), "{}", err);
    }

    #[test]
    fn test_file_path_composition() {
        let handler = single(HandlerConfig::default().with_path("/var/log").with_filename("app.log")).unwrap();
        assert_eq!(handler.handler_type, HandlerType::File);
        assert_eq!(handler.kind.file_path(), Some(Path::new("/var/log/app.log")));

        let handler = single(HandlerConfig::new("FileHandler").with_path("/var/log")).unwrap();
        let name = handler.kind.file_path().unwrap().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".log") && name.len() == 36, "{}", name);

        let handler = single(HandlerConfig::new("FileHandler").with_arg("/tmp/explicit.log")).unwrap();
        assert_eq!(handler.kind.file_path(), Some(Path::new("/tmp/explicit.log")));

        let err = single(HandlerConfig::new("FileHandler")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_rotating_arguments() {
        let handler = single(
            HandlerConfig::new("RotatingFileHandler")
                .with_path("/tmp")
                .with_kwarg("maxBytes", 1024)
                .with_kwarg("backupCount", 3),
        )
        .unwrap();
        match handler.kind {
            HandlerKind::RotatingFile { policy, .. } => {
                assert_eq!(policy.max_bytes, 1024);
                assert_eq!(policy.backup_count, 3);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let err = single(HandlerConfig::new("RotatingFileHandler").with_path("/tmp").with_kwarg("maxSize", 1)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_timed_rotating_arguments() {
        let handler = single(
            HandlerConfig::new("TimedRotatingFileHandler")
                .with_path("/tmp")
                .with_kwarg("when", "midnight")
                .with_kwarg("atTime", "03:30"),
        )
        .unwrap();
        match handler.kind {
            HandlerKind::TimedRotatingFile { policy, .. } => {
                assert_eq!(policy.when, When::Midnight);
                assert_eq!(policy.at_time, NaiveTime::from_hms_opt(3, 30, 0));
            }
            other => panic!("unexpected kind {:?}", other),
        }

        for (key, value) in [
            ("interval", json!(0)),
            ("interval", json!(4_000_000_000u64)),
            ("when", json!("fortnight")),
            ("atTime", json!("25:00")),
        ] {
            let err = single(HandlerConfig::new("TimedRotatingFileHandler").with_path("/tmp").with_kwarg(key, value))
                .unwrap_err();
            assert!(err.is_configuration(), "{}", key);
        }
    }

    #[test]
    fn test_timed_rotating_period_bound() {
        let err = single(
            HandlerConfig::new("TimedRotatingFileHandler")
                .with_path("/tmp")
                .with_kwarg("when", "D")
                .with_kwarg("interval", 4_000_000_000u64),
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("interval"));

        let weekly = single(
            HandlerConfig::new("TimedRotatingFileHandler")
                .with_path("/tmp")
                .with_kwarg("when", "W3")
                .with_kwarg("interval", 4_000_000_000u64),
        );
        assert!(weekly.is_ok());

        let century = single(
            HandlerConfig::new("TimedRotatingFileHandler")
                .with_path("/tmp")
                .with_kwarg("when", "D")
                .with_kwarg("interval", 36_500),
        );
        assert!(century.is_ok());
    }

    #[test]
    fn test_network_defaults_and_overrides() {
        let handler = single(HandlerConfig::new("SocketHandler")).unwrap();
        assert!(matches!(handler.kind, HandlerKind::Socket { ref host, port: 9020 } if host == "localhost"));

        let handler = single(HandlerConfig::new("DatagramHandler").with_arg("10.1.1.1")).unwrap();
        assert!(matches!(handler.kind, HandlerKind::Datagram { ref host, port: 9021 } if host == "10.1.1.1"));

        let err = single(HandlerConfig::new("SocketHandler").with_kwarg("port", 70000)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_syslog_arguments() {
        let handler = single(HandlerConfig::new("SysLogHandler")).unwrap();
        match handler.kind {
            HandlerKind::SysLog { address, facility, protocol } => {
                assert_eq!(address, SyslogAddress::default());
                assert_eq!(facility, Facility::USER);
                assert_eq!(protocol, Protocol::Tcp);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let handler = single(
            HandlerConfig::new("SysLogHandler")
                .with_arg("/dev/log")
                .with_arg(16)
                .with_proto("UDP"),
        )
        .unwrap();
        match handler.kind {
            HandlerKind::SysLog { address, facility, protocol } => {
                assert_eq!(address, SyslogAddress::Unix(PathBuf::from("/dev/log")));
                assert_eq!(facility, Facility::LOCAL0);
                assert_eq!(protocol, Protocol::Udp);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let err = single(HandlerConfig::new("SysLogHandler").with_proto("SCTP")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_event_log_requires_appname() {
        assert!(single(HandlerConfig::new("NTEventLogHandler")).unwrap_err().is_configuration());
        let handler = single(HandlerConfig::new("NTEventLogHandler").with_arg("svc")).unwrap();
        assert!(matches!(handler.kind, HandlerKind::NtEventLog { ref logtype, .. } if logtype == "Application"));
    }

    #[cfg(feature = "smtp")]
    #[test]
    fn test_smtp_arguments() {
        let handler = single(
            HandlerConfig::new("SMTPHandler")
                .with_arg(json!(["mail.example.com", 2525]))
                .with_arg("logger@example.com")
                .with_arg("ops@example.com")
                .with_arg("Alert")
                .with_kwarg("credentials", json!(["user", "pw"]))
                .with_kwarg("secure", json!([])),
        )
        .unwrap();
        match handler.kind {
            HandlerKind::Smtp(settings) => {
                assert_eq!(settings.host, "mail.example.com");
                assert_eq!(settings.port, 2525);
                assert_eq!(settings.to.len(), 1);
                assert!(settings.secure);
                assert_eq!(settings.timeout, Duration::from_secs(1));
            }
            other => panic!("unexpected kind {:?}", other),
        }

        let err = single(HandlerConfig::new("SMTPHandler").with_arg("mail.example.com")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_filters() {
        let handler = single(HandlerConfig::new("StreamHandler").with_filter("svc.a").with_filter("svc.b")).unwrap();
        assert_eq!(handler.filter.unwrap().names(), ["svc.a", "svc.b"]);

        let err = single(HandlerConfig::new("StreamHandler").with_filter("")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_encoding_and_mode() {
        let err = single(HandlerConfig::new("FileHandler").with_path("/tmp").with_kwarg("encoding", "latin-1")).unwrap_err();
        assert!(err.is_configuration());
        let err = single(HandlerConfig::new("FileHandler").with_path("/tmp").with_kwarg("mode", "r")).unwrap_err();
        assert!(err.is_configuration());
        let handler = single(HandlerConfig::new("FileHandler").with_path("/tmp").with_kwarg("mode", "w")).unwrap();
        assert!(matches!(handler.kind, HandlerKind::File { mode: FileMode::Truncate, .. }));
    }

    #[test]
    fn test_build_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let handler = single(HandlerConfig::new("FileHandler").with_path(missing.to_string_lossy())).unwrap();

        let err = handler.build(&no_streams()).err().unwrap();
        assert!(err.is_construction());
        assert!(err.to_string().contains("doesn't exist"), "{}", err);
        assert!(!missing.exists());
    }

    #[test]
    fn test_into_handler_applies_settings() {
        let dir = tempfile::tempdir().unwrap();
        let handler = single(
            HandlerConfig::new("FileHandler")
                .with_path(dir.path().to_string_lossy())
                .with_filename("out.log")
                .with_level("ERROR")
                .with_filter("v"),
        )
        .unwrap()
        .into_handler(&no_streams())
        .unwrap();

        assert_eq!(handler.kind(), "FileHandler");
        assert_eq!(handler.level(), LogLevel::Error);
        assert_eq!(handler.filters().len(), 1);
        assert!(dir.path().join("out.log").exists());
    }
}
