//! Configuration document
//!
//! The document is plain data: it is deserialized from JSON or TOML (or
//! built in code) and only checked when it is resolved. Unknown logger keys
//! are rejected at deserialization time. Unknown handler keys are kept aside
//! and rejected when the handler is resolved, so a disabled handler never
//! fails the document.
//!
//! ```json
//! {
//!     "name": "svc",
//!     "level": "INFO",
//!     "handlers": [
//!         {"type": "StreamHandler", "level": "WARNING"},
//!         {"type": "RotatingFileHandler", "path": "/var/log", "filename": "svc.log",
//!          "handler_kwargs": {"maxBytes": 1048576, "backupCount": 3}}
//!     ]
//! }
//! ```

use crate::core::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

fn default_enabled() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A logger and the handlers to attach to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Logger name; a unique token is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Severity name, `DEBUG` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default = "default_enabled", skip_serializing_if = "is_true")]
    pub enabled: bool,
    #[serde(default)]
    pub propagate: bool,
    /// Template for handlers that do not set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// strftime layout for `%(asctime)s`, inherited like `format`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<HandlerConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: None,
            level: None,
            enabled: true,
            propagate: false,
            format: None,
            datefmt: None,
            handlers: Vec::new(),
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON document
    ///
    /// # Errors
    ///
    /// Returns a JSON error (a configuration error) for malformed input or
    /// unknown logger keys
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Load a `.json` or `.toml` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "read logger configuration",
                format!("cannot read '{}'", path.display()),
                e,
            )
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("toml") => Self::from_toml_str(&text),
            _ => Err(LoggerError::config(
                "document",
                format!("cannot tell the format of '{}', expected .json or .toml", path.display()),
            )),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_handler(mut self, handler: HandlerConfig) -> Self {
        self.handlers.push(handler);
        self
    }
}

/// One output sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Handler kind, `FileHandler` when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default = "default_enabled", skip_serializing_if = "is_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,
    /// Logger-name prefixes; records from other loggers are dropped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    /// Directory of the log file for file kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub handler_kwargs: Map<String, Value>,
    /// `TCP` or `UDP` for syslog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    /// Keys this schema does not know; an error once the handler is enabled
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub unrecognized: Map<String, Value>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            kind: None,
            level: None,
            enabled: true,
            format: None,
            datefmt: None,
            filters: Vec::new(),
            path: None,
            filename: None,
            args: Vec::new(),
            handler_kwargs: Map::new(),
            proto: None,
            unrecognized: Map::new(),
        }
    }
}

impl HandlerConfig {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filter(mut self, prefix: impl Into<String>) -> Self {
        self.filters.push(prefix.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.handler_kwargs.insert(name.into(), value.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = Some(proto.into());
        self
    }
}
