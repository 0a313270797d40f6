//! Logging macros for ergonomic log message formatting.
//!
//! These macros format like `format!` and also record where the call was
//! made, so templates can use `%(filename)s`, `%(lineno)d` and
//! `%(funcName)s`.
//!
//! # Examples
//!
//! ```
//! use rust_logutils::core::{LoggerRegistry, Registry};
//! use rust_logutils::info;
//!
//! let registry = Registry::new();
//! let logger = registry.lookup_or_create("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Name of the enclosing function, closures stripped
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        let name = name.trim_end_matches("::{{closure}}");
        match name.rfind("::") {
            Some(idx) => &name[idx + 2..],
            None => name,
        }
    }};
}

/// Log a message at the given level.
///
/// # Examples
///
/// ```
/// # use rust_logutils::core::Logger;
/// # let logger = Logger::new("app");
/// use rust_logutils::{log, LogLevel};
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at(
            $level,
            format!($($arg)+),
            $crate::core::Location {
                file: file!(),
                line: line!(),
                module_path: module_path!(),
                function: $crate::__function_name!(),
            },
        )
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_logutils::core::Logger;
/// # let logger = Logger::new("disk");
/// use rust_logutils::warning;
/// warning!(logger, "Low disk space");
/// warning!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::appenders::{SharedBuffer, StreamAppender};
    use crate::core::{Formatter, Handler, LogLevel, Logger};
    use std::sync::Arc;

    fn capture(template: &str) -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::new("macros");
        logger.set_level(LogLevel::Debug);
        logger.add_handler(Arc::new(
            Handler::new(StreamAppender::shared(buffer.clone()))
                .with_formatter(Formatter::new(template).unwrap()),
        ));
        (logger, buffer)
    }

    #[test]
    fn test_macros_format_arguments() {
        let (logger, buffer) = capture("%(levelname)s %(message)s");
        info!(logger, "listening on {}", 8080);
        critical!(logger, "down");
        assert_eq!(buffer.lines(), vec!["INFO listening on 8080", "CRITICAL down"]);
    }

    #[test]
    fn test_macros_capture_call_site() {
        let (logger, buffer) = capture("%(funcName)s|%(filename)s|%(module)s");
        warning!(logger, "here");
        let line = buffer.contents();
        assert!(line.starts_with("test_macros_capture_call_site|macros.rs|"), "{}", line);
    }

    #[test]
    fn test_function_name_inside_closure() {
        let name = (|| crate::__function_name!())();
        assert_eq!(name, "test_function_name_inside_closure");
    }
}
