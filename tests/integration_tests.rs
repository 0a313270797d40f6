//! Integration tests for the configuration layer
//!
//! These tests verify:
//! - Level, enabled and propagate settings of resolved loggers
//! - Handler thresholds, formats and name filters
//! - File, rotating file, socket, datagram and syslog handlers end to end
//! - Rollback when a handler cannot be constructed
//! - Teardown and reuse of a logger

use rust_logutils::appenders::SharedBuffer;
use rust_logutils::prelude::*;
use rust_logutils::DEFAULT_FORMAT;
use serde_json::json;
use std::fs;
use std::io::Read;
use std::net::{TcpListener, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn resolver() -> Resolver {
    Resolver::with_registry(Arc::new(Registry::new()))
}

fn capture_handler(stream: &str) -> HandlerConfig {
    HandlerConfig::new("StreamHandler")
        .with_arg(stream)
        .with_format("%(name)s [%(levelname)s] %(message)s")
}

fn file_handler(dir: &TempDir, filename: &str) -> HandlerConfig {
    HandlerConfig::new("FileHandler")
        .with_path(dir.path().to_string_lossy())
        .with_filename(filename)
        .with_format("%(levelname)s %(message)s")
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    listener.local_addr().expect("No local address").port()
}

// ============================================================================
// Logger settings
// ============================================================================

#[test]
fn test_level_threshold_end_to_end() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let config = LoggerConfig::from_json_value(json!({
        "name": "t1",
        "level": "INFO",
        "handlers": [{"type": "StreamHandler", "level": "WARNING", "args": ["capture"]}]
    }))
    .expect("Failed to parse config");

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");

    assert_eq!(logger.effective_level(), LogLevel::Info);
    let handlers = logger.handlers();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].level(), LogLevel::Warning);

    logger.info("quiet message");
    assert!(output.contents().is_empty());

    logger.error("loud message");
    assert!(output.contents().contains("loud message"));
}

#[test]
fn test_disabled_logger_emits_nothing() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let config = LoggerConfig::new("muted")
        .with_enabled(false)
        .with_handler(capture_handler("capture"));

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");
    for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error, LogLevel::Critical] {
        logger.log(level, "should not appear");
    }

    assert!(output.contents().is_empty());
    assert_eq!(logger.handlers().len(), 1);
}

#[test]
fn test_disabled_parent_ignores_propagated_records() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let parent = LoggerConfig::new("t1")
        .with_enabled(false)
        .with_handler(capture_handler("capture"));
    resolver.create_logger(&parent, None).expect("Failed to create parent");

    let child = resolver
        .create_logger(&LoggerConfig::new("t1.child").with_level("DEBUG").with_propagate(true), None)
        .expect("Failed to create child");
    child.critical("must not reach the disabled parent");

    assert!(output.contents().is_empty());
}

#[test]
fn test_disabled_handler_is_not_attached() {
    let resolver = resolver().with_stream("capture", SharedBuffer::new());
    let config = LoggerConfig::new("partial")
        .with_handler(capture_handler("capture").with_enabled(false))
        .with_handler(capture_handler("capture"))
        .with_handler(HandlerConfig::new("SocketHandler").with_enabled(false));

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");
    assert_eq!(logger.handlers().len(), 1);
    assert_eq!(logger.handlers()[0].kind(), "StreamHandler");
}

#[test]
fn test_disabled_handler_with_unknown_key_is_ignored() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let config = LoggerConfig::from_json_value(json!({
        "name": "lenient",
        "handlers": [
            {"type": "StreamHandler", "enabled": false, "retries": 3},
            {"type": "StreamHandler", "args": ["capture"], "format": "%(message)s"}
        ]
    }))
    .expect("Failed to parse config");

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");
    logger.info("kept");
    assert_eq!(output.contents(), "kept\n");
    assert_eq!(logger.handlers().len(), 1);
}

#[test]
fn test_default_format_when_omitted_everywhere() {
    let resolver = resolver().with_stream("capture", SharedBuffer::new());
    let config = LoggerConfig::new("fmt").with_handler(HandlerConfig::new("StreamHandler").with_arg("capture"));

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");
    assert_eq!(logger.handlers()[0].formatter().template(), DEFAULT_FORMAT);
}

#[test]
fn test_default_format_renders_function_name() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let config = LoggerConfig::new("fmt.fn").with_handler(HandlerConfig::new("StreamHandler").with_arg("capture"));

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");
    rust_logutils::warning!(logger, "with location");

    let line = output.contents();
    assert!(
        line.contains("fmt.fn - test_default_format_renders_function_name [WARNING]: with location"),
        "{}",
        line
    );
}

#[test]
fn test_unrecognized_type_attaches_nothing() {
    let resolver = resolver();
    let config = LoggerConfig::new("bogus")
        .with_handler(HandlerConfig::new("StreamHandler"))
        .with_handler(HandlerConfig::new("BogusHandler"));

    let err = resolver.create_logger(&config, None).expect_err("Bogus type must fail");
    assert!(err.is_configuration());
    assert!(err.to_string().contains("BogusHandler"));
    assert!(resolver.registry().lookup("bogus").is_none());
}

#[test]
fn test_unknown_severity_name_fails() {
    let resolver = resolver();
    for level in ["VERBOSE", "info", "OFF"] {
        let err = resolver
            .create_logger(&LoggerConfig::new("lvl").with_level(level), None)
            .expect_err("Unknown level must fail");
        assert!(err.is_configuration(), "{}: {}", level, err);
    }
}

// ============================================================================
// Filters and propagation
// ============================================================================

#[test]
fn test_filtered_handler_only_sees_matching_loggers() {
    let first = SharedBuffer::new();
    let second = SharedBuffer::new();
    let resolver = resolver()
        .with_stream("first", first.clone())
        .with_stream("second", second.clone());
    let config = LoggerConfig::new("moduleB.sub")
        .with_handler(capture_handler("first"))
        .with_handler(capture_handler("second").with_filter("moduleA"));

    let logger = resolver.create_logger(&config, None).expect("Failed to create logger");
    logger.warning("only first");

    assert_eq!(first.lines(), vec!["moduleB.sub [WARNING] only first"]);
    assert!(second.contents().is_empty());
}

#[test]
fn test_filters_match_propagated_record_names() {
    let all = SharedBuffer::new();
    let api_only = SharedBuffer::new();
    let resolver = resolver()
        .with_stream("all", all.clone())
        .with_stream("api", api_only.clone());
    let config = LoggerConfig::new("svc")
        .with_handler(capture_handler("all"))
        .with_handler(capture_handler("api").with_filter("svc.api"));
    resolver.create_logger(&config, None).expect("Failed to create logger");

    let api = resolver.registry().lookup_or_create("svc.api.v2");
    let db = resolver.registry().lookup_or_create("svc.db");
    api.info("request");
    db.info("query");

    assert_eq!(all.lines(), vec!["svc.api.v2 [INFO] request", "svc.db [INFO] query"]);
    assert_eq!(api_only.lines(), vec!["svc.api.v2 [INFO] request"]);
}

#[test]
fn test_propagate_flag_controls_ancestor_output() {
    let parent_out = SharedBuffer::new();
    let child_out = SharedBuffer::new();
    let resolver = resolver()
        .with_stream("parent", parent_out.clone())
        .with_stream("child", child_out.clone());

    resolver
        .create_logger(&LoggerConfig::new("app").with_handler(capture_handler("parent")), None)
        .expect("Failed to create parent");
    let child = resolver
        .create_logger(&LoggerConfig::new("app.worker").with_handler(capture_handler("child")), None)
        .expect("Failed to create child");

    child.info("isolated");
    assert!(parent_out.contents().is_empty());

    resolver
        .create_logger(
            &LoggerConfig::new("app.worker").with_propagate(true),
            Some(&child),
        )
        .expect("Failed to reconfigure child");
    child.info("shared");

    assert_eq!(parent_out.lines(), vec!["app.worker [INFO] shared"]);
    assert_eq!(child_out.lines().len(), 2);
}

// ============================================================================
// File handlers
// ============================================================================

#[test]
fn test_file_handler_writes_composed_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig::new("files").with_handler(file_handler(&temp_dir, "app.log"));

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.info("first");
    logger.error("second");
    close_logger(&logger);

    let content = fs::read_to_string(temp_dir.path().join("app.log")).expect("Failed to read log file");
    assert_eq!(content, "INFO first\nERROR second\n");
}

#[test]
fn test_file_handler_generates_filename() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig::new("generated")
        .with_handler(HandlerConfig::default().with_path(temp_dir.path().to_string_lossy()));

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.info("hello");
    close_logger(&logger);

    let entries: Vec<_> = fs::read_dir(temp_dir.path())
        .expect("Failed to list dir")
        .map(|entry| entry.expect("bad entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ends_with(".log"));
    assert_eq!(entries[0].len(), 36);
}

#[test]
fn test_file_handler_without_path_is_a_configuration_error() {
    let err = resolver()
        .create_logger(&LoggerConfig::new("nopath").with_handler(HandlerConfig::new("FileHandler")), None)
        .expect_err("Missing path must fail");
    assert!(err.is_configuration());
}

#[test]
fn test_rotating_file_handler_keeps_backups() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig::new("rotating").with_handler(
        HandlerConfig::new("RotatingFileHandler")
            .with_path(temp_dir.path().to_string_lossy())
            .with_filename("rot.log")
            .with_format("%(message)s")
            .with_kwarg("maxBytes", 64)
            .with_kwarg("backupCount", 2),
    );

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    for i in 0..20 {
        logger.info(format!("rotating message number {:02}", i));
    }
    close_logger(&logger);

    let base = temp_dir.path().join("rot.log");
    assert!(base.exists());
    assert!(temp_dir.path().join("rot.log.1").exists());
    assert!(temp_dir.path().join("rot.log.2").exists());
    assert!(!temp_dir.path().join("rot.log.3").exists());
    let current = fs::read_to_string(&base).expect("Failed to read log file");
    assert!(current.contains("number 19"));
}

#[test]
fn test_rotating_file_handler_without_backups_keeps_all_records() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig::new("nobackup").with_handler(
        HandlerConfig::new("RotatingFileHandler")
            .with_path(temp_dir.path().to_string_lossy())
            .with_filename("grow.log")
            .with_format("%(message)s")
            .with_kwarg("maxBytes", 20),
    );

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    for i in 0..5 {
        logger.info(format!("record {}", i));
    }
    close_logger(&logger);

    let content = fs::read_to_string(temp_dir.path().join("grow.log")).expect("Failed to read log file");
    assert_eq!(content.lines().count(), 5);
    assert!(content.starts_with("record 0\n"));
    assert!(!temp_dir.path().join("grow.log.1").exists());
}

#[test]
fn test_timed_rotating_file_handler_writes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig::from_json_value(json!({
        "name": "timed",
        "handlers": [{
            "type": "TimedRotatingFileHandler",
            "path": temp_dir.path().to_string_lossy(),
            "filename": "timed.log",
            "format": "%(message)s",
            "handler_kwargs": {"when": "midnight", "backupCount": 7}
        }]
    }))
    .expect("Failed to parse config");

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.info("tick");
    close_logger(&logger);

    let content = fs::read_to_string(temp_dir.path().join("timed.log")).expect("Failed to read log file");
    assert_eq!(content, "tick\n");
}

#[cfg(unix)]
#[test]
fn test_watched_file_handler_reopens_removed_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("watched.log");
    let config = LoggerConfig::new("watched").with_handler(
        HandlerConfig::new("WatchedFileHandler")
            .with_arg(path.to_string_lossy())
            .with_format("%(message)s"),
    );

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.info("before");
    fs::remove_file(&path).expect("Failed to remove log file");
    logger.info("after");
    close_logger(&logger);

    assert_eq!(fs::read_to_string(&path).expect("Failed to read log file"), "after\n");
}

#[test]
fn test_missing_directory_rolls_back() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let resolver = resolver();
    let config = LoggerConfig::new("rollback")
        .with_level("ERROR")
        .with_handler(file_handler(&temp_dir, "first.log"))
        .with_handler(HandlerConfig::new("FileHandler").with_path(temp_dir.path().join("absent").to_string_lossy()));

    let err = resolver.create_logger(&config, None).expect_err("Missing directory must fail");
    assert!(err.is_construction());
    assert!(err.to_string().contains("doesn't exist"));
    assert!(resolver.registry().lookup("rollback").is_none());
}

#[test]
fn test_failed_augmentation_keeps_existing_logger() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let resolver = resolver();
    let logger = resolver
        .create_logger(&LoggerConfig::new("stable").with_level("INFO").with_handler(file_handler(&temp_dir, "a.log")), None)
        .expect("Failed to create logger");

    let config = LoggerConfig::new("stable")
        .with_level("DEBUG")
        .with_handler(file_handler(&temp_dir, "b.log"))
        .with_handler(HandlerConfig::new("SocketHandler").with_arg("127.0.0.1").with_arg(closed_port()));
    let err = resolver.create_logger(&config, Some(&logger)).expect_err("Refused connection must fail");

    assert!(err.is_construction());
    assert_eq!(logger.level(), LogLevel::Info);
    assert_eq!(logger.handlers().len(), 1);
}

// ============================================================================
// Network handlers
// ============================================================================

fn read_frame(stream: &mut impl Read) -> serde_json::Value {
    let mut length = [0u8; 4];
    stream.read_exact(&mut length).expect("Failed to read frame length");
    let mut body = vec![0u8; u32::from_be_bytes(length) as usize];
    stream.read_exact(&mut body).expect("Failed to read frame body");
    serde_json::from_slice(&body).expect("Frame is not JSON")
}

#[test]
fn test_socket_handler_sends_length_prefixed_json() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let port = listener.local_addr().expect("No local address").port();
    let config = LoggerConfig::new("net.tcp")
        .with_handler(HandlerConfig::new("SocketHandler").with_arg("127.0.0.1").with_arg(port));

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    let (mut peer, _) = listener.accept().expect("Failed to accept");
    peer.set_read_timeout(Some(Duration::from_secs(5))).expect("Failed to set timeout");

    logger.error("over tcp");
    let frame = read_frame(&mut peer);
    close_logger(&logger);

    assert_eq!(frame["name"], "net.tcp");
    assert_eq!(frame["msg"], "over tcp");
    assert_eq!(frame["levelname"], "ERROR");
    assert_eq!(frame["levelno"], 40);
}

#[test]
fn test_datagram_handler_sends_frames() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind peer");
    peer.set_read_timeout(Some(Duration::from_secs(5))).expect("Failed to set timeout");
    let port = peer.local_addr().expect("No local address").port();
    let config = LoggerConfig::new("net.udp").with_handler(
        HandlerConfig::new("DatagramHandler")
            .with_kwarg("host", "127.0.0.1")
            .with_kwarg("port", port),
    );

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.warning("over udp");

    let mut buf = [0u8; 4096];
    let received = peer.recv(&mut buf).expect("Failed to receive datagram");
    let frame = read_frame(&mut &buf[..received]);
    assert_eq!(frame["msg"], "over udp");
    assert_eq!(frame["levelname"], "WARNING");
    close_logger(&logger);
}

#[test]
fn test_syslog_handler_over_udp() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind peer");
    peer.set_read_timeout(Some(Duration::from_secs(5))).expect("Failed to set timeout");
    let port = peer.local_addr().expect("No local address").port();
    let config = LoggerConfig::from_json_value(json!({
        "name": "sys",
        "handlers": [{
            "type": "SysLogHandler",
            "proto": "UDP",
            "format": "%(name)s: %(message)s",
            "args": [["127.0.0.1", port], "local0"]
        }]
    }))
    .expect("Failed to parse config");

    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.info("daemon message");

    let mut buf = [0u8; 1024];
    let received = peer.recv(&mut buf).expect("Failed to receive datagram");
    assert_eq!(&buf[..received], b"<134>sys: daemon message\0");
    close_logger(&logger);
}

#[test]
fn test_syslog_handler_rejects_unknown_protocol() {
    let config = LoggerConfig::new("sys.bad").with_handler(HandlerConfig::new("SysLogHandler").with_proto("QUIC"));
    let err = resolver().create_logger(&config, None).expect_err("Unknown proto must fail");
    assert!(err.is_configuration());
}

#[cfg(not(windows))]
#[test]
fn test_event_log_handler_is_unsupported_off_windows() {
    let config = LoggerConfig::new("evt").with_handler(HandlerConfig::new("NTEventLogHandler").with_arg("svc"));
    let err = resolver().create_logger(&config, None).expect_err("Event log needs Windows");
    assert!(err.is_construction());
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_close_logger_twice() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let logger = resolver
        .create_logger(&LoggerConfig::new("closing").with_handler(capture_handler("capture")), None)
        .expect("Failed to create logger");

    close_logger(&logger);
    assert!(logger.handlers().is_empty());
    close_logger(&logger);
    assert!(logger.handlers().is_empty());

    logger.critical("dropped");
    assert!(output.contents().is_empty());
}

#[test]
fn test_closed_logger_can_be_reconfigured() {
    let output = SharedBuffer::new();
    let resolver = resolver().with_stream("capture", output.clone());
    let logger = resolver
        .create_logger(&LoggerConfig::new("reuse").with_handler(capture_handler("capture")), None)
        .expect("Failed to create logger");
    close_logger(&logger);

    let again = resolver
        .create_logger(&LoggerConfig::new("reuse").with_handler(capture_handler("capture")), Some(&logger))
        .expect("Failed to reconfigure logger");
    assert!(Arc::ptr_eq(&logger, &again));

    logger.info("back");
    assert_eq!(output.lines(), vec!["reuse [INFO] back"]);
}

// ============================================================================
// Documents and threads
// ============================================================================

#[test]
fn test_toml_document_from_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let doc = temp_dir.path().join("logging.toml");
    fs::write(
        &doc,
        format!(
            r#"
name = "from.toml"
level = "WARNING"
format = "%(levelname)s|%(message)s"

[[handlers]]
type = "FileHandler"
path = "{}"
filename = "toml.log"
"#,
            temp_dir.path().display()
        ),
    )
    .expect("Failed to write document");

    let config = LoggerConfig::from_path(&doc).expect("Failed to load document");
    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");
    logger.info("skipped");
    logger.warning("kept");
    close_logger(&logger);

    let content = fs::read_to_string(temp_dir.path().join("toml.log")).expect("Failed to read log file");
    assert_eq!(content, "WARNING|kept\n");
}

#[test]
fn test_concurrent_emission_to_one_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig::new("threads").with_handler(file_handler(&temp_dir, "threads.log"));
    let logger = resolver().create_logger(&config, None).expect("Failed to create logger");

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..50 {
                    logger.info(format!("worker {} message {}", worker, i));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("Worker panicked");
    }
    close_logger(&logger);

    let content = fs::read_to_string(temp_dir.path().join("threads.log")).expect("Failed to read log file");
    assert_eq!(content.lines().count(), 200);
    assert!(content.lines().all(|line| line.starts_with("INFO worker ")));
}
