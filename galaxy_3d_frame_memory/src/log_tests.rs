//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and the global logger switch.
//! Tests that replace the global logger are marked #[serial].

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "galaxy3d::RingBuffer".to_string(),
        message: "Immediate VBO grown to 4096 bytes".to_string(),
        file,
        line,
    }
}

/// Logger that keeps the entries tagged "galaxy3d::test"
///
/// Other tests log concurrently through the same global logger,
/// so anything from another source is ignored.
#[derive(Clone, Default)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source == "galaxy3d::test" {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify it doesn't panic
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("ring_buffer.rs"), Some(42)));
    }
}

#[test]
fn test_format_plain_without_location() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[galaxy3d::RingBuffer]"));
    assert!(text.ends_with("Immediate VBO grown to 4096 bytes"));
}

#[test]
fn test_format_plain_with_location() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("ring_buffer.rs"), Some(7)));
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("(ring_buffer.rs:7)"));
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_receives_macro_output() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    crate::engine_info!("galaxy3d::test", "created {} slots", 3);
    crate::engine_error!("galaxy3d::test", "allocation failed");

    log::reset_logger();

    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "created 3 slots");
    assert!(entries[0].file.is_none());
    assert_eq!(entries[1].severity, LogSeverity::Error);
    assert!(entries[1].file.is_some());
    assert!(entries[1].line.is_some());
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());
    log::set_min_severity(LogSeverity::Warn);

    crate::engine_debug!("galaxy3d::test", "dropped");
    crate::engine_info!("galaxy3d::test", "dropped too");
    crate::engine_warn!("galaxy3d::test", "kept");

    log::set_min_severity(LogSeverity::Debug);
    log::reset_logger();

    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "kept");
}

#[test]
#[serial]
fn test_trace_disabled_by_default() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    assert_eq!(log::min_severity(), LogSeverity::Debug);
    assert!(!log::enabled(LogSeverity::Trace));
    crate::engine_trace!("galaxy3d::test", "upload of {} bytes", 64);

    log::reset_logger();
    assert!(capture.entries.lock().unwrap().is_empty());
}

#[test]
#[serial]
fn test_engine_err_logs_once() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    let _ = crate::engine_err!("galaxy3d::test", "fence wait failed");

    log::reset_logger();

    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].message, "fence wait failed");
}
