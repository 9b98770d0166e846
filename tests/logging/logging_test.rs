//! Tests for `src/logging.rs`.

use aria::logging::{self, LoggingGuard, LOG_FILE_PREFIX};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("nested").join("logs");
    assert!(!logs_dir.exists());

    // The global subscriber can only be installed once per process, so the
    // result may be an error; the directory is created either way.
    let _result = logging::init_production(&logs_dir, "info");
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_is_idempotent() {
    logging::init_cli("debug");
    logging::init_cli("warn");
}

#[test]
fn log_files_carry_the_crate_prefix() {
    assert!(LOG_FILE_PREFIX.starts_with("aria"));
}
