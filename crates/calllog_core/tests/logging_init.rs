use calllog_core::{init_logging, logging_status, LoggingConfig, LoggingError};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

// The logger is process-global; its directory must outlive the test.
fn unique_log_dir(suffix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "calllog-logging-{suffix}-{}-{nanos}",
        std::process::id()
    ))
}

#[test]
fn init_logging_is_idempotent_and_rejects_conflicts() {
    let first = unique_log_dir("active");
    let second = unique_log_dir("other");
    let config = LoggingConfig::new("info", &first);

    init_logging(&config).unwrap();
    init_logging(&config).unwrap();
    assert!(first.is_dir());

    let level_err = init_logging(&LoggingConfig::new("debug", &first)).unwrap_err();
    assert!(matches!(level_err, LoggingError::AlreadyInitialized { .. }));

    let dir_err = init_logging(&LoggingConfig::new("info", &second)).unwrap_err();
    assert!(matches!(dir_err, LoggingError::AlreadyInitialized { .. }));

    let (level, dir) = logging_status().unwrap();
    assert_eq!(level, "info");
    assert_eq!(dir, first);
}
