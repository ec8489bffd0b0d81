//! Integration tests for configuration loading

use callgate::config::{ConfigLoader, GateConfig};
use callgate::sensor::UpdatePriority;
use tempfile::TempDir;

#[test]
fn test_full_file_round_trips_every_section() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("callgate.toml");
    std::fs::write(
        &path,
        r#"
[session]
connect_timeout_ms = 1000
location_timeout_ms = 2000
update_interval_ms = 30000
update_priority = "low_power"

[queue]
max_pending = 42

[logging]
level = "debug"
format = "json"
output = "stdout"

[logging.modules]
"callgate::queue" = "trace"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.session.connect_timeout_ms, 1000);
    assert_eq!(config.session.update_request().interval.as_secs(), 30);
    assert_eq!(config.session.update_priority, UpdatePriority::LowPower);
    assert_eq!(config.queue.max_pending, 42);
    assert_eq!(config.logging.format, "json");
    assert_eq!(
        config.logging.modules.get("callgate::queue").map(String::as_str),
        Some("trace")
    );
}

#[test]
fn test_empty_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.toml");
    std::fs::write(&path, "").unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config, GateConfig::default());
}

#[test]
fn test_unknown_priority_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "[session]\nupdate_priority = \"turbo\"\n").unwrap();

    assert!(ConfigLoader::load_from_file(&path).is_err());
}

#[test]
fn test_invalid_log_format_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad_log.toml");
    std::fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Logging"));
}
