//! Integration tests for configuration loading

use shipment_tracker::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "test-site"

[server]
bind_address = "127.0.0.1"
port = 9090

[tracking]
max_code_attempts = 4

[metrics]
interval_secs = 15
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "test-site");
    assert_eq!(config.bind_address(), "127.0.0.1");
    assert_eq!(config.port(), 9090);
    assert_eq!(config.max_code_attempts(), 4);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server]\nport = 8181\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.port(), 8181);
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.site_id(), "shipments");
    assert_eq!(config.max_code_attempts(), 16);
    assert_eq!(config.metrics_interval_secs(), 30);
}

#[test]
fn test_zero_metrics_interval_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[metrics]\ninterval_secs = 0\n").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("interval_secs"));
}

#[test]
fn test_malformed_toml_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server\nport = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.port(), 8080);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_explicit_path_wins() {
    assert_eq!(Config::resolve_config_path(Some("custom.toml")), "custom.toml");
}
