//! Configuration resolution tests
//!
//! Covers:
//! - TOML parsing (full, partial, malformed)
//! - Priority order: overrides > TOML file > built-in defaults
//! - Validation of values the playback core cannot use
//! - Missing explicit config file is an error

use std::io::Write;
use std::path::Path;
use std::time::Duration;
use syncloop_common::config::{Settings, SettingsOverrides, TomlConfig};
use syncloop_common::Error;

const FULL_CONFIG: &str = r#"
round_to_secs = 30.0
drift_tolerance_ms = 5.0
buffer_frames = 512
monitor_interval_ms = 250
device = "USB Audio"

[logging]
level = "debug"
"#;

#[test]
fn test_parse_full_config() {
    let config = TomlConfig::parse(FULL_CONFIG).unwrap();
    assert_eq!(config.round_to_secs, Some(30.0));
    assert_eq!(config.drift_tolerance_ms, Some(5.0));
    assert_eq!(config.buffer_frames, Some(512));
    assert_eq!(config.monitor_interval_ms, Some(250));
    assert_eq!(config.device.as_deref(), Some("USB Audio"));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config = TomlConfig::parse("").unwrap();
    let settings = Settings::resolve(SettingsOverrides::default(), config).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_parse_malformed_config_fails() {
    let result = TomlConfig::parse("round_to_secs = \"ten\"");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
}

#[test]
fn test_file_values_override_defaults() {
    let config = TomlConfig::parse(FULL_CONFIG).unwrap();
    let settings = Settings::resolve(SettingsOverrides::default(), config).unwrap();

    assert_eq!(settings.round_to_secs, 30.0);
    assert_eq!(settings.drift_tolerance_ms, 5.0);
    assert_eq!(settings.buffer_frames, 512);
    assert_eq!(settings.monitor_interval, Duration::from_millis(250));
    assert_eq!(settings.device.as_deref(), Some("USB Audio"));
    assert_eq!(settings.log_level, "debug");
}

#[test]
fn test_overrides_beat_file_values() {
    let config = TomlConfig::parse(FULL_CONFIG).unwrap();
    let overrides = SettingsOverrides {
        round_to_secs: Some(60.0),
        buffer_frames: Some(2048),
        device: Some("Speakers".to_string()),
        log_level: Some("warn".to_string()),
        ..SettingsOverrides::default()
    };
    let settings = Settings::resolve(overrides, config).unwrap();

    assert_eq!(settings.round_to_secs, 60.0);
    assert_eq!(settings.buffer_frames, 2048);
    assert_eq!(settings.device.as_deref(), Some("Speakers"));
    assert_eq!(settings.log_level, "warn");
    // Not overridden: file value survives
    assert_eq!(settings.drift_tolerance_ms, 5.0);
    assert_eq!(settings.monitor_interval, Duration::from_millis(250));
}

#[test]
fn test_partial_file_falls_through_to_defaults() {
    let config = TomlConfig::parse("drift_tolerance_ms = 1.5").unwrap();
    let settings = Settings::resolve(SettingsOverrides::default(), config).unwrap();
    assert_eq!(settings.drift_tolerance_ms, 1.5);
    assert_eq!(settings.round_to_secs, 10.0);
    assert_eq!(settings.buffer_frames, 1024);
}

#[test]
fn test_rejects_non_positive_period() {
    for bad in [0.0, -10.0, f64::NAN] {
        let overrides = SettingsOverrides {
            round_to_secs: Some(bad),
            ..SettingsOverrides::default()
        };
        let result = Settings::resolve(overrides, TomlConfig::default());
        assert!(
            matches!(result, Err(Error::InvalidInput(_))),
            "period {} should be rejected",
            bad
        );
    }
}

#[test]
fn test_rejects_negative_tolerance() {
    let overrides = SettingsOverrides {
        drift_tolerance_ms: Some(-1.0),
        ..SettingsOverrides::default()
    };
    assert!(Settings::resolve(overrides, TomlConfig::default()).is_err());
}

#[test]
fn test_zero_tolerance_is_allowed() {
    let overrides = SettingsOverrides {
        drift_tolerance_ms: Some(0.0),
        ..SettingsOverrides::default()
    };
    assert!(Settings::resolve(overrides, TomlConfig::default()).is_ok());
}

#[test]
fn test_rejects_zero_buffer_and_interval() {
    let overrides = SettingsOverrides {
        buffer_frames: Some(0),
        ..SettingsOverrides::default()
    };
    assert!(Settings::resolve(overrides, TomlConfig::default()).is_err());

    let overrides = SettingsOverrides {
        monitor_interval_ms: Some(0),
        ..SettingsOverrides::default()
    };
    assert!(Settings::resolve(overrides, TomlConfig::default()).is_err());
}

#[test]
fn test_load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL_CONFIG.as_bytes()).unwrap();

    let (config, source) = TomlConfig::load_or_default(Some(file.path())).unwrap();
    assert_eq!(config.buffer_frames, Some(512));
    assert_eq!(source.as_deref(), Some(file.path()));
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let result = TomlConfig::load_or_default(Some(Path::new(&missing)));
    assert!(matches!(result, Err(Error::Config(_))));
}
