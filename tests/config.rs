use std::fs;
use std::time::Duration;

use lumascript::config::{LogFormat, VmConfig};
use lumascript::vm::UnitMode;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = VmConfig::load(&dir.path().join("absent.toml")).expect("load");
    assert_eq!(config.max_frames, 256);
    assert_eq!(config.discovery_timeout(), Duration::from_secs(5));
    assert!(config.enable_pause);
    assert_eq!(config.default_unit_mode, UnitMode::Logical);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "max_frames = 32\nenable_pause = false\ndefault_unit_mode = \"RAW\"\nlog_format = \"pretty\"\n",
    )
    .expect("write config");

    let config = VmConfig::load(&path).expect("load");
    assert_eq!(config.max_frames, 32);
    assert!(!config.enable_pause);
    assert_eq!(config.default_unit_mode, UnitMode::Raw);
    assert_eq!(config.log_format, LogFormat::Pretty);
    assert_eq!(config.max_print_buffer, 2048);
    assert_eq!(config.fake_lights, 4);
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");
    let config = VmConfig {
        discovery_timeout_ms: 750,
        trace_instructions: true,
        fake_lights: 9,
        ..VmConfig::default()
    };
    config.save(&path).expect("save");

    let loaded = VmConfig::load(&path).expect("load");
    assert_eq!(loaded.discovery_timeout(), Duration::from_millis(750));
    assert!(loaded.trace_instructions);
    assert_eq!(loaded.fake_lights, 9);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "max_frames = \"many\"\n").expect("write config");

    let err = VmConfig::load(&path).expect_err("bad config");
    assert!(format!("{err:#}").contains("parsing configuration"));
}
