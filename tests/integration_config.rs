// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for configuration loading.
//!
//! Tests the Config module with realistic TOML configurations.

use std::io::Write;

use runctl::config::Config;
use runctl::config::loader::ConfigLoader;
use runctl::logging::LogLevel;

// =============================================================================
// Loading from TOML strings
// =============================================================================

#[test]
fn config_parse_empty() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.format_options(), Config::default().format_options());
}

#[test]
fn config_parse_full_file() {
    let toml = r#"
[global]
output_log_level = 4
file_log_level = 6
log_file = "/tmp/runctl.log"
state_trace = true

[session]
run_mode = "RunConfiguration.QmlProfilerRunMode"
device_type = "GenericLinuxOsType"
start_timeout_ms = 1500
stop_timeout_ms = 0
essential_main_worker = false
repeat = 2
"#;
    let config = Config::parse(toml).unwrap();
    insta::assert_snapshot!(config.format_options().join("\n"), @r"
    global.file_log_level         = 6
    global.log_file               = /tmp/runctl.log
    global.output_log_level       = 4
    global.state_trace            = true
    session.device_type           = GenericLinuxOsType
    session.essential_main_worker = false
    session.repeat                = 2
    session.run_mode              = RunConfiguration.QmlProfilerRunMode
    session.start_timeout_ms      = 1500
    session.stop_timeout_ms       = 0
    ");
}

#[test]
fn config_rejects_unknown_section() {
    assert!(Config::parse("[tasks]\nfoo = 1\n").is_err());
}

#[test]
fn config_rejects_wrong_type() {
    assert!(Config::parse("[session]\nrepeat = \"many\"\n").is_err());
}

// =============================================================================
// Layering
// =============================================================================

#[test]
fn config_files_layer_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("runctl.toml");
    let extra = dir.path().join("extra.toml");
    std::fs::File::create(&base)
        .unwrap()
        .write_all(b"[global]\noutput_log_level = 1\n[session]\nrepeat = 5\n")
        .unwrap();
    std::fs::File::create(&extra)
        .unwrap()
        .write_all(b"[session]\nrepeat = 2\n")
        .unwrap();

    let loader = ConfigLoader::new()
        .add_toml_file_optional(&base)
        .add_toml_file(&extra);
    assert_eq!(loader.format_loaded_files().len(), 2);

    let config = loader
        .set("global.state_trace", true)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(config.global.output_log_level, LogLevel::ERROR);
    assert_eq!(config.session.repeat, 2);
    assert!(config.global.state_trace);
}

#[test]
fn config_cli_override_beats_file() {
    let config = ConfigLoader::new()
        .add_toml_str("[global]\noutput_log_level = 1\n")
        .set("global.output_log_level", 5_i64)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(config.global.output_log_level, LogLevel::TRACE);
}
