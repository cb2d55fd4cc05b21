//! CLI smoke tests driving the built `squad` binary.

mod common;

use serde_json::Value;

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: squad [OPTIONS] [COMMAND]"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
    for command in ["dashboard", "status", "snapshot", "topics", "completions"] {
        assert!(result.stdout.contains(command), "help lists {command}");
    }
}

#[test]
fn version_flag_prints_version() {
    let result = common::run_cli_case("version_flag_prints_version", &["--version"]);
    assert!(result.status.success());
    assert!(
        result
            .stdout
            .contains(&format!("squad {}", env!("CARGO_PKG_VERSION"))),
        "log: {}",
        result.log_path.display()
    );
}

#[test]
fn topics_lists_every_topic_without_config() {
    let result = common::run_cli_case("topics_lists_every_topic_without_config", &["topics"]);
    assert!(
        result.status.success(),
        "log: {}",
        result.log_path.display()
    );
    for name in [
        "instances",
        "datasets",
        "projects",
        "products",
        "merchants",
        "assets",
        "personal-units",
        "units",
        "service-errors",
        "defined-exchange-rates",
        "undefined-exchange-rates",
    ] {
        assert!(result.stdout.contains(name), "missing {name}");
    }
}

#[test]
fn topics_json_describes_default_sorts() {
    let result = common::run_cli_case("topics_json_describes_default_sorts", &["topics", "--json"]);
    assert!(result.status.success());
    let payload: Value = serde_json::from_str(result.stdout.trim()).expect("valid json");
    let topics = payload.as_array().expect("array");
    assert_eq!(topics.len(), 11);
    let datasets = topics
        .iter()
        .find(|t| t["topic"] == "datasets")
        .expect("datasets entry");
    assert_eq!(datasets["backend"], "DM");
    assert_eq!(datasets["default_sort"], "size");
    assert_eq!(datasets["ascending"], false);
}

#[test]
fn completions_generate_for_bash() {
    let result = common::run_cli_case("completions_generate_for_bash", &["completions", "bash"]);
    assert!(result.status.success());
    assert!(result.stdout.contains("_squad"));
}

#[test]
fn missing_environments_file_exits_with_status_one() {
    let result = common::run_cli_case("missing_environments_file", &["status"]);
    assert_eq!(
        result.status.code(),
        Some(1),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stderr.contains("squad: [SQD-1002]"), "{}", result.stderr);
}

#[test]
fn unknown_environment_exits_with_status_one() {
    let home = tempfile::tempdir().expect("temp home");
    let config = common::write_environments(
        home.path(),
        &common::UNREACHABLE_ENVIRONMENTS.replace("environment = \"local\"", "environment = \"prod\""),
    );
    let result = common::run_cli_case_in(
        "unknown_environment",
        home.path(),
        &["--config", config.to_str().unwrap(), "status"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("[SQD-1004]"), "{}", result.stderr);
}

#[test]
fn environment_override_selects_defined_environment() {
    let home = tempfile::tempdir().expect("temp home");
    let config = common::write_environments(
        home.path(),
        &common::UNREACHABLE_ENVIRONMENTS.replace("environment = \"local\"", "environment = \"prod\""),
    );
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_squad"))
        .args(["--config", config.to_str().unwrap(), "status", "--json"])
        .env("HOME", home.path())
        .env("SQUAD_ENVIRONMENT", "local")
        .output()
        .expect("run squad");
    assert!(output.status.success());
    let payload: Value =
        serde_json::from_slice(&output.stdout).expect("status prints json");
    assert_eq!(payload["environment"], "local");
}

#[test]
fn status_json_reports_unreachable_backends() {
    let home = tempfile::tempdir().expect("temp home");
    let config = common::write_environments(home.path(), common::UNREACHABLE_ENVIRONMENTS);
    let result = common::run_cli_case_in(
        "status_json_reports_unreachable_backends",
        home.path(),
        &["--config", config.to_str().unwrap(), "status", "--json"],
    );
    assert!(
        result.status.success(),
        "log: {}",
        result.log_path.display()
    );
    let payload: Value = serde_json::from_str(result.stdout.trim()).expect("valid json");
    assert_eq!(payload["environment"], "local");
    assert_eq!(payload["keycloak"]["authenticated"], false);
    assert_eq!(
        payload["data_manager"]["url"],
        "http://127.0.0.1:9/data-manager-api"
    );
    assert!(payload["account_server"]["version"].is_null());
    assert!(payload["account_server"]["error"].is_string());
}

#[test]
fn snapshot_without_token_fails_unauthenticated() {
    let home = tempfile::tempdir().expect("temp home");
    let config = common::write_environments(home.path(), common::UNREACHABLE_ENVIRONMENTS);
    let result = common::run_cli_case_in(
        "snapshot_without_token_fails_unauthenticated",
        home.path(),
        &["--config", config.to_str().unwrap(), "snapshot", "projects"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stderr.contains("squad: projects: unauthenticated"),
        "log: {}",
        result.log_path.display()
    );
}

#[test]
fn snapshot_rejects_unknown_sort_column() {
    let home = tempfile::tempdir().expect("temp home");
    let config = common::write_environments(home.path(), common::UNREACHABLE_ENVIRONMENTS);
    let result = common::run_cli_case_in(
        "snapshot_rejects_unknown_sort_column",
        home.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "snapshot",
            "projects",
            "--sort",
            "colour",
        ],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("[SQD-3101]"), "{}", result.stderr);
}

#[test]
fn invalid_dashboard_section_is_a_configuration_error() {
    let home = tempfile::tempdir().expect("temp home");
    let config = common::write_environments(
        home.path(),
        &common::UNREACHABLE_ENVIRONMENTS.replace("request_timeout_ms = 500", "tick_ms = 0"),
    );
    let result = common::run_cli_case_in(
        "invalid_dashboard_section",
        home.path(),
        &["--config", config.to_str().unwrap(), "snapshot", "units"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("[SQD-1001]"), "{}", result.stderr);
}
