//! Coverage for config file loading, overrides and validation.

use std::fs;

use aria::config::{AssistantConfig, ConfigError};
use aria::types::Intent;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let config =
        AssistantConfig::load_with(&tmp.path().join("absent.toml"), no_env).expect("defaults");
    assert!((config.resolver.execute_threshold - 0.80).abs() < f64::EPSILON);
    assert_eq!(config.context.capacity, 10);
    assert_eq!(config.logging.level, "info");
    assert!(config.vocabulary.path.is_none());
}

#[test]
fn file_values_then_env_overrides() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("aria.toml");
    fs::write(
        &path,
        r#"
[resolver]
execute_threshold = 0.9
confirm_threshold = 0.5
intent_priority = ["SEND_EMAIL", "OPEN_APPLICATION"]

[context]
capacity = 4
timeout_seconds = 120

[applications]
gimp = "gimp.exe"

[logging]
level = "warn"
"#,
    )
    .expect("write config");

    let config = AssistantConfig::load_with(&path, |key| match key {
        "ARIA_CONTEXT_CAPACITY" => Some("6".to_owned()),
        "ARIA_LOG_LEVEL" => Some("debug".to_owned()),
        _ => None,
    })
    .expect("load");

    assert!((config.resolver.execute_threshold - 0.9).abs() < f64::EPSILON);
    assert_eq!(
        config.resolver.intent_priority,
        vec![Intent::SendEmail, Intent::OpenApplication]
    );
    assert_eq!(config.context.capacity, 6);
    assert_eq!(config.context.timeout().as_secs(), 120);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.applications.get("gimp").map(String::as_str),
        Some("gimp.exe")
    );
}

#[test]
fn invalid_thresholds_fail_to_load() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("aria.toml");
    fs::write(
        &path,
        "[resolver]\nexecute_threshold = 0.4\nconfirm_threshold = 0.6\n",
    )
    .expect("write config");

    let err = AssistantConfig::load_with(&path, no_env).expect_err("should be rejected");
    let cause = err
        .chain()
        .find_map(|e| e.downcast_ref::<ConfigError>())
        .expect("config error in chain");
    assert!(matches!(cause, ConfigError::ConfirmAboveExecute { .. }));
}

#[test]
fn env_override_can_invalidate_a_good_file() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let err = AssistantConfig::load_with(&tmp.path().join("absent.toml"), |key| {
        (key == "ARIA_CONTEXT_TIMEOUT_SECS").then(|| "0".to_owned())
    })
    .expect_err("zero timeout");
    assert!(err.to_string().contains("invalid configuration"));
}

#[test]
fn malformed_toml_is_reported() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("aria.toml");
    fs::write(&path, "[resolver\nexecute_threshold = ").expect("write config");
    let err = AssistantConfig::load_with(&path, no_env).expect_err("malformed");
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn camel_case_file_is_accepted() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("aria.toml");
    fs::write(
        &path,
        r#"
[resolver]
statisticalMarginThreshold = 0.1
classifierTimeoutMs = 250

[context]
contextCarryover = 0.7

[applicationAliases]
"bloc" = "bloc-notes"
"#,
    )
    .expect("write config");

    let config = AssistantConfig::load_with(&path, no_env).expect("load");
    assert!((config.resolver.statistical_margin_threshold - 0.1).abs() < f64::EPSILON);
    assert_eq!(config.resolver.classifier_timeout().as_millis(), 250);
    assert!((config.context.carryover - 0.7).abs() < f64::EPSILON);
    assert_eq!(
        config.application_aliases.get("bloc").map(String::as_str),
        Some("bloc-notes")
    );
}
