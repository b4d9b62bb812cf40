//! Config defaults and loading tests for rotation-gate-config.
// crates/rotation-gate-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Loading Tests
// Description: Validate default behavior, file loading, and core conversions.
// Purpose: Ensure minimal config is valid and maps onto the runtime structs.
// =============================================================================

use std::fs;
use std::time::Duration;

use rotation_gate_config::ConfigError;
use rotation_gate_config::RotationGateConfig;
use rotation_gate_config::config_toml_example;
use rotation_gate_core::UncertainPolicy;

mod common;

use common::TestResult;

#[test]
fn minimal_config_validates_with_defaults() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.validator.default_on_uncertain != UncertainPolicy::HimRequired {
        return Err("default_on_uncertain should default to him_required".to_string());
    }
    if !config.validator.automation_enabled {
        return Err("automation should default to enabled".to_string());
    }
    if config.him.session_timeout_secs != 300 || config.him.max_attempts != 3 {
        return Err("him defaults should be 300s and 3 attempts".to_string());
    }
    if config.cache.default_ttl_secs != 30 * 24 * 60 * 60 {
        return Err("rule set ttl should default to 30 days".to_string());
    }
    Ok(())
}

#[test]
fn missing_ledger_section_fails_parse() -> TestResult {
    match RotationGateConfig::from_toml_str("") {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {}", describe(&other))),
    }
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let text = format!("{}\n[cache]\nttl = 5\n", common::MINIMAL_TOML);
    match RotationGateConfig::from_toml_str(&text) {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {}", describe(&other))),
    }
}

#[test]
fn example_config_parses_and_validates() -> TestResult {
    let config =
        RotationGateConfig::from_toml_str(&config_toml_example()).map_err(|err| err.to_string())?;
    let defaults = common::minimal_config().map_err(|err| err.to_string())?;
    if config.cache != defaults.cache || config.him != defaults.him || config.retry != defaults.retry
    {
        return Err("example should spell out the defaults".to_string());
    }
    Ok(())
}

#[test]
fn load_reads_file_from_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("rotation-gate.toml");
    let text = format!(
        "{}\n[validator]\ndefault_on_uncertain = \"blocked\"\nautomation_enabled = false\n",
        common::MINIMAL_TOML
    );
    fs::write(&path, text).map_err(|err| err.to_string())?;
    let config = RotationGateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let validator = config.validator.validator_config();
    if validator.default_on_uncertain != UncertainPolicy::Blocked || validator.automation_enabled {
        return Err("validator section not applied".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let mut text = String::from(common::MINIMAL_TOML);
    text.push_str(&"# padding\n".repeat(120_000));
    fs::write(&path, text).map_err(|err| err.to_string())?;
    common::assert_invalid(RotationGateConfig::load(Some(&path)).map(|_| ()), "size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, [0xff, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(RotationGateConfig::load(Some(&path)).map(|_| ()), "utf-8")
}

#[test]
fn load_missing_file_is_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    match RotationGateConfig::load(Some(&dir.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {}", describe(&other))),
    }
}

#[test]
fn sections_convert_into_runtime_configs() -> TestResult {
    let text = format!(
        "{}\n[cache]\ndefault_ttl_secs = 60\nrefresh_enabled = false\nrefresh_timeout_ms = \
         250\n[him]\nsession_timeout_secs = 30\nmax_attempts = 5\ngc_grace_secs = \
         0\nmax_sessions = 7\n[retry]\nmax_attempts = 4\ninitial_backoff_ms = 10\nmultiplier = \
         3\nmax_backoff_ms = 90\n",
        common::MINIMAL_TOML
    );
    let config = RotationGateConfig::from_toml_str(&text).map_err(|err| err.to_string())?;
    let cache = config.cache.rule_cache_config();
    cache.validate()?;
    if cache.default_ttl != Duration::from_secs(60) {
        return Err("cache ttl not converted".to_string());
    }
    let him = config.him.him_config();
    him.validate()?;
    if him.session_timeout != Duration::from_secs(30) || him.max_attempts != 5 || him.max_sessions != 7
    {
        return Err("him config not converted".to_string());
    }
    let orchestrator = config.orchestrator_config();
    orchestrator.validate()?;
    if orchestrator.refresh_enabled || orchestrator.refresh_timeout != Duration::from_millis(250) {
        return Err("refresh settings not converted".to_string());
    }
    if orchestrator.retry.backoff_for(1) != Duration::from_millis(30) {
        return Err("retry policy not converted".to_string());
    }
    Ok(())
}

fn describe(result: &Result<RotationGateConfig, ConfigError>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(err) => err.to_string(),
    }
}
