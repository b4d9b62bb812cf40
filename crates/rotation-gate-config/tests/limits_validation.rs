//! Bounded limit validation tests for rotation-gate-config.
// crates/rotation-gate-config/tests/limits_validation.rs
// =============================================================================
// Module: Limits Validation Tests
// Description: Every numeric bound rejects values outside its range.
// Purpose: Ensure out-of-range configuration fails closed instead of clamping.
// =============================================================================

mod common;

use common::TestResult;
use common::assert_invalid;

#[test]
fn him_attempts_must_be_at_least_one() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.him.max_attempts = 0;
    assert_invalid(config.validate(), "him.max_attempts")
}

#[test]
fn him_attempts_upper_bound() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.him.max_attempts = 11;
    assert_invalid(config.validate(), "him.max_attempts")
}

#[test]
fn him_timeout_must_be_positive() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.him.session_timeout_secs = 0;
    assert_invalid(config.validate(), "him.session_timeout_secs")
}

#[test]
fn him_timeout_upper_bound() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.him.session_timeout_secs = 3_601;
    assert_invalid(config.validate(), "him.session_timeout_secs")
}

#[test]
fn him_sessions_must_be_bounded() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.him.max_sessions = 0;
    assert_invalid(config.validate(), "him.max_sessions")?;
    config.him.max_sessions = 100_001;
    assert_invalid(config.validate(), "him.max_sessions")
}

#[test]
fn gc_grace_upper_bound() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.him.gc_grace_secs = 86_401;
    assert_invalid(config.validate(), "him.gc_grace_secs")
}

#[test]
fn cache_ttl_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.default_ttl_secs = 0;
    assert_invalid(config.validate(), "cache.default_ttl_secs")?;
    config.cache.default_ttl_secs = 365 * 24 * 60 * 60 + 1;
    assert_invalid(config.validate(), "cache.default_ttl_secs")
}

#[test]
fn refresh_timeout_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.refresh_timeout_ms = 99;
    assert_invalid(config.validate(), "cache.refresh_timeout_ms")?;
    config.cache.refresh_timeout_ms = 120_001;
    assert_invalid(config.validate(), "cache.refresh_timeout_ms")
}

#[test]
fn retry_attempts_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.max_attempts = 0;
    assert_invalid(config.validate(), "retry.max_attempts")?;
    config.retry.max_attempts = 11;
    assert_invalid(config.validate(), "retry.max_attempts")
}

#[test]
fn retry_multiplier_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.multiplier = 0;
    assert_invalid(config.validate(), "retry.multiplier")
}

#[test]
fn retry_initial_backoff_must_not_exceed_max() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.initial_backoff_ms = 6_000;
    config.retry.max_backoff_ms = 5_000;
    assert_invalid(config.validate(), "retry.initial_backoff_ms")
}

#[test]
fn subject_salt_must_be_non_empty() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.ledger.subject_salt = "   ".to_string();
    assert_invalid(config.validate(), "ledger.subject_salt")
}

#[test]
fn subject_salt_length_bound() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.ledger.subject_salt = "s".repeat(257);
    assert_invalid(config.validate(), "ledger.subject_salt")
}

#[test]
fn ledger_paths_must_be_non_empty() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.ledger.audit_log_path = Some(String::new());
    assert_invalid(config.validate(), "ledger.audit_log_path")
}

#[test]
fn ledger_paths_must_differ() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.ledger.audit_log_path = Some("var/ledger.jsonl".to_string());
    config.ledger.evidence_log_path = Some("var/ledger.jsonl".to_string());
    assert_invalid(config.validate(), "must differ")
}

#[test]
fn uncertain_policy_rejects_unknown_value() -> TestResult {
    let text = format!("{}\n[validator]\ndefault_on_uncertain = \"maybe\"\n", common::MINIMAL_TOML);
    if common::config_from_toml(&text).is_ok() {
        return Err("unknown default_on_uncertain should fail to parse".to_string());
    }
    Ok(())
}
