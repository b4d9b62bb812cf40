// crates/rotation-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for rotation-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use rotation_gate_config::ConfigError;
use rotation_gate_config::RotationGateConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Minimal TOML accepted by the loader.
pub const MINIMAL_TOML: &str = "[ledger]\nsubject_salt = \"test-salt\"\n";

/// Parses a TOML string into a `RotationGateConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<RotationGateConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<RotationGateConfig, toml::de::Error> {
    config_from_toml(MINIMAL_TOML)
}

/// Asserts that a validation result is an error mentioning `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
