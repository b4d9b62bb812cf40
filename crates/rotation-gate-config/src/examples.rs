// crates/rotation-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Rotation Gate configuration. The example parses and
//! validates as-is and spells out every default.

/// Returns a canonical example `rotation-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[ledger]
subject_salt = "replace-with-deployment-salt"
# signing_key_path = "keys/ledger.key"
# audit_log_path = "var/audit.jsonl"
# evidence_log_path = "var/evidence.jsonl"

[cache]
default_ttl_secs = 2592000
refresh_enabled = true
refresh_timeout_ms = 10000

[validator]
default_on_uncertain = "him_required"
automation_enabled = true

[him]
session_timeout_secs = 300
max_attempts = 3
gc_grace_secs = 60
max_sessions = 10000

[retry]
max_attempts = 3
initial_backoff_ms = 100
multiplier = 2
max_backoff_ms = 5000
"#,
    )
}
