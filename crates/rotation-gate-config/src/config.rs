// crates/rotation-gate-config/src/config.rs
// ============================================================================
// Module: Rotation Gate Configuration
// Description: Configuration loading and validation for Rotation Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rotation-gate-core, serde, toml, tracing
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every numeric bound is explicit; values outside their range fail closed
//! instead of being clamped. Validated sections convert into the core runtime
//! configuration structs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use rotation_gate_core::Clock;
use rotation_gate_core::FileLedgerSink;
use rotation_gate_core::HimConfig;
use rotation_gate_core::OrchestratorConfig;
use rotation_gate_core::RetryPolicy;
use rotation_gate_core::RuleCacheConfig;
use rotation_gate_core::SignedHashChainLedger;
use rotation_gate_core::SubjectHasher;
use rotation_gate_core::UncertainPolicy;
use rotation_gate_core::ValidatorConfig;
use rotation_gate_core::VerificationReport;
use rotation_gate_core::generate_signing_key;
use rotation_gate_core::load_ledger_file;
use rotation_gate_core::load_signing_key;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "rotation-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "ROTATION_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum subject salt length in bytes.
const MAX_SUBJECT_SALT_BYTES: usize = 256;
/// Seconds per day.
const SECS_PER_DAY: u64 = 24 * 60 * 60;
/// Default rule set lifetime in seconds (30 days).
const DEFAULT_TTL_SECS: u64 = 30 * SECS_PER_DAY;
/// Maximum rule set lifetime in seconds (365 days).
const MAX_TTL_SECS: u64 = 365 * SECS_PER_DAY;
/// Minimum refresh timeout in milliseconds.
const MIN_REFRESH_TIMEOUT_MS: u64 = 100;
/// Maximum refresh timeout in milliseconds.
const MAX_REFRESH_TIMEOUT_MS: u64 = 120_000;
/// Maximum HIM session timeout in seconds.
const MAX_SESSION_TIMEOUT_SECS: u64 = 3_600;
/// Maximum HIM attempts.
const MAX_HIM_ATTEMPTS: u32 = 10;
/// Maximum HIM garbage-collection grace in seconds.
const MAX_GC_GRACE_SECS: u64 = 86_400;
/// Maximum concurrent HIM sessions.
const MAX_HIM_SESSIONS: usize = 100_000;
/// Maximum retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Maximum retry multiplier.
const MAX_RETRY_MULTIPLIER: u32 = 10;
/// Maximum single retry delay in milliseconds.
const MAX_BACKOFF_MS: u64 = 60_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Rotation Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationGateConfig {
    /// Ledger keys, persistence, and subject hashing.
    pub ledger: LedgerConfig,
    /// Rule cache and refresh settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Compliance validator settings.
    #[serde(default)]
    pub validator: ValidatorSection,
    /// HIM session settings.
    #[serde(default)]
    pub him: HimSection,
    /// Retry settings for reversible collaborator calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl RotationGateConfig {
    /// Loads configuration from `path`, the environment override, or the
    /// default file name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml_str(content)?;
        info!(path = %resolved.display(), "rotation gate config loaded");
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.validate()?;
        self.cache.validate()?;
        self.him.validate()?;
        self.retry.validate()?;
        Ok(())
    }

    /// Builds the orchestrator configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            refresh_enabled: self.cache.refresh_enabled,
            refresh_timeout: Duration::from_millis(self.cache.refresh_timeout_ms),
            retry: self.retry.retry_policy(),
        }
    }
}

// ============================================================================
// SECTION: Ledger Config
// ============================================================================

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Signing key file (32 raw bytes or base64); a fresh key is generated when unset.
    #[serde(default)]
    pub signing_key_path: Option<String>,
    /// Audit ledger JSON-lines file.
    #[serde(default)]
    pub audit_log_path: Option<String>,
    /// Evidence ledger JSON-lines file.
    #[serde(default)]
    pub evidence_log_path: Option<String>,
    /// Salt used to hash credential and target identifiers.
    pub subject_salt: String,
}

impl LedgerConfig {
    /// Validates ledger settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_salt.trim().is_empty() {
            return Err(ConfigError::Invalid("ledger.subject_salt must be non-empty".to_string()));
        }
        if self.subject_salt.len() > MAX_SUBJECT_SALT_BYTES {
            return Err(ConfigError::Invalid(format!(
                "ledger.subject_salt exceeds {MAX_SUBJECT_SALT_BYTES} bytes"
            )));
        }
        for (field, value) in [
            ("ledger.signing_key_path", &self.signing_key_path),
            ("ledger.audit_log_path", &self.audit_log_path),
            ("ledger.evidence_log_path", &self.evidence_log_path),
        ] {
            if let Some(value) = value {
                validate_path_string(field, value)?;
            }
        }
        if let (Some(audit), Some(evidence)) = (&self.audit_log_path, &self.evidence_log_path)
            && audit.trim() == evidence.trim()
        {
            return Err(ConfigError::Invalid(
                "ledger.audit_log_path and ledger.evidence_log_path must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the subject hasher for this deployment.
    #[must_use]
    pub fn subject_hasher(&self) -> SubjectHasher {
        SubjectHasher::new(self.subject_salt.as_bytes())
    }

    /// Opens the audit and evidence ledgers, restoring persisted history.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the key or ledger files cannot be read.
    pub fn open_ledgers(&self, clock: &Arc<dyn Clock>) -> Result<OpenedLedgers, ConfigError> {
        let signing_key = match &self.signing_key_path {
            Some(path) => load_signing_key(Path::new(path.trim()))
                .map_err(|err| ConfigError::Io(err.to_string()))?,
            None => {
                warn!("no signing key configured; ledger signatures use an ephemeral key");
                generate_signing_key()
            }
        };
        let (audit, audit_report) =
            open_ledger("audit", self.audit_log_path.as_deref(), signing_key.clone(), clock)?;
        let (evidence, evidence_report) =
            open_ledger("evidence", self.evidence_log_path.as_deref(), signing_key, clock)?;
        Ok(OpenedLedgers {
            audit,
            audit_report,
            evidence,
            evidence_report,
        })
    }
}

/// Ledgers opened from configuration with their restore reports.
pub struct OpenedLedgers {
    /// Rotation outcome ledger.
    pub audit: SignedHashChainLedger,
    /// Verification report for restored audit history.
    pub audit_report: VerificationReport,
    /// Compliance decision ledger.
    pub evidence: SignedHashChainLedger,
    /// Verification report for restored evidence history.
    pub evidence_report: VerificationReport,
}

/// Restores one ledger and attaches its file sink when a path is configured.
fn open_ledger(
    label: &str,
    path: Option<&str>,
    signing_key: SigningKey,
    clock: &Arc<dyn Clock>,
) -> Result<(SignedHashChainLedger, VerificationReport), ConfigError> {
    let Some(path) = path.map(str::trim) else {
        let (ledger, report) =
            SignedHashChainLedger::restore(label, signing_key, Arc::clone(clock), Vec::new());
        return Ok((ledger, report));
    };
    let path = Path::new(path);
    let entries = load_ledger_file(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let sink = FileLedgerSink::open(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let (ledger, report) =
        SignedHashChainLedger::restore(label, signing_key, Arc::clone(clock), entries);
    Ok((ledger.with_sink(Arc::new(sink)), report))
}

// ============================================================================
// SECTION: Cache Config
// ============================================================================

/// Rule cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Rule set lifetime in seconds when a store call gives none.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Whether missing rule sets may be refreshed on demand.
    #[serde(default = "default_true")]
    pub refresh_enabled: bool,
    /// Upper bound on one refresh in milliseconds.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            refresh_enabled: true,
            refresh_timeout_ms: default_refresh_timeout_ms(),
        }
    }
}

impl CacheConfig {
    /// Validates cache settings.
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("cache.default_ttl_secs", self.default_ttl_secs, 1, MAX_TTL_SECS)?;
        check_range(
            "cache.refresh_timeout_ms",
            self.refresh_timeout_ms,
            MIN_REFRESH_TIMEOUT_MS,
            MAX_REFRESH_TIMEOUT_MS,
        )
    }

    /// Builds the core rule cache configuration.
    #[must_use]
    pub const fn rule_cache_config(&self) -> RuleCacheConfig {
        RuleCacheConfig {
            default_ttl: Duration::from_secs(self.default_ttl_secs),
        }
    }
}

// ============================================================================
// SECTION: Validator Config
// ============================================================================

/// Compliance validator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorSection {
    /// Outcome substituted for uncertain evaluations.
    #[serde(default)]
    pub default_on_uncertain: UncertainPolicy,
    /// Global automation switch.
    #[serde(default = "default_true")]
    pub automation_enabled: bool,
}

impl Default for ValidatorSection {
    fn default() -> Self {
        Self {
            default_on_uncertain: UncertainPolicy::HimRequired,
            automation_enabled: true,
        }
    }
}

impl ValidatorSection {
    /// Builds the core validator configuration.
    #[must_use]
    pub const fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            default_on_uncertain: self.default_on_uncertain,
            automation_enabled: self.automation_enabled,
        }
    }
}

// ============================================================================
// SECTION: HIM Config
// ============================================================================

/// HIM session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HimSection {
    /// Response deadline in seconds after creation.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Rejected responses allowed before failure.
    #[serde(default = "default_him_attempts")]
    pub max_attempts: u32,
    /// Retention of terminal sessions in seconds.
    #[serde(default = "default_gc_grace_secs")]
    pub gc_grace_secs: u64,
    /// Maximum sessions held at once.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for HimSection {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout_secs(),
            max_attempts: default_him_attempts(),
            gc_grace_secs: default_gc_grace_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl HimSection {
    /// Validates HIM settings.
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "him.session_timeout_secs",
            self.session_timeout_secs,
            1,
            MAX_SESSION_TIMEOUT_SECS,
        )?;
        check_range(
            "him.max_attempts",
            u64::from(self.max_attempts),
            1,
            u64::from(MAX_HIM_ATTEMPTS),
        )?;
        check_range("him.gc_grace_secs", self.gc_grace_secs, 0, MAX_GC_GRACE_SECS)?;
        if self.max_sessions == 0 || self.max_sessions > MAX_HIM_SESSIONS {
            return Err(ConfigError::Invalid(format!(
                "him.max_sessions must be between 1 and {MAX_HIM_SESSIONS}"
            )));
        }
        Ok(())
    }

    /// Builds the core HIM configuration.
    #[must_use]
    pub const fn him_config(&self) -> HimConfig {
        HimConfig {
            session_timeout: Duration::from_secs(self.session_timeout_secs),
            max_attempts: self.max_attempts,
            gc_grace: Duration::from_secs(self.gc_grace_secs),
            max_sessions: self.max_sessions,
        }
    }
}

// ============================================================================
// SECTION: Retry Config
// ============================================================================

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Growth factor per attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    /// Upper bound on a single delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Validates retry settings.
    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "retry.max_attempts",
            u64::from(self.max_attempts),
            1,
            u64::from(MAX_RETRY_ATTEMPTS),
        )?;
        check_range(
            "retry.multiplier",
            u64::from(self.multiplier),
            1,
            u64::from(MAX_RETRY_MULTIPLIER),
        )?;
        check_range("retry.max_backoff_ms", self.max_backoff_ms, 0, MAX_BACKOFF_MS)?;
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the core retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: self.multiplier,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or referenced files.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default for boolean switches that are on unless disabled.
const fn default_true() -> bool {
    true
}

/// Default rule set lifetime.
const fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

/// Default refresh timeout.
const fn default_refresh_timeout_ms() -> u64 {
    10_000
}

/// Default HIM deadline.
const fn default_session_timeout_secs() -> u64 {
    300
}

/// Default HIM attempt limit.
const fn default_him_attempts() -> u32 {
    3
}

/// Default terminal session retention.
const fn default_gc_grace_secs() -> u64 {
    60
}

/// Default session capacity.
const fn default_max_sessions() -> usize {
    10_000
}

/// Default retry attempts.
const fn default_retry_attempts() -> u32 {
    3
}

/// Default first retry delay.
const fn default_initial_backoff_ms() -> u64 {
    100
}

/// Default retry growth factor.
const fn default_multiplier() -> u32 {
    2
}

/// Default retry delay cap.
const fn default_max_backoff_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects values outside `min..=max`.
fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Resolves the config path from the argument, env override, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
