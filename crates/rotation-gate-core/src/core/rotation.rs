// crates/rotation-gate-core/src/core/rotation.rs
// ============================================================================
// Module: Rotation Gate Rotation Records
// Description: Credentials, rotation policies, secrets, and rotation results.
// Purpose: Describe what the orchestrator rotates and what it reports back.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Rotation records cross the boundary between the orchestrator and the
//! credential vault. [`SecretValue`] never prints its contents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::action::AutomationMethod;
use crate::core::decision::Decision;
use crate::core::hashing::SubjectHash;
use crate::core::him::InterventionKind;
use crate::core::identifiers::CredentialId;
use crate::core::identifiers::EntryId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::TargetId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum generated secret length.
pub const MIN_SECRET_LENGTH: usize = 12;
/// Maximum generated secret length.
pub const MAX_SECRET_LENGTH: usize = 256;

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Rotation candidate reported by the credential vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Vault credential identifier.
    pub credential_id: CredentialId,
    /// Target (site or service) the credential belongs to.
    pub target_id: TargetId,
    /// Whether the target offers a programmatic API for credential updates.
    pub supports_api: bool,
}

/// Raw policy document fetched for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Target identifier.
    pub target_id: TargetId,
    /// Document version or content hash.
    pub version: String,
    /// Document text.
    pub content: String,
}

/// Newly generated secret value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret for delivery to the vault.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

// ============================================================================
// SECTION: Rotation Policy
// ============================================================================

/// Character class a generated secret must include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    /// `a-z`.
    Lowercase,
    /// `A-Z`.
    Uppercase,
    /// `0-9`.
    Digits,
    /// Printable ASCII symbols.
    Symbols,
}

impl CharacterClass {
    /// Returns the alphabet for the class.
    #[must_use]
    pub const fn alphabet(self) -> &'static [u8] {
        match self {
            Self::Lowercase => b"abcdefghijklmnopqrstuvwxyz",
            Self::Uppercase => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::Digits => b"0123456789",
            Self::Symbols => b"!#$%&()*+,-./:;<=>?@[]^_{|}~",
        }
    }
}

/// How a credential should be rotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Generated secret length.
    pub length: usize,
    /// Character classes the secret must include.
    pub character_classes: Vec<CharacterClass>,
    /// Preferred automation method.
    pub preferred_method: AutomationMethod,
    /// Intervention kind requested when a human must step in.
    pub intervention_kind: InterventionKind,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            length: 24,
            character_classes: vec![
                CharacterClass::Lowercase,
                CharacterClass::Uppercase,
                CharacterClass::Digits,
                CharacterClass::Symbols,
            ],
            preferred_method: AutomationMethod::ProgrammaticApi,
            intervention_kind: InterventionKind::ManualConfirmation,
        }
    }
}

impl RotationPolicy {
    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`RotationPolicyError`] when the policy cannot produce a secret.
    pub fn validate(&self) -> Result<(), RotationPolicyError> {
        if !(MIN_SECRET_LENGTH ..= MAX_SECRET_LENGTH).contains(&self.length) {
            return Err(RotationPolicyError::Length(self.length));
        }
        if self.character_classes.is_empty() {
            return Err(RotationPolicyError::NoCharacterClasses);
        }
        if matches!(self.preferred_method, AutomationMethod::Manual | AutomationMethod::HimAssisted)
        {
            return Err(RotationPolicyError::UnsupportedMethod(
                self.preferred_method.as_str().to_string(),
            ));
        }
        Ok(())
    }
}

/// Invalid rotation policy errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationPolicyError {
    /// Secret length outside the supported range.
    #[error("secret length {0} outside {MIN_SECRET_LENGTH}..={MAX_SECRET_LENGTH}")]
    Length(usize),
    /// No character classes configured.
    #[error("rotation policy requires at least one character class")]
    NoCharacterClasses,
    /// Preferred method is not an automation method.
    #[error("preferred method {0} is not an automation method")]
    UnsupportedMethod(String),
}

// ============================================================================
// SECTION: Rotation Results
// ============================================================================

/// Final status of one rotation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStatus {
    /// The vault accepted the new secret.
    Rotated,
    /// Compliance policy rejected the rotation.
    Rejected,
    /// The rotation failed.
    Failed,
    /// The rotation was cancelled before the external call.
    Cancelled,
}

impl RotationStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rotated => "rotated",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Failure classification attached to failed rotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Error class label (`input`, `transient`, `integrity`, `policy`).
    pub class: String,
    /// Failure message.
    pub message: String,
}

/// Outcome of one rotation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationResult {
    /// Hashed credential subject.
    pub subject_hash: SubjectHash,
    /// Final status.
    pub status: RotationStatus,
    /// Compliance decision, when one was reached.
    pub decision: Option<Decision>,
    /// HIM session used, if any.
    pub him_session_id: Option<SessionId>,
    /// Failure details for failed rotations.
    pub failure: Option<FailureInfo>,
    /// Human-readable reason.
    pub reason: String,
    /// Audit ledger entry recording this outcome.
    pub audit_entry_id: EntryId,
}
