// crates/rotation-gate-core/src/core/him.rs
// ============================================================================
// Module: Rotation Gate Human-Intervention Types
// Description: Session, state, prompt, and response records for HIM flows.
// Purpose: Define the data contract for pausing automation on human input.
// Dependencies: serde, serde_json, subtle
// ============================================================================

//! ## Overview
//! A human-intervention (HIM) session suspends an in-flight automation until
//! a person supplies an MFA code, CAPTCHA solution, confirmation, or answer.
//! The security token is an anti-forgery value that every response must echo.
//!
//! State graph:
//! `Initialized -> AwaitingInput -> Validating -> {Resuming -> Completed} |
//! Failed | Cancelled | TimedOut`. Terminal states are final.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::core::identifiers::SessionId;
use crate::core::identifiers::TargetId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum digits accepted for an MFA code.
const MFA_MIN_DIGITS: usize = 6;
/// Maximum digits accepted for an MFA code.
const MFA_MAX_DIGITS: usize = 8;
/// Maximum CAPTCHA solution length in bytes.
const MAX_CAPTCHA_SOLUTION_BYTES: usize = 256;
/// Maximum security answer length in bytes.
const MAX_ANSWER_BYTES: usize = 512;

// ============================================================================
// SECTION: Intervention Kinds
// ============================================================================

/// Kind of human input a session waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    /// One-time MFA code: `{"code": "123456"}`.
    Mfa,
    /// CAPTCHA solution: `{"solution": "..."}`.
    Captcha,
    /// Manual review confirmation: `{"confirmed": true}`.
    ManualConfirmation,
    /// Security question answer: `{"answer": "..."}`.
    SecurityQuestion,
}

impl InterventionKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mfa => "mfa",
            Self::Captcha => "captcha",
            Self::ManualConfirmation => "manual_confirmation",
            Self::SecurityQuestion => "security_question",
        }
    }

    /// Checks a response payload against the expected input format.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch when the shape is wrong.
    pub fn validate_input(self, data: &Value) -> Result<(), String> {
        match self {
            Self::Mfa => {
                let code = string_field(data, "code")?;
                let digits = code.len();
                if !(MFA_MIN_DIGITS ..= MFA_MAX_DIGITS).contains(&digits)
                    || !code.bytes().all(|byte| byte.is_ascii_digit())
                {
                    return Err(format!(
                        "code must be {MFA_MIN_DIGITS}-{MFA_MAX_DIGITS} ascii digits"
                    ));
                }
                Ok(())
            }
            Self::Captcha => bounded_text(data, "solution", MAX_CAPTCHA_SOLUTION_BYTES),
            Self::ManualConfirmation => match data.get("confirmed") {
                Some(Value::Bool(true)) => Ok(()),
                Some(Value::Bool(false)) => Err("confirmation was declined".to_string()),
                _ => Err("confirmed must be a boolean".to_string()),
            },
            Self::SecurityQuestion => bounded_text(data, "answer", MAX_ANSWER_BYTES),
        }
    }
}

/// Extracts a required string field from a JSON object.
fn string_field<'a>(data: &'a Value, field: &str) -> Result<&'a str, String> {
    data.get(field).and_then(Value::as_str).ok_or_else(|| format!("{field} must be a string"))
}

/// Validates a non-blank, size-bounded text field.
fn bounded_text(data: &Value, field: &str, max_bytes: usize) -> Result<(), String> {
    let text = string_field(data, field)?;
    if text.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if text.len() > max_bytes {
        return Err(format!("{field} exceeds {max_bytes} bytes"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Session State
// ============================================================================

/// HIM session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HimState {
    /// Created; prompt not yet delivered.
    Initialized,
    /// Prompt delivered; waiting for a response.
    AwaitingInput,
    /// A response is being checked.
    Validating,
    /// Input accepted; automation is resuming.
    Resuming,
    /// Input accepted and automation resumed.
    Completed,
    /// Attempt limit reached.
    Failed,
    /// Cancelled by an external caller.
    Cancelled,
    /// Deadline passed before valid input arrived.
    TimedOut,
}

impl HimState {
    /// Returns true for final states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut)
    }

    /// Returns true for states in which the deadline is enforced.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Initialized | Self::AwaitingInput)
    }

    /// Returns a stable boundary code for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::AwaitingInput => "awaiting_input",
            Self::Validating => "validating",
            Self::Resuming => "resuming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Recorded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HimTransition {
    /// State entered.
    pub state: HimState,
    /// Time the state was entered.
    pub at: Timestamp,
}

// ============================================================================
// SECTION: Security Token
// ============================================================================

/// Anti-forgery token bound to a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityToken(String);

impl SecurityToken {
    /// Wraps a token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token value for delivery to the prompt surface.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compares a presented token in constant time.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityToken(<redacted>)")
    }
}

// ============================================================================
// SECTION: Sessions
// ============================================================================

/// Caller-supplied context describing why intervention is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HimContext {
    /// Target the automation is acting on.
    pub target_id: TargetId,
    /// Message shown to the person.
    pub message: String,
}

/// Full HIM session, including its security token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HimSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// Anti-forgery token.
    pub security_token: SecurityToken,
    /// Intervention kind.
    pub kind: InterventionKind,
    /// Request context.
    pub context: HimContext,
    /// Current state.
    pub state: HimState,
    /// Creation time.
    pub created_at: Timestamp,
    /// Response deadline.
    pub expires_at: Timestamp,
    /// Rejected responses so far.
    pub attempts: u32,
    /// Rejected responses allowed before failure.
    pub max_attempts: u32,
    /// Last rejection reason.
    pub last_error: Option<String>,
    /// Time a terminal state was entered.
    pub terminal_at: Option<Timestamp>,
    /// State history, oldest first.
    pub history: Vec<HimTransition>,
}

impl HimSession {
    /// Returns a token-free view of the session.
    #[must_use]
    pub fn view(&self) -> HimSessionView {
        HimSessionView {
            session_id: self.session_id.clone(),
            kind: self.kind,
            target_id: self.context.target_id.clone(),
            state: self.state,
            created_at: self.created_at,
            expires_at: self.expires_at,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            last_error: self.last_error.clone(),
            history: self.history.clone(),
        }
    }

    /// Returns the prompt delivered to the person.
    #[must_use]
    pub fn prompt(&self) -> HimPrompt {
        HimPrompt {
            session_id: self.session_id.clone(),
            security_token: self.security_token.clone(),
            kind: self.kind,
            target_id: self.context.target_id.clone(),
            message: self.context.message.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// Inspection view of a session without its security token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HimSessionView {
    /// Session identifier.
    pub session_id: SessionId,
    /// Intervention kind.
    pub kind: InterventionKind,
    /// Target identifier.
    pub target_id: TargetId,
    /// Current state.
    pub state: HimState,
    /// Creation time.
    pub created_at: Timestamp,
    /// Response deadline.
    pub expires_at: Timestamp,
    /// Rejected responses so far.
    pub attempts: u32,
    /// Rejected responses allowed before failure.
    pub max_attempts: u32,
    /// Last rejection reason.
    pub last_error: Option<String>,
    /// State history, oldest first.
    pub history: Vec<HimTransition>,
}

/// Prompt delivered to the person answering the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HimPrompt {
    /// Session identifier.
    pub session_id: SessionId,
    /// Token the response must echo.
    pub security_token: SecurityToken,
    /// Intervention kind.
    pub kind: InterventionKind,
    /// Target identifier.
    pub target_id: TargetId,
    /// Message shown to the person.
    pub message: String,
    /// Response deadline.
    pub expires_at: Timestamp,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Reason a response was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum HimRejection {
    /// Security token did not match.
    TokenMismatch,
    /// Response shape did not match the intervention kind.
    InvalidFormat(String),
    /// Deadline had already passed.
    Expired,
}

/// Result of submitting a response to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HimRespondOutcome {
    /// Session identifier.
    pub session_id: SessionId,
    /// State after processing the response.
    pub state: HimState,
    /// Rejected responses so far.
    pub attempts: u32,
    /// Remaining responses before failure.
    pub attempts_remaining: u32,
    /// Rejection reason when the response was not accepted.
    pub rejection: Option<HimRejection>,
}
