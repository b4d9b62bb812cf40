// crates/rotation-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rotation Gate Interfaces
// Description: Capability traits for every component and external collaborator.
// Purpose: Define the contract surfaces wired together by the orchestrator.
// Dependencies: crate::core, async-trait, ed25519-dalek
// ============================================================================

//! ## Overview
//! Each core component (ledger, rule cache, validator, session manager) and
//! each external collaborator (credential vault, policy source, policy
//! analyzer, prompt channel) is reached through a trait, so every piece can be
//! replaced by a fake in tests. Implementations must fail closed: a missing
//! rule set or an unreachable collaborator never reads as "automation
//! permitted".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use serde_json::Value;
use thiserror::Error;

use crate::core::Action;
use crate::core::AutomationMethod;
use crate::core::CacheStats;
use crate::core::Credential;
use crate::core::CredentialId;
use crate::core::Decision;
use crate::core::DecisionOutcome;
use crate::core::EventType;
use crate::core::HimContext;
use crate::core::HimPrompt;
use crate::core::HimRespondOutcome;
use crate::core::HimSession;
use crate::core::HimSessionView;
use crate::core::HimState;
use crate::core::InterventionKind;
use crate::core::LedgerEntry;
use crate::core::LedgerFilter;
use crate::core::LedgerRange;
use crate::core::PolicyDocument;
use crate::core::Rule;
use crate::core::RuleSet;
use crate::core::RuleSetSummary;
use crate::core::SecretValue;
use crate::core::SessionId;
use crate::core::SubjectHash;
use crate::core::TargetId;
use crate::core::VerificationReport;

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Payload could not be canonicalized.
    #[error("ledger payload serialization failed: {0}")]
    Serialization(String),
    /// Ledger lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned")]
    Poisoned,
    /// Persistence I/O failure.
    #[error("ledger io error: {0}")]
    Io(String),
    /// Stored ledger data could not be decoded.
    #[error("ledger data invalid: {0}")]
    Invalid(String),
    /// Signing key could not be loaded.
    #[error("ledger signing key error: {0}")]
    Key(String),
}

/// Append-only, hash-linked, signed record chain.
pub trait Ledger: Send + Sync {
    /// Appends an entry and returns the committed record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the entry cannot be built or committed.
    fn append(
        &self,
        event_type: EventType,
        subject_hash: SubjectHash,
        payload: Value,
    ) -> Result<LedgerEntry, LedgerError>;

    /// Verifies signatures and chain links across `range`, reporting every violation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] only when the ledger cannot be read.
    fn verify(&self, range: LedgerRange) -> Result<VerificationReport, LedgerError>;

    /// Returns entries matching `filter` in append order without mutating the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] only when the ledger cannot be read.
    fn export(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Returns the number of committed entries.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] only when the ledger cannot be read.
    fn len(&self) -> Result<usize, LedgerError>;

    /// Returns true when no entries are committed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] only when the ledger cannot be read.
    fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    /// Returns the public key that verifies entry signatures.
    fn verifying_key(&self) -> VerifyingKey;
}

/// Durable destination for committed ledger entries.
pub trait LedgerSink: Send + Sync {
    /// Persists a committed entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when persistence fails.
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;
}

// ============================================================================
// SECTION: Rule Cache
// ============================================================================

/// Rule cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache lock was poisoned by a panicking writer.
    #[error("rule cache lock poisoned")]
    Poisoned,
    /// Change-log append failed.
    #[error("rule cache change log failed: {0}")]
    ChangeLog(#[from] LedgerError),
}

/// Per-target compliance rule set cache with absolute expiry.
pub trait RuleCache: Send + Sync {
    /// Stores a rule set, replacing any entry for the same target.
    ///
    /// The expiry is `created_at + ttl`, using the cache default when `ttl` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be updated.
    fn store(&self, rule_set: RuleSet, ttl: Option<Duration>) -> Result<Arc<RuleSet>, CacheError>;

    /// Returns the live rule set for a target; expired entries read as absent.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn get(&self, target_id: &TargetId) -> Result<Option<Arc<RuleSet>>, CacheError>;

    /// Lists summaries whose target matches `pattern` (`*` wildcards).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn list(&self, pattern: &str, include_expired: bool)
    -> Result<Vec<RuleSetSummary>, CacheError>;

    /// Removes the entry for a target; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be updated.
    fn invalidate(&self, target_id: &TargetId) -> Result<bool, CacheError>;

    /// Returns cache counters.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn stats(&self) -> Result<CacheStats, CacheError>;
}

// ============================================================================
// SECTION: Compliance Validator
// ============================================================================

/// Pure compliance decision function over a rule set and an action.
pub trait ComplianceValidator: Send + Sync {
    /// Returns the rules that apply to `action`.
    fn applicable_rules<'a>(&self, rule_set: &'a RuleSet, action: &Action) -> Vec<&'a Rule>;

    /// Decides whether `action` may proceed.
    fn decide(&self, rule_set: &RuleSet, action: &Action) -> Decision;

    /// Recommends an automation method for a decided outcome.
    fn recommend_method(&self, outcome: DecisionOutcome, action: &Action) -> AutomationMethod;
}

// ============================================================================
// SECTION: Human Intervention
// ============================================================================

/// Human-intervention session errors.
#[derive(Debug, Error)]
pub enum HimError {
    /// Session does not exist (never created or already collected).
    #[error("him session not found: {0}")]
    NotFound(SessionId),
    /// Session already reached a terminal state.
    #[error("him session {session_id} is terminal ({})", .state.as_str())]
    Terminal {
        /// Session identifier.
        session_id: SessionId,
        /// Terminal state.
        state: HimState,
    },
    /// Session table is full.
    #[error("him session capacity exceeded ({0} sessions)")]
    CapacityExceeded(usize),
    /// Session table lock was poisoned.
    #[error("him session table lock poisoned")]
    Poisoned,
}

/// State machine that suspends automation pending human input.
#[async_trait]
pub trait InterventionManager: Send + Sync {
    /// Creates a session in `Initialized` with a fresh id, token, and deadline.
    ///
    /// # Errors
    ///
    /// Returns [`HimError`] when the session cannot be created.
    fn create(&self, kind: InterventionKind, context: HimContext)
    -> Result<HimSession, HimError>;

    /// Records prompt delivery (`Initialized -> AwaitingInput`).
    ///
    /// # Errors
    ///
    /// Returns [`HimError`] when the session is unknown or terminal.
    fn mark_awaiting_input(&self, session_id: &SessionId) -> Result<HimState, HimError>;

    /// Submits a response for validation.
    ///
    /// # Errors
    ///
    /// Returns [`HimError`] when the session is unknown or already terminal.
    fn respond(
        &self,
        session_id: &SessionId,
        token: &str,
        data: &Value,
    ) -> Result<HimRespondOutcome, HimError>;

    /// Cancels a pending session; cancelling a terminal session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HimError::NotFound`] when the session is unknown.
    fn cancel(&self, session_id: &SessionId) -> Result<HimState, HimError>;

    /// Inspects a session, applying the deadline check first.
    ///
    /// # Errors
    ///
    /// Returns [`HimError::NotFound`] when the session is unknown.
    fn session(&self, session_id: &SessionId) -> Result<HimSessionView, HimError>;

    /// Times out overdue sessions and removes terminal ones past the grace period.
    ///
    /// # Errors
    ///
    /// Returns [`HimError`] when the session table cannot be updated.
    fn sweep(&self) -> Result<usize, HimError>;

    /// Waits until the session reaches a terminal state or its deadline.
    ///
    /// # Errors
    ///
    /// Returns [`HimError::NotFound`] when the session is unknown.
    async fn wait(&self, session_id: &SessionId) -> Result<HimSessionView, HimError>;
}

/// Prompt delivery errors.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Prompt surface could not be reached.
    #[error("prompt delivery failed: {0}")]
    Delivery(String),
}

/// Surface that shows HIM prompts to a person.
#[async_trait]
pub trait PromptChannel: Send + Sync {
    /// Delivers a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] when delivery fails.
    async fn deliver(&self, prompt: &HimPrompt) -> Result<(), PromptError>;
}

// ============================================================================
// SECTION: Credential Vault
// ============================================================================

/// Credential vault errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Vault is temporarily unreachable.
    #[error("vault unavailable: {0}")]
    Unavailable(String),
    /// Vault rejected the request.
    #[error("vault rejected request: {0}")]
    Rejected(String),
}

impl VaultError {
    /// Returns true when the error may clear on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Credential vault integration.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    /// Lists credentials that are candidates for rotation.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the vault cannot be queried.
    async fn detect_candidates(&self) -> Result<Vec<Credential>, VaultError>;

    /// Writes a new secret for a credential. This call is irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the update fails.
    async fn update_secret(
        &self,
        credential_id: &CredentialId,
        new_value: &SecretValue,
    ) -> Result<(), VaultError>;

    /// Returns whether the vault is locked.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the lock state cannot be read.
    async fn is_locked(&self) -> Result<bool, VaultError>;
}

// ============================================================================
// SECTION: Policy Refresh
// ============================================================================

/// Rule set refresh errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Refresh exceeded its time bound.
    #[error("rule set refresh timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// Policy document could not be fetched.
    #[error("policy source failed: {0}")]
    Source(String),
    /// Policy analysis failed.
    #[error("policy analysis failed: {0}")]
    Analysis(String),
}

/// Fetches the raw policy document for a target.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Fetches the current policy document.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] when the document cannot be fetched.
    async fn fetch(&self, target_id: &TargetId) -> Result<PolicyDocument, RefreshError>;
}

/// Turns a policy document into a structured rule set.
#[async_trait]
pub trait PolicyAnalyzer: Send + Sync {
    /// Analyzes a document for a target.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] when analysis fails.
    async fn analyze(
        &self,
        target_id: &TargetId,
        document: &PolicyDocument,
    ) -> Result<RuleSet, RefreshError>;
}
