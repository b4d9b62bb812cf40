// crates/rotation-gate-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Rotation Gate Orchestrator
// Description: End-to-end compliance-gated credential rotation flow.
// Purpose: Gate every rotation behind a recorded decision and audit its outcome.
// Dependencies: crate::{core, interfaces, runtime}, tokio, tokio-util, tracing
// ============================================================================

//! ## Overview
//! [`RotationOrchestrator::rotate`] walks one credential through:
//!
//! 1. rotation policy validation
//! 2. vault lock check (retried on transient errors, locked is final)
//! 3. candidate lookup (retried on transient errors)
//! 4. rule set resolution, refreshing through the policy collaborators under
//!    a bounded timeout when the cache has no live entry
//! 5. compliance decision, recorded in the evidence ledger
//! 6. human intervention when the decision requires it
//! 7. secret generation and the irreversible vault update (never retried)
//!
//! Cancellation is honoured up to the vault update. Every path ends in
//! exactly one audit ledger entry; `rotate` returns an error only when that
//! entry cannot be written. A missing or unreachable rule set never reads as
//! permission.
//!
//! [`RotationOrchestrator::validate_action`] leaves exactly one evidence
//! entry per call: the decision, or the reason no decision was reached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::Action;
use crate::core::ActionError;
use crate::core::ActionKind;
use crate::core::AutomationMethod;
use crate::core::Clock;
use crate::core::Credential;
use crate::core::CredentialId;
use crate::core::Decision;
use crate::core::DecisionOutcome;
use crate::core::EventType;
use crate::core::FailureInfo;
use crate::core::HimContext;
use crate::core::HimState;
use crate::core::RotationPolicy;
use crate::core::RotationPolicyError;
use crate::core::RotationResult;
use crate::core::RotationStatus;
use crate::core::RuleSet;
use crate::core::SessionId;
use crate::core::SubjectHash;
use crate::core::SubjectHasher;
use crate::core::TargetId;
use crate::core::ledger::events;
use crate::interfaces::CacheError;
use crate::interfaces::ComplianceValidator;
use crate::interfaces::CredentialVault;
use crate::interfaces::HimError;
use crate::interfaces::InterventionManager;
use crate::interfaces::Ledger;
use crate::interfaces::LedgerError;
use crate::interfaces::PolicyAnalyzer;
use crate::interfaces::PolicySource;
use crate::interfaces::PromptChannel;
use crate::interfaces::PromptError;
use crate::interfaces::RefreshError;
use crate::interfaces::RuleCache;
use crate::interfaces::VaultError;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::retry_with_backoff;
use crate::runtime::secret::generate_secret;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Orchestrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Whether a missing rule set may be refreshed on demand.
    pub refresh_enabled: bool,
    /// Upper bound on one refresh, including retries.
    pub refresh_timeout: Duration,
    /// Retry policy for reversible collaborator calls.
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            refresh_enabled: true,
            refresh_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message when a bound is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_timeout.is_zero() {
            return Err("refresh timeout must be non-zero".to_string());
        }
        self.retry.validate()
    }
}

/// Components and collaborators wired into the orchestrator.
#[derive(Clone)]
pub struct OrchestratorDeps {
    /// Ledger receiving one entry per rotation outcome.
    pub audit_ledger: Arc<dyn Ledger>,
    /// Ledger receiving compliance decisions.
    pub evidence_ledger: Arc<dyn Ledger>,
    /// Rule set cache.
    pub rule_cache: Arc<dyn RuleCache>,
    /// Compliance validator.
    pub validator: Arc<dyn ComplianceValidator>,
    /// HIM session manager.
    pub him: Arc<dyn InterventionManager>,
    /// Credential vault.
    pub vault: Arc<dyn CredentialVault>,
    /// Policy document source.
    pub policy_source: Arc<dyn PolicySource>,
    /// Policy analyzer.
    pub policy_analyzer: Arc<dyn PolicyAnalyzer>,
    /// HIM prompt surface.
    pub prompt_channel: Arc<dyn PromptChannel>,
    /// Hasher for credential subjects.
    pub subject_hasher: SubjectHasher,
    /// Clock used for rule set expiry checks.
    pub clock: Arc<dyn Clock>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error taxonomy used for failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed input or missing configuration; never retried.
    Input,
    /// External failure that may clear; retried where reversible.
    Transient,
    /// Ledger integrity or persistence failure.
    Integrity,
    /// Compliance rejection; a correct outcome rather than a fault.
    Policy,
}

impl ErrorClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Transient => "transient",
            Self::Integrity => "integrity",
            Self::Policy => "policy",
        }
    }
}

/// Orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Rotation policy is invalid.
    #[error("invalid rotation policy: {0}")]
    InvalidPolicy(#[from] RotationPolicyError),
    /// Action is malformed.
    #[error("invalid action: {0}")]
    InvalidAction(#[from] ActionError),
    /// Credential is not a rotation candidate.
    #[error("credential is not a rotation candidate")]
    UnknownCredential,
    /// No cached rule set and refresh is disabled.
    #[error("no rule set cached for target {0} and refresh is disabled")]
    NoRuleSet(TargetId),
    /// Refresh failed or timed out.
    #[error("no rule set available: {0}")]
    Refresh(#[from] RefreshError),
    /// Vault call failed.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
    /// Vault reported itself locked.
    #[error("vault is locked")]
    VaultLocked,
    /// Prompt delivery failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),
    /// HIM session manager failed.
    #[error("him session error: {0}")]
    Him(#[from] HimError),
    /// Rule cache failed.
    #[error("rule cache error: {0}")]
    Cache(#[from] CacheError),
    /// Ledger append failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl OrchestratorError {
    /// Returns the taxonomy class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidPolicy(_)
            | Self::InvalidAction(_)
            | Self::UnknownCredential
            | Self::NoRuleSet(_) => ErrorClass::Input,
            Self::Refresh(_)
            | Self::Vault(_)
            | Self::VaultLocked
            | Self::Prompt(_)
            | Self::Him(_)
            | Self::Cache(_) => ErrorClass::Transient,
            Self::Ledger(_) => ErrorClass::Integrity,
        }
    }
}

// ============================================================================
// SECTION: Flow State
// ============================================================================

/// Non-failure end of a rotation flow.
enum Flow {
    /// The vault accepted the new secret.
    Rotated,
    /// Compliance or the person answering rejected the rotation.
    Rejected(String),
    /// The flow was cancelled before the vault update.
    Cancelled(String),
}

/// Facts gathered while the flow runs, recorded in the audit entry.
#[derive(Default)]
struct Progress {
    /// Target of the credential, once known.
    target_id: Option<TargetId>,
    /// Compliance decision, once reached.
    decision: Option<Decision>,
    /// HIM session, once created.
    him_session_id: Option<SessionId>,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Compliance-gated rotation orchestrator.
pub struct RotationOrchestrator {
    /// Orchestrator configuration.
    config: OrchestratorConfig,
    /// Wired components.
    deps: OrchestratorDeps,
}

impl RotationOrchestrator {
    /// Creates an orchestrator from already-constructed components.
    #[must_use]
    pub const fn new(config: OrchestratorConfig, deps: OrchestratorDeps) -> Self {
        Self {
            config,
            deps,
        }
    }

    /// Returns the wired components.
    #[must_use]
    pub const fn deps(&self) -> &OrchestratorDeps {
        &self.deps
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> OrchestratorConfig {
        self.config
    }

    /// Rotates one credential.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Ledger`] only when the audit entry for
    /// the outcome cannot be written; every other failure is reported in the
    /// returned [`RotationResult`].
    pub async fn rotate(
        &self,
        credential_id: &CredentialId,
        policy: &RotationPolicy,
        cancel: &CancellationToken,
    ) -> Result<RotationResult, OrchestratorError> {
        let subject_hash = self.deps.subject_hasher.hash(credential_id.as_str());
        let mut progress = Progress::default();
        let outcome = self.execute(credential_id, None, policy, cancel, &mut progress).await;
        self.record_outcome(subject_hash, progress, &outcome)
    }

    /// Detects rotation candidates and rotates each one.
    ///
    /// Cancelling stops further vault updates; remaining candidates are
    /// recorded as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when detection fails (after recording
    /// the failure) or when an audit entry cannot be written.
    pub async fn run_cycle(
        &self,
        policy: &RotationPolicy,
        cancel: &CancellationToken,
    ) -> Result<Vec<RotationResult>, OrchestratorError> {
        let candidates = match self.detect_candidates().await {
            Ok(candidates) => candidates,
            Err(err) => {
                let subject_hash = self.deps.subject_hasher.hash("rotation-cycle");
                let outcome: Result<Flow, OrchestratorError> = Err(err);
                self.record_outcome(subject_hash, Progress::default(), &outcome)?;
                return outcome.map(|_| Vec::new());
            }
        };
        match self.deps.him.sweep() {
            Ok(0) => {}
            Ok(removed) => info!(removed, "him sessions collected before rotation cycle"),
            Err(err) => warn!(error = %err, "him session sweep failed"),
        }
        info!(candidates = candidates.len(), "rotation cycle started");
        let mut results = Vec::with_capacity(candidates.len());
        for credential in &candidates {
            let subject_hash = self.deps.subject_hasher.hash(credential.credential_id.as_str());
            let mut progress = Progress::default();
            let outcome = self
                .execute(&credential.credential_id, Some(credential), policy, cancel, &mut progress)
                .await;
            results.push(self.record_outcome(subject_hash, progress, &outcome)?);
        }
        Ok(results)
    }

    /// Decides an action against the live rule set for `target_id`.
    ///
    /// The decision is recorded in the evidence ledger. When no decision can
    /// be reached, a `compliance_decision_failed` entry is recorded instead.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the action is malformed, no rule set
    /// can be resolved, or the evidence entry cannot be written.
    pub async fn validate_action(&self, action: &Action) -> Result<Decision, OrchestratorError> {
        let err = match self.decide_action(action).await {
            Ok(decision) => return Ok(decision),
            Err(err) => err,
        };
        // The evidence ledger itself rejected the decision record.
        if matches!(err, OrchestratorError::Ledger(_)) {
            return Err(err);
        }
        warn!(target_id = %action.target_id, error = %err, "compliance decision failed");
        self.record_decision_failure(&action.target_id, &err)?;
        Err(err)
    }

    /// Validates the action, resolves its rule set, and records the decision.
    async fn decide_action(&self, action: &Action) -> Result<Decision, OrchestratorError> {
        action.validate()?;
        let rule_set = self.resolve_rule_set(&action.target_id).await?;
        let decision = self.deps.validator.decide(&rule_set, action);
        self.record_decision(&decision, &rule_set)?;
        Ok(decision)
    }

    /// Runs the rotation flow up to (and including) the vault update.
    async fn execute(
        &self,
        credential_id: &CredentialId,
        known: Option<&Credential>,
        policy: &RotationPolicy,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<Flow, OrchestratorError> {
        policy.validate()?;
        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled("cancelled before rotation started".to_string()));
        }

        let locked = retry_with_backoff(
            &self.config.retry,
            "vault_is_locked",
            VaultError::is_transient,
            || self.deps.vault.is_locked(),
        )
        .await?;
        if locked {
            return Err(OrchestratorError::VaultLocked);
        }

        let credential = match known {
            Some(credential) => credential.clone(),
            None => self
                .detect_candidates()
                .await?
                .into_iter()
                .find(|candidate| &candidate.credential_id == credential_id)
                .ok_or(OrchestratorError::UnknownCredential)?,
        };
        progress.target_id = Some(credential.target_id.clone());

        let rule_set = self.resolve_rule_set(&credential.target_id).await?;
        let method = if policy.preferred_method.is_api_based() && !credential.supports_api {
            AutomationMethod::HeadlessBrowser
        } else {
            policy.preferred_method
        };
        let action = Action::new(credential.target_id.clone(), ActionKind::Update, method)
            .with_api_support(credential.supports_api);
        action.validate()?;

        let decision = self.deps.validator.decide(&rule_set, &action);
        progress.decision = Some(decision.clone());
        self.record_decision(&decision, &rule_set)?;

        match decision.outcome {
            DecisionOutcome::Allowed => {}
            DecisionOutcome::HimRequired => {
                if let Some(flow) =
                    self.await_intervention(&credential, policy, cancel, progress).await?
                {
                    return Ok(flow);
                }
            }
            DecisionOutcome::Blocked | DecisionOutcome::Disabled | DecisionOutcome::Uncertain => {
                return Ok(Flow::Rejected(decision.reason.clone()));
            }
        }

        if cancel.is_cancelled() {
            return Ok(Flow::Cancelled("cancelled before vault update".to_string()));
        }
        let secret = generate_secret(policy)?;
        self.deps.vault.update_secret(&credential.credential_id, &secret).await?;
        Ok(Flow::Rotated)
    }

    /// Runs a HIM session; returns `None` when the person approved.
    async fn await_intervention(
        &self,
        credential: &Credential,
        policy: &RotationPolicy,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<Option<Flow>, OrchestratorError> {
        let context = HimContext {
            target_id: credential.target_id.clone(),
            message: format!("approve credential rotation for {}", credential.target_id),
        };
        let session = self.deps.him.create(policy.intervention_kind, context)?;
        let session_id = session.session_id.clone();
        progress.him_session_id = Some(session_id.clone());

        if let Err(err) = self.deps.prompt_channel.deliver(&session.prompt()).await {
            if let Err(cancel_err) = self.deps.him.cancel(&session_id) {
                warn!(session_id = %session_id, error = %cancel_err, "him session cancel failed");
            }
            return Err(err.into());
        }
        match self.deps.him.mark_awaiting_input(&session_id) {
            // A fast responder may already have finished the session.
            Ok(_) | Err(HimError::Terminal {
                ..
            }) => {}
            Err(err) => return Err(err.into()),
        }

        let view = tokio::select! {
            view = self.deps.him.wait(&session_id) => view?,
            () = cancel.cancelled() => {
                self.deps.him.cancel(&session_id)?;
                return Ok(Some(Flow::Cancelled(
                    "cancelled while awaiting human input".to_string(),
                )));
            }
        };
        match view.state {
            HimState::Completed => Ok(None),
            HimState::Cancelled => {
                Ok(Some(Flow::Cancelled("human intervention was cancelled".to_string())))
            }
            state => Ok(Some(Flow::Rejected(format!(
                "human intervention ended in {}",
                state.as_str()
            )))),
        }
    }

    /// Lists vault candidates with retry.
    async fn detect_candidates(&self) -> Result<Vec<Credential>, OrchestratorError> {
        Ok(retry_with_backoff(
            &self.config.retry,
            "vault_detect_candidates",
            VaultError::is_transient,
            || self.deps.vault.detect_candidates(),
        )
        .await?)
    }

    /// Returns the live rule set for a target, refreshing when allowed.
    async fn resolve_rule_set(
        &self,
        target_id: &TargetId,
    ) -> Result<Arc<RuleSet>, OrchestratorError> {
        if let Some(rule_set) = self.deps.rule_cache.get(target_id)? {
            return Ok(rule_set);
        }
        if !self.config.refresh_enabled {
            return Err(OrchestratorError::NoRuleSet(target_id.clone()));
        }
        let timeout = self.config.refresh_timeout;
        let refreshed = tokio::time::timeout(
            timeout,
            retry_with_backoff(
                &self.config.retry,
                "rule_set_refresh",
                |err: &RefreshError| !matches!(err, RefreshError::Analysis(_)),
                || self.refresh(target_id),
            ),
        )
        .await
        .map_err(|_| RefreshError::Timeout(timeout))
        .and_then(|result| result);
        let rule_set = match refreshed {
            Ok(rule_set) => rule_set,
            Err(err) => {
                warn!(target_id = %target_id, error = %err, "rule set refresh failed");
                return Err(err.into());
            }
        };
        if &rule_set.target_id != target_id {
            return Err(RefreshError::Analysis(format!(
                "analysis returned rule set for {}",
                rule_set.target_id
            ))
            .into());
        }
        let stored = self.deps.rule_cache.store(rule_set, None)?;
        if stored.is_expired(self.deps.clock.now()) {
            return Err(RefreshError::Analysis("refreshed rule set is already expired".to_string())
                .into());
        }
        info!(target_id = %target_id, rules = stored.rules.len(), "rule set refreshed");
        Ok(stored)
    }

    /// Fetches and analyzes the policy document for a target.
    async fn refresh(&self, target_id: &TargetId) -> Result<RuleSet, RefreshError> {
        let document = self.deps.policy_source.fetch(target_id).await?;
        self.deps.policy_analyzer.analyze(target_id, &document).await
    }

    /// Appends a compliance decision to the evidence ledger.
    fn record_decision(&self, decision: &Decision, rule_set: &RuleSet) -> Result<(), LedgerError> {
        let payload = json!({
            "target_id": decision.target_id,
            "outcome": decision.outcome.as_str(),
            "evaluated": decision.evaluated.as_str(),
            "method": decision.method.as_str(),
            "applied_rules": decision.applied_rules,
            "rate_limit": decision.rate_limit,
            "reason": decision.reason,
            "rule_set_version": rule_set.source_version,
        });
        let subject = self.deps.subject_hasher.hash(decision.target_id.as_str());
        self.deps.evidence_ledger.append(
            EventType::new(events::COMPLIANCE_DECISION),
            subject,
            payload,
        )?;
        Ok(())
    }

    /// Appends a failed compliance decision to the evidence ledger.
    fn record_decision_failure(
        &self,
        target_id: &TargetId,
        err: &OrchestratorError,
    ) -> Result<(), LedgerError> {
        let payload = json!({
            "target_id": target_id,
            "class": err.class().as_str(),
            "error": err.to_string(),
        });
        let subject = self.deps.subject_hasher.hash(target_id.as_str());
        self.deps.evidence_ledger.append(
            EventType::new(events::COMPLIANCE_DECISION_FAILED),
            subject,
            payload,
        )?;
        Ok(())
    }

    /// Writes the single audit entry for a rotation outcome.
    fn record_outcome(
        &self,
        subject_hash: SubjectHash,
        progress: Progress,
        outcome: &Result<Flow, OrchestratorError>,
    ) -> Result<RotationResult, OrchestratorError> {
        let (status, failure, reason, class) = match outcome {
            Ok(Flow::Rotated) => {
                (RotationStatus::Rotated, None, "credential rotated".to_string(), None)
            }
            Ok(Flow::Rejected(reason)) => {
                (RotationStatus::Rejected, None, reason.clone(), Some(ErrorClass::Policy))
            }
            Ok(Flow::Cancelled(reason)) => (RotationStatus::Cancelled, None, reason.clone(), None),
            Err(err) => {
                let class = err.class();
                let failure = FailureInfo {
                    class: class.as_str().to_string(),
                    message: err.to_string(),
                };
                (RotationStatus::Failed, Some(failure), err.to_string(), Some(class))
            }
        };
        let event = match status {
            RotationStatus::Rotated => events::ROTATION_SUCCEEDED,
            RotationStatus::Rejected => events::ROTATION_REJECTED,
            RotationStatus::Failed => events::ROTATION_FAILED,
            RotationStatus::Cancelled => events::ROTATION_CANCELLED,
        };
        let payload = json!({
            "status": status.as_str(),
            "reason": reason,
            "class": class.map(ErrorClass::as_str),
            "target_id": progress.target_id,
            "decision": progress.decision.as_ref().map(|decision| decision.outcome.as_str()),
            "method": progress.decision.as_ref().map(|decision| decision.method.as_str()),
            "applied_rules": progress
                .decision
                .as_ref()
                .map_or(Value::Null, |decision| json!(decision.applied_rules)),
            "him_session_id": progress.him_session_id,
        });
        let entry = match self.deps.audit_ledger.append(
            EventType::new(event),
            subject_hash.clone(),
            payload,
        ) {
            Ok(entry) => entry,
            Err(err) => {
                error!(subject = %subject_hash, status = status.as_str(), error = %err, "audit append failed");
                return Err(err.into());
            }
        };
        match status {
            RotationStatus::Rotated => {
                info!(subject = %subject_hash, seq = entry.seq, "credential rotated");
            }
            RotationStatus::Rejected | RotationStatus::Cancelled => {
                warn!(subject = %subject_hash, status = status.as_str(), reason = %reason, "rotation not performed");
            }
            RotationStatus::Failed => {
                error!(subject = %subject_hash, reason = %reason, "rotation failed");
            }
        }
        Ok(RotationResult {
            subject_hash,
            status,
            decision: progress.decision,
            him_session_id: progress.him_session_id,
            failure,
            reason,
            audit_entry_id: entry.entry_id,
        })
    }
}
