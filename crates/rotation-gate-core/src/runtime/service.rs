// crates/rotation-gate-core/src/runtime/service.rs
// ============================================================================
// Module: Rotation Gate Trust Service
// Description: Request-facing facade over the orchestrator and its components.
// Purpose: Expose the six boundary operations with stable result codes.
// Dependencies: crate::{core, interfaces, runtime}, tokio-util
// ============================================================================

//! ## Overview
//! [`TrustService`] is what a request-handling layer (for example an RPC
//! server) wraps. It adds no states of its own: decisions and session states
//! cross the boundary as the core enumerations, whose `as_str` codes are the
//! wire codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::Action;
use crate::core::CredentialId;
use crate::core::Decision;
use crate::core::HimContext;
use crate::core::HimRespondOutcome;
use crate::core::HimSession;
use crate::core::HimSessionView;
use crate::core::HimState;
use crate::core::InterventionKind;
use crate::core::LedgerEntry;
use crate::core::LedgerFilter;
use crate::core::LedgerRange;
use crate::core::RotationPolicy;
use crate::core::RotationResult;
use crate::core::SessionId;
use crate::core::TargetId;
use crate::core::VerificationReport;
use crate::interfaces::HimError;
use crate::interfaces::Ledger;
use crate::interfaces::LedgerError;
use crate::runtime::orchestrator::OrchestratorError;
use crate::runtime::orchestrator::RotationOrchestrator;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ledger selector for boundary queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Rotation outcome ledger.
    Audit,
    /// Compliance decision ledger.
    Evidence,
}

/// Boundary errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Orchestrator failure.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// HIM session failure.
    #[error(transparent)]
    Him(#[from] HimError),
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Boundary facade over a [`RotationOrchestrator`].
#[derive(Clone)]
pub struct TrustService {
    /// Shared orchestrator.
    orchestrator: Arc<RotationOrchestrator>,
}

impl TrustService {
    /// Creates a service over an orchestrator.
    #[must_use]
    pub const fn new(orchestrator: Arc<RotationOrchestrator>) -> Self {
        Self {
            orchestrator,
        }
    }

    /// Returns the wrapped orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &RotationOrchestrator {
        &self.orchestrator
    }

    /// Decides whether `action` may run against `target_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] when the action names another
    /// target, otherwise propagates orchestrator failures.
    pub async fn validate_action(
        &self,
        target_id: &TargetId,
        action: &Action,
    ) -> Result<Decision, ServiceError> {
        if &action.target_id != target_id {
            return Err(ServiceError::InvalidRequest(format!(
                "action targets {} but request names {target_id}",
                action.target_id
            )));
        }
        Ok(self.orchestrator.validate_action(action).await?)
    }

    /// Rotates one credential.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Orchestrator`] when the outcome cannot be audited.
    pub async fn rotate(
        &self,
        credential_id: &CredentialId,
        policy: &RotationPolicy,
        cancel: &CancellationToken,
    ) -> Result<RotationResult, ServiceError> {
        Ok(self.orchestrator.rotate(credential_id, policy, cancel).await?)
    }

    /// Returns ledger entries matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Ledger`] when the ledger cannot be read.
    pub fn get_ledger_range(
        &self,
        kind: LedgerKind,
        filter: &LedgerFilter,
    ) -> Result<Vec<LedgerEntry>, ServiceError> {
        Ok(self.ledger(kind).export(filter)?)
    }

    /// Verifies a ledger range.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Ledger`] when the ledger cannot be read.
    pub fn verify_ledger(
        &self,
        kind: LedgerKind,
        range: LedgerRange,
    ) -> Result<VerificationReport, ServiceError> {
        Ok(self.ledger(kind).verify(range)?)
    }

    /// Creates a HIM session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Him`] when the session cannot be created.
    pub fn create_him_session(
        &self,
        kind: InterventionKind,
        context: HimContext,
    ) -> Result<HimSession, ServiceError> {
        Ok(self.orchestrator.deps().him.create(kind, context)?)
    }

    /// Submits a response to a HIM session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Him`] when the session is unknown or terminal.
    pub fn respond_to_him(
        &self,
        session_id: &SessionId,
        token: &str,
        data: &Value,
    ) -> Result<HimRespondOutcome, ServiceError> {
        Ok(self.orchestrator.deps().him.respond(session_id, token, data)?)
    }

    /// Inspects a HIM session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Him`] when the session is unknown.
    pub fn him_session(&self, session_id: &SessionId) -> Result<HimSessionView, ServiceError> {
        Ok(self.orchestrator.deps().him.session(session_id)?)
    }

    /// Cancels a HIM session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Him`] when the session is unknown.
    pub fn cancel_him_session(&self, session_id: &SessionId) -> Result<HimState, ServiceError> {
        Ok(self.orchestrator.deps().him.cancel(session_id)?)
    }

    /// Collects terminal HIM sessions past their grace period.
    ///
    /// Hosts call this periodically; it returns the number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Him`] when the session table cannot be updated.
    pub fn sweep_him_sessions(&self) -> Result<usize, ServiceError> {
        Ok(self.orchestrator.deps().him.sweep()?)
    }

    /// Selects a ledger.
    fn ledger(&self, kind: LedgerKind) -> &dyn Ledger {
        let deps = self.orchestrator.deps();
        match kind {
            LedgerKind::Audit => deps.audit_ledger.as_ref(),
            LedgerKind::Evidence => deps.evidence_ledger.as_ref(),
        }
    }
}
