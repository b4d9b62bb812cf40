// crates/rotation-gate-core/src/runtime/him.rs
// ============================================================================
// Module: Rotation Gate HIM Session Manager
// Description: Deadline-bounded state machine for human intervention.
// Purpose: Suspend automation until a person supplies validated input.
// Dependencies: crate::{core, interfaces}, tokio, tracing
// ============================================================================

//! ## Overview
//! Sessions move through
//! `Initialized -> AwaitingInput -> Validating -> Resuming -> Completed`, or
//! end in `Failed`, `Cancelled`, or `TimedOut`. Every operation that touches a
//! pending session first compares the clock against its deadline; a passed
//! deadline forces `TimedOut` before anything else happens, and the
//! transition is recorded once.
//!
//! A rejected response (wrong token or wrong input shape) counts as one
//! attempt. Reaching the attempt limit fails the session. Terminal states
//! are final; terminal sessions are collected by [`HimSessionManager::sweep`]
//! after the configured grace period. `create` runs the same collection when
//! the table is full, so expired history never holds capacity.
//!
//! The session table sits behind an `RwLock`. Inspections take the read lock
//! unless a deadline has passed and a transition must be written.
//!
//! Each session carries a [`tokio::sync::watch`] channel so
//! [`InterventionManager::wait`] wakes on state changes instead of polling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::Clock;
use crate::core::HimContext;
use crate::core::HimRejection;
use crate::core::HimRespondOutcome;
use crate::core::HimSession;
use crate::core::HimSessionView;
use crate::core::HimState;
use crate::core::HimTransition;
use crate::core::InterventionKind;
use crate::core::SecurityToken;
use crate::core::SessionId;
use crate::core::Timestamp;
use crate::core::hashing::random_hex;
use crate::interfaces::HimError;
use crate::interfaces::InterventionManager;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Security token size in random bytes.
const TOKEN_BYTES: usize = 32;
/// Shortest timer armed while waiting on a session.
const MIN_WAIT_INTERVAL: Duration = Duration::from_millis(1);

/// HIM session manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HimConfig {
    /// Time allowed for a response after creation.
    pub session_timeout: Duration,
    /// Rejected responses allowed before the session fails.
    pub max_attempts: u32,
    /// Time a terminal session is retained before collection.
    pub gc_grace: Duration,
    /// Maximum sessions held at once.
    pub max_sessions: usize,
}

impl Default for HimConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(300),
            max_attempts: 3,
            gc_grace: Duration::from_secs(60),
            max_sessions: 10_000,
        }
    }
}

impl HimConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message when a bound is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_timeout.is_zero() {
            return Err("him session timeout must be non-zero".to_string());
        }
        if self.max_attempts == 0 {
            return Err("him max_attempts must be at least 1".to_string());
        }
        if self.max_sessions == 0 {
            return Err("him max_sessions must be at least 1".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Session Slots
// ============================================================================

/// Session plus its state notifier.
struct SessionSlot {
    /// Session record.
    session: HimSession,
    /// State change notifier for waiters.
    notifier: watch::Sender<HimState>,
}

impl SessionSlot {
    /// Enters `state` at `now`, recording history and waking waiters.
    fn transition(&mut self, state: HimState, now: Timestamp) {
        self.session.state = state;
        self.session.history.push(HimTransition {
            state,
            at: now,
        });
        if state.is_terminal() {
            self.session.terminal_at = Some(now);
        }
        self.notifier.send_replace(state);
    }

    /// Returns true when a pending session is past its deadline.
    fn is_due(&self, now: Timestamp) -> bool {
        self.session.state.is_pending() && now >= self.session.expires_at
    }

    /// Forces `TimedOut` when a pending session is past its deadline.
    fn expire_if_due(&mut self, now: Timestamp) -> bool {
        if self.is_due(now) {
            self.session.last_error = Some("deadline passed".to_string());
            self.transition(HimState::TimedOut, now);
            info!(session_id = %self.session.session_id, "him session timed out");
            return true;
        }
        false
    }

    /// Builds a respond outcome from the current session state.
    fn outcome(&self, rejection: Option<HimRejection>) -> HimRespondOutcome {
        HimRespondOutcome {
            session_id: self.session.session_id.clone(),
            state: self.session.state,
            attempts: self.session.attempts,
            attempts_remaining: self.session.max_attempts.saturating_sub(self.session.attempts),
            rejection,
        }
    }

    /// Returns a terminal-state error for this session.
    fn terminal_error(&self) -> HimError {
        HimError::Terminal {
            session_id: self.session.session_id.clone(),
            state: self.session.state,
        }
    }
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// In-memory [`InterventionManager`].
pub struct HimSessionManager {
    /// Manager configuration.
    config: HimConfig,
    /// Clock used for deadlines.
    clock: Arc<dyn Clock>,
    /// Sessions keyed by id.
    sessions: RwLock<HashMap<SessionId, SessionSlot>>,
}

impl HimSessionManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(config: HimConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the manager configuration.
    #[must_use]
    pub const fn config(&self) -> HimConfig {
        self.config
    }

    /// Returns the number of sessions currently held.
    ///
    /// # Errors
    ///
    /// Returns [`HimError::Poisoned`] when the session table is poisoned.
    pub fn session_count(&self) -> Result<usize, HimError> {
        Ok(self.read()?.len())
    }

    /// Locks the session table for inspection.
    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<SessionId, SessionSlot>>, HimError> {
        self.sessions.read().map_err(|_| HimError::Poisoned)
    }

    /// Locks the session table for transitions.
    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, SessionSlot>>, HimError> {
        self.sessions.write().map_err(|_| HimError::Poisoned)
    }

    /// Times out overdue sessions and drops terminal ones past `grace`.
    fn collect(
        sessions: &mut HashMap<SessionId, SessionSlot>,
        now: Timestamp,
        grace: Duration,
    ) -> usize {
        for slot in sessions.values_mut() {
            slot.expire_if_due(now);
        }
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.session.terminal_at.is_none_or(|terminal_at| terminal_at.saturating_add(grace) > now)
        });
        before - sessions.len()
    }

    /// Records a rejected response and returns the resulting outcome.
    fn reject(slot: &mut SessionSlot, rejection: HimRejection, now: Timestamp) -> HimRespondOutcome {
        slot.session.attempts = slot.session.attempts.saturating_add(1);
        let detail = match &rejection {
            HimRejection::TokenMismatch => "security token mismatch".to_string(),
            HimRejection::InvalidFormat(detail) => detail.clone(),
            HimRejection::Expired => "deadline passed".to_string(),
        };
        slot.session.last_error = Some(detail);
        let next = if slot.session.attempts >= slot.session.max_attempts {
            HimState::Failed
        } else {
            HimState::AwaitingInput
        };
        slot.transition(next, now);
        warn!(
            session_id = %slot.session.session_id,
            attempts = slot.session.attempts,
            max_attempts = slot.session.max_attempts,
            state = next.as_str(),
            "him response rejected"
        );
        slot.outcome(Some(rejection))
    }
}

#[async_trait]
impl InterventionManager for HimSessionManager {
    fn create(
        &self,
        kind: InterventionKind,
        context: HimContext,
    ) -> Result<HimSession, HimError> {
        let now = self.clock.now();
        let mut sessions = self.write()?;
        if sessions.len() >= self.config.max_sessions {
            let removed = Self::collect(&mut sessions, now, self.config.gc_grace);
            if removed > 0 {
                debug!(removed, remaining = sessions.len(), "him sessions collected at capacity");
            }
        }
        if sessions.len() >= self.config.max_sessions {
            warn!(max_sessions = self.config.max_sessions, "him session capacity exceeded");
            return Err(HimError::CapacityExceeded(self.config.max_sessions));
        }
        let session = HimSession {
            session_id: SessionId::generate(),
            security_token: SecurityToken::new(random_hex(TOKEN_BYTES)),
            kind,
            context,
            state: HimState::Initialized,
            created_at: now,
            expires_at: now.saturating_add(self.config.session_timeout),
            attempts: 0,
            max_attempts: self.config.max_attempts,
            last_error: None,
            terminal_at: None,
            history: vec![HimTransition {
                state: HimState::Initialized,
                at: now,
            }],
        };
        let (notifier, _) = watch::channel(HimState::Initialized);
        sessions.insert(session.session_id.clone(), SessionSlot {
            session: session.clone(),
            notifier,
        });
        info!(
            session_id = %session.session_id,
            kind = kind.as_str(),
            target_id = %session.context.target_id,
            "him session created"
        );
        Ok(session)
    }

    fn mark_awaiting_input(&self, session_id: &SessionId) -> Result<HimState, HimError> {
        let now = self.clock.now();
        let mut sessions = self.write()?;
        let slot =
            sessions.get_mut(session_id).ok_or_else(|| HimError::NotFound(session_id.clone()))?;
        slot.expire_if_due(now);
        match slot.session.state {
            HimState::Initialized => {
                slot.transition(HimState::AwaitingInput, now);
                debug!(session_id = %session_id, "him prompt delivered");
                Ok(HimState::AwaitingInput)
            }
            HimState::AwaitingInput => Ok(HimState::AwaitingInput),
            _ => Err(slot.terminal_error()),
        }
    }

    fn respond(
        &self,
        session_id: &SessionId,
        token: &str,
        data: &Value,
    ) -> Result<HimRespondOutcome, HimError> {
        let now = self.clock.now();
        let mut sessions = self.write()?;
        let slot =
            sessions.get_mut(session_id).ok_or_else(|| HimError::NotFound(session_id.clone()))?;
        if slot.expire_if_due(now) {
            return Ok(slot.outcome(Some(HimRejection::Expired)));
        }
        if !slot.session.state.is_pending() {
            return Err(slot.terminal_error());
        }

        slot.transition(HimState::Validating, now);
        if !slot.session.security_token.matches(token) {
            return Ok(Self::reject(slot, HimRejection::TokenMismatch, now));
        }
        if let Err(detail) = slot.session.kind.validate_input(data) {
            return Ok(Self::reject(slot, HimRejection::InvalidFormat(detail), now));
        }

        slot.session.last_error = None;
        slot.transition(HimState::Resuming, now);
        slot.transition(HimState::Completed, now);
        info!(session_id = %session_id, "him session completed");
        Ok(slot.outcome(None))
    }

    fn cancel(&self, session_id: &SessionId) -> Result<HimState, HimError> {
        let now = self.clock.now();
        let mut sessions = self.write()?;
        let slot =
            sessions.get_mut(session_id).ok_or_else(|| HimError::NotFound(session_id.clone()))?;
        slot.expire_if_due(now);
        if slot.session.state.is_terminal() {
            return Ok(slot.session.state);
        }
        slot.transition(HimState::Cancelled, now);
        info!(session_id = %session_id, "him session cancelled");
        Ok(HimState::Cancelled)
    }

    fn session(&self, session_id: &SessionId) -> Result<HimSessionView, HimError> {
        let now = self.clock.now();
        {
            let sessions = self.read()?;
            let slot =
                sessions.get(session_id).ok_or_else(|| HimError::NotFound(session_id.clone()))?;
            if !slot.is_due(now) {
                return Ok(slot.session.view());
            }
        }
        let mut sessions = self.write()?;
        let slot =
            sessions.get_mut(session_id).ok_or_else(|| HimError::NotFound(session_id.clone()))?;
        slot.expire_if_due(now);
        Ok(slot.session.view())
    }

    fn sweep(&self) -> Result<usize, HimError> {
        let now = self.clock.now();
        let grace = self.config.gc_grace;
        let mut sessions = self.write()?;
        let removed = Self::collect(&mut sessions, now, grace);
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "him sessions collected");
        }
        Ok(removed)
    }

    async fn wait(&self, session_id: &SessionId) -> Result<HimSessionView, HimError> {
        // Subscribe before the first inspection so no transition is missed.
        let mut receiver = {
            let sessions = self.read()?;
            let slot =
                sessions.get(session_id).ok_or_else(|| HimError::NotFound(session_id.clone()))?;
            slot.notifier.subscribe()
        };
        loop {
            let view = self.session(session_id)?;
            if view.state.is_terminal() {
                return Ok(view);
            }
            let remaining = self.clock.now().until(view.expires_at).max(MIN_WAIT_INTERVAL);
            match tokio::time::timeout(remaining, receiver.changed()).await {
                Ok(Ok(())) | Err(_) => {}
                Ok(Err(_)) => return self.session(session_id),
            }
        }
    }
}
