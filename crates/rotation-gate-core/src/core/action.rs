// crates/rotation-gate-core/src/core/action.rs
// ============================================================================
// Module: Rotation Gate Actions
// Description: Proposed automation steps submitted for compliance validation.
// Purpose: Describe what automation wants to do and how.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An [`Action`] is ephemeral: it exists for one validation call. Malformed
//! actions are rejected at the boundary before any rule is consulted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TargetId;

// ============================================================================
// SECTION: Action Types
// ============================================================================

/// Kind of operation an automation step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Reads account data.
    Read,
    /// Creates account data.
    Create,
    /// Updates account data, including credential updates.
    Update,
    /// Deletes account data.
    Delete,
}

impl ActionKind {
    /// Returns true for read actions.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }

    /// Returns true for actions that modify account state.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }

    /// Returns true for update actions.
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::Update)
    }
}

/// Automation method under consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationMethod {
    /// Scripted headless browser session.
    HeadlessBrowser,
    /// Documented programmatic API.
    ProgrammaticApi,
    /// Performed by a person without automation.
    Manual,
    /// Automation paused for human-in-the-middle input.
    HimAssisted,
}

impl AutomationMethod {
    /// Returns true for API-based methods.
    #[must_use]
    pub const fn is_api_based(self) -> bool {
        matches!(self, Self::ProgrammaticApi)
    }

    /// Returns a stable label for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeadlessBrowser => "headless_browser",
            Self::ProgrammaticApi => "programmatic_api",
            Self::Manual => "manual",
            Self::HimAssisted => "him_assisted",
        }
    }
}

/// Proposed automation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Target identifier.
    pub target_id: TargetId,
    /// Operation kind.
    pub kind: ActionKind,
    /// Candidate automation method.
    pub method: AutomationMethod,
    /// Whether the target offers a programmatic API for this action.
    pub supports_api: bool,
}

impl Action {
    /// Creates an action; API support is inferred from the method.
    #[must_use]
    pub fn new(target_id: impl Into<TargetId>, kind: ActionKind, method: AutomationMethod) -> Self {
        Self {
            target_id: target_id.into(),
            kind,
            method,
            supports_api: method.is_api_based(),
        }
    }

    /// Overrides whether the target offers a programmatic API.
    #[must_use]
    pub const fn with_api_support(mut self, supports_api: bool) -> Self {
        self.supports_api = supports_api;
        self
    }

    /// Validates the action shape.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the action is malformed.
    pub fn validate(&self) -> Result<(), ActionError> {
        if self.target_id.as_str().trim().is_empty() {
            return Err(ActionError::EmptyTarget);
        }
        if self.method.is_api_based() && !self.supports_api {
            return Err(ActionError::ApiUnsupported(self.target_id.to_string()));
        }
        Ok(())
    }
}

/// Malformed action errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Target identifier is empty.
    #[error("action target id must not be empty")]
    EmptyTarget,
    /// API method proposed for a target without API support.
    #[error("programmatic api proposed but target {0} does not support it")]
    ApiUnsupported(String),
}
