// crates/rotation-gate-core/src/core/decision.rs
// ============================================================================
// Module: Rotation Gate Decisions
// Description: Compliance decision outcomes and records.
// Purpose: Carry the validator's categorical result with its justification.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Decision`] is immutable once produced. When rule evaluation is
//! uncertain, the configured [`UncertainPolicy`] is substituted; the decision
//! keeps the pre-substitution outcome in [`Decision::evaluated`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::action::AutomationMethod;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::TargetId;
use crate::core::rules::RateLimit;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Categorical compliance outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Automation may proceed.
    Allowed,
    /// Automation is prohibited.
    Blocked,
    /// Automation may proceed only with human input.
    HimRequired,
    /// Automation is switched off by the operator.
    Disabled,
    /// Rules did not settle the question.
    Uncertain,
}

impl DecisionOutcome {
    /// Returns a stable boundary code for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
            Self::HimRequired => "him_required",
            Self::Disabled => "disabled",
            Self::Uncertain => "uncertain",
        }
    }
}

/// Outcome substituted when evaluation is uncertain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertainPolicy {
    /// Treat uncertainty as allowed.
    Allowed,
    /// Treat uncertainty as blocked.
    Blocked,
    /// Route uncertainty through human intervention.
    #[default]
    HimRequired,
}

impl From<UncertainPolicy> for DecisionOutcome {
    fn from(policy: UncertainPolicy) -> Self {
        match policy {
            UncertainPolicy::Allowed => Self::Allowed,
            UncertainPolicy::Blocked => Self::Blocked,
            UncertainPolicy::HimRequired => Self::HimRequired,
        }
    }
}

// ============================================================================
// SECTION: Decision Record
// ============================================================================

/// Validator output for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Target identifier the decision applies to.
    pub target_id: TargetId,
    /// Final outcome returned to the caller.
    pub outcome: DecisionOutcome,
    /// Outcome produced by rule evaluation before default substitution.
    pub evaluated: DecisionOutcome,
    /// Recommended automation method.
    pub method: AutomationMethod,
    /// Rules that produced the decision, sorted by identifier.
    pub applied_rules: Vec<RuleId>,
    /// Most restrictive rate limit among applicable rules.
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    /// Human-readable reason.
    pub reason: String,
}

impl Decision {
    /// Returns true when the uncertain-default policy replaced the evaluated outcome.
    #[must_use]
    pub fn is_substituted(&self) -> bool {
        self.evaluated != self.outcome
    }

    /// Returns true when automation may proceed without human input.
    #[must_use]
    pub fn permits_automation(&self) -> bool {
        self.outcome == DecisionOutcome::Allowed
    }
}
