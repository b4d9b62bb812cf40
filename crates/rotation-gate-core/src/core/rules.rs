// crates/rotation-gate-core/src/core/rules.rs
// ============================================================================
// Module: Rotation Gate Compliance Rules
// Description: Rule, rule set, and cache summary structures.
// Purpose: Model the compliance posture derived for one target.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RuleSet`] is produced by an external policy-analysis step and is
//! treated as already validated. Rule sets are immutable: refreshing a target
//! replaces the whole set, it never edits rules in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::decision::DecisionOutcome;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::TargetId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Rule Classification
// ============================================================================

/// Fixed rule category enumeration used for applicability matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Applies to every action.
    GeneralAutomation,
    /// Applies to write and update actions.
    AccountModification,
    /// Applies to every action.
    RateLimiting,
    /// Applies to read actions.
    DataAccess,
    /// Applies to update actions.
    MultiFactor,
    /// Applies only when the candidate method is API based.
    ProgrammaticApi,
}

/// Rule severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational constraint.
    Low,
    /// Moderate constraint.
    Medium,
    /// Strong constraint.
    High,
    /// Hard constraint.
    Critical,
}

impl Severity {
    /// Returns the stable string code for this severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// A rule's stance on automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStance {
    /// The rule explicitly permits automation.
    Permitted,
    /// The rule prohibits automation.
    Prohibited,
    /// The rule is silent on automation.
    Unspecified,
}

/// Numeric rate limit carried by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimit {
    /// Maximum requests permitted per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

/// Structured implications extracted from a rule's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleImplications {
    /// Automation stance.
    pub automation: AutomationStance,
    /// Whether a human must confirm the action.
    pub requires_human_confirmation: bool,
    /// Optional numeric rate limit.
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

impl RuleImplications {
    /// Returns true when the rule prohibits automation.
    #[must_use]
    pub fn prohibits_automation(&self) -> bool {
        self.automation == AutomationStance::Prohibited
    }

    /// Returns true when the rule explicitly permits automation.
    #[must_use]
    pub fn permits_automation(&self) -> bool {
        self.automation == AutomationStance::Permitted
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// One immutable compliance constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Rule category.
    pub category: RuleCategory,
    /// Rule severity.
    pub severity: Severity,
    /// Free-text description from the source document.
    pub description: String,
    /// Structured implications.
    pub implications: RuleImplications,
    /// Analysis confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Compliance posture for one target identifier.
///
/// # Invariants
/// - Expiry is absolute wall-clock time; `expires_at <= now` means expired.
/// - Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Target identifier.
    pub target_id: TargetId,
    /// Version or hash of the source policy document.
    pub source_version: String,
    /// Rules (insertion order is irrelevant).
    pub rules: Vec<Rule>,
    /// Default decision recommended by the analysis step.
    pub recommendation: DecisionOutcome,
    /// Overall analysis confidence in `[0, 1]`.
    pub confidence: f64,
    /// Creation time.
    pub created_at: Timestamp,
    /// Absolute expiry time.
    pub expires_at: Timestamp,
}

impl RuleSet {
    /// Returns true when the rule set is expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Returns the rule with the given identifier.
    #[must_use]
    pub fn rule(&self, rule_id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|rule| &rule.rule_id == rule_id)
    }

    /// Builds a listing summary for this rule set.
    #[must_use]
    pub fn summary(&self, now: Timestamp) -> RuleSetSummary {
        RuleSetSummary {
            target_id: self.target_id.clone(),
            source_version: self.source_version.clone(),
            rule_count: self.rules.len(),
            recommendation: self.recommendation,
            confidence: self.confidence,
            created_at: self.created_at,
            expires_at: self.expires_at,
            expired: self.is_expired(now),
        }
    }
}

// ============================================================================
// SECTION: Cache Views
// ============================================================================

/// Listing entry returned by rule cache listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSummary {
    /// Target identifier.
    pub target_id: TargetId,
    /// Source document version.
    pub source_version: String,
    /// Number of rules.
    pub rule_count: usize,
    /// Recommended default decision.
    pub recommendation: DecisionOutcome,
    /// Analysis confidence.
    pub confidence: f64,
    /// Creation time.
    pub created_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
    /// Whether the entry was expired when listed.
    pub expired: bool,
}

/// Rule cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries that are not expired.
    pub valid_count: usize,
    /// Entries that are expired but not yet replaced or invalidated.
    pub expired_count: usize,
    /// Total `get` calls served.
    pub total_lookups: u64,
}
