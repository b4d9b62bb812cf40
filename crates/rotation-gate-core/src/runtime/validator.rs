// crates/rotation-gate-core/src/runtime/validator.rs
// ============================================================================
// Module: Rotation Gate Compliance Validator
// Description: Priority-ordered rule resolution over a cached rule set.
// Purpose: Classify a proposed automation action before anything runs.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`RuleValidator`] is a pure function of a rule set, an action, and its
//! configuration. Applicable rules are selected by category, then the first
//! matching priority wins:
//!
//! 1. critical rule prohibiting automation: blocked
//! 2. high rule prohibiting automation: blocked
//! 3. rule requiring human confirmation: human intervention required
//! 4. every applicable rule permits automation: allowed
//! 5. anything else: uncertain, replaced by the configured default
//!
//! Rule ids are sorted before they are reported, so the decision does not
//! depend on rule order inside the rule set. An empty applicable set is
//! never read as permission.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Action;
use crate::core::AutomationMethod;
use crate::core::Decision;
use crate::core::DecisionOutcome;
use crate::core::RateLimit;
use crate::core::Rule;
use crate::core::RuleCategory;
use crate::core::RuleId;
use crate::core::RuleSet;
use crate::core::Severity;
use crate::core::UncertainPolicy;
use crate::interfaces::ComplianceValidator;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Validator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Outcome substituted for uncertain evaluations.
    pub default_on_uncertain: UncertainPolicy,
    /// Global automation switch; `false` disables every action.
    pub automation_enabled: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            default_on_uncertain: UncertainPolicy::HimRequired,
            automation_enabled: true,
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Category-matching compliance validator.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    /// Validator configuration.
    config: ValidatorConfig,
}

impl RuleValidator {
    /// Creates a validator with the given configuration.
    #[must_use]
    pub const fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the validator configuration.
    #[must_use]
    pub const fn config(&self) -> ValidatorConfig {
        self.config
    }

    /// Builds a decision with the recommended method filled in.
    fn finish(
        &self,
        action: &Action,
        evaluated: DecisionOutcome,
        applied: &[&Rule],
        rate_limit: Option<RateLimit>,
        reason: String,
    ) -> Decision {
        let outcome = match evaluated {
            DecisionOutcome::Uncertain => DecisionOutcome::from(self.config.default_on_uncertain),
            other => other,
        };
        Decision {
            target_id: action.target_id.clone(),
            outcome,
            evaluated,
            method: self.recommend_method(outcome, action),
            applied_rules: sorted_ids(applied),
            rate_limit,
            reason,
        }
    }
}

impl ComplianceValidator for RuleValidator {
    fn applicable_rules<'a>(&self, rule_set: &'a RuleSet, action: &Action) -> Vec<&'a Rule> {
        rule_set.rules.iter().filter(|rule| rule_applies(rule.category, action)).collect()
    }

    fn decide(&self, rule_set: &RuleSet, action: &Action) -> Decision {
        if !self.config.automation_enabled {
            return Decision {
                target_id: action.target_id.clone(),
                outcome: DecisionOutcome::Disabled,
                evaluated: DecisionOutcome::Disabled,
                method: AutomationMethod::Manual,
                applied_rules: Vec::new(),
                rate_limit: None,
                reason: "automation is disabled".to_string(),
            };
        }

        let applicable = self.applicable_rules(rule_set, action);
        let rate_limit = most_restrictive_rate_limit(&applicable);

        for severity in [Severity::Critical, Severity::High] {
            let prohibiting: Vec<&Rule> = applicable
                .iter()
                .copied()
                .filter(|rule| rule.severity == severity && rule.implications.prohibits_automation())
                .collect();
            if let Some(first) = first_id(&prohibiting) {
                let reason =
                    format!("rule {first} prohibits automation ({} severity)", severity.as_str());
                return self.finish(action, DecisionOutcome::Blocked, &prohibiting, rate_limit, reason);
            }
        }

        let confirming: Vec<&Rule> = applicable
            .iter()
            .copied()
            .filter(|rule| rule.implications.requires_human_confirmation)
            .collect();
        if let Some(first) = first_id(&confirming) {
            let reason = format!("rule {first} requires human confirmation");
            return self.finish(action, DecisionOutcome::HimRequired, &confirming, rate_limit, reason);
        }

        if !applicable.is_empty()
            && applicable.iter().all(|rule| rule.implications.permits_automation())
        {
            let reason = format!("all {} applicable rules permit automation", applicable.len());
            return self.finish(action, DecisionOutcome::Allowed, &applicable, rate_limit, reason);
        }

        let reason = if applicable.is_empty() {
            "no applicable rules".to_string()
        } else {
            format!("{} applicable rules do not settle automation", applicable.len())
        };
        self.finish(action, DecisionOutcome::Uncertain, &applicable, rate_limit, reason)
    }

    fn recommend_method(&self, outcome: DecisionOutcome, action: &Action) -> AutomationMethod {
        match outcome {
            DecisionOutcome::Allowed => {
                if action.supports_api {
                    AutomationMethod::ProgrammaticApi
                } else {
                    AutomationMethod::HeadlessBrowser
                }
            }
            DecisionOutcome::HimRequired => AutomationMethod::HimAssisted,
            DecisionOutcome::Uncertain => self.recommend_method(
                DecisionOutcome::from(self.config.default_on_uncertain),
                action,
            ),
            DecisionOutcome::Blocked | DecisionOutcome::Disabled => AutomationMethod::Manual,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when a rule category applies to the action.
const fn rule_applies(category: RuleCategory, action: &Action) -> bool {
    match category {
        RuleCategory::GeneralAutomation | RuleCategory::RateLimiting => true,
        RuleCategory::AccountModification => action.kind.is_write(),
        RuleCategory::DataAccess => action.kind.is_read(),
        RuleCategory::MultiFactor => action.kind.is_update(),
        RuleCategory::ProgrammaticApi => action.method.is_api_based(),
    }
}

/// Returns rule ids in sorted order.
fn sorted_ids(rules: &[&Rule]) -> Vec<RuleId> {
    let mut ids: Vec<RuleId> = rules.iter().map(|rule| rule.rule_id.clone()).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Returns the lowest rule id, used to cite a deterministic reason.
fn first_id<'a>(rules: &[&'a Rule]) -> Option<&'a RuleId> {
    rules.iter().map(|rule| &rule.rule_id).min()
}

/// Returns the rate limit allowing the fewest requests per second.
fn most_restrictive_rate_limit(rules: &[&Rule]) -> Option<RateLimit> {
    rules.iter().filter_map(|rule| rule.implications.rate_limit).min_by(|left, right| {
        let left_rate = u128::from(left.max_requests) * u128::from(right.window_secs);
        let right_rate = u128::from(right.max_requests) * u128::from(left.window_secs);
        left_rate
            .cmp(&right_rate)
            .then(left.max_requests.cmp(&right.max_requests))
            .then(right.window_secs.cmp(&left.window_secs))
    })
}
