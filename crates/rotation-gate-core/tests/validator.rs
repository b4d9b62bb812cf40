// crates/rotation-gate-core/tests/validator.rs
// ============================================================================
// Module: Compliance Validator Tests
// Description: Priority resolution, applicability, and method recommendation.
// ============================================================================
//! ## Overview
//! Covers each decision priority, uncertain-default substitution, the kill
//! switch, rate limit selection, and method recommendations.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use rotation_gate_core::Action;
use rotation_gate_core::ActionKind;
use rotation_gate_core::AutomationMethod;
use rotation_gate_core::AutomationStance;
use rotation_gate_core::ComplianceValidator;
use rotation_gate_core::DecisionOutcome;
use rotation_gate_core::RateLimit;
use rotation_gate_core::RuleCategory;
use rotation_gate_core::RuleId;
use rotation_gate_core::RuleValidator;
use rotation_gate_core::Severity;
use rotation_gate_core::Timestamp;
use rotation_gate_core::UncertainPolicy;
use rotation_gate_core::ValidatorConfig;

mod common;
use crate::common::T0;
use crate::common::rule;
use crate::common::rule_set;

fn update(target: &str) -> Action {
    Action::new(target, ActionKind::Update, AutomationMethod::HeadlessBrowser)
}

fn validator(default_on_uncertain: UncertainPolicy) -> RuleValidator {
    RuleValidator::new(ValidatorConfig {
        default_on_uncertain,
        automation_enabled: true,
    })
}

fn ids(values: &[&str]) -> Vec<RuleId> {
    values.iter().map(|value| RuleId::new(*value)).collect()
}

fn now() -> Timestamp {
    Timestamp::from_unix_millis(T0)
}

// ============================================================================
// SECTION: Priorities
// ============================================================================

#[test]
fn critical_prohibition_blocks() {
    let rules = rule_set(
        "x",
        vec![
            rule("permit", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false),
            rule("tos-7", RuleCategory::AccountModification, Severity::Critical, AutomationStance::Prohibited, false),
        ],
        now(),
    );
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(decision.outcome, DecisionOutcome::Blocked);
    assert_eq!(decision.evaluated, DecisionOutcome::Blocked);
    assert_eq!(decision.applied_rules, ids(&["tos-7"]));
    assert_eq!(decision.method, AutomationMethod::Manual);
    assert_eq!(decision.reason, "rule tos-7 prohibits automation (critical severity)");
    assert!(!decision.permits_automation());
}

#[test]
fn critical_outranks_high_and_confirmation() {
    let rules = rule_set(
        "x",
        vec![
            rule("a-high", RuleCategory::GeneralAutomation, Severity::High, AutomationStance::Prohibited, false),
            rule("b-confirm", RuleCategory::MultiFactor, Severity::Low, AutomationStance::Permitted, true),
            rule("c-critical", RuleCategory::GeneralAutomation, Severity::Critical, AutomationStance::Prohibited, false),
        ],
        now(),
    );
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(decision.outcome, DecisionOutcome::Blocked);
    assert_eq!(decision.applied_rules, ids(&["c-critical"]));
}

#[test]
fn high_prohibition_blocks() {
    let rules = rule_set(
        "x",
        vec![
            rule("z-high", RuleCategory::GeneralAutomation, Severity::High, AutomationStance::Prohibited, false),
            rule("y-high", RuleCategory::RateLimiting, Severity::High, AutomationStance::Prohibited, false),
            rule("confirm", RuleCategory::MultiFactor, Severity::Low, AutomationStance::Permitted, true),
        ],
        now(),
    );
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(decision.outcome, DecisionOutcome::Blocked);
    assert_eq!(decision.applied_rules, ids(&["y-high", "z-high"]));
    assert_eq!(decision.reason, "rule y-high prohibits automation (high severity)");
}

#[test]
fn lower_severity_prohibition_is_uncertain() {
    let rules = rule_set(
        "x",
        vec![rule("medium", RuleCategory::GeneralAutomation, Severity::Medium, AutomationStance::Prohibited, false)],
        now(),
    );
    let decision = validator(UncertainPolicy::Blocked).decide(&rules, &update("x"));
    assert_eq!(decision.evaluated, DecisionOutcome::Uncertain);
    assert_eq!(decision.outcome, DecisionOutcome::Blocked);
    assert!(decision.is_substituted());
}

#[test]
fn confirmation_requires_him() {
    let rules = rule_set(
        "x",
        vec![
            rule("permit", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false),
            rule("mfa", RuleCategory::MultiFactor, Severity::Medium, AutomationStance::Permitted, true),
        ],
        now(),
    );
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(decision.outcome, DecisionOutcome::HimRequired);
    assert_eq!(decision.applied_rules, ids(&["mfa"]));
    assert_eq!(decision.method, AutomationMethod::HimAssisted);
    assert!(!decision.is_substituted());
}

#[test]
fn unanimous_permission_allows() {
    let rules = rule_set(
        "x",
        vec![
            rule("b", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false),
            rule("a", RuleCategory::AccountModification, Severity::High, AutomationStance::Permitted, false),
        ],
        now(),
    );
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(decision.outcome, DecisionOutcome::Allowed);
    assert_eq!(decision.applied_rules, ids(&["a", "b"]));
    assert_eq!(decision.method, AutomationMethod::HeadlessBrowser);
    assert!(decision.permits_automation());
}

#[test]
fn unspecified_stance_is_uncertain() {
    let rules = rule_set(
        "x",
        vec![
            rule("permit", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false),
            rule("silent", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Unspecified, false),
        ],
        now(),
    );
    let decision = validator(UncertainPolicy::Allowed).decide(&rules, &update("x"));
    assert_eq!(decision.evaluated, DecisionOutcome::Uncertain);
    assert_eq!(decision.outcome, DecisionOutcome::Allowed);
    assert_eq!(decision.applied_rules, ids(&["permit", "silent"]));
}

#[test]
fn empty_applicable_set_defaults_to_him() {
    let rules = rule_set(
        "x",
        vec![rule("reads", RuleCategory::DataAccess, Severity::Critical, AutomationStance::Prohibited, false)],
        now(),
    );
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(decision.evaluated, DecisionOutcome::Uncertain);
    assert_eq!(decision.outcome, DecisionOutcome::HimRequired);
    assert!(decision.applied_rules.is_empty());
    assert_eq!(decision.reason, "no applicable rules");
    assert_eq!(decision.method, AutomationMethod::HimAssisted);

    let empty = rule_set("x", Vec::new(), now());
    let blocked = validator(UncertainPolicy::Blocked).decide(&empty, &update("x"));
    assert_eq!(blocked.outcome, DecisionOutcome::Blocked);
    assert_eq!(blocked.method, AutomationMethod::Manual);
}

#[test]
fn kill_switch_disables() {
    let rules = rule_set(
        "x",
        vec![rule("permit", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false)],
        now(),
    );
    let validator = RuleValidator::new(ValidatorConfig {
        automation_enabled: false,
        ..ValidatorConfig::default()
    });
    let decision = validator.decide(&rules, &update("x"));
    assert_eq!(decision.outcome, DecisionOutcome::Disabled);
    assert_eq!(decision.method, AutomationMethod::Manual);
    assert!(decision.applied_rules.is_empty());
}

// ============================================================================
// SECTION: Applicability
// ============================================================================

#[test]
fn categories_apply_by_action() {
    let rules = rule_set(
        "x",
        vec![
            rule("data", RuleCategory::DataAccess, Severity::Low, AutomationStance::Permitted, false),
            rule("modify", RuleCategory::AccountModification, Severity::Low, AutomationStance::Permitted, false),
            rule("mfa", RuleCategory::MultiFactor, Severity::Low, AutomationStance::Permitted, false),
            rule("api", RuleCategory::ProgrammaticApi, Severity::Low, AutomationStance::Permitted, false),
            rule("general", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false),
            rule("rate", RuleCategory::RateLimiting, Severity::Low, AutomationStance::Permitted, false),
        ],
        now(),
    );
    let validator = RuleValidator::default();
    let applied = |action: &Action| -> Vec<String> {
        let mut names: Vec<String> = validator
            .applicable_rules(&rules, action)
            .into_iter()
            .map(|rule| rule.rule_id.to_string())
            .collect();
        names.sort();
        names
    };

    let read = Action::new("x", ActionKind::Read, AutomationMethod::HeadlessBrowser);
    assert_eq!(applied(&read), vec!["data", "general", "rate"]);
    let create = Action::new("x", ActionKind::Create, AutomationMethod::HeadlessBrowser);
    assert_eq!(applied(&create), vec!["general", "modify", "rate"]);
    assert_eq!(applied(&update("x")), vec!["general", "mfa", "modify", "rate"]);
    let api_delete = Action::new("x", ActionKind::Delete, AutomationMethod::ProgrammaticApi);
    assert_eq!(applied(&api_delete), vec!["api", "general", "modify", "rate"]);
}

#[test]
fn most_restrictive_rate_limit_wins() {
    let mut slow = rule("slow", RuleCategory::RateLimiting, Severity::Low, AutomationStance::Permitted, false);
    slow.implications.rate_limit = Some(RateLimit {
        max_requests: 10,
        window_secs: 3600,
    });
    let mut fast = rule("fast", RuleCategory::GeneralAutomation, Severity::Low, AutomationStance::Permitted, false);
    fast.implications.rate_limit = Some(RateLimit {
        max_requests: 5,
        window_secs: 60,
    });
    let mut reads = rule("reads", RuleCategory::DataAccess, Severity::Low, AutomationStance::Permitted, false);
    reads.implications.rate_limit = Some(RateLimit {
        max_requests: 1,
        window_secs: 86_400,
    });
    let rules = rule_set("x", vec![fast, slow, reads], now());
    let decision = RuleValidator::default().decide(&rules, &update("x"));
    assert_eq!(
        decision.rate_limit,
        Some(RateLimit {
            max_requests: 10,
            window_secs: 3600,
        })
    );
}

// ============================================================================
// SECTION: Methods
// ============================================================================

#[test]
fn recommended_methods() {
    let validator = validator(UncertainPolicy::Allowed);
    let browser = update("x");
    let api = update("x").with_api_support(true);
    assert_eq!(validator.recommend_method(DecisionOutcome::Allowed, &browser), AutomationMethod::HeadlessBrowser);
    assert_eq!(validator.recommend_method(DecisionOutcome::Allowed, &api), AutomationMethod::ProgrammaticApi);
    assert_eq!(validator.recommend_method(DecisionOutcome::HimRequired, &api), AutomationMethod::HimAssisted);
    assert_eq!(validator.recommend_method(DecisionOutcome::Blocked, &api), AutomationMethod::Manual);
    assert_eq!(validator.recommend_method(DecisionOutcome::Disabled, &api), AutomationMethod::Manual);
    assert_eq!(validator.recommend_method(DecisionOutcome::Uncertain, &api), AutomationMethod::ProgrammaticApi);
}

#[test]
fn action_validation() {
    assert!(update("x").validate().is_ok());
    assert!(update(" ").validate().is_err());
    let mut api = Action::new("x", ActionKind::Update, AutomationMethod::ProgrammaticApi);
    assert!(api.supports_api);
    api.supports_api = false;
    assert!(api.validate().is_err());
}
