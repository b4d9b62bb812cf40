// crates/rotation-gate-core/src/core/mod.rs
// ============================================================================
// Module: Rotation Gate Core Types
// Description: Canonical rule, decision, ledger, and session structures.
// Purpose: Provide stable, serializable types shared by every component.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define compliance rule sets, proposed actions, decisions,
//! ledger entries, and human-intervention sessions. These types are the
//! canonical source of truth for any derived API surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod action;
pub mod decision;
pub mod hashing;
pub mod him;
pub mod identifiers;
pub mod ledger;
pub mod rotation;
pub mod rules;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use action::Action;
pub use action::ActionError;
pub use action::ActionKind;
pub use action::AutomationMethod;
pub use decision::Decision;
pub use decision::DecisionOutcome;
pub use decision::UncertainPolicy;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::SubjectHash;
pub use hashing::SubjectHasher;
pub use him::HimContext;
pub use him::HimPrompt;
pub use him::HimRejection;
pub use him::HimRespondOutcome;
pub use him::HimSession;
pub use him::HimSessionView;
pub use him::HimState;
pub use him::HimTransition;
pub use him::InterventionKind;
pub use him::SecurityToken;
pub use identifiers::CredentialId;
pub use identifiers::EntryId;
pub use identifiers::EventType;
pub use identifiers::RuleId;
pub use identifiers::SessionId;
pub use identifiers::TargetId;
pub use ledger::LedgerEntry;
pub use ledger::LedgerFilter;
pub use ledger::LedgerRange;
pub use ledger::LedgerViolation;
pub use ledger::VerificationReport;
pub use ledger::VerificationStatus;
pub use ledger::ViolationKind;
pub use rotation::CharacterClass;
pub use rotation::Credential;
pub use rotation::FailureInfo;
pub use rotation::PolicyDocument;
pub use rotation::RotationPolicy;
pub use rotation::RotationPolicyError;
pub use rotation::RotationResult;
pub use rotation::RotationStatus;
pub use rotation::SecretValue;
pub use rules::AutomationStance;
pub use rules::CacheStats;
pub use rules::RateLimit;
pub use rules::Rule;
pub use rules::RuleCategory;
pub use rules::RuleImplications;
pub use rules::RuleSet;
pub use rules::RuleSetSummary;
pub use rules::Severity;
pub use self::time::Clock;
pub use self::time::ManualClock;
pub use self::time::SystemClock;
pub use self::time::Timestamp;
