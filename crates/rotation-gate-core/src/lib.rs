// crates/rotation-gate-core/src/lib.rs
// ============================================================================
// Module: Rotation Gate Core Library
// Description: Public API surface for the compliance-gated rotation engine.
// Purpose: Expose core types, interfaces, and runtime components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Rotation Gate core gates automated credential rotation behind a compliance
//! decision and records every decision and rotation in a signed, hash-linked
//! ledger. Components are wired through explicit interfaces so hosts can
//! substitute storage, vault, and policy-analysis backends.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::CacheError;
pub use interfaces::ComplianceValidator;
pub use interfaces::CredentialVault;
pub use interfaces::HimError;
pub use interfaces::InterventionManager;
pub use interfaces::Ledger;
pub use interfaces::LedgerError;
pub use interfaces::LedgerSink;
pub use interfaces::PolicyAnalyzer;
pub use interfaces::PolicySource;
pub use interfaces::PromptChannel;
pub use interfaces::PromptError;
pub use interfaces::RefreshError;
pub use interfaces::RuleCache;
pub use interfaces::VaultError;
pub use runtime::ErrorClass;
pub use runtime::FileLedgerSink;
pub use runtime::HimConfig;
pub use runtime::HimSessionManager;
pub use runtime::InMemoryRuleCache;
pub use runtime::LedgerKind;
pub use runtime::OrchestratorConfig;
pub use runtime::OrchestratorDeps;
pub use runtime::OrchestratorError;
pub use runtime::RetryPolicy;
pub use runtime::RotationOrchestrator;
pub use runtime::RuleCacheConfig;
pub use runtime::RuleValidator;
pub use runtime::ServiceError;
pub use runtime::SignedHashChainLedger;
pub use runtime::TrustService;
pub use runtime::ValidatorConfig;
pub use runtime::decode_verifying_key;
pub use runtime::encode_verifying_key;
pub use runtime::generate_secret;
pub use runtime::generate_signing_key;
pub use runtime::load_ledger_file;
pub use runtime::load_signing_key;
pub use runtime::retry_with_backoff;
pub use runtime::verify_chain;
