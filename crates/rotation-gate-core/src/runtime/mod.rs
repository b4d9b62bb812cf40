// crates/rotation-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Rotation Gate Runtime
// Description: Concrete implementations of the rotation gate components.
// Purpose: Provide the ledger, cache, validator, sessions, and orchestration.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime implementations of the interface traits plus the orchestrator and
//! boundary service that wire them together.

pub mod cache;
pub mod him;
pub mod ledger;
pub mod orchestrator;
pub mod retry;
pub mod secret;
pub mod service;
pub mod sink;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::DEFAULT_RULE_SET_TTL;
pub use cache::InMemoryRuleCache;
pub use cache::RuleCacheConfig;
pub use cache::wildcard_match;
pub use him::HimConfig;
pub use him::HimSessionManager;
pub use ledger::SignedHashChainLedger;
pub use ledger::compute_chain_hash;
pub use ledger::decode_verifying_key;
pub use ledger::encode_verifying_key;
pub use ledger::generate_signing_key;
pub use ledger::load_signing_key;
pub use ledger::verify_chain;
pub use orchestrator::ErrorClass;
pub use orchestrator::OrchestratorConfig;
pub use orchestrator::OrchestratorDeps;
pub use orchestrator::OrchestratorError;
pub use orchestrator::RotationOrchestrator;
pub use retry::RetryPolicy;
pub use retry::retry_with_backoff;
pub use secret::generate_secret;
pub use service::LedgerKind;
pub use service::ServiceError;
pub use service::TrustService;
pub use sink::FileLedgerSink;
pub use sink::load_ledger_file;
pub use validator::RuleValidator;
pub use validator::ValidatorConfig;
