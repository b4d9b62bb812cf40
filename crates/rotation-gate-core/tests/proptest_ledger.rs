//! Ledger property-based tests.
//!
//! ## Purpose
//! Randomized payloads and single-byte edits must never slip past chain
//! verification, and verification must be deterministic for a fixed chain.
//!
//! ## What is covered
//! - Any payload edit at any index is reported at or after that index.
//! - Verifying an exported copy twice yields identical reports.
// crates/rotation-gate-core/tests/proptest_ledger.rs
// ============================================================================
// Module: Ledger Property-Based Tests
// Description: Randomized tamper detection over signed chains.
// Purpose: Ensure tampering is always detected and attributed correctly.
// ============================================================================

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use proptest::prelude::*;
use rotation_gate_core::EventType;
use rotation_gate_core::Ledger;
use rotation_gate_core::LedgerEntry;
use rotation_gate_core::LedgerFilter;
use rotation_gate_core::ManualClock;
use rotation_gate_core::SignedHashChainLedger;
use rotation_gate_core::SubjectHash;
use rotation_gate_core::Timestamp;
use rotation_gate_core::verify_chain;
use serde_json::json;

fn build_chain(payloads: &[String]) -> (SignedHashChainLedger, Vec<LedgerEntry>) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(0)));
    let ledger = SignedHashChainLedger::new("prop", clock);
    for payload in payloads {
        ledger
            .append(EventType::new("compliance_decision"), SubjectHash::from_hashed("p"), json!({ "v": payload }))
            .unwrap();
    }
    let entries = ledger.export(&LedgerFilter::default()).unwrap();
    (ledger, entries)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn payload_edits_are_attributed(
        payloads in prop::collection::vec("[a-z]{0,12}", 1 .. 12),
        pick in any::<prop::sample::Index>(),
        suffix in "[A-Z]{1,4}",
    ) {
        let (ledger, mut entries) = build_chain(&payloads);
        let index = pick.index(entries.len());
        entries[index].payload = json!({ "v": format!("{}{suffix}", payloads[index]) });
        let report = verify_chain(None, &entries, &ledger.verifying_key());
        prop_assert!(!report.is_ok());
        prop_assert_eq!(report.flagged.first().copied(), Some(index as u64));
        prop_assert!(report.violations.iter().all(|violation| violation.seq >= index as u64));
    }

    #[test]
    fn verification_is_deterministic(payloads in prop::collection::vec("[a-z]{0,12}", 0 .. 12)) {
        let (ledger, entries) = build_chain(&payloads);
        let first = verify_chain(None, &entries, &ledger.verifying_key());
        let second = verify_chain(None, &entries, &ledger.verifying_key());
        prop_assert!(first.is_ok());
        prop_assert_eq!(first, second);
    }
}
