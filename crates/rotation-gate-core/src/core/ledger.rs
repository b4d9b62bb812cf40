// crates/rotation-gate-core/src/core/ledger.rs
// ============================================================================
// Module: Rotation Gate Ledger Records
// Description: Ledger entries, export filters, and verification reports.
// Purpose: Define the write-once record shape shared by audit and evidence chains.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`LedgerEntry`] is write-once. Its chain hash is
//! `SHA-256(entry_id || previous_entry_id)` (or `SHA-256(entry_id)` for the
//! genesis entry) and its signature covers the entry identifier, sequence,
//! timestamp, subject hash, event type, payload hash, and the previous
//! entry's chain hash. The payload itself is opaque to the ledger.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;
use crate::core::hashing::SubjectHash;
use crate::core::identifiers::EntryId;
use crate::core::identifiers::EventType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Well-known event-type tags written by Rotation Gate components.
pub mod events {
    /// Credential rotation succeeded.
    pub const ROTATION_SUCCEEDED: &str = "rotation_succeeded";
    /// Credential rotation was rejected by compliance policy.
    pub const ROTATION_REJECTED: &str = "rotation_rejected";
    /// Credential rotation failed.
    pub const ROTATION_FAILED: &str = "rotation_failed";
    /// Credential rotation was cancelled before the external call.
    pub const ROTATION_CANCELLED: &str = "rotation_cancelled";
    /// Compliance decision evidence.
    pub const COMPLIANCE_DECISION: &str = "compliance_decision";
    /// Compliance decision could not be reached.
    pub const COMPLIANCE_DECISION_FAILED: &str = "compliance_decision_failed";
    /// Rule set stored or replaced in the cache.
    pub const RULE_SET_STORED: &str = "rule_set_stored";
    /// Rule set invalidated from the cache.
    pub const RULE_SET_INVALIDATED: &str = "rule_set_invalidated";
}

// ============================================================================
// SECTION: Ledger Entry
// ============================================================================

/// One append-only ledger record.
///
/// # Invariants
/// - `seq` is the zero-based append position.
/// - `previous_id` and `previous_chain_hash` are `None` only for `seq == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub entry_id: EntryId,
    /// Append sequence number.
    pub seq: u64,
    /// Append time.
    pub timestamp: Timestamp,
    /// Event-type tag.
    pub event_type: EventType,
    /// Privacy-hashed subject identifier.
    pub subject_hash: SubjectHash,
    /// Opaque payload.
    pub payload: Value,
    /// Canonical hash of the payload.
    pub payload_hash: HashDigest,
    /// Identifier of the previous entry.
    pub previous_id: Option<EntryId>,
    /// Chain hash of the previous entry.
    pub previous_chain_hash: Option<HashDigest>,
    /// Derived chain hash for this entry.
    pub chain_hash: HashDigest,
    /// Base64 ed25519 signature.
    pub signature: String,
}

// ============================================================================
// SECTION: Ranges and Filters
// ============================================================================

/// Half-open sequence range `[start, end)` used for verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRange {
    /// First sequence number (inclusive).
    pub start: u64,
    /// Last sequence number (exclusive); `None` means through the head.
    pub end: Option<u64>,
}

impl LedgerRange {
    /// Range covering the entire ledger.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    /// Range covering `[start, end)`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }
}

/// Export filter; empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// Event types to include.
    #[serde(default)]
    pub event_types: Vec<EventType>,
    /// Subject hash to match.
    #[serde(default)]
    pub subject_hash: Option<SubjectHash>,
    /// Sequence range to include.
    #[serde(default)]
    pub range: Option<LedgerRange>,
    /// Earliest timestamp (inclusive).
    #[serde(default)]
    pub since: Option<Timestamp>,
    /// Latest timestamp (exclusive).
    #[serde(default)]
    pub until: Option<Timestamp>,
    /// Maximum entries returned.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LedgerFilter {
    /// Returns true when the entry matches this filter.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&entry.event_type) {
            return false;
        }
        if let Some(subject) = &self.subject_hash
            && subject != &entry.subject_hash
        {
            return false;
        }
        if let Some(range) = &self.range {
            if entry.seq < range.start {
                return false;
            }
            if let Some(end) = range.end
                && entry.seq >= end
            {
                return false;
            }
        }
        if let Some(since) = self.since
            && entry.timestamp < since
        {
            return false;
        }
        if let Some(until) = self.until
            && entry.timestamp >= until
        {
            return false;
        }
        true
    }
}

// ============================================================================
// SECTION: Verification Types
// ============================================================================

/// Kind of integrity violation found during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Signature does not verify against the ledger public key.
    SignatureMismatch,
    /// Stored payload hash does not match the payload.
    PayloadHashMismatch,
    /// Stored chain hash does not match the recomputed value.
    ChainHashMismatch,
    /// Previous-entry link does not match the actual prior entry.
    BrokenLink,
    /// Entry references a predecessor that is not present.
    MissingPredecessor,
}

impl ViolationKind {
    /// Returns a stable label for the violation kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignatureMismatch => "signature mismatch",
            Self::PayloadHashMismatch => "payload hash mismatch",
            Self::ChainHashMismatch => "chain hash mismatch",
            Self::BrokenLink => "broken chain link",
            Self::MissingPredecessor => "missing predecessor",
        }
    }
}

/// Position-specific integrity violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerViolation {
    /// Sequence number of the offending entry.
    pub seq: u64,
    /// Identifier of the offending entry.
    pub entry_id: EntryId,
    /// Violation kind.
    pub kind: ViolationKind,
    /// Detail message.
    pub detail: String,
}

impl fmt::Display for LedgerViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {} ({}): {}: {}", self.seq, self.entry_id, self.kind.as_str(), self.detail)
    }
}

/// Verification status for ledger reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Every checked entry verified.
    Pass,
    /// At least one violation was found.
    Fail,
}

/// Ledger verification report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Verification status.
    pub status: VerificationStatus,
    /// Number of entries checked.
    pub checked_entries: usize,
    /// Every violation found, in sequence order.
    pub violations: Vec<LedgerViolation>,
    /// Sequence numbers of entries at or after the first violation.
    pub flagged: Vec<u64>,
}

impl VerificationReport {
    /// Returns true when no violations were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == VerificationStatus::Pass
    }

    /// Returns the violations rendered as strings.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}
