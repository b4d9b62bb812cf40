// crates/rotation-gate-core/src/runtime/ledger.rs
// ============================================================================
// Module: Rotation Gate Signed Hash-Chain Ledger
// Description: In-memory append-only ledger with ed25519 signatures.
// Purpose: Provide the tamper-evident chain used for audit and evidence records.
// Dependencies: crate::{core, interfaces}, ed25519-dalek, base64, rand, tracing
// ============================================================================

//! ## Overview
//! [`SignedHashChainLedger`] serializes every append behind one write lock:
//! reading the chain head, deriving the next chain hash, signing, and pushing
//! the entry happen in a single critical section, so no two entries can claim
//! the same predecessor. Persistence runs after the lock is released.
//!
//! Verification never stops at the first problem. [`verify_chain`] checks
//! every payload hash, signature, chain hash, and predecessor link in the
//! range and reports each mismatch at the position where it is observed.
//! Integrity problems are surfaced, never repaired, and the ledger keeps
//! accepting appends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::error;

use crate::core::Clock;
use crate::core::EntryId;
use crate::core::EventType;
use crate::core::LedgerEntry;
use crate::core::LedgerFilter;
use crate::core::LedgerRange;
use crate::core::LedgerViolation;
use crate::core::SubjectHash;
use crate::core::Timestamp;
use crate::core::VerificationReport;
use crate::core::VerificationStatus;
use crate::core::ViolationKind;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::hash_bytes;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::Ledger;
use crate::interfaces::LedgerError;
use crate::interfaces::LedgerSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum signing key file size in bytes.
const MAX_SIGNING_KEY_BYTES: u64 = 1024;

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Append-only ledger signed with a process-held ed25519 key.
///
/// # Invariants
/// - Entries are totally ordered by `seq`; `seq` equals the append position.
/// - The private key never leaves this struct.
pub struct SignedHashChainLedger {
    /// Ledger label used in logs (for example `audit` or `evidence`).
    label: String,
    /// Private signing key.
    signing_key: SigningKey,
    /// Public verification key.
    verifying_key: VerifyingKey,
    /// Clock used for entry timestamps.
    clock: Arc<dyn Clock>,
    /// Committed entries in append order.
    chain: RwLock<Vec<LedgerEntry>>,
    /// Optional persistence sink, invoked outside the chain lock.
    sink: Option<Arc<dyn LedgerSink>>,
}

impl SignedHashChainLedger {
    /// Creates an empty ledger with a freshly generated signing key.
    #[must_use]
    pub fn new(label: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self::with_signing_key(label, generate_signing_key(), clock)
    }

    /// Creates an empty ledger signed with `signing_key`.
    #[must_use]
    pub fn with_signing_key(
        label: impl Into<String>,
        signing_key: SigningKey,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            label: label.into(),
            signing_key,
            verifying_key,
            clock,
            chain: RwLock::new(Vec::new()),
            sink: None,
        }
    }

    /// Restores a ledger from previously persisted entries.
    ///
    /// History is verified with the key derived from `signing_key`; violations
    /// are returned and logged but do not prevent new appends.
    #[must_use]
    pub fn restore(
        label: impl Into<String>,
        signing_key: SigningKey,
        clock: Arc<dyn Clock>,
        mut entries: Vec<LedgerEntry>,
    ) -> (Self, VerificationReport) {
        entries.sort_by_key(|entry| entry.seq);
        let mut ledger = Self::with_signing_key(label, signing_key, clock);
        let report = verify_chain(None, &entries, &ledger.verifying_key);
        if !report.is_ok() {
            error!(
                ledger = %ledger.label,
                violations = report.violations.len(),
                "restored ledger history failed verification"
            );
        }
        ledger.chain = RwLock::new(entries);
        (ledger, report)
    }

    /// Attaches a persistence sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LedgerSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the ledger label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the base64-encoded public key for persistence alongside the chain.
    #[must_use]
    pub fn public_key_base64(&self) -> String {
        encode_verifying_key(&self.verifying_key)
    }
}

impl Ledger for SignedHashChainLedger {
    fn append(
        &self,
        event_type: EventType,
        subject_hash: SubjectHash,
        payload: Value,
    ) -> Result<LedgerEntry, LedgerError> {
        let payload_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &payload)
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        let entry = {
            let mut chain = self.chain.write().map_err(|_| LedgerError::Poisoned)?;
            let head = chain.last();
            let seq = u64::try_from(chain.len())
                .map_err(|_| LedgerError::Invalid("ledger length exceeds u64".to_string()))?;
            let entry_id = EntryId::generate();
            let previous_id = head.map(|prior| prior.entry_id.clone());
            let previous_chain_hash = head.map(|prior| prior.chain_hash.clone());
            let chain_hash = compute_chain_hash(&entry_id, previous_id.as_ref());
            let mut entry = LedgerEntry {
                entry_id,
                seq,
                timestamp: self.clock.now(),
                event_type,
                subject_hash,
                payload,
                payload_hash,
                previous_id,
                previous_chain_hash,
                chain_hash,
                signature: String::new(),
            };
            let message = signing_message(&entry)?;
            entry.signature = BASE64.encode(self.signing_key.sign(&message).to_bytes());
            chain.push(entry.clone());
            entry
        };
        if let Some(sink) = &self.sink
            && let Err(err) = sink.record(&entry)
        {
            error!(
                ledger = %self.label,
                seq = entry.seq,
                error = %err,
                "ledger entry committed in memory but persistence failed"
            );
        }
        debug!(
            ledger = %self.label,
            seq = entry.seq,
            event_type = %entry.event_type,
            "ledger entry appended"
        );
        Ok(entry)
    }

    fn verify(&self, range: LedgerRange) -> Result<VerificationReport, LedgerError> {
        let report = {
            let chain = self.chain.read().map_err(|_| LedgerError::Poisoned)?;
            let len = chain.len();
            let start = usize::try_from(range.start).unwrap_or(usize::MAX).min(len);
            let end = range
                .end
                .map_or(len, |end| usize::try_from(end).unwrap_or(usize::MAX).min(len))
                .max(start);
            let predecessor = start.checked_sub(1).and_then(|index| chain.get(index));
            let entries = chain.get(start .. end).unwrap_or(&[]);
            verify_chain(predecessor, entries, &self.verifying_key)
        };
        if report.is_ok() {
            debug!(ledger = %self.label, checked = report.checked_entries, "ledger verified");
        } else {
            for violation in &report.violations {
                error!(ledger = %self.label, violation = %violation, "ledger integrity violation");
            }
        }
        Ok(report)
    }

    fn export(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        let chain = self.chain.read().map_err(|_| LedgerError::Poisoned)?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(chain.iter().filter(|entry| filter.matches(entry)).take(limit).cloned().collect())
    }

    fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.chain.read().map_err(|_| LedgerError::Poisoned)?.len())
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }
}

// ============================================================================
// SECTION: Chain Derivation
// ============================================================================

/// Fields covered by an entry signature.
#[derive(Serialize)]
struct SignedFields<'a> {
    /// Entry identifier.
    entry_id: &'a EntryId,
    /// Append sequence.
    seq: u64,
    /// Append time.
    timestamp: Timestamp,
    /// Hashed subject.
    subject_hash: &'a SubjectHash,
    /// Event-type tag.
    event_type: &'a EventType,
    /// Payload hash value.
    payload_hash: &'a str,
    /// Previous chain hash value, empty for the genesis entry.
    previous_chain_hash: &'a str,
}

/// Builds the canonical signing message for an entry.
fn signing_message(entry: &LedgerEntry) -> Result<Vec<u8>, LedgerError> {
    let fields = SignedFields {
        entry_id: &entry.entry_id,
        seq: entry.seq,
        timestamp: entry.timestamp,
        subject_hash: &entry.subject_hash,
        event_type: &entry.event_type,
        payload_hash: &entry.payload_hash.value,
        previous_chain_hash: entry
            .previous_chain_hash
            .as_ref()
            .map_or("", |digest| digest.value.as_str()),
    };
    canonical_json_bytes(&fields).map_err(|err| LedgerError::Serialization(err.to_string()))
}

/// Computes `Hash(entry_id + previous_id)`, or `Hash(entry_id)` for genesis.
#[must_use]
pub fn compute_chain_hash(entry_id: &EntryId, previous_id: Option<&EntryId>) -> HashDigest {
    let mut material = entry_id.as_str().to_string();
    if let Some(previous_id) = previous_id {
        material.push_str(previous_id.as_str());
    }
    hash_bytes(DEFAULT_HASH_ALGORITHM, material.as_bytes())
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies a contiguous run of entries.
///
/// `predecessor` is the entry immediately before `entries[0]`, or `None` when
/// the run starts at genesis or the predecessor is unavailable.
#[must_use]
pub fn verify_chain(
    predecessor: Option<&LedgerEntry>,
    entries: &[LedgerEntry],
    key: &VerifyingKey,
) -> VerificationReport {
    let mut violations = Vec::new();
    let mut first_bad: Option<usize> = None;
    let mut previous = predecessor;
    for (index, entry) in entries.iter().enumerate() {
        let before = violations.len();
        check_entry(entry, previous, key, &mut violations);
        if violations.len() > before && first_bad.is_none() {
            first_bad = Some(index);
        }
        previous = Some(entry);
    }
    let flagged = first_bad
        .map(|index| entries.iter().skip(index).map(|entry| entry.seq).collect())
        .unwrap_or_default();
    let status =
        if violations.is_empty() { VerificationStatus::Pass } else { VerificationStatus::Fail };
    VerificationReport {
        status,
        checked_entries: entries.len(),
        violations,
        flagged,
    }
}

/// Checks one entry against its own fields and its predecessor.
fn check_entry(
    entry: &LedgerEntry,
    previous: Option<&LedgerEntry>,
    key: &VerifyingKey,
    out: &mut Vec<LedgerViolation>,
) {
    let mut report = |kind: ViolationKind, detail: String| {
        out.push(LedgerViolation {
            seq: entry.seq,
            entry_id: entry.entry_id.clone(),
            kind,
            detail,
        });
    };

    match hash_canonical_json(entry.payload_hash.algorithm, &entry.payload) {
        Ok(actual) if actual == entry.payload_hash => {}
        Ok(actual) => report(
            ViolationKind::PayloadHashMismatch,
            format!("stored {}, computed {}", entry.payload_hash, actual),
        ),
        Err(err) => report(ViolationKind::PayloadHashMismatch, err.to_string()),
    }

    if let Err(detail) = verify_signature(entry, key) {
        report(ViolationKind::SignatureMismatch, detail);
    }

    let expected = compute_chain_hash(&entry.entry_id, entry.previous_id.as_ref());
    if expected != entry.chain_hash {
        report(
            ViolationKind::ChainHashMismatch,
            format!("stored {}, computed {}", entry.chain_hash, expected),
        );
    }

    match (&entry.previous_id, previous) {
        (None, None) => {
            if entry.seq != 0 {
                report(
                    ViolationKind::BrokenLink,
                    "genesis link on a non-genesis sequence".to_string(),
                );
            } else if entry.previous_chain_hash.is_some() {
                report(
                    ViolationKind::BrokenLink,
                    "genesis entry carries a previous chain hash".to_string(),
                );
            }
        }
        (None, Some(prior)) => report(
            ViolationKind::BrokenLink,
            format!("entry does not link to prior entry {}", prior.entry_id),
        ),
        (Some(previous_id), None) => report(
            ViolationKind::MissingPredecessor,
            format!("predecessor {previous_id} is not present"),
        ),
        (Some(previous_id), Some(prior)) => {
            if previous_id != &prior.entry_id {
                report(
                    ViolationKind::BrokenLink,
                    format!("previous id {previous_id} does not match prior entry {}", prior.entry_id),
                );
            } else if entry.previous_chain_hash.as_ref() != Some(&prior.chain_hash) {
                report(
                    ViolationKind::BrokenLink,
                    "previous chain hash does not match prior entry".to_string(),
                );
            } else if prior.seq.checked_add(1) != Some(entry.seq) {
                report(
                    ViolationKind::BrokenLink,
                    format!("sequence {} does not follow {}", entry.seq, prior.seq),
                );
            }
        }
    }
}

/// Verifies the entry signature with the ledger public key.
fn verify_signature(entry: &LedgerEntry, key: &VerifyingKey) -> Result<(), String> {
    let message = signing_message(entry).map_err(|err| err.to_string())?;
    let bytes =
        BASE64.decode(entry.signature.as_bytes()).map_err(|_| "signature is not base64".to_string())?;
    let signature =
        Signature::from_slice(&bytes).map_err(|_| "signature has invalid length".to_string())?;
    key.verify_strict(&message, &signature)
        .map_err(|_| "signature does not verify".to_string())
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Generates a fresh signing key from the operating system RNG.
#[must_use]
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Loads a signing key from disk (32 raw bytes or base64 text).
///
/// # Errors
///
/// Returns [`LedgerError::Key`] when the file is unreadable or malformed.
pub fn load_signing_key(path: &Path) -> Result<SigningKey, LedgerError> {
    let size = fs::metadata(path)
        .map_err(|err| LedgerError::Key(format!("unable to stat signing key: {err}")))?
        .len();
    if size > MAX_SIGNING_KEY_BYTES {
        return Err(LedgerError::Key(format!(
            "signing key file exceeds {MAX_SIGNING_KEY_BYTES} bytes"
        )));
    }
    let bytes = fs::read(path)
        .map_err(|err| LedgerError::Key(format!("unable to read signing key: {err}")))?;
    let key_bytes = if bytes.len() == 32 {
        bytes
    } else {
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| LedgerError::Key("signing key must be utf-8".to_string()))?;
        BASE64
            .decode(text.trim())
            .map_err(|_| LedgerError::Key("invalid base64 signing key".to_string()))?
    };
    let key: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| LedgerError::Key("signing key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&key))
}

/// Encodes a verifying key as base64.
#[must_use]
pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    BASE64.encode(key.to_bytes())
}

/// Decodes a base64 verifying key.
///
/// # Errors
///
/// Returns [`LedgerError::Key`] when the text is not a valid ed25519 public key.
pub fn decode_verifying_key(text: &str) -> Result<VerifyingKey, LedgerError> {
    let bytes = BASE64
        .decode(text.trim())
        .map_err(|_| LedgerError::Key("invalid base64 public key".to_string()))?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| LedgerError::Key("public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| LedgerError::Key("invalid ed25519 public key".to_string()))
}
