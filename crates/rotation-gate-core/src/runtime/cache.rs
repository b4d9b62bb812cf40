// crates/rotation-gate-core/src/runtime/cache.rs
// ============================================================================
// Module: Rotation Gate Rule Cache
// Description: In-memory per-target rule set cache with absolute expiry.
// Purpose: Hold the compliance posture for each target between refreshes.
// Dependencies: crate::{core, interfaces}, serde_json, tracing
// ============================================================================

//! ## Overview
//! Rule sets are held as `Arc<RuleSet>` and replaced wholesale, so a reader
//! observes either the old rule set or the new one, never a mix. Expiry is
//! checked on every read against the injected clock; expired entries stay in
//! the map until replaced or invalidated and are reported by diagnostic
//! listings.
//!
//! When a change log is attached, each store and each successful invalidation
//! is appended to that ledger after the map lock is released.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::core::CacheStats;
use crate::core::Clock;
use crate::core::EventType;
use crate::core::RuleSet;
use crate::core::RuleSetSummary;
use crate::core::SubjectHasher;
use crate::core::TargetId;
use crate::core::ledger::events;
use crate::interfaces::CacheError;
use crate::interfaces::Ledger;
use crate::interfaces::RuleCache;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default rule set lifetime (30 days).
pub const DEFAULT_RULE_SET_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Rule cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCacheConfig {
    /// Lifetime applied when a store call does not supply one.
    pub default_ttl: Duration,
}

impl Default for RuleCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_RULE_SET_TTL,
        }
    }
}

impl RuleCacheConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message when the default lifetime is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_ttl.is_zero() {
            return Err("rule cache default ttl must be non-zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Change Log
// ============================================================================

/// Ledger destination for rule set lifecycle events.
struct ChangeLog {
    /// Target ledger.
    ledger: Arc<dyn Ledger>,
    /// Hasher applied to target identifiers.
    hasher: SubjectHasher,
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Thread-safe in-memory [`RuleCache`].
pub struct InMemoryRuleCache {
    /// Cache configuration.
    config: RuleCacheConfig,
    /// Clock used for expiry checks.
    clock: Arc<dyn Clock>,
    /// Rule sets keyed by target.
    entries: RwLock<HashMap<TargetId, Arc<RuleSet>>>,
    /// Number of `get` calls served.
    lookups: AtomicU64,
    /// Optional lifecycle log.
    change_log: Option<ChangeLog>,
}

impl InMemoryRuleCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: RuleCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: RwLock::new(HashMap::new()),
            lookups: AtomicU64::new(0),
            change_log: None,
        }
    }

    /// Records stores and invalidations in `ledger`.
    #[must_use]
    pub fn with_change_log(mut self, ledger: Arc<dyn Ledger>, hasher: SubjectHasher) -> Self {
        self.change_log = Some(ChangeLog {
            ledger,
            hasher,
        });
        self
    }

    /// Returns the configured default lifetime.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Appends a lifecycle event when a change log is attached.
    fn log_change(
        &self,
        event: &str,
        target_id: &TargetId,
        payload: serde_json::Value,
    ) -> Result<(), CacheError> {
        if let Some(log) = &self.change_log {
            log.ledger.append(EventType::new(event), log.hasher.hash(target_id.as_str()), payload)?;
        }
        Ok(())
    }
}

impl RuleCache for InMemoryRuleCache {
    fn store(&self, rule_set: RuleSet, ttl: Option<Duration>) -> Result<Arc<RuleSet>, CacheError> {
        let mut rule_set = rule_set;
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        rule_set.expires_at = rule_set.created_at.saturating_add(ttl);
        let stored = Arc::new(rule_set);
        let replaced = {
            let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
            entries.insert(stored.target_id.clone(), Arc::clone(&stored)).is_some()
        };
        debug!(
            target_id = %stored.target_id,
            source_version = %stored.source_version,
            rules = stored.rules.len(),
            replaced,
            "rule set stored"
        );
        self.log_change(
            events::RULE_SET_STORED,
            &stored.target_id,
            json!({
                "source_version": stored.source_version,
                "rule_count": stored.rules.len(),
                "recommendation": stored.recommendation.as_str(),
                "expires_at": stored.expires_at,
                "replaced": replaced,
            }),
        )?;
        Ok(stored)
    }

    fn get(&self, target_id: &TargetId) -> Result<Option<Arc<RuleSet>>, CacheError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(target_id).filter(|rule_set| !rule_set.is_expired(now)).cloned())
    }

    fn list(
        &self,
        pattern: &str,
        include_expired: bool,
    ) -> Result<Vec<RuleSetSummary>, CacheError> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        let mut summaries: Vec<RuleSetSummary> = entries
            .values()
            .filter(|rule_set| wildcard_match(pattern, rule_set.target_id.as_str()))
            .map(|rule_set| rule_set.summary(now))
            .filter(|summary| include_expired || !summary.expired)
            .collect();
        summaries.sort_by(|left, right| left.target_id.cmp(&right.target_id));
        Ok(summaries)
    }

    fn invalidate(&self, target_id: &TargetId) -> Result<bool, CacheError> {
        let removed = {
            let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
            entries.remove(target_id)
        };
        let Some(removed) = removed else {
            return Ok(false);
        };
        debug!(target_id = %target_id, "rule set invalidated");
        self.log_change(
            events::RULE_SET_INVALIDATED,
            target_id,
            json!({ "source_version": removed.source_version }),
        )?;
        Ok(true)
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let now = self.clock.now();
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        let expired_count = entries.values().filter(|rule_set| rule_set.is_expired(now)).count();
        Ok(CacheStats {
            valid_count: entries.len() - expired_count,
            expired_count,
            total_lookups: self.lookups.load(Ordering::Relaxed),
        })
    }
}

// ============================================================================
// SECTION: Pattern Matching
// ============================================================================

/// Matches `text` against a pattern where `*` matches any run of characters.
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(ch) if *ch == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern.iter().skip(p).all(|ch| *ch == '*')
}
