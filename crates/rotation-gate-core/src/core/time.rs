// crates/rotation-gate-core/src/core/time.rs
// ============================================================================
// Module: Rotation Gate Time Model
// Description: Canonical timestamps and the clock abstraction.
// Purpose: Make every expiry check go through an injectable clock.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Rotation Gate stores wall-clock instants as unix milliseconds. Components
//! never read the system time directly; they ask a [`Clock`], which lets tests
//! cross cache and session deadlines deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical wall-clock timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Arithmetic saturates; it never wraps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp advanced by `duration`.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Returns the time remaining from `self` until `later`, or zero when passed.
    #[must_use]
    pub fn until(self, later: Self) -> Duration {
        let delta = later.0.saturating_sub(self.0);
        u64::try_from(delta).map_or(Duration::ZERO, Duration::from_millis)
    }
}

/// Converts a duration to whole milliseconds, saturating at `i64::MAX`.
fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of wall-clock time for expiry checks.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Timestamp(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Manually driven clock for tests and deterministic replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in unix milliseconds.
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock starting at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start.0),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now.0, Ordering::SeqCst);
    }

    /// Advances the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        let millis = duration_millis(duration);
        let _ = self.now.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            Some(current.saturating_add(millis))
        });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::SeqCst))
    }
}
