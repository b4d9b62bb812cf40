// crates/rotation-gate-core/src/runtime/retry.rs
// ============================================================================
// Module: Rotation Gate Retry
// Description: Bounded exponential backoff for transient collaborator failures.
// Purpose: Retry reversible calls without ever retrying the irreversible one.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! Backoff is deterministic: attempt `n` (zero based) waits
//! `initial_backoff * multiplier^n`, capped at `max_backoff`. Only errors the
//! caller classifies as retryable are retried; the last error is returned
//! unchanged once attempts run out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy for reversible collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: u32,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy that performs exactly one attempt.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns a message when a bound is inconsistent.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry max_attempts must be at least 1".to_string());
        }
        if self.multiplier == 0 {
            return Err("retry multiplier must be at least 1".to_string());
        }
        if self.initial_backoff > self.max_backoff {
            return Err("retry initial_backoff must not exceed max_backoff".to_string());
        }
        Ok(())
    }

    /// Returns the delay after failed attempt `attempt` (zero based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.checked_mul(factor).unwrap_or(self.max_backoff).min(self.max_backoff)
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs `operation` until it succeeds, fails permanently, or attempts run out.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once
/// `policy.max_attempts` is exhausted.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !is_retryable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let backoff = policy.backoff_for(attempt - 1);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %err,
                    "retryable operation failed"
                );
                debug!(
                    operation = operation_name,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "backing off before next attempt"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
