// Copyright (c) 2025 - Cowboy AI, Inc.
//! Caller-side retry
//!
//! The allocator never retries on its own. Callers that want to ride out
//! lost races wrap the whole allocation call, so every attempt starts from
//! a fresh snapshot.

use std::future::Future;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::errors::AllocationResult;

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are exhausted
///
/// Returns the last result together with the number of attempts made.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> (AllocationResult<T>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AllocationResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retryable allocation failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return (result, attempt),
        }
    }
}
