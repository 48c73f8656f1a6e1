// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Bounded retry for individual backend calls.
//!
//! Only errors that report [`Transient::is_transient`] are re-attempted. Any
//! other error propagates on the attempt that produced it, and once the
//! budget runs out the last transient error surfaces unchanged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backon::{BlockingRetryable, ConstantBuilder, Retryable};

use crate::error::Transient;

/// Attempt budget and pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first; zero behaves like one
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// A policy that never re-attempts
    #[must_use]
    pub fn once() -> Self {
        Self::new(1)
    }

    fn backoff(&self) -> ConstantBuilder {
        // backon counts re-attempts, not attempts.
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }

    /// Runs `call` until it succeeds, fails permanently, or the budget is spent
    pub async fn retry<T, E, F, Fut>(&self, label: &str, call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut attempt = 1_usize;
        Retryable::retry(call, self.backoff())
            .when(|e: &E| e.is_transient())
            .notify(|e: &E, _delay: Duration| {
                let message = e.to_string();
                diagnostics::warn!(
                    "{label} attempt {attempt} failed, retrying: {message}",
                    label: label,
                    attempt: attempt,
                    message: message.as_str()
                );
                attempt += 1;
            })
            .await
    }

    /// Blocking form of [`RetryPolicy::retry`]
    pub fn retry_blocking<T, E, F>(&self, label: &str, call: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Transient + Display,
    {
        let mut attempt = 1_usize;
        BlockingRetryable::retry(call, self.backoff())
            .when(|e: &E| e.is_transient())
            .notify(|e: &E, _delay: Duration| {
                let message = e.to_string();
                diagnostics::warn!(
                    "{label} attempt {attempt} failed, retrying: {message}",
                    label: label,
                    attempt: attempt,
                    message: message.as_str()
                );
                attempt += 1;
            })
            .call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, Operation};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fault(message: &str) -> GatewayError {
        GatewayError::Transient {
            operation: Operation::GetContent,
            target: "item".to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_absorbed_within_budget() {
        let calls = AtomicUsize::new(0);
        let result = RetryPolicy::default()
            .retry("download", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(fault("busy")) } else { Ok(n) }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_last_transient_error_surfaces_unchanged() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), GatewayError> = RetryPolicy::default()
            .retry("download", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(fault(&format!("fault {}", n)))
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(&err, GatewayError::Transient { message, .. } if message == "fault 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), GatewayError> = RetryPolicy::new(5)
            .retry("lookup", || async {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::not_found(Operation::GetContent, "gone"))
            })
            .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_between_attempts() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(2).with_delay(Duration::from_millis(5));
        let started = std::time::Instant::now();
        let result = tokio_test::block_on(policy.retry("upload", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 2 { Err(fault("busy")) } else { Ok(n) }
        }));
        assert_eq!(result.unwrap(), 2);
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_blocking_form_counts_attempts() {
        let mut calls = 0;
        let result: Result<(), std::io::Error> = RetryPolicy::new(4).retry_blocking("write", || {
            calls += 1;
            Err(std::io::Error::from(std::io::ErrorKind::Interrupted))
        });
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::Interrupted);
        assert_eq!(calls, 4);

        let mut calls = 0;
        let result: Result<(), std::io::Error> = RetryPolicy::once().retry_blocking("write", || {
            calls += 1;
            Err(std::io::Error::from(std::io::ErrorKind::Interrupted))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_calls_once() {
        let mut calls = 0;
        let result: Result<u8, std::io::Error> = RetryPolicy::new(0).retry_blocking("noop", || {
            calls += 1;
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }
}
