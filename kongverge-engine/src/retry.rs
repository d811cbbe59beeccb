//! Bounded-time retry loop.
//!
//! The timeout is a deadline over the whole loop: attempts in flight and
//! backoff sleeps both count against it. Retrying is all-or-nothing,
//! controlled by a single flag.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::shutdown::Shutdown;

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Delay between attempts, doubling up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
        }
    }
}

/// Why a retry loop gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Retrying is disabled; this is the first failure.
    Permanent(E),
    /// The deadline elapsed; carries the last failure.
    Exhausted {
        last: E,
        attempts: u32,
        elapsed: Duration,
    },
    /// The deadline elapsed before any attempt finished.
    TimedOut { attempts: u32, elapsed: Duration },
    /// Shutdown was signalled.
    Cancelled { attempts: u32 },
}

/// Retry configuration for one call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retry_on_error: bool,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, retry_on_error: bool) -> Self {
        Self {
            timeout,
            retry_on_error,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `op` until it succeeds, fails permanently, the deadline passes or
    /// shutdown is signalled. No attempt starts after shutdown.
    pub async fn run<T, E, F, Fut>(&self, shutdown: &Shutdown, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let start = Instant::now();
        let deadline = start
            .checked_add(self.timeout)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let mut wait = self.backoff.initial;
        let mut attempts = 0u32;
        let mut last: Option<E> = None;

        loop {
            if shutdown.is_triggered() {
                return Err(RetryError::Cancelled { attempts });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = shutdown.triggered() => return Err(RetryError::Cancelled { attempts }),
                outcome = tokio::time::timeout(remaining, op()) => outcome,
            };

            match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if !self.retry_on_error => return Err(RetryError::Permanent(err)),
                Ok(Err(err)) => last = Some(err),
                Err(_) => {
                    debug!("Attempt {} outlived the retry deadline", attempts);
                    break;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let pause = wait.min(remaining);
            if let Some(err) = &last {
                warn!("Attempt {} failed: {}, retrying in {:?}", attempts, err, pause);
            }

            tokio::select! {
                biased;
                _ = shutdown.triggered() => return Err(RetryError::Cancelled { attempts }),
                _ = tokio::time::sleep(pause) => {}
            }
            wait = wait.saturating_mul(2).min(self.backoff.max);
        }

        let elapsed = start.elapsed();
        Err(match last {
            Some(last) => RetryError::Exhausted {
                last,
                attempts,
                elapsed,
            },
            None => RetryError::TimedOut { attempts, elapsed },
        })
    }
}
