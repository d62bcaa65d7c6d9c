//! Fixed-interval retry for remote calls
//!
//! Each attempt reports whether its failure is worth retrying. Retryable
//! failures sleep `pause` between attempts (not after the last one);
//! aborting and fatal failures stop the loop at the attempt that raised them.

use std::fmt::Display;
use std::time::Duration;

/// Attempt budget and fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, pause: Duration) -> Self {
        Self { attempts, pause }
    }
}

/// Failure of a single attempt, classified by how the loop should react.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Try again after the pause (if budget remains)
    Retryable(E),
    /// Stop now; a repeat of the same request will not succeed
    Abort(E),
    /// Unexpected failure; stop and hand it to the caller untouched
    Fatal(E),
}

/// Why the retry loop gave up.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// Every attempt failed with a retryable error. `last` is `None` only
    /// when the budget was zero.
    Exhausted { attempts: u32, last: Option<E> },
    Aborted { attempts: u32, error: E },
    Fatal { attempts: u32, error: E },
}

impl<E> RetryFailure<E> {
    /// Attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. }
            | Self::Fatal { attempts, .. } => *attempts,
        }
    }
}

/// Run `attempt_fn` up to `policy.attempts` times.
///
/// `attempt_fn` receives the 1-based attempt number.
pub fn retry_fixed<T, E: Display>(
    label: &str,
    policy: &RetryPolicy,
    mut attempt_fn: impl FnMut(u32) -> Result<T, AttemptError<E>>,
) -> Result<T, RetryFailure<E>> {
    let mut last = None;
    for attempt in 1..=policy.attempts {
        match attempt_fn(attempt) {
            Ok(v) => return Ok(v),
            Err(AttemptError::Retryable(e)) => {
                if attempt < policy.attempts {
                    log::warn!(
                        "{label}: attempt {attempt}/{} failed: {e}, retrying in {:?}",
                        policy.attempts,
                        policy.pause
                    );
                    std::thread::sleep(policy.pause);
                } else {
                    log::warn!("{label}: attempt {attempt}/{} failed: {e}", policy.attempts);
                }
                last = Some(e);
            }
            Err(AttemptError::Abort(e)) => {
                log::error!("{label}: attempt {attempt}/{} failed: {e}, stopping", policy.attempts);
                return Err(RetryFailure::Aborted {
                    attempts: attempt,
                    error: e,
                });
            }
            Err(AttemptError::Fatal(e)) => {
                log::error!("{label}: unexpected failure: {e}");
                return Err(RetryFailure::Fatal {
                    attempts: attempt,
                    error: e,
                });
            }
        }
    }
    log::error!("{label}: failed permanently after {} attempts", policy.attempts);
    Err(RetryFailure::Exhausted {
        attempts: policy.attempts,
        last,
    })
}
