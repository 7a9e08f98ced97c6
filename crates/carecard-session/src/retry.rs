//! Bounded retry with fixed settle and backoff delays.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Something that can wait. Production code sleeps the thread; tests record.
pub trait Delay {
    fn wait(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested waits without sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().clone()
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.waits.lock().iter().sum()
    }
}

impl Delay for RecordingDelay {
    fn wait(&self, duration: Duration) {
        self.waits.lock().push(duration);
    }
}

impl<D: Delay + ?Sized> Delay for &D {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration)
    }
}

impl<D: Delay + ?Sized> Delay for std::sync::Arc<D> {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration)
    }
}

/// How often and how patiently to retry a tag operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before giving up. Default: 3.
    pub max_attempts: u32,
    /// Wait before every attempt, for the tag to settle in the field.
    /// Default: 1 s.
    pub settle_delay: Duration,
    /// Extra wait after a failed attempt that will be retried. Default: 500 ms.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A single attempt with no delays.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            settle_delay: Duration::ZERO,
            backoff: Duration::ZERO,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            settle_delay: Duration::from_millis(1000),
            backoff: Duration::from_millis(500),
        }
    }
}

/// Result of [`retry`].
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded. `attempts` counts it.
    Success { value: T, attempts: u32 },
    /// Every attempt failed; `last_error` is from the final one.
    Exhausted { attempts: u32, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Exhausted { last_error, .. } => Err(last_error),
        }
    }
}

/// Run `op` up to `policy.max_attempts` times (at least once).
///
/// Each attempt is preceded by `settle_delay`; a failure that will be
/// retried is followed by `backoff`. `op` receives the 1-based attempt
/// number.
pub fn retry<T, E, F>(policy: &RetryPolicy, delay: &dyn Delay, mut op: F) -> RetryOutcome<T, E>
where
    E: fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        delay.wait(policy.settle_delay);
        debug!(attempt, max_attempts, "attempt starting");

        match op(attempt) {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(err) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "attempt failed, retrying");
                delay.wait(policy.backoff);
                attempt += 1;
            }
            Err(err) => {
                warn!(attempt, max_attempts, error = %err, "final attempt failed");
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last_error: err,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(1000);
    const BACKOFF: Duration = Duration::from_millis(500);

    #[test]
    fn test_first_attempt_succeeds() {
        let delay = RecordingDelay::new();
        let outcome = retry(&RetryPolicy::default(), &delay, |_| Ok::<_, String>(7));
        assert!(matches!(outcome, RetryOutcome::Success { value: 7, attempts: 1 }));
        assert_eq!(delay.waits(), vec![SETTLE]);
    }

    #[test]
    fn test_succeeds_after_failures() {
        let delay = RecordingDelay::new();
        let outcome = retry(&RetryPolicy::default(), &delay, |attempt| {
            if attempt < 3 {
                Err(format!("boom {attempt}"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(outcome.into_result().unwrap(), 3);
        assert_eq!(delay.waits(), vec![SETTLE, BACKOFF, SETTLE, BACKOFF, SETTLE]);
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let delay = RecordingDelay::new();
        let mut calls = 0;
        let outcome: RetryOutcome<(), String> = retry(&RetryPolicy::default(), &delay, |attempt| {
            calls += 1;
            Err(format!("failure {attempt}"))
        });
        assert_eq!(calls, 3);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "failure 3");
            }
            other => panic!("unexpected {other:?}"),
        }
        // No backoff after the final attempt.
        assert_eq!(delay.total(), SETTLE * 3 + BACKOFF * 2);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let delay = RecordingDelay::new();
        let policy = RetryPolicy::new(0).with_settle_delay(Duration::ZERO);
        let outcome = retry(&policy, &delay, |_| Err::<(), _>("nope"));
        assert_eq!(outcome.attempts(), 1);
    }

    #[test]
    fn test_immediate_policy() {
        let delay = RecordingDelay::new();
        let outcome = retry(&RetryPolicy::immediate(), &delay, |_| Err::<(), _>("x"));
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(delay.total(), Duration::ZERO);
    }
}
