//! Bounded blocking retry for transient busy signals during stepping.
//!
//! The engine reports "busy" when another connection or process holds a
//! lock on the same database file. A step that sees busy is retried with a
//! fixed sleep between attempts; once the attempt budget is spent the
//! failure escalates to the caller. The wait is a plain thread sleep with no
//! cancellation hook.
//!
//! [`RetryPolicy::drive`] is engine-independent: it takes the raw step as a
//! closure, so the same state machine runs against the real engine and
//! against scripted outcomes in tests.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Default number of step attempts before a busy signal becomes fatal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Default sleep between busy attempts, in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 250;

/// Classified result of one raw engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A row is available.
    Row,
    /// Execution finished.
    Done,
    /// The database is locked by someone else; the step may be retried.
    Busy,
    /// Any other result code.
    Failed(i32),
}

/// Why [`RetryPolicy::drive`] gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFailure {
    /// Every attempt reported busy.
    BusyTimeout {
        /// Number of attempts made.
        attempts: u32,
    },
    /// The engine returned a non-retryable code.
    Engine {
        /// The raw result code.
        code: i32,
    },
}

/// Fixed-backoff retry settings for busy steps.
///
/// # Examples
///
/// ```
/// use stmtwrap_core::{RetryPolicy, StepOutcome, StepFailure};
///
/// let policy = RetryPolicy::new(3, 0);
/// let mut script = [StepOutcome::Busy, StepOutcome::Row].into_iter();
/// assert_eq!(policy.drive(|| script.next().unwrap()), Ok(true));
///
/// let always_busy = policy.drive(|| StepOutcome::Busy);
/// assert_eq!(always_busy, Err(StepFailure::BusyTimeout { attempts: 3 }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of step attempts, the first one included.
    pub max_attempts: u32,
    /// Sleep between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and backoff.
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Sleep between attempts.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Runs `step` until it yields a row, completes, fails, or the busy
    /// budget is exhausted.
    ///
    /// Returns `Ok(true)` for a row and `Ok(false)` for completion. A zero
    /// `max_attempts` still performs one attempt.
    ///
    /// # Errors
    ///
    /// [`StepFailure::BusyTimeout`] after `max_attempts` consecutive busy
    /// outcomes, [`StepFailure::Engine`] on the first non-retryable code.
    pub fn drive<F>(&self, mut step: F) -> Result<bool, StepFailure>
    where
        F: FnMut() -> StepOutcome,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match step() {
                StepOutcome::Row => {
                    trace!(attempt, "step produced a row");
                    return Ok(true);
                }
                StepOutcome::Done => {
                    trace!(attempt, "step completed");
                    return Ok(false);
                }
                StepOutcome::Busy if attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        backoff_ms = self.backoff_ms,
                        "database busy, retrying step"
                    );
                    if self.backoff_ms > 0 {
                        thread::sleep(self.backoff());
                    }
                    attempt += 1;
                }
                StepOutcome::Busy => {
                    return Err(StepFailure::BusyTimeout { attempts: attempt });
                }
                StepOutcome::Failed(code) => return Err(StepFailure::Engine { code }),
            }
        }
    }
}
