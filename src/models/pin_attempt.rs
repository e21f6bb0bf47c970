use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PIN_FAILURES, PIN_FAILURE_WINDOW_SECS};
use crate::error::{AppError, Result};

/// Failed PIN logins against one saving id
///
/// Keyed by the requested id whether or not a saving exists there, so a
/// lockout never reveals which ids are real.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinAttemptRecord {
    /// Failures inside the current window
    pub failures: u32,
    /// Unix timestamp of the last failure
    pub last_failure_at: Option<i64>,
    /// Unix timestamp when the failure counter resets
    pub window_reset_at: i64,
}

impl PinAttemptRecord {
    pub fn new(now: i64) -> Self {
        Self {
            failures: 0,
            last_failure_at: None,
            window_reset_at: now + PIN_FAILURE_WINDOW_SECS,
        }
    }

    /// Check whether another PIN attempt is allowed right now
    /// Returns Ok(()) if allowed, Err(RateLimitExceeded) if locked out
    pub fn check(&mut self, now: i64) -> Result<()> {
        if now >= self.window_reset_at {
            self.failures = 0;
            self.window_reset_at = now + PIN_FAILURE_WINDOW_SECS;
        }

        if self.failures >= MAX_PIN_FAILURES {
            tracing::warn!(
                "PIN attempts locked out: {}/{}",
                self.failures,
                MAX_PIN_FAILURES
            );
            return Err(AppError::RateLimitExceeded);
        }

        Ok(())
    }

    pub fn record_failure(&mut self, now: i64) {
        self.failures += 1;
        self.last_failure_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let now = 1000000;
        let record = PinAttemptRecord::new(now);

        assert_eq!(record.failures, 0);
        assert!(record.last_failure_at.is_none());
        assert_eq!(record.window_reset_at, now + PIN_FAILURE_WINDOW_SECS);
    }

    #[test]
    fn test_lockout_after_max_failures() {
        let now = 1000000;
        let mut record = PinAttemptRecord::new(now);

        for _ in 0..MAX_PIN_FAILURES {
            assert!(record.check(now).is_ok());
            record.record_failure(now);
        }

        assert!(matches!(
            record.check(now),
            Err(AppError::RateLimitExceeded)
        ));
        assert_eq!(record.last_failure_at, Some(now));
    }

    #[test]
    fn test_window_reset() {
        let now = 1000000;
        let mut record = PinAttemptRecord::new(now);

        for _ in 0..MAX_PIN_FAILURES {
            record.record_failure(now);
        }
        assert!(record.check(now + 10).is_err());

        // After the window elapses the counter starts over
        let after_reset = now + PIN_FAILURE_WINDOW_SECS + 1;
        assert!(record.check(after_reset).is_ok());
        assert_eq!(record.failures, 0);
        assert_eq!(
            record.window_reset_at,
            after_reset + PIN_FAILURE_WINDOW_SECS
        );
    }
}
