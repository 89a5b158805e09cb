use std::time::Duration;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget exhausted; mark the segment failed.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Attempt budget and fixed backoff for segment fetches.
///
/// `max_attempts` counts every attempt including the first; a segment that
/// fails `max_attempts` times is reported with a retry count equal to the
/// budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Budget of `max_attempts` with the standard backoff.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Decide what to do after `failed_attempts` attempts have failed.
    pub fn decide(&self, failed_attempts: u32) -> RetryDecision {
        if failed_attempts >= self.max_attempts {
            RetryDecision::NoRetry
        } else {
            RetryDecision::RetryAfter(self.backoff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_attempt_budget() {
        let p = RetryPolicy::with_attempts(3);
        assert_eq!(p.decide(1), RetryDecision::RetryAfter(p.backoff));
        assert_eq!(p.decide(2), RetryDecision::RetryAfter(p.backoff));
        assert_eq!(p.decide(3), RetryDecision::NoRetry);
    }

    #[test]
    fn backoff_is_fixed() {
        let p = RetryPolicy::default();
        for failed in 1..p.max_attempts {
            match p.decide(failed) {
                RetryDecision::RetryAfter(d) => assert_eq!(d, Duration::from_secs(2)),
                RetryDecision::NoRetry => panic!("expected retry"),
            }
        }
    }

    #[test]
    fn with_attempts_floors_at_one() {
        let p = RetryPolicy::with_attempts(0);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.decide(1), RetryDecision::NoRetry);
    }
}
