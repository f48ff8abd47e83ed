//! Retry policy for answer generation

use std::time::Duration;

use crate::error::Error;

/// What to do after a failed generation attempt
#[derive(Debug)]
pub enum RetryDecision {
    /// Try the next attempt immediately
    Continue,
    /// Wait, then try the next attempt
    BackoffThen(Duration),
    /// Give up with this error
    Fail(Error),
}

/// Classify a failed attempt
///
/// `attempt` is zero-based. Quota exhaustion moves straight from the primary
/// model to the fallback and stops if the fallback is also out of quota, even
/// when attempts remain. Rate limiting backs off exponentially
/// (`base_delay * 2^attempt`) until the budget is spent. Every other error is
/// terminal.
pub fn decide(attempt: u32, max_retries: u32, base_delay: Duration, error: &Error) -> RetryDecision {
    let last_attempt = attempt + 1 >= max_retries;

    match error {
        Error::QuotaExceeded(_) if attempt == 0 => RetryDecision::Continue,
        Error::QuotaExceeded(_) => {
            RetryDecision::Fail(Error::QuotaExceeded("quota exceeded for all models".to_string()))
        }
        Error::RateLimited(_) if !last_attempt => {
            RetryDecision::BackoffThen(base_delay.saturating_mul(2u32.saturating_pow(attempt)))
        }
        Error::RateLimited(message) => RetryDecision::Fail(Error::RateLimited(format!(
            "still rate limited after {} attempts: {}",
            max_retries, message
        ))),
        other => RetryDecision::Fail(Error::generation(format!(
            "Failed to generate response: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_secs(1);

    #[test]
    fn test_quota_on_primary_switches_model() {
        let err = Error::QuotaExceeded("primary".to_string());
        assert!(matches!(decide(0, 3, BASE, &err), RetryDecision::Continue));
    }

    #[test]
    fn test_quota_on_fallback_is_terminal() {
        let err = Error::QuotaExceeded("fallback".to_string());
        match decide(1, 5, BASE, &err) {
            RetryDecision::Fail(Error::QuotaExceeded(msg)) => {
                assert_eq!(msg, "quota exceeded for all models")
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_backoff_doubles() {
        let err = Error::RateLimited("slow down".to_string());
        let delays: Vec<Duration> = (0..3)
            .map(|attempt| match decide(attempt, 4, BASE, &err) {
                RetryDecision::BackoffThen(d) => d,
                other => panic!("unexpected decision: {:?}", other),
            })
            .collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_rate_limit_on_last_attempt_fails() {
        let err = Error::RateLimited("slow down".to_string());
        match decide(2, 3, BASE, &err) {
            RetryDecision::Fail(Error::RateLimited(msg)) => assert!(msg.contains("slow down")),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_other_errors_are_terminal() {
        let err = Error::internal("boom");
        match decide(0, 3, BASE, &err) {
            RetryDecision::Fail(Error::Generation(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected decision: {:?}", other),
        }
    }
}
