//! Timeout and bounded retry around scoring-model calls

use crate::config::LlmConfig;
use crate::error::ScoringServiceError;
use crate::llm::ScoringModel;
use log::warn;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            timeout: config.timeout(),
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

/// Call `scorer`, retrying timeouts and transient failures with exponential backoff.
pub async fn predict_with_retry(
    scorer: &dyn ScoringModel,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, ScoringServiceError> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(policy.timeout, scorer.predict(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ScoringServiceError::Timeout(policy.timeout.as_secs())),
        };

        match result {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    "Scoring attempt {} of {} failed ({}), retrying after {}ms...",
                    attempt,
                    policy.max_attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        status: u16,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ScoringModel for Flaky {
        async fn predict(&self, _prompt: &str) -> Result<String, ScoringServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ScoringServiceError::Api {
                    status: self.status,
                    message: "unavailable".to_string(),
                })
            } else {
                Ok("'Skills': 4".to_string())
            }
        }
    }

    struct Stalled;

    #[async_trait]
    impl ScoringModel for Stalled {
        async fn predict(&self, _prompt: &str) -> Result<String, ScoringServiceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    fn flaky(failures: u32, status: u16) -> Flaky {
        Flaky {
            failures,
            status,
            calls: AtomicU32::new(0),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let scorer = flaky(2, 503);
        let reply = predict_with_retry(&scorer, "prompt", &fast_policy(3)).await.unwrap();
        assert_eq!(reply, "'Skills': 4");
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let scorer = flaky(10, 429);
        let err = predict_with_retry(&scorer, "prompt", &fast_policy(3)).await.unwrap_err();
        assert!(matches!(err, ScoringServiceError::Api { status: 429, .. }));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let scorer = flaky(10, 401);
        let err = predict_with_retry(&scorer, "prompt", &fast_policy(3)).await.unwrap_err();
        assert!(matches!(err, ScoringServiceError::Api { status: 401, .. }));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_calls_time_out() {
        let err = predict_with_retry(&Stalled, "prompt", &fast_policy(2)).await.unwrap_err();
        assert!(matches!(err, ScoringServiceError::Timeout(_)));
    }
}
