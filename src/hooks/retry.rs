//! Retry policy: a call-wrapping hook that re-attempts transient
//! handler failures with linear backoff.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::error::{ConfigError, HandlerError};
use crate::exchange::{ModelRequest, ModelResponse};
use crate::handler::Next;
use crate::hooks::{Capability, Hook};

/// Wraps the handler call chain and retries transient failures.
///
/// Attempt `i` (failing, with attempts remaining) suspends for
/// `backoff_base * i` before the next try, so delays grow linearly.
/// Non-transient failures propagate immediately; exhaustion propagates
/// the last failure annotated with the total attempt count. A
/// short-circuited pre-call outcome is never retried — this policy only
/// ever sees the handler path.
#[derive(Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    /// Create a retry policy. `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Result<Self, ConfigError> {
        if max_attempts < 1 {
            return Err(ConfigError::InvalidValue {
                key: "max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            max_attempts,
            backoff_base,
        })
    }

    /// Create a retry policy from resolved configuration.
    pub fn from_config(config: &RetryConfig) -> Result<Self, ConfigError> {
        Self::new(config.max_attempts, config.backoff_base)
    }

    /// Backoff before attempt `attempt + 1`, after `attempt` failures.
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

#[async_trait]
impl Hook for RetryPolicy {
    fn name(&self) -> &str {
        "retry"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::WrapCall]
    }

    async fn wrap_call(
        &self,
        request: ModelRequest,
        next: Next<'_>,
    ) -> Result<ModelResponse, HandlerError> {
        let mut last_err: Option<HandlerError> = None;

        for attempt in 1..=self.max_attempts {
            let started = Instant::now();
            match next.run(request.clone()).await {
                Ok(response) => {
                    tracing::info!(
                        attempt,
                        elapsed = ?started.elapsed(),
                        "model call succeeded"
                    );
                    return Ok(response);
                }
                Err(err) => {
                    if !err.is_transient() {
                        return Err(err);
                    }
                    tracing::warn!(attempt, error = %err, "model call attempt failed");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                    last_err = Some(err);
                }
            }
        }

        // SAFETY: max_attempts >= 1 (checked in `new`), so at least one
        // attempt ran and `last_err` is `Some`.
        Err(HandlerError::RetriesExhausted {
            attempts: self.max_attempts,
            last: Box::new(last_err.expect("at least one attempt ran")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::testing::StubHandler;
    use std::sync::Arc;

    fn request() -> ModelRequest {
        ModelRequest::from_user_text("hi")
    }

    #[test]
    fn test_from_config_defaults() {
        let policy = RetryPolicy::from_config(&RetryConfig::default()).unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_base, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = RetryPolicy::new(0, Duration::ZERO).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_linear_backoff_is_monotonic() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200)).unwrap();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_calls_handler_once() {
        let handler = Arc::new(StubHandler::new("ok"));
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(
                RetryPolicy::new(3, Duration::ZERO).unwrap(),
            ))
            .build()
            .unwrap();

        let outcome = pipeline.run(request()).await.unwrap();
        assert_eq!(outcome.response.content, "ok");
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn test_fails_then_succeeds_within_budget() {
        let handler = Arc::new(StubHandler::new("recovered").fail_first(2));
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(
                RetryPolicy::new(3, Duration::ZERO).unwrap(),
            ))
            .build()
            .unwrap();

        let outcome = pipeline.run(request()).await.unwrap();
        assert_eq!(outcome.response.content, "recovered");
        assert_eq!(handler.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_propagates_last_failure_with_attempt_count() {
        let handler = Arc::new(StubHandler::new("never").fail_first(10));
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(
                RetryPolicy::new(3, Duration::ZERO).unwrap(),
            ))
            .build()
            .unwrap();

        let err = pipeline.run(request()).await.unwrap_err();
        match err {
            crate::error::Error::Handler(HandlerError::RetriesExhausted { attempts, .. }) => {
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got: {other:?}"),
        }
        assert_eq!(handler.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let handler = Arc::new(StubHandler::new("never").fail_first(1).non_transient());
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(
                RetryPolicy::new(3, Duration::ZERO).unwrap(),
            ))
            .build()
            .unwrap();

        let err = pipeline.run(request()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Handler(HandlerError::InvalidRequest(_))
        ));
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn test_backoff_suspends_between_attempts() {
        let handler = Arc::new(StubHandler::new("recovered").fail_first(2));
        let pipeline = Pipeline::builder(handler.clone())
            .hook(Arc::new(
                RetryPolicy::new(3, Duration::from_millis(20)).unwrap(),
            ))
            .build()
            .unwrap();

        let started = Instant::now();
        pipeline.run(request()).await.unwrap();

        // Two failures: backoff of 20ms then 40ms before the third attempt.
        assert!(
            started.elapsed() >= Duration::from_millis(60),
            "elapsed: {:?}",
            started.elapsed()
        );
        assert_eq!(handler.calls(), 3);
    }
}
