use crate::domain::model::{AttemptEvent, ChatRequest, ChatResponse, TransportResponse};
use crate::domain::ports::Transport;
use crate::utils::error::{DigestError, Result};
use std::time::Duration;

/// Text returned when the service answers without any message content.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "*No summary was returned.*";

const ERROR_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed `attempt` (1-based): `base_delay * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug)]
enum AttemptOutcome {
    Success(String),
    RetryableFailure(String),
    FatalFailure(DigestError),
}

#[derive(Debug)]
struct RequestAttempt {
    attempt_number: u32,
    delay_before: Duration,
    outcome: AttemptOutcome,
}

/// Runs one chat-completion call with a deadline per attempt, retrying
/// rate limits, server errors and timeouts with exponential backoff.
pub struct RequestExecutor<T: Transport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the response text, or the first fatal error, or
    /// `ExhaustedRetries` once every attempt failed in a retryable way.
    ///
    /// `on_attempt` is called before each backoff wait.
    pub async fn execute<F>(
        &self,
        credential: &str,
        request: &ChatRequest,
        context: &str,
        timeout: Duration,
        mut on_attempt: F,
    ) -> Result<String>
    where
        F: FnMut(&AttemptEvent) + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt_number = 1;
        let mut delay_before = Duration::ZERO;

        loop {
            tracing::debug!("{}: attempt {}/{}", context, attempt_number, max_attempts);

            let attempt = RequestAttempt {
                attempt_number,
                delay_before,
                outcome: self.attempt(credential, request, timeout).await,
            };

            match attempt.outcome {
                AttemptOutcome::Success(text) => {
                    tracing::debug!(
                        "{}: succeeded on attempt {} after a {}ms wait ({} chars)",
                        context,
                        attempt.attempt_number,
                        attempt.delay_before.as_millis(),
                        text.len()
                    );
                    return Ok(text);
                }
                AttemptOutcome::FatalFailure(err) => {
                    tracing::warn!("{}: fatal failure, not retrying: {}", context, err);
                    return Err(err);
                }
                AttemptOutcome::RetryableFailure(reason) if attempt.attempt_number >= max_attempts => {
                    tracing::warn!(
                        "{}: giving up after {} attempts: {}",
                        context,
                        attempt.attempt_number,
                        reason
                    );
                    return Err(DigestError::ExhaustedRetries {
                        context: context.to_string(),
                        attempts: attempt.attempt_number,
                        last_reason: reason,
                    });
                }
                AttemptOutcome::RetryableFailure(reason) => {
                    let delay = self.policy.backoff_delay(attempt.attempt_number);
                    tracing::warn!(
                        "{}: attempt {} failed ({}), retrying in {}ms",
                        context,
                        attempt.attempt_number,
                        reason,
                        delay.as_millis()
                    );
                    on_attempt(&AttemptEvent {
                        attempt: attempt.attempt_number,
                        max_attempts,
                        delay,
                        reason,
                    });
                    tokio::time::sleep(delay).await;
                    attempt_number = attempt.attempt_number + 1;
                    delay_before = delay;
                }
            }
        }
    }

    async fn attempt(&self, credential: &str, request: &ChatRequest, timeout: Duration) -> AttemptOutcome {
        let call = self.transport.call(credential, request, timeout);
        match tokio::time::timeout(timeout, call).await {
            Err(_) => AttemptOutcome::RetryableFailure(format!(
                "request timed out after {}ms",
                timeout.as_millis()
            )),
            Ok(Err(err)) if err.is_retryable() => AttemptOutcome::RetryableFailure(err.to_string()),
            Ok(Err(err)) => AttemptOutcome::FatalFailure(err),
            Ok(Ok(response)) => classify_response(response),
        }
    }
}

fn classify_response(response: TransportResponse) -> AttemptOutcome {
    if response.is_success() {
        return match serde_json::from_str::<ChatResponse>(&response.body) {
            Ok(parsed) => {
                let text = parsed
                    .first_content()
                    .filter(|content| !content.trim().is_empty())
                    .unwrap_or(EMPTY_RESPONSE_PLACEHOLDER);
                AttemptOutcome::Success(text.to_string())
            }
            Err(err) => AttemptOutcome::FatalFailure(err.into()),
        };
    }

    let message = error_excerpt(&response.body);
    if response.status == 429 || response.status >= 500 {
        AttemptOutcome::RetryableFailure(format!("HTTP {}: {}", response.status, message))
    } else {
        AttemptOutcome::FatalFailure(DigestError::FatalRequestError {
            status: response.status,
            message,
        })
    }
}

/// Prefers the API's `error.message` field, falling back to the raw body.
fn error_excerpt(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });
    let text = from_json.unwrap_or_else(|| body.trim().to_string());
    if text.is_empty() {
        return "empty response body".to_string();
    }
    text.chars().take(ERROR_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ModelProfile;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<TransportResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn always(status: u16) -> Self {
            Self::new((0..10).map(|_| Ok(TransportResponse::new(status, ""))).collect())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn call(&self, _: &str, _: &ChatRequest, _: Duration) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more often than scripted")
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn call(&self, _: &str, _: &ChatRequest, _: Duration) -> Result<TransportResponse> {
            std::future::pending().await
        }
    }

    fn ok_body(content: &str) -> TransportResponse {
        TransportResponse::new(
            200,
            serde_json::json!({"choices": [{"message": {"content": content}}]}).to_string(),
        )
    }

    fn request() -> ChatRequest {
        ChatRequest::from_prompt(&ModelProfile::chapter_default(), "Summarize".to_string())
    }

    async fn run<T: Transport>(
        executor: &RequestExecutor<T>,
        events: &mut Vec<AttemptEvent>,
    ) -> Result<String> {
        executor
            .execute("key", &request(), "Chapter 'One'", Duration::from_secs(30), |event| {
                events.push(event.clone())
            })
            .await
    }

    #[test]
    fn test_backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(8000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_then_success() {
        let executor = RequestExecutor::new(
            ScriptedTransport::new(vec![
                Ok(TransportResponse::new(500, "")),
                Ok(TransportResponse::new(500, "")),
                Ok(ok_body("## Summary")),
            ]),
            RetryPolicy::default(),
        );
        let mut events = Vec::new();

        let text = run(&executor, &mut events).await.unwrap();

        assert_eq!(text, "## Summary");
        assert_eq!(executor.transport().calls(), 3);
        let delays: Vec<u128> = events.iter().map(|e| e.delay.as_millis()).collect();
        assert_eq!(delays, vec![2000, 4000]);
        assert_eq!(events[0].attempt, 1);
        assert_eq!(events[1].attempt, 2);
        assert!(events[0].reason.contains("HTTP 500"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_fails_immediately() {
        let executor = RequestExecutor::new(ScriptedTransport::always(400), RetryPolicy::default());
        let mut events = Vec::new();

        let err = run(&executor, &mut events).await.unwrap_err();

        assert!(matches!(err, DigestError::FatalRequestError { status: 400, .. }));
        assert!(events.is_empty());
        assert_eq!(executor.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausts_retries() {
        let executor = RequestExecutor::new(ScriptedTransport::always(429), RetryPolicy::default());
        let mut events = Vec::new();
        let started = tokio::time::Instant::now();

        let err = run(&executor, &mut events).await.unwrap_err();

        match err {
            DigestError::ExhaustedRetries {
                attempts,
                last_reason,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_reason.contains("429"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.transport().calls(), 3);
        let total: Duration = events.iter().map(|e| e.delay).sum();
        assert_eq!(total, Duration::from_millis(6000));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(6000) && elapsed < Duration::from_millis(6100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_is_retryable() {
        let executor = RequestExecutor::new(HangingTransport, RetryPolicy::default());
        let mut events = Vec::new();

        let err = run(&executor, &mut events).await.unwrap_err();

        match err {
            DigestError::ExhaustedRetries { last_reason, .. } => {
                assert!(last_reason.contains("timed out after 30000ms"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(events.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_transport_error_is_retried() {
        let executor = RequestExecutor::new(
            ScriptedTransport::new(vec![
                Err(DigestError::RetryableRequestError {
                    reason: "connection reset".to_string(),
                }),
                Ok(ok_body("done")),
            ]),
            RetryPolicy::default(),
        );
        let mut events = Vec::new();

        assert_eq!(run(&executor, &mut events).await.unwrap(), "done");
        assert_eq!(events.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_network_error_is_fatal() {
        let executor = RequestExecutor::new(
            ScriptedTransport::new(vec![Err(DigestError::ConfigError {
                message: "bad header".to_string(),
            })]),
            RetryPolicy::default(),
        );
        let mut events = Vec::new();

        let err = run(&executor, &mut events).await.unwrap_err();

        assert!(matches!(err, DigestError::ConfigError { .. }));
        assert_eq!(executor.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_content_uses_placeholder() {
        let executor = RequestExecutor::new(
            ScriptedTransport::new(vec![Ok(TransportResponse::new(200, r#"{"choices":[]}"#))]),
            RetryPolicy::default(),
        );
        let mut events = Vec::new();

        let text = run(&executor, &mut events).await.unwrap();
        assert_eq!(text, EMPTY_RESPONSE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_fatal() {
        let executor = RequestExecutor::new(
            ScriptedTransport::new(vec![Ok(TransportResponse::new(200, "<html>oops</html>"))]),
            RetryPolicy::default(),
        );
        let mut events = Vec::new();

        let err = run(&executor, &mut events).await.unwrap_err();
        assert!(matches!(err, DigestError::SerializationError(_)));
    }

    #[test]
    fn test_error_excerpt_prefers_api_message() {
        assert_eq!(
            error_excerpt(r#"{"error":{"message":"Invalid model","type":"invalid_request_error"}}"#),
            "Invalid model"
        );
        assert_eq!(error_excerpt("  plain failure "), "plain failure");
        assert_eq!(error_excerpt(""), "empty response body");
        assert_eq!(error_excerpt(&"x".repeat(500)).len(), ERROR_EXCERPT_CHARS);
    }
}
