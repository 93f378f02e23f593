use epub_digest::adapters::http::ReqwestTransport;
use epub_digest::domain::model::{ChatRequest, ModelProfile};
use epub_digest::{DigestError, RequestExecutor, RetryPolicy};
use httpmock::prelude::*;
use std::time::Duration;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
    }
}

fn chapter_request() -> ChatRequest {
    ChatRequest::from_prompt(&ModelProfile::chapter_default(), "Summarize: rain fell.".to_string())
}

#[tokio::test]
async fn test_successful_call_sends_credential_and_payload() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test")
            .body_contains("\"model\":\"gpt-5-mini\"")
            .body_contains("\"reasoning_effort\":\"low\"")
            .body_contains("\"max_completion_tokens\":2000");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "## Rain\n- It fell"}}]
            }));
    });

    let transport = ReqwestTransport::new(server.url("/v1/chat/completions"));
    let executor = RequestExecutor::new(transport, fast_policy(3));

    let text = executor
        .execute("sk-test", &chapter_request(), "Chapter", Duration::from_secs(5), |_| {})
        .await
        .unwrap();

    assert_eq!(text, "## Rain\n- It fell");
    api_mock.assert();
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(400)
            .json_body(serde_json::json!({"error": {"message": "Unsupported parameter"}}));
    });

    let transport = ReqwestTransport::new(server.url("/v1/chat/completions"));
    let executor = RequestExecutor::new(transport, fast_policy(3));

    let err = executor
        .execute("sk-test", &chapter_request(), "Chapter", Duration::from_secs(5), |_| {})
        .await
        .unwrap_err();

    match err {
        DigestError::FatalRequestError { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Unsupported parameter");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    api_mock.assert_hits(1);
}

#[tokio::test]
async fn test_rate_limit_is_retried_until_exhausted() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429).body("slow down");
    });

    let transport = ReqwestTransport::new(server.url("/v1/chat/completions"));
    let executor = RequestExecutor::new(transport, fast_policy(3));
    let mut events = Vec::new();

    let err = executor
        .execute(
            "sk-test",
            &chapter_request(),
            "Chapter",
            Duration::from_secs(5),
            |event| events.push(event.clone()),
        )
        .await
        .unwrap_err();

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
    api_mock.assert_hits(3);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].delay, Duration::from_millis(10));
    assert_eq!(events[1].delay, Duration::from_millis(20));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(serde_json::json!({"choices": [{"message": {"content": "late"}}]}));
    });

    let transport = ReqwestTransport::new(server.url("/v1/chat/completions"));
    let executor = RequestExecutor::new(transport, fast_policy(2));

    let err = executor
        .execute("sk-test", &chapter_request(), "Chapter", Duration::from_millis(50), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, DigestError::ExhaustedRetries { attempts: 2, .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_retryable() {
    // Nothing listens on the discard port.
    let transport = ReqwestTransport::new("http://127.0.0.1:9/v1/chat/completions");
    let executor = RequestExecutor::new(transport, fast_policy(2));

    let err = executor
        .execute("sk-test", &chapter_request(), "Chapter", Duration::from_secs(2), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, DigestError::ExhaustedRetries { attempts: 2, .. }));
}
