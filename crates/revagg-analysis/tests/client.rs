//! Integration tests for `LlmClient` using wiremock HTTP mocks.

use revagg_analysis::{LlmClient, LlmConfig, LlmError, Prompt, ResponseShape};
use revagg_core::LlmProvider;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn groq_client(base_url: &str, max_retries: u32) -> LlmClient {
    let mut config = LlmConfig::new(LlmProvider::Groq)
        .with_api_key("test-key")
        .with_base_url(base_url);
    config.max_retries = max_retries;
    config.retry_backoff_base_ms = 0;
    LlmClient::new(config).expect("client construction should not fail")
}

fn ollama_client(base_url: &str) -> LlmClient {
    let mut config = LlmConfig::new(LlmProvider::Ollama).with_base_url(base_url);
    config.retry_backoff_base_ms = 0;
    LlmClient::new(config).expect("client construction should not fail")
}

fn prompt() -> Prompt {
    Prompt::new("You are a review analyzer.", "[{\"rating\":5,\"body\":\"Great\"}]")
}

fn groq_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "llama-3.3-70b-versatile",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn groq_returns_message_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.3-70b-versatile",
            "stream": false,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": "You are a review analyzer." },
                { "role": "user", "content": "[{\"rating\":5,\"body\":\"Great\"}]" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(groq_body("{\"ok\":true}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = groq_client(&server.uri(), 0);
    let text = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect("should return content");

    assert_eq!(text, "{\"ok\":true}");
}

#[tokio::test]
async fn ollama_returns_message_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "deepseek-r1",
            "stream": false,
            "format": "json"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "deepseek-r1",
            "message": { "role": "assistant", "content": "<think>hmm</think>{\"a\":1}" },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ollama_client(&server.uri());
    let text = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect("should return content");

    assert_eq!(text, "<think>hmm</think>{\"a\":1}");
}

#[tokio::test]
async fn rate_limit_surfaces_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let client = groq_client(&server.uri(), 0);
    let err = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect_err("429 should fail without retries");

    assert!(
        matches!(
            err,
            LlmError::RateLimited {
                retry_after_secs: Some(7)
            }
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(groq_body("{\"late\":1}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = groq_client(&server.uri(), 3);
    let text = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect("should succeed after retries");

    assert_eq!(text, "{\"late\":1}");
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
        .expect(1)
        .mount(&server)
        .await;

    let client = groq_client(&server.uri(), 3);
    let err = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect_err("400 should fail");

    match err {
        LlmError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad model");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_content_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(groq_body("   ")))
        .mount(&server)
        .await;

    let client = groq_client(&server.uri(), 3);
    let err = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect_err("blank content should fail");

    assert!(matches!(err, LlmError::EmptyResponse), "got {err:?}");
}

#[tokio::test]
async fn missing_choices_is_an_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = groq_client(&server.uri(), 0);
    let err = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect_err("no choices should fail");

    assert!(matches!(err, LlmError::EmptyResponse), "got {err:?}");
}

#[tokio::test]
async fn non_json_envelope_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ollama_client(&server.uri());
    let err = client
        .complete(&prompt(), ResponseShape::Object)
        .await
        .expect_err("bad envelope should fail");

    assert!(matches!(err, LlmError::Deserialize { .. }), "got {err:?}");
}
