use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{ChatGateway, ChatRequest, GroqGateway, GroqGatewayConfig, LlmError};
use shared::models::Turn;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_payloads: Arc<Mutex<Vec<Value>>>,
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_payloads: Arc::new(Mutex::new(Vec::new())),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn chat_sends_messages_and_parses_the_answer() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("Hello there."),
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(&base_url, 1, 0)).expect("gateway should build");
    let answer = gateway
        .chat(sample_request())
        .await
        .expect("chat should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(answer, "Hello there.");

    let payloads = state.seen_payloads.lock().await.clone();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["model"], "test-model");
    let temperature = payloads[0]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.7).abs() < 1e-6);
    assert_eq!(payloads[0]["max_tokens"], 512);
    assert_eq!(payloads[0]["stream"], false);
    assert_eq!(payloads[0]["messages"][0]["role"], "system");
    assert_eq!(payloads[0]["messages"][1]["content"], "hi");

    let auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(auth_headers, vec!["Bearer test-groq-key".to_string()]);
}

#[tokio::test]
async fn chat_retries_transient_failures_before_succeeding() {
    let state = TestServerState::with_replies(vec![
        provider_error_reply(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        provider_error_reply(StatusCode::BAD_GATEWAY, "upstream_gateway"),
        MockReply {
            status: StatusCode::OK,
            body: success_response_body("Recovered."),
        },
    ]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(&base_url, 2, 0)).expect("gateway should build");
    let answer = gateway
        .chat(sample_request())
        .await
        .expect("chat should succeed after retries");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(answer, "Recovered.");
    assert_eq!(state.seen_payloads.lock().await.len(), 3);
}

#[tokio::test]
async fn chat_does_not_retry_client_errors() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::UNAUTHORIZED,
        "invalid_api_key",
    )]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(&base_url, 2, 0)).expect("gateway should build");
    let err = gateway
        .chat(sample_request())
        .await
        .expect_err("unauthorized errors should fail immediately");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, LlmError::ProviderFailure(ref message) if message.contains("status=401")),
        "expected structured unauthorized provider error, got {err:?}"
    );
    assert_eq!(state.seen_payloads.lock().await.len(), 1);
}

#[tokio::test]
async fn chat_rejects_a_payload_without_choices() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({ "choices": [] }),
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(&base_url, 1, 0)).expect("gateway should build");
    let err = gateway
        .chat(sample_request())
        .await
        .expect_err("empty choices should be rejected");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, LlmError::InvalidPayload(_)));
}

#[tokio::test]
async fn list_models_parses_the_catalog() {
    let state = TestServerState::with_replies(vec![]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = GroqGateway::new(config_for(&base_url, 1, 0)).expect("gateway should build");
    let catalog = gateway
        .list_models()
        .await
        .expect("model catalog should list");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let ids: Vec<&str> = catalog.iter().map(|model| model.id.as_str()).collect();
    assert_eq!(ids, vec!["llama-3.1-8b-instant", "whisper-large-v3"]);
}

fn sample_request() -> ChatRequest {
    ChatRequest::new(
        "test-model",
        vec![Turn::system("be brief"), Turn::user("hi")],
    )
}

fn config_for(base_url: &str, max_retries: u32, retry_base_backoff_ms: u64) -> GroqGatewayConfig {
    GroqGatewayConfig {
        chat_completions_url: format!("{base_url}/chat/completions"),
        models_url: format!("{base_url}/models"),
        api_key: "test-groq-key".to_string(),
        timeout_ms: 5_000,
        max_retries,
        retry_base_backoff_ms,
    }
}

fn success_response_body(content: &str) -> Value {
    json!({
        "id": "req-success",
        "model": "test-model",
        "choices": [
            {
                "message": {
                    "role": "assistant",
                    "content": content
                }
            }
        ],
        "usage": {
            "prompt_tokens": 12,
            "completion_tokens": 8,
            "total_tokens": 20
        }
    })
}

fn provider_error_reply(status: StatusCode, code: &str) -> MockReply {
    MockReply {
        status,
        body: json!({
            "error": {
                "code": code
            }
        }),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/chat/completions", post(test_chat_completions_handler))
        .route("/models", get(test_models_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

async fn test_chat_completions_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_payloads.lock().await.push(payload);

    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({
            "error": {
                "code": "exhausted_test_replies"
            }
        }),
    });

    (reply.status, Json(reply.body))
}

async fn test_models_handler() -> Json<Value> {
    Json(json!({
        "data": [
            { "id": "llama-3.1-8b-instant" },
            { "id": "whisper-large-v3" }
        ]
    }))
}
