//! End-to-end chat session flows against a mock backend
//!
//! Drives the real controller through the real HTTP gateway at a
//! wiremock server: resume, send, end, and feedback.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use findastro::chat::message::{Role, ERROR_REPLY};
use findastro::chat::{ChatController, ChatTiming, SendOutcome, UserStatus};
use findastro::config::ApiConfig;
use findastro::gateway::ApiClient;
use findastro::session_store::SessionStore;

struct Flow {
    server: MockServer,
    controller: Arc<ChatController>,
    _dir: TempDir,
}

async fn setup() -> Flow {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SessionStore::open_with_path(dir.path().join("session.json")).unwrap());
    store.set_mobile("9876543210").unwrap();
    store.set_token("tok_abc").unwrap();

    let config = ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
    };
    let api = Arc::new(ApiClient::new(&config, store.clone()).unwrap());
    let timing = ChatTiming {
        status_poll_interval: Duration::from_millis(50),
        status_fallback: Duration::from_millis(500),
        inactivity_timeout: Duration::from_secs(600),
    };
    let (controller, _events) = ChatController::new(api, store, timing);

    Flow {
        server,
        controller: Arc::new(controller),
        _dir: dir,
    }
}

async fn mock_ready_status(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/user-status/9876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ready",
            "wallet_balance": 100.0
        })))
        .mount(server)
        .await;
}

async fn mock_empty_history(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/history/9876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessions": []})))
        .mount(server)
        .await;
}

async fn wait_until_ready(controller: &ChatController) {
    for _ in 0..50 {
        if controller.status() == UserStatus::Ready {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("controller never became ready");
}

#[tokio::test]
async fn test_send_success_grows_log_by_two() {
    let flow = setup().await;
    mock_ready_status(&flow.server).await;
    mock_empty_history(&flow.server).await;

    Mock::given(method("POST"))
        .and(path("/auth/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "All is well.",
            "assistant": "guruji",
            "guruji_json": {"para1": "All is well."}
        })))
        .expect(1)
        .mount(&flow.server)
        .await;

    flow.controller.start(false).await;
    wait_until_ready(&flow.controller).await;
    let before = flow.controller.messages().len();

    let outcome = flow.controller.send("How are the stars?").await.unwrap();

    assert_eq!(outcome, SendOutcome::Delivered);
    let messages = flow.controller.messages();
    assert_eq!(messages.len(), before + 2);
    assert_eq!(messages[before].role, Role::User);
    assert!(messages[before + 1].structured_payload.is_some());
    flow.controller.shutdown().await;
}

#[tokio::test]
async fn test_send_failure_appends_fallback_reply() {
    let flow = setup().await;
    mock_ready_status(&flow.server).await;
    mock_empty_history(&flow.server).await;

    Mock::given(method("POST"))
        .and(path("/auth/chat"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "astrologer overloaded"})),
        )
        .expect(1)
        .mount(&flow.server)
        .await;

    flow.controller.start(false).await;
    wait_until_ready(&flow.controller).await;
    let before = flow.controller.messages().len();

    let outcome = flow.controller.send("hello?").await.unwrap();

    assert_eq!(outcome, SendOutcome::Failed);
    let messages = flow.controller.messages();
    assert_eq!(messages.len(), before + 2);
    assert_eq!(messages.last().unwrap().content, ERROR_REPLY);
    flow.controller.shutdown().await;
}

#[tokio::test]
async fn test_history_resume_adopts_server_session() {
    let flow = setup().await;
    mock_ready_status(&flow.server).await;

    Mock::given(method("GET"))
        .and(path("/auth/history/9876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{
                "session_id": "SESS_SERVER_7",
                "messages": [
                    {"role": "assistant", "content": "welcome back", "assistant": "maya"},
                    {"role": "user", "content": "about my career"},
                    {"role": "assistant", "content": "growth ahead", "assistant": "guruji"},
                    {"role": "user", "content": "when exactly?"}
                ]
            }]
        })))
        .expect(1)
        .mount(&flow.server)
        .await;

    flow.controller.start(false).await;

    // The 4-message server log and its id are adopted verbatim.
    assert_eq!(flow.controller.session_id(), "SESS_SERVER_7");
    let messages = flow.controller.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3].content, "when exactly?");
    flow.controller.shutdown().await;
}

#[tokio::test]
async fn test_end_and_feedback_flow() {
    let flow = setup().await;
    mock_ready_status(&flow.server).await;
    mock_empty_history(&flow.server).await;

    Mock::given(method("POST"))
        .and(path("/auth/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "ok"})))
        .mount(&flow.server)
        .await;

    // One explicit end plus the best-effort end after feedback.
    Mock::given(method("POST"))
        .and(path("/auth/end-chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"summary": "a fine session"})),
        )
        .expect(2)
        .mount(&flow.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&flow.server)
        .await;

    flow.controller.start(false).await;
    wait_until_ready(&flow.controller).await;

    flow.controller.send("one question").await.unwrap();
    let summary = flow.controller.end(false).await.unwrap();
    assert_eq!(summary.text, "a fine session");

    flow.controller.submit_feedback(5, "lovely").await.unwrap();
    assert!(flow.controller.feedback().submitted);

    // Let the fire-and-forget end-chat land before verifying expectations.
    tokio::time::sleep(Duration::from_millis(200)).await;
    flow.controller.shutdown().await;
}

#[tokio::test]
async fn test_zero_rating_feedback_never_reaches_backend() {
    let flow = setup().await;
    mock_ready_status(&flow.server).await;
    mock_empty_history(&flow.server).await;

    Mock::given(method("POST"))
        .and(path("/auth/feedback"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&flow.server)
        .await;

    flow.controller.start(false).await;

    let result = flow.controller.submit_feedback(0, "never sent").await;
    assert!(result.is_err());
    flow.controller.shutdown().await;
}

#[tokio::test]
async fn test_end_failure_keeps_session_open() {
    let flow = setup().await;
    mock_ready_status(&flow.server).await;
    mock_empty_history(&flow.server).await;

    Mock::given(method("POST"))
        .and(path("/auth/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "ok"})))
        .mount(&flow.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/end-chat"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "busy"})))
        .mount(&flow.server)
        .await;

    flow.controller.start(false).await;
    wait_until_ready(&flow.controller).await;
    flow.controller.send("one question").await.unwrap();

    let result = flow.controller.end(false).await;

    assert!(result.is_err());
    assert!(flow.controller.summary().is_none());
    // The session is still usable after the failed end.
    assert_eq!(flow.controller.messages().len(), 3);
    flow.controller.shutdown().await;
}
