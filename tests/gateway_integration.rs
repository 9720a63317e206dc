//! Gateway integration tests against a mock backend

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use findastro::config::ApiConfig;
use findastro::error::ApiError;
use findastro::gateway::{ApiClient, Backend};
use findastro::session_store::SessionStore;

async fn setup() -> (MockServer, ApiClient, Arc<SessionStore>, TempDir) {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SessionStore::open_with_path(dir.path().join("session.json")).unwrap());
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
    };
    let api = ApiClient::new(&config, store.clone()).unwrap();
    (server, api, store, dir)
}

#[tokio::test]
async fn test_verify_otp_known_user() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/verify-otp"))
        .and(body_json(json!({"mobile": "9876543210", "otp": "1234"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok_user",
            "is_new_user": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = api.verify_otp("9876543210", "1234").await.unwrap();
    assert_eq!(response.access_token, "tok_user");
    assert!(!response.is_new_user);
}

#[tokio::test]
async fn test_verify_otp_new_user() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/verify-otp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok_new",
            "is_new_user": true
        })))
        .mount(&server)
        .await;

    let response = api.verify_otp("9876543210", "1234").await.unwrap();
    assert!(response.is_new_user);
}

#[tokio::test]
async fn test_bearer_token_attached_after_login() {
    let (server, api, store, _dir) = setup().await;
    store.set_mobile("9876543210").unwrap();
    store.set_token("tok_abc").unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/history/9876543210"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessions": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = api.chat_history("9876543210").await.unwrap();
    assert!(response.sessions.is_empty());
}

#[tokio::test]
async fn test_detail_string_surfaced_from_error_response() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/verify-otp"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Invalid OTP."})),
        )
        .mount(&server)
        .await;

    let error = api.verify_otp("9876543210", "0000").await.unwrap_err();
    match error {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid OTP.");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_detail_validation_list_first_message_surfaced() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/send-otp"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [
                {"loc": ["body", "mobile"], "msg": "mobile must be 10 digits"},
                {"loc": ["body", "mobile"], "msg": "second message"}
            ]
        })))
        .mount(&server)
        .await;

    let error = api.send_otp("123").await.unwrap_err();
    match error {
        ApiError::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "mobile must be 10 digits");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_send_round_trip() {
    let (server, api, store, _dir) = setup().await;
    store.set_token("tok_abc").unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/chat"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "The stars favor patience.",
            "assistant": "guruji",
            "wallet_balance": 90.0,
            "amount": 10.0,
            "guruji_json": {
                "para1": "The stars favor patience.",
                "para2": "Saturn asks for discipline.",
                "para3": "Good news arrives soon.",
                "follow_up": "Shall we look at your career?"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = findastro::gateway::types::ChatRequest {
        mobile: "9876543210".to_string(),
        message: "When will things improve?".to_string(),
        history: vec![],
        session_id: "SESS_1".to_string(),
    };
    let response = api.send_chat(request).await.unwrap();

    assert_eq!(response.answer, "The stars favor patience.");
    assert_eq!(response.wallet_balance, Some(90.0));
    let reply = response.guruji_json.unwrap();
    assert_eq!(reply.segments().len(), 3);
}

#[tokio::test]
async fn test_wallet_balance_and_recharge() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("GET"))
        .and(path("/wallet/balance/9876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": 42.0})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/wallet/recharge"))
        .and(body_json(json!({"mobile": "9876543210", "amount": 100.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": 142.0})))
        .mount(&server)
        .await;

    let balance = api.wallet_balance("9876543210").await.unwrap();
    assert!((balance.balance - 42.0).abs() < f64::EPSILON);

    let request = findastro::gateway::types::RechargeRequest {
        mobile: "9876543210".to_string(),
        amount: 100.0,
    };
    let response = api.recharge_wallet(&request).await.unwrap();
    assert!((response.balance - 142.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_wallet_toggle_uses_query_param() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("POST"))
        .and(path("/wallet/toggle-system"))
        .and(query_param("enabled", "true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    api.toggle_wallet_system(true).await.unwrap();
}

#[tokio::test]
async fn test_admin_stats_range_and_shape() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/stats"))
        .and(query_param("range", "30D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalUsers": 250,
            "activeToday": 31,
            "totalConversations": 1200,
            "averageRAGScore": 0.77,
            "trends": {"users": 12.0, "sessions": 0.0, "conversations": 4.0, "wallet": -1.0}
        })))
        .mount(&server)
        .await;

    let stats = api.dashboard_stats("30D").await.unwrap();
    assert_eq!(stats.total_users, 250);
    assert_eq!(stats.total_conversations, 1200);
    assert!((stats.trends.users - 12.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_user_status_fields() {
    let (server, api, _store, _dir) = setup().await;

    Mock::given(method("GET"))
        .and(path("/auth/user-status/9876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "user_profile": {"name": "Asha"},
            "wallet_balance": 100.0
        })))
        .mount(&server)
        .await;

    let response = api.user_status("9876543210").await.unwrap();
    assert_eq!(response.status, "processing");
    assert_eq!(response.user_profile.unwrap().name.as_deref(), Some("Asha"));
    assert_eq!(response.wallet_balance, Some(100.0));
}
