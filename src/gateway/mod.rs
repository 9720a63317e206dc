//! Backend gateway for the Findastro client
//!
//! One typed async method per remote operation, all over a single
//! `reqwest` client with a shared base URL, a long shared timeout, and a
//! bearer-token header sourced from the session store once login has
//! stored one. Failures surface exactly once as [`ApiError`]; there is
//! no retry policy here, callers decide whether to show an error or
//! degrade.

pub mod admin;
pub mod types;
pub mod wallet;

use crate::config::ApiConfig;
use crate::error::{ApiError, FindastroError, Result};
use crate::session_store::SessionStore;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use types::{
    ChatRequest, ChatResponse, EndChatRequest, EndChatResponse, FeedbackRequest, HistoryResponse,
    RegisterRequest, SendOtpRequest, UserStatusResponse, VerifyOtpRequest, VerifyOtpResponse,
};

/// The chat-session operations the controller depends on
///
/// This is the seam between the session controller and the HTTP client:
/// tests substitute an in-memory implementation, production uses
/// [`ApiClient`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /auth/chat`
    async fn send_chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, ApiError>;

    /// `POST /auth/end-chat`
    async fn end_chat(
        &self,
        request: EndChatRequest,
    ) -> std::result::Result<EndChatResponse, ApiError>;

    /// `GET /auth/history/{mobile}`
    async fn chat_history(&self, mobile: &str)
        -> std::result::Result<HistoryResponse, ApiError>;

    /// `GET /auth/user-status/{mobile}`
    async fn user_status(
        &self,
        mobile: &str,
    ) -> std::result::Result<UserStatusResponse, ApiError>;

    /// `POST /auth/feedback`
    async fn submit_feedback(
        &self,
        request: FeedbackRequest,
    ) -> std::result::Result<(), ApiError>;
}

/// HTTP client for the Findastro backend
///
/// Holds the shared `reqwest::Client`, the base URL, and a reference to
/// the session store so the bearer token set at login rides on every
/// subsequent request until logout clears it.
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a new gateway
    ///
    /// # Errors
    ///
    /// Returns `FindastroError::Config` if the HTTP client cannot be
    /// initialized.
    pub fn new(config: &ApiConfig, store: Arc<SessionStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("findastro/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                FindastroError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::debug!("Initialized gateway: base_url={}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    /// Build a request for `path`, attaching the bearer token when one
    /// is stored
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.store.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode a JSON response body
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> std::result::Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_detail(&body, status.as_u16()),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send a request, discarding any response body
    async fn execute_unit(&self, builder: RequestBuilder) -> std::result::Result<(), ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_detail(&body, status.as_u16()),
            });
        }
        Ok(())
    }

    /// `POST /auth/send-otp`
    pub async fn send_otp(&self, mobile: &str) -> std::result::Result<(), ApiError> {
        let body = SendOtpRequest {
            mobile: mobile.to_string(),
        };
        self.execute_unit(self.request(Method::POST, "/auth/send-otp").json(&body))
            .await
    }

    /// `POST /auth/verify-otp`
    pub async fn verify_otp(
        &self,
        mobile: &str,
        otp: &str,
    ) -> std::result::Result<VerifyOtpResponse, ApiError> {
        let body = VerifyOtpRequest {
            mobile: mobile.to_string(),
            otp: otp.to_string(),
        };
        self.execute(self.request(Method::POST, "/auth/verify-otp").json(&body))
            .await
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> std::result::Result<(), ApiError> {
        self.execute_unit(self.request(Method::POST, "/auth/register").json(request))
            .await
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn send_chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, ApiError> {
        self.execute(self.request(Method::POST, "/auth/chat").json(&request))
            .await
    }

    async fn end_chat(
        &self,
        request: EndChatRequest,
    ) -> std::result::Result<EndChatResponse, ApiError> {
        self.execute(self.request(Method::POST, "/auth/end-chat").json(&request))
            .await
    }

    async fn chat_history(
        &self,
        mobile: &str,
    ) -> std::result::Result<HistoryResponse, ApiError> {
        self.execute(self.request(Method::GET, &format!("/auth/history/{}", mobile)))
            .await
    }

    async fn user_status(
        &self,
        mobile: &str,
    ) -> std::result::Result<UserStatusResponse, ApiError> {
        self.execute(self.request(Method::GET, &format!("/auth/user-status/{}", mobile)))
            .await
    }

    async fn submit_feedback(
        &self,
        request: FeedbackRequest,
    ) -> std::result::Result<(), ApiError> {
        self.execute_unit(self.request(Method::POST, "/auth/feedback").json(&request))
            .await
    }
}

/// Extract the user-facing message from an error response body
///
/// The backend reports structured validation errors FastAPI-style: a
/// `detail` field holding either a plain string or a list of records
/// whose first `msg` is the one worth surfacing. Anything else falls
/// back to a generic message carrying the status code.
fn extract_detail(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                if let Some(first) = items.first() {
                    if let Some(msg) = first.get("msg").and_then(|m| m.as_str()) {
                        return msg.to_string();
                    }
                    if let Some(s) = first.as_str() {
                        return s.to_string();
                    }
                }
            }
            _ => {}
        }
    }
    format!("The service returned an error (HTTP {})", status)
}
