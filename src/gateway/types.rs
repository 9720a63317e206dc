//! Wire types for the Findastro backend
//!
//! Request and response bodies for every remote operation, matching the
//! backend's JSON field names. Response types default missing optional
//! fields so older backend versions deserialize cleanly.

use crate::chat::message::{AdvisorReply, Message};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/send-otp`
#[derive(Debug, Serialize)]
pub struct SendOtpRequest {
    pub mobile: String,
}

/// Request body for `POST /auth/verify-otp`
#[derive(Debug, Serialize)]
pub struct VerifyOtpRequest {
    pub mobile: String,
    pub otp: String,
}

/// Response body for `POST /auth/verify-otp`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpResponse {
    /// Bearer token for all subsequent calls
    pub access_token: String,
    /// True when the mobile number has no profile yet and registration
    /// must run before chat
    #[serde(default)]
    pub is_new_user: bool,
}

/// Request body for `POST /auth/register`
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub mobile: String,
    pub name: String,
    /// Birth date, `YYYY-MM-DD`
    pub birth_date: String,
    /// Birth time, `HH:MM`, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_time: Option<String>,
    /// Birth place, free text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub mobile: String,
    pub message: String,
    /// Prior log minus the synthetic greeting
    pub history: Vec<Message>,
    pub session_id: String,
}

/// Response body for `POST /auth/chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    /// The assistant's plain-text answer
    #[serde(default)]
    pub answer: String,
    /// Which persona answered ("maya" or "guruji")
    #[serde(default)]
    pub assistant: Option<String>,
    /// Wallet balance after any charge for this turn
    #[serde(default)]
    pub wallet_balance: Option<f64>,
    /// Coins debited for this turn
    #[serde(default)]
    pub amount: Option<f64>,
    /// Receptionist classification record, opaque
    #[serde(default)]
    pub maya_json: Option<serde_json::Value>,
    /// The advisor's structured reply
    #[serde(default)]
    pub guruji_json: Option<AdvisorReply>,
    /// Backend-reported metrics, opaque
    #[serde(default)]
    pub metrics: Option<serde_json::Value>,
    /// Retrieval context used for the answer, opaque
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Request body for `POST /auth/end-chat`
#[derive(Debug, Serialize)]
pub struct EndChatRequest {
    pub mobile: String,
    /// The full log, greeting included
    pub history: Vec<Message>,
    pub session_id: String,
}

/// Response body for `POST /auth/end-chat`
#[derive(Debug, Clone, Deserialize)]
pub struct EndChatResponse {
    pub summary: String,
}

/// Response body for `GET /auth/history/{mobile}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    /// Sessions, most recent first
    #[serde(default)]
    pub sessions: Vec<HistorySession>,
}

/// One server-held session in a history response
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySession {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Response body for `GET /auth/user-status/{mobile}`
#[derive(Debug, Clone, Deserialize)]
pub struct UserStatusResponse {
    /// Readiness status string: checking, processing, ready, failed
    pub status: String,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub wallet_balance: Option<f64>,
}

/// Profile fields piggybacked on the status response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for `POST /auth/feedback`
#[derive(Debug, Serialize)]
pub struct FeedbackRequest {
    pub mobile: String,
    pub session_id: String,
    /// Star rating, 1-5
    pub rating: u8,
    /// Free-text comment; the backend calls this field `feedback`
    pub feedback: String,
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Response body for `GET /wallet/status`
#[derive(Debug, Clone, Deserialize)]
pub struct WalletStatusResponse {
    /// Whether the wallet system is enabled at all
    #[serde(default)]
    pub enabled: bool,
}

/// Response body for `GET /wallet/balance/{mobile}`
#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResponse {
    #[serde(default)]
    pub balance: f64,
}

/// Response body for `GET /wallet/history/{mobile}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletHistoryResponse {
    #[serde(default)]
    pub transactions: Vec<WalletTransaction>,
}

/// One wallet ledger entry
#[derive(Debug, Clone, Deserialize)]
pub struct WalletTransaction {
    #[serde(default)]
    pub amount: f64,
    /// "credit" or "debit"
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request body for `POST /wallet/recharge`
#[derive(Debug, Serialize)]
pub struct RechargeRequest {
    pub mobile: String,
    pub amount: f64,
}

/// Response body for `POST /wallet/recharge`
#[derive(Debug, Clone, Deserialize)]
pub struct RechargeResponse {
    /// Balance after the recharge
    #[serde(default)]
    pub balance: f64,
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/login`
#[derive(Debug, Serialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Response body for `POST /admin/login`
#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginResponse {
    pub access_token: String,
}

/// Response body for `GET /admin/users`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUsersResponse {
    #[serde(default)]
    pub users: Vec<AdminUser>,
}

/// One user row in the admin users listing
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUser {
    pub mobile: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub wallet_balance: Option<f64>,
    #[serde(default)]
    pub last_active: Option<String>,
}

/// Response body for the system/receptionist prompt endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct PromptResponse {
    #[serde(default)]
    pub prompt: String,
}

/// Request body for the system/receptionist prompt update endpoints
#[derive(Debug, Serialize)]
pub struct PromptUpdateRequest {
    pub prompt: String,
}

/// Response body for `POST /admin/test-upload`
#[derive(Debug, Clone, Deserialize)]
pub struct TestUploadResponse {
    /// Server-side name of the uploaded file, fed to test-process
    pub filename: String,
}

/// Response body for `POST /admin/test-process`
#[derive(Debug, Clone, Deserialize)]
pub struct TestProcessResponse {
    /// Document id usable in test-chat requests
    pub doc_id: String,
}

/// Request body for `POST /admin/test-chat`
#[derive(Debug, Serialize)]
pub struct TestChatRequest {
    pub message: String,
    pub doc_id: String,
    pub model: String,
}

/// Dashboard statistics from `GET /admin/stats?range=`
///
/// The backend reports these camelCase; all fields default to zero so a
/// partial stats payload still renders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_today: u64,
    pub total_conversations: u64,
    #[serde(rename = "averageRAGScore")]
    pub average_rag_score: f64,
    pub wallet_volume: f64,
    pub total_dakshina: f64,
    pub dakshina_wallet: f64,
    pub dakshina_gateway: f64,
    pub total_tokens: u64,
    pub ai_cost: f64,
    pub current_balance: f64,
    pub active_subscriptions: u64,
    pub trends: StatTrends,
}

/// Percentage trends attached to the dashboard stats
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatTrends {
    pub users: f64,
    pub sessions: f64,
    pub conversations: f64,
    pub wallet: f64,
}
