//! Admin endpoints
//!
//! Dashboard queries, prompt management, and the chat tester. The chat
//! tester's upload and process endpoints take multipart bodies; the rest
//! are plain JSON like everything else.

use super::types::{
    AdminLoginRequest, AdminLoginResponse, AdminUsersResponse, DashboardStats, PromptResponse,
    PromptUpdateRequest, TestChatRequest, TestProcessResponse, TestUploadResponse,
};
use super::ApiClient;
use crate::error::ApiError;
use reqwest::multipart;
use reqwest::Method;
use std::path::Path;

impl ApiClient {
    /// `POST /admin/login`
    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminLoginResponse, ApiError> {
        let body = AdminLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.execute(self.request(Method::POST, "/admin/login").json(&body))
            .await
    }

    /// `GET /admin/users`
    pub async fn admin_users(&self) -> Result<AdminUsersResponse, ApiError> {
        self.execute(self.request(Method::GET, "/admin/users"))
            .await
    }

    /// `GET /admin/user-details/{mobile}`
    ///
    /// The detail record's shape varies with the backend version, so it
    /// is passed through opaquely and rendered as pretty JSON.
    pub async fn admin_user_details(
        &self,
        mobile: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(self.request(Method::GET, &format!("/admin/user-details/{}", mobile)))
            .await
    }

    /// `GET /admin/system-prompt`
    pub async fn system_prompt(&self) -> Result<PromptResponse, ApiError> {
        self.execute(self.request(Method::GET, "/admin/system-prompt"))
            .await
    }

    /// `POST /admin/system-prompt`
    pub async fn update_system_prompt(&self, prompt: &str) -> Result<(), ApiError> {
        let body = PromptUpdateRequest {
            prompt: prompt.to_string(),
        };
        self.execute_unit(self.request(Method::POST, "/admin/system-prompt").json(&body))
            .await
    }

    /// `GET /admin/maya-prompt`
    pub async fn maya_prompt(&self) -> Result<PromptResponse, ApiError> {
        self.execute(self.request(Method::GET, "/admin/maya-prompt"))
            .await
    }

    /// `POST /admin/maya-prompt`
    pub async fn update_maya_prompt(&self, prompt: &str) -> Result<(), ApiError> {
        let body = PromptUpdateRequest {
            prompt: prompt.to_string(),
        };
        self.execute_unit(self.request(Method::POST, "/admin/maya-prompt").json(&body))
            .await
    }

    /// `POST /admin/test-upload` (multipart)
    ///
    /// Uploads a document for the chat tester and returns the
    /// server-side filename to feed into [`Self::admin_test_process`].
    pub async fn admin_test_upload(
        &self,
        file_path: &Path,
    ) -> Result<TestUploadResponse, ApiError> {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| ApiError::Decode(format!("could not read {}: {}", file_path.display(), e)))?;

        let part = multipart::Part::bytes(bytes).file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        self.execute(
            self.request(Method::POST, "/admin/test-upload")
                .multipart(form),
        )
        .await
    }

    /// `POST /admin/test-process` (multipart)
    pub async fn admin_test_process(
        &self,
        filename: &str,
    ) -> Result<TestProcessResponse, ApiError> {
        let form = multipart::Form::new().text("filename", filename.to_string());
        self.execute(
            self.request(Method::POST, "/admin/test-process")
                .multipart(form),
        )
        .await
    }

    /// `POST /admin/test-chat`
    ///
    /// The tester response mirrors the chat response but its shape drifts
    /// with backend experiments, so it is passed through opaquely.
    pub async fn admin_test_chat(
        &self,
        message: &str,
        doc_id: &str,
        model: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let body = TestChatRequest {
            message: message.to_string(),
            doc_id: doc_id.to_string(),
            model: model.to_string(),
        };
        self.execute(self.request(Method::POST, "/admin/test-chat").json(&body))
            .await
    }

    /// `GET /admin/stats?range=`
    pub async fn dashboard_stats(&self, range: &str) -> Result<DashboardStats, ApiError> {
        self.execute(self.request(Method::GET, &format!("/admin/stats?range={}", range)))
            .await
    }
}
