//! Wallet endpoints
//!
//! Balance, ledger, recharge, and the system-wide wallet toggle. All of
//! these ride on the same client and bearer token as the auth endpoints.

use super::types::{
    RechargeRequest, RechargeResponse, WalletBalanceResponse, WalletHistoryResponse,
    WalletStatusResponse,
};
use super::ApiClient;
use crate::error::ApiError;
use reqwest::Method;

impl ApiClient {
    /// `GET /wallet/status`
    pub async fn wallet_status(&self) -> Result<WalletStatusResponse, ApiError> {
        self.execute(self.request(Method::GET, "/wallet/status"))
            .await
    }

    /// `GET /wallet/balance/{mobile}`
    pub async fn wallet_balance(
        &self,
        mobile: &str,
    ) -> Result<WalletBalanceResponse, ApiError> {
        self.execute(self.request(Method::GET, &format!("/wallet/balance/{}", mobile)))
            .await
    }

    /// `GET /wallet/history/{mobile}`
    pub async fn wallet_history(
        &self,
        mobile: &str,
    ) -> Result<WalletHistoryResponse, ApiError> {
        self.execute(self.request(Method::GET, &format!("/wallet/history/{}", mobile)))
            .await
    }

    /// `POST /wallet/recharge`
    pub async fn recharge_wallet(
        &self,
        request: &RechargeRequest,
    ) -> Result<RechargeResponse, ApiError> {
        self.execute(self.request(Method::POST, "/wallet/recharge").json(request))
            .await
    }

    /// `POST /wallet/toggle-system?enabled=`
    pub async fn toggle_wallet_system(&self, enabled: bool) -> Result<(), ApiError> {
        self.execute_unit(
            self.request(
                Method::POST,
                &format!("/wallet/toggle-system?enabled={}", enabled),
            ),
        )
        .await
    }
}
