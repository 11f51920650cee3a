use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{
    ApiError, CreateTransactionRequest, CreateTransactionResponse, FeeEstimate, Page,
    RateLimitResponse, SuccessResponse, Transaction, TransactionFilter,
};
use super::WalletApi;
use crate::utils::ratelimit::rate_limit_wallet_api;

/// Embedded Wallet API client scoped to a single wallet
pub struct EmbeddedWalletClient {
    http_client: HttpClient,
    api_token: String,
    base_url: String,
    wallet_id: String,
}

impl EmbeddedWalletClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://sandbox-api.fireblocks.io/v1";

    /// Create a new client against the default backend
    pub fn new(api_token: String, wallet_id: String) -> Self {
        Self::with_base_url(api_token, wallet_id, Self::DEFAULT_BASE_URL.to_string())
    }

    /// Create a new client with custom base URL
    pub fn with_base_url(api_token: String, wallet_id: String, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            wallet_id,
        }
    }

    fn transactions_url(&self) -> String {
        format!("{}/ncw/wallets/{}/transactions", self.base_url, self.wallet_id)
    }

    /// Create default headers with authorization
    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_token))
            .map_err(|e| ApiError::RequestError(format!("Failed to create auth header: {}", e)))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = response.text().await.unwrap_or_default();

        match status_code {
            400 => {
                if let Ok(err_json) = serde_json::from_str::<serde_json::Value>(&body_text) {
                    let message = err_json
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&body_text);
                    ApiError::BadRequest(message.to_string())
                } else {
                    ApiError::BadRequest(body_text)
                }
            }
            401 => ApiError::Unauthorized(body_text),
            403 => ApiError::Forbidden(body_text),
            404 => ApiError::NotFound(body_text),
            429 => {
                let retry_after = serde_json::from_str::<RateLimitResponse>(&body_text)
                    .ok()
                    .and_then(|r| r.retry_after)
                    .unwrap_or(1000);
                warn!("Rate limited by wallet API, retry after {} ms", retry_after);
                ApiError::RateLimited { retry_after }
            }
            500..=599 => {
                warn!("Server error {}: {}", status_code, body_text);
                ApiError::ServerError(status_code as i32, body_text)
            }
            _ => ApiError::HttpError(status_code as i32, body_text),
        }
    }

    /// Send a prepared request and decode the JSON body
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        rate_limit_wallet_api().await;

        let headers = self.create_headers()?;
        let response = request
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl WalletApi for EmbeddedWalletClient {
    /// GET /ncw/wallets/{wallet_id}/transactions
    async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Page<Transaction>, ApiError> {
        let url = self.transactions_url();
        debug!("GET {} {:?}", url, filter);
        let request = self.http_client.get(&url).query(&filter.query_pairs());
        self.send_json(request).await
    }

    /// GET /ncw/wallets/{wallet_id}/transactions/{tx_id}
    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, ApiError> {
        let url = format!("{}/{}", self.transactions_url(), tx_id);
        self.send_json(self.http_client.get(&url)).await
    }

    /// POST /ncw/wallets/{wallet_id}/transactions/{tx_id}/cancel
    async fn cancel_transaction(&self, tx_id: &str) -> Result<SuccessResponse, ApiError> {
        let url = format!("{}/{}/cancel", self.transactions_url(), tx_id);
        self.send_json(self.http_client.post(&url)).await
    }

    /// POST /ncw/wallets/{wallet_id}/transactions
    async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse, ApiError> {
        let url = self.transactions_url();
        self.send_json(self.http_client.post(&url).json(request)).await
    }

    /// POST /ncw/wallets/{wallet_id}/transactions/estimate_fee
    async fn estimate_transaction_fee(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<FeeEstimate, ApiError> {
        let url = format!("{}/estimate_fee", self.transactions_url());
        self.send_json(self.http_client.post(&url).json(request)).await
    }
}
