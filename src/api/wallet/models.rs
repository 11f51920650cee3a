use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the wallet backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Submitted,
    PendingAmlScreening,
    PendingEnrichment,
    PendingAuthorization,
    Queued,
    PendingSignature,
    #[serde(rename = "PENDING_3RD_PARTY_MANUAL_APPROVAL")]
    Pending3rdPartyManualApproval,
    #[serde(rename = "PENDING_3RD_PARTY")]
    Pending3rdParty,
    Broadcasting,
    Confirming,
    Cancelling,
    Cancelled,
    Blocked,
    Rejected,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    /// COMPLETED, FAILED, CANCELLED and BLOCKED never change again
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed
                | TransactionStatus::Failed
                | TransactionStatus::Cancelled
                | TransactionStatus::Blocked
        )
    }

    /// Wire name, as used in query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Submitted => "SUBMITTED",
            TransactionStatus::PendingAmlScreening => "PENDING_AML_SCREENING",
            TransactionStatus::PendingEnrichment => "PENDING_ENRICHMENT",
            TransactionStatus::PendingAuthorization => "PENDING_AUTHORIZATION",
            TransactionStatus::Queued => "QUEUED",
            TransactionStatus::PendingSignature => "PENDING_SIGNATURE",
            TransactionStatus::Pending3rdPartyManualApproval => "PENDING_3RD_PARTY_MANUAL_APPROVAL",
            TransactionStatus::Pending3rdParty => "PENDING_3RD_PARTY",
            TransactionStatus::Broadcasting => "BROADCASTING",
            TransactionStatus::Confirming => "CONFIRMING",
            TransactionStatus::Cancelling => "CANCELLING",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Blocked => "BLOCKED",
            TransactionStatus::Rejected => "REJECTED",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub status: TransactionStatus,
    /// Creation time in milliseconds since the epoch
    pub created_at: i64,
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default)]
    pub sub_status: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Cursor info attached to a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl<T> Page<T> {
    /// Cursor for the following page, if the server returned one
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Query filter for GET transactions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub incoming: Option<bool>,
    pub outgoing: Option<bool>,
    pub after: Option<i64>,
    pub status: Option<TransactionStatus>,
    pub limit: Option<u32>,
    pub page_cursor: Option<String>,
}

impl TransactionFilter {
    /// Build the query pairs sent to the backend, skipping unset fields
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(incoming) = self.incoming {
            pairs.push(("incoming", incoming.to_string()));
        }
        if let Some(outgoing) = self.outgoing {
            pairs.push(("outgoing", outgoing.to_string()));
        }
        if let Some(after) = self.after {
            pairs.push(("after", after.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.page_cursor {
            pairs.push(("pageCursor", cursor.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerType {
    VaultAccount,
    EndUserWallet,
    OneTimeAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeAddress {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Source or destination of a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPeer {
    #[serde(rename = "type")]
    pub peer_type: PeerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_address: Option<OneTimeAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionOperation {
    Transfer,
    ContractCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraParameters {
    pub contract_call_data: String,
}

/// Request body for POST transactions and POST transactions/estimate_fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub asset_id: String,
    pub operation: TransactionOperation,
    pub source: TransferPeer,
    pub destination: TransferPeer,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_level: Option<FeeLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_parameters: Option<ExtraParameters>,
    pub external_tx_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionResponse {
    pub id: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeLevelEstimate {
    #[serde(default)]
    pub network_fee: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub fee_per_byte: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    #[serde(default)]
    pub low: FeeLevelEstimate,
    #[serde(default)]
    pub medium: FeeLevelEstimate,
    #[serde(default)]
    pub high: FeeLevelEstimate,
}

/// Body of POST transactions/{id}/cancel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// 429 response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResponse {
    pub message: Option<String>,
    pub retry_after: Option<i64>,
}

/// Comprehensive error type for API operations
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 401 Unauthorized
    Unauthorized(String),
    /// 403 Forbidden
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 429 Too Many Requests
    RateLimited { retry_after: i64 },
    /// 5xx Server Error
    ServerError(i32, String),
    /// Other HTTP errors
    HttpError(i32, String),
    /// Network/request error
    RequestError(String),
    /// Deserialization error
    DeserializationError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::RateLimited { retry_after } => {
                write!(f, "Rate Limited. Retry after {} ms", retry_after)
            }
            ApiError::ServerError(code, msg) => write!(f, "Server Error ({}): {}", code, msg),
            ApiError::HttpError(code, msg) => write!(f, "HTTP Error ({}): {}", code, msg),
            ApiError::RequestError(msg) => write!(f, "Request Error: {}", msg),
            ApiError::DeserializationError(msg) => write!(f, "Deserialization Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(TransactionStatus::Completed.is_final());
        assert!(TransactionStatus::Failed.is_final());
        assert!(TransactionStatus::Cancelled.is_final());
        assert!(TransactionStatus::Blocked.is_final());
        assert!(!TransactionStatus::PendingSignature.is_final());
        assert!(!TransactionStatus::Rejected.is_final());
        assert!(!TransactionStatus::Broadcasting.is_final());
    }

    #[test]
    fn test_transaction_page_deserializes() {
        let body = r#"{
            "data": [
                {"id": "tx-1", "status": "PENDING_SIGNATURE", "createdAt": 100, "lastUpdated": 120, "assetId": "ETH_TEST5"},
                {"id": "tx-2", "status": "PENDING_3RD_PARTY", "createdAt": 200},
                {"id": "tx-3", "status": "SOMETHING_NEW", "createdAt": 300}
            ],
            "paging": {"next": "cursor-2"}
        }"#;

        let page: Page<Transaction> = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.data[0].status, TransactionStatus::PendingSignature);
        assert_eq!(page.data[0].asset_id.as_deref(), Some("ETH_TEST5"));
        assert_eq!(page.data[1].status, TransactionStatus::Pending3rdParty);
        assert_eq!(page.data[2].status, TransactionStatus::Unknown);
        assert_eq!(page.next_cursor(), Some("cursor-2"));
    }

    #[test]
    fn test_empty_cursor_ends_paging() {
        let page: Page<Transaction> =
            serde_json::from_str(r#"{"data": [], "paging": {"next": ""}}"#).unwrap();
        assert_eq!(page.next_cursor(), None);

        let page: Page<Transaction> = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn test_filter_query_pairs_skip_unset() {
        let filter = TransactionFilter {
            outgoing: Some(true),
            after: Some(42),
            status: Some(TransactionStatus::PendingSignature),
            ..Default::default()
        };

        let pairs = filter.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("outgoing", "true".to_string()),
                ("after", "42".to_string()),
                ("status", "PENDING_SIGNATURE".to_string()),
            ]
        );
    }

    #[test]
    fn test_one_time_address_request_shape() {
        let request = CreateTransactionRequest {
            asset_id: "ETH_TEST5".to_string(),
            operation: TransactionOperation::Transfer,
            source: TransferPeer {
                peer_type: PeerType::EndUserWallet,
                id: Some("0".to_string()),
                wallet_id: Some("w-1".to_string()),
                one_time_address: None,
            },
            destination: TransferPeer {
                peer_type: PeerType::OneTimeAddress,
                id: None,
                wallet_id: None,
                one_time_address: Some(OneTimeAddress {
                    address: "0xabc".to_string(),
                    tag: None,
                }),
            },
            amount: "0.001".to_string(),
            fee_level: Some(FeeLevel::Medium),
            note: None,
            extra_parameters: None,
            external_tx_id: "ext-1".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["source"]["type"], "END_USER_WALLET");
        assert_eq!(json["source"]["walletId"], "w-1");
        assert_eq!(json["destination"]["type"], "ONE_TIME_ADDRESS");
        assert_eq!(json["destination"]["oneTimeAddress"]["address"], "0xabc");
        assert_eq!(json["feeLevel"], "MEDIUM");
        assert_eq!(json["externalTxId"], "ext-1");
        assert!(json.get("note").is_none());
    }
}
