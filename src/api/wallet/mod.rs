pub mod client;
pub mod models;

use async_trait::async_trait;

pub use client::EmbeddedWalletClient;
pub use models::{
    ApiError, CreateTransactionRequest, CreateTransactionResponse, FeeEstimate, Page,
    SuccessResponse, Transaction, TransactionFilter, TransactionStatus,
};

/// Transaction endpoints of the Embedded Wallet backend
///
/// Implemented over HTTP by [`EmbeddedWalletClient`]; tests plug in an in-memory fake.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Page<Transaction>, ApiError>;

    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, ApiError>;

    async fn cancel_transaction(&self, tx_id: &str) -> Result<SuccessResponse, ApiError>;

    async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse, ApiError>;

    async fn estimate_transaction_fee(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<FeeEstimate, ApiError>;
}
