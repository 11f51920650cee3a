//! Stateless wrapper over the wallet transaction endpoints
//!
//! Listing failures are logged and returned as `None`; creation and lookup
//! failures are logged and handed back as `Err(ApiError)`. Nothing here panics
//! or retries.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::wallet::models::{
    ExtraParameters, FeeLevel, OneTimeAddress, PeerType, TransactionOperation, TransferPeer,
};
use crate::api::wallet::{
    ApiError, CreateTransactionRequest, CreateTransactionResponse, FeeEstimate, Page,
    SuccessResponse, Transaction, TransactionFilter, WalletApi,
};

pub const DEFAULT_MAX_SYNC_PAGES: usize = 50;

/// Outcome of following a cursor chain
#[derive(Debug, Clone, PartialEq)]
pub enum PagedSync {
    /// The backend stopped returning a cursor
    Complete(Vec<Transaction>),
    /// The page cap was hit or a follow-up page failed
    Incomplete(Vec<Transaction>),
}

impl PagedSync {
    pub fn is_complete(&self) -> bool {
        matches!(self, PagedSync::Complete(_))
    }

    pub fn transactions(&self) -> &[Transaction] {
        match self {
            PagedSync::Complete(items) | PagedSync::Incomplete(items) => items,
        }
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        match self {
            PagedSync::Complete(items) | PagedSync::Incomplete(items) => items,
        }
    }
}

/// Fields shared by every transfer the device originates
#[derive(Debug, Clone, PartialEq)]
pub struct TransferParams {
    pub asset_id: String,
    /// End-user wallet account funding the transfer
    pub account_id: String,
    pub amount: String,
    pub fee_level: Option<FeeLevel>,
    pub note: Option<String>,
}

pub struct DataRepository {
    api: Arc<dyn WalletApi>,
    wallet_id: String,
    max_pages: usize,
}

impl DataRepository {
    pub fn new(api: Arc<dyn WalletApi>, wallet_id: impl Into<String>) -> Self {
        Self {
            api,
            wallet_id: wallet_id.into(),
            max_pages: DEFAULT_MAX_SYNC_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch a single page; `None` on any request failure
    pub async fn get_transactions(&self, filter: &TransactionFilter) -> Option<Page<Transaction>> {
        match self.api.get_transactions(filter).await {
            Ok(page) => {
                debug!(
                    "Fetched {} transactions (incoming: {:?}, outgoing: {:?}, after: {:?})",
                    page.data.len(),
                    filter.incoming,
                    filter.outgoing,
                    filter.after
                );
                Some(page)
            }
            Err(e) => {
                warn!("Failed to fetch transactions: {}", e);
                None
            }
        }
    }

    /// Follow `paging.next` until the backend stops returning a cursor
    ///
    /// Returns `None` when the first page fails. A later failure, or reaching
    /// the page cap, keeps what was accumulated and reports `Incomplete`.
    pub async fn get_all_transactions(&self, filter: TransactionFilter) -> Option<PagedSync> {
        let mut filter = filter;
        let mut items = Vec::new();

        let first = self.get_transactions(&filter).await?;
        let mut cursor = first.next_cursor().map(str::to_string);
        items.extend(first.data);
        let mut pages = 1;

        while let Some(next) = cursor.take() {
            if pages >= self.max_pages {
                warn!(
                    "Stopped following transaction cursor after {} pages ({} transactions)",
                    pages,
                    items.len()
                );
                return Some(PagedSync::Incomplete(items));
            }

            filter.page_cursor = Some(next);
            match self.get_transactions(&filter).await {
                Some(page) => {
                    cursor = page.next_cursor().map(str::to_string);
                    items.extend(page.data);
                    pages += 1;
                }
                None => return Some(PagedSync::Incomplete(items)),
            }
        }

        Some(PagedSync::Complete(items))
    }

    fn source(&self, params: &TransferParams) -> TransferPeer {
        TransferPeer {
            peer_type: PeerType::EndUserWallet,
            id: Some(params.account_id.clone()),
            wallet_id: Some(self.wallet_id.clone()),
            one_time_address: None,
        }
    }

    fn build_request(
        &self,
        params: &TransferParams,
        operation: TransactionOperation,
        destination: TransferPeer,
        extra_parameters: Option<ExtraParameters>,
    ) -> CreateTransactionRequest {
        CreateTransactionRequest {
            asset_id: params.asset_id.clone(),
            operation,
            source: self.source(params),
            destination,
            amount: params.amount.clone(),
            fee_level: params.fee_level,
            note: params.note.clone(),
            extra_parameters,
            external_tx_id: Uuid::new_v4().to_string(),
        }
    }

    /// Request paying an arbitrary address
    pub fn one_time_address_request(
        &self,
        params: &TransferParams,
        address: &str,
        tag: Option<&str>,
    ) -> CreateTransactionRequest {
        let destination = TransferPeer {
            peer_type: PeerType::OneTimeAddress,
            id: None,
            wallet_id: None,
            one_time_address: Some(OneTimeAddress {
                address: address.to_string(),
                tag: tag.map(str::to_string),
            }),
        };
        self.build_request(params, TransactionOperation::Transfer, destination, None)
    }

    /// Request invoking a contract with pre-encoded call data
    pub fn contract_call_request(
        &self,
        params: &TransferParams,
        contract_address: &str,
        call_data: &str,
    ) -> CreateTransactionRequest {
        let destination = TransferPeer {
            peer_type: PeerType::OneTimeAddress,
            id: None,
            wallet_id: None,
            one_time_address: Some(OneTimeAddress {
                address: contract_address.to_string(),
                tag: None,
            }),
        };
        self.build_request(
            params,
            TransactionOperation::ContractCall,
            destination,
            Some(ExtraParameters {
                contract_call_data: call_data.to_string(),
            }),
        )
    }

    /// Request paying another end-user wallet account
    pub fn end_user_wallet_request(
        &self,
        params: &TransferParams,
        destination_wallet_id: &str,
        destination_account_id: &str,
    ) -> CreateTransactionRequest {
        let destination = TransferPeer {
            peer_type: PeerType::EndUserWallet,
            id: Some(destination_account_id.to_string()),
            wallet_id: Some(destination_wallet_id.to_string()),
            one_time_address: None,
        };
        self.build_request(params, TransactionOperation::Transfer, destination, None)
    }

    /// Request paying a workspace vault account
    pub fn vault_request(
        &self,
        params: &TransferParams,
        vault_account_id: &str,
    ) -> CreateTransactionRequest {
        let destination = TransferPeer {
            peer_type: PeerType::VaultAccount,
            id: Some(vault_account_id.to_string()),
            wallet_id: None,
            one_time_address: None,
        };
        self.build_request(params, TransactionOperation::Transfer, destination, None)
    }

    async fn submit(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse, ApiError> {
        match self.api.create_transaction(&request).await {
            Ok(response) => {
                info!(
                    "Created {:?} transaction {} ({} {}) with status {}",
                    request.operation, response.id, request.amount, request.asset_id, response.status
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    "Failed to create transaction (external id {}): {}",
                    request.external_tx_id, e
                );
                Err(e)
            }
        }
    }

    pub async fn create_one_time_address_transaction(
        &self,
        params: &TransferParams,
        address: &str,
        tag: Option<&str>,
    ) -> Result<CreateTransactionResponse, ApiError> {
        self.submit(self.one_time_address_request(params, address, tag))
            .await
    }

    pub async fn create_contract_call_transaction(
        &self,
        params: &TransferParams,
        contract_address: &str,
        call_data: &str,
    ) -> Result<CreateTransactionResponse, ApiError> {
        self.submit(self.contract_call_request(params, contract_address, call_data))
            .await
    }

    pub async fn create_end_user_wallet_transaction(
        &self,
        params: &TransferParams,
        destination_wallet_id: &str,
        destination_account_id: &str,
    ) -> Result<CreateTransactionResponse, ApiError> {
        self.submit(self.end_user_wallet_request(
            params,
            destination_wallet_id,
            destination_account_id,
        ))
        .await
    }

    pub async fn create_vault_transaction(
        &self,
        params: &TransferParams,
        vault_account_id: &str,
    ) -> Result<CreateTransactionResponse, ApiError> {
        self.submit(self.vault_request(params, vault_account_id))
            .await
    }

    pub async fn cancel_transaction(&self, tx_id: &str) -> Result<SuccessResponse, ApiError> {
        self.api.cancel_transaction(tx_id).await.map_err(|e| {
            error!("Failed to cancel transaction {}: {}", tx_id, e);
            e
        })
    }

    pub async fn get_transaction_by_id(&self, tx_id: &str) -> Result<Transaction, ApiError> {
        self.api.get_transaction(tx_id).await.map_err(|e| {
            warn!("Failed to fetch transaction {}: {}", tx_id, e);
            e
        })
    }

    pub async fn estimate_transaction_fee(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<FeeEstimate, ApiError> {
        self.api.estimate_transaction_fee(request).await.map_err(|e| {
            warn!("Failed to estimate fee for {}: {}", request.asset_id, e);
            e
        })
    }
}
