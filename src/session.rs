//! Wallet session: owns the transaction manager and the polling registry
//!
//! Created when a device signs in and dropped (after [`WalletSession::sign_out`])
//! when it leaves. Consumers hold a reference instead of looking up a global.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::api::wallet::{CreateTransactionResponse, FeeEstimate, TransactionStatus, WalletApi};
use crate::config::Config;
use crate::models::{TransactionWrapper, WalletEvent};
use crate::services::{
    settle_transaction, DataRepository, PagedSync, PollingTransactionsManager, SettleOutcome,
    TransactionManager, TransactionPoller, TransferParams,
};
use crate::utils::ratelimit::set_wallet_api_rate_limit;
use crate::utils::WalletError;

/// Seam to the key-share signing SDK
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_transaction(&self, tx_id: &str) -> Result<(), WalletError>;
}

/// Signer for hosts without a local key share; another device holding the
/// share is expected to sign, and the settle loop watches for the result
pub struct DeferredSigner;

#[async_trait]
impl TransactionSigner for DeferredSigner {
    async fn sign_transaction(&self, tx_id: &str) -> Result<(), WalletError> {
        info!("Awaiting signature for {} from the paired device", tx_id);
        Ok(())
    }
}

pub struct WalletSession {
    config: Config,
    manager: Arc<TransactionManager>,
    polling: PollingTransactionsManager,
    signer: Arc<dyn TransactionSigner>,
}

impl WalletSession {
    /// Must be called from within a tokio runtime; polling tasks run on it
    pub fn new(config: Config, api: Arc<dyn WalletApi>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self::with_runtime(config, api, signer, Handle::current())
    }

    pub fn with_runtime(
        config: Config,
        api: Arc<dyn WalletApi>,
        signer: Arc<dyn TransactionSigner>,
        runtime: Handle,
    ) -> Self {
        set_wallet_api_rate_limit(config.api_max_requests_per_second);

        let repository =
            DataRepository::new(api, config.wallet_id.clone()).with_max_pages(config.max_sync_pages);
        let manager = Arc::new(TransactionManager::new(repository));
        manager.set_active_device(config.device_id.clone());

        Self {
            config,
            manager,
            polling: PollingTransactionsManager::new(runtime),
            signer,
        }
    }

    pub fn manager(&self) -> &Arc<TransactionManager> {
        &self.manager
    }

    fn active_device(&self) -> Result<String, WalletError> {
        self.manager
            .active_device()
            .ok_or_else(|| WalletError::Unavailable("no active device".to_string()))
    }

    pub fn start_polling(&self) -> Result<(), WalletError> {
        let device_id = self.active_device()?;
        self.start_polling_device(&device_id);
        Ok(())
    }

    pub fn start_polling_device(&self, device_id: &str) {
        self.polling.start_polling_transactions(
            Arc::clone(&self.manager),
            device_id,
            self.config.poll_interval,
        );
    }

    pub fn stop_polling(&self, device_id: &str) -> bool {
        self.polling
            .stop_polling_transactions(&self.manager, device_id)
    }

    pub fn is_polling(&self, device_id: &str) -> bool {
        self.polling.is_polling(device_id)
    }

    /// Move the session to another device: old data is dropped, polling follows
    pub fn switch_device(&self, device_id: &str) {
        if let Some(previous) = self.manager.active_device() {
            if previous == device_id {
                return;
            }
            self.stop_polling(&previous);
        }
        self.manager.clear_transactions();
        self.manager.set_active_device(device_id);
        self.start_polling_device(device_id);
    }

    /// One-shot full fetch for the active device, fanned out like a poll
    pub async fn refresh_transactions(&self) -> Result<usize, WalletError> {
        let device_id = self.active_device()?;
        let poller = TransactionPoller::new(Arc::clone(&self.manager), device_id.as_str());

        let sync = poller.get_all_transactions().await.ok_or_else(|| {
            WalletError::Unavailable(format!("could not fetch transactions for {}", device_id))
        })?;

        if let PagedSync::Incomplete(items) = &sync {
            self.manager.fire_event(WalletEvent::SyncIncomplete {
                device_id: device_id.clone(),
                fetched: items.len(),
            });
        }

        let transactions = sync.into_transactions();
        let fetched = transactions.len();
        for transaction in transactions {
            self.manager
                .fire_transaction(TransactionWrapper::new(device_id.as_str(), transaction));
        }
        info!("Refreshed {} transaction(s) for device {}", fetched, device_id);
        Ok(fetched)
    }

    async fn lookup(&self, device_id: &str, tx_id: &str) -> Result<TransactionWrapper, WalletError> {
        match self.manager.get_transaction(tx_id) {
            Some(wrapper) => Ok(wrapper),
            None => {
                let transaction = self.manager.get_transaction_by_id(tx_id).await?;
                Ok(TransactionWrapper::new(device_id, transaction))
            }
        }
    }

    /// Sign a pending transaction and wait (bounded) for it to leave PENDING_SIGNATURE
    ///
    /// Polling for the device is paused for the duration and resumed afterwards,
    /// including on failure.
    pub async fn approve_transaction(&self, tx_id: &str) -> Result<SettleOutcome, WalletError> {
        let device_id = self.active_device()?;
        let wrapper = self.lookup(&device_id, tx_id).await?;

        let was_polling = self.stop_polling(&device_id);
        let result = self.approve_paused(wrapper).await;
        if was_polling {
            self.start_polling_device(&device_id);
        }
        result
    }

    async fn approve_paused(&self, mut wrapper: TransactionWrapper) -> Result<SettleOutcome, WalletError> {
        if let Err(e) = self.signer.sign_transaction(wrapper.id()).await {
            error!("Signing {} failed: {}", wrapper.id(), e);
            return Err(e);
        }

        wrapper.just_approved = true;
        let outcome = settle_transaction(
            &self.manager,
            wrapper,
            TransactionStatus::Broadcasting,
            self.config.settle,
        )
        .await;

        if !outcome.left_pending_signature {
            warn!(
                "Transaction {} still {} after {} checks; next poll will catch up",
                outcome.wrapper.id(),
                outcome.wrapper.status(),
                outcome.attempts
            );
        }
        Ok(outcome)
    }

    /// Cancel a pending transaction and wait (bounded) for the backend to reflect it
    pub async fn deny_transaction(&self, tx_id: &str) -> Result<SettleOutcome, WalletError> {
        let device_id = self.active_device()?;
        let wrapper = self.lookup(&device_id, tx_id).await?;

        let was_polling = self.stop_polling(&device_id);
        let result = match self.manager.cancel_transaction(tx_id).await {
            Ok(()) => Ok(settle_transaction(
                &self.manager,
                wrapper,
                TransactionStatus::Cancelling,
                self.config.settle,
            )
            .await),
            Err(e) => Err(e),
        };
        if was_polling {
            self.start_polling_device(&device_id);
        }
        result
    }

    pub async fn cancel_transaction(&self, tx_id: &str) -> Result<(), WalletError> {
        self.manager.cancel_transaction(tx_id).await
    }

    /// Transfer parameters funded from the configured account
    pub fn transfer_params(&self, asset_id: &str, amount: &str) -> TransferParams {
        TransferParams {
            asset_id: asset_id.to_string(),
            account_id: self.config.account_id.clone(),
            amount: amount.to_string(),
            fee_level: None,
            note: None,
        }
    }

    pub async fn send_to_address(
        &self,
        asset_id: &str,
        amount: &str,
        address: &str,
    ) -> Result<CreateTransactionResponse, WalletError> {
        let params = self.transfer_params(asset_id, amount);
        self.manager
            .create_one_time_address_transaction(&params, address, None)
            .await
    }

    pub async fn estimate_send_fee(
        &self,
        asset_id: &str,
        amount: &str,
        address: &str,
    ) -> Result<FeeEstimate, WalletError> {
        let params = self.transfer_params(asset_id, amount);
        let request = self
            .manager
            .repository()
            .one_time_address_request(&params, address, None);
        self.manager.estimate_transaction_fee(&request).await
    }

    /// Stop every poller and forget all transactions
    pub fn sign_out(&self) {
        let stopped = self.polling.stop_all(&self.manager);
        self.manager.clear_transactions();
        info!("Signed out ({} poller(s) stopped)", stopped.len());
    }
}
