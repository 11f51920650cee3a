//! In-memory doubles shared by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::wallet::models::{FeeLevelEstimate, Paging};
use crate::api::wallet::{
    ApiError, CreateTransactionRequest, CreateTransactionResponse, FeeEstimate, Page,
    SuccessResponse, Transaction, TransactionFilter, TransactionStatus, WalletApi,
};
use crate::models::{TransactionWrapper, WalletEvent};
use crate::services::transaction_service::{EventListener, TransactionListener};
use crate::utils::ListenerError;

pub fn tx(id: &str, status: TransactionStatus, created_at: i64) -> Transaction {
    Transaction {
        id: id.to_string(),
        status,
        created_at,
        last_updated: created_at,
        sub_status: None,
        asset_id: Some("ETH_TEST5".to_string()),
        operation: Some("TRANSFER".to_string()),
        amount: Some("0.01".to_string()),
        destination_address: None,
        tx_hash: None,
        note: None,
    }
}

pub fn page(items: Vec<Transaction>, next: Option<&str>) -> Page<Transaction> {
    Page {
        data: items,
        paging: next.map(|n| Paging {
            next: Some(n.to_string()),
        }),
    }
}

/// Scriptable stand-in for the wallet backend
#[derive(Default)]
pub struct FakeWalletApi {
    pub outgoing: Mutex<Vec<Transaction>>,
    pub incoming: Mutex<Vec<Transaction>>,
    /// Served in order before falling back to the direction lists; `None` fails the call
    pub scripted_pages: Mutex<VecDeque<Option<Page<Transaction>>>>,
    /// Status sequence per id; the last entry repeats
    pub statuses: Mutex<HashMap<String, VecDeque<TransactionStatus>>>,
    pub fail_listing: AtomicBool,
    pub listing_calls: Mutex<Vec<TransactionFilter>>,
    pub get_by_id_calls: AtomicUsize,
    pub cancelled: Mutex<Vec<String>>,
    pub created: Mutex<Vec<CreateTransactionRequest>>,
}

impl FakeWalletApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_statuses(&self, tx_id: &str, statuses: &[TransactionStatus]) {
        self.statuses
            .lock()
            .unwrap()
            .insert(tx_id.to_string(), statuses.iter().copied().collect());
    }

    pub fn listing_calls(&self) -> Vec<TransactionFilter> {
        self.listing_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletApi for FakeWalletApi {
    async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Page<Transaction>, ApiError> {
        self.listing_calls.lock().unwrap().push(filter.clone());

        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError(503, "unavailable".to_string()));
        }

        if let Some(scripted) = self.scripted_pages.lock().unwrap().pop_front() {
            return scripted.ok_or_else(|| ApiError::RequestError("scripted failure".to_string()));
        }

        let source = if filter.incoming == Some(true) {
            &self.incoming
        } else {
            &self.outgoing
        };
        let after = filter.after.unwrap_or(0);
        let items = source
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.created_at >= after)
            .cloned()
            .collect();
        Ok(page(items, None))
    }

    async fn get_transaction(&self, tx_id: &str) -> Result<Transaction, ApiError> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let script = statuses
            .get_mut(tx_id)
            .ok_or_else(|| ApiError::NotFound(tx_id.to_string()))?;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        };
        let status = next.ok_or_else(|| ApiError::NotFound(tx_id.to_string()))?;
        Ok(tx(tx_id, status, 100))
    }

    async fn cancel_transaction(&self, tx_id: &str) -> Result<SuccessResponse, ApiError> {
        self.cancelled.lock().unwrap().push(tx_id.to_string());
        Ok(SuccessResponse { success: true })
    }

    async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse, ApiError> {
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(CreateTransactionResponse {
            id: format!("created-{}", created.len()),
            status: TransactionStatus::Submitted,
        })
    }

    async fn estimate_transaction_fee(
        &self,
        _request: &CreateTransactionRequest,
    ) -> Result<FeeEstimate, ApiError> {
        Ok(FeeEstimate {
            medium: FeeLevelEstimate {
                network_fee: Some("0.0001".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMode {
    Ok,
    Fail,
    Panic,
}

/// Records every callback it receives
pub struct RecordingListener {
    pub mode: ListenerMode,
    pub fired: Mutex<Vec<(String, usize)>>,
    pub clears: AtomicUsize,
    pub events: Mutex<Vec<WalletEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::with_mode(ListenerMode::Ok)
    }

    pub fn with_mode(mode: ListenerMode) -> Self {
        Self {
            mode,
            fired: Mutex::new(Vec::new()),
            clears: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn counts(&self) -> Vec<usize> {
        self.fired.lock().unwrap().iter().map(|(_, c)| *c).collect()
    }

    pub fn fired_ids(&self) -> Vec<String> {
        self.fired.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    fn outcome(&self) -> Result<(), ListenerError> {
        match self.mode {
            ListenerMode::Ok => Ok(()),
            ListenerMode::Fail => Err(ListenerError::Failed("rejected".to_string())),
            ListenerMode::Panic => panic!("listener exploded"),
        }
    }
}

impl TransactionListener for RecordingListener {
    fn fire_transaction(
        &self,
        wrapper: &TransactionWrapper,
        count: usize,
    ) -> Result<(), ListenerError> {
        self.fired
            .lock()
            .unwrap()
            .push((wrapper.id().to_string(), count));
        self.outcome()
    }

    fn clear_transactions_count(&self) -> Result<(), ListenerError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &WalletEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone());
        self.outcome()
    }
}
