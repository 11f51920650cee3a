//! In-memory transaction set and listener fan-out
//!
//! One `TransactionManager` exists per wallet session. Mutations of the set
//! and of the listener registries happen under short-lived locks; listener
//! callbacks always run on a snapshot taken after the lock is released.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::api::wallet::{
    ApiError, CreateTransactionRequest, CreateTransactionResponse, FeeEstimate, Transaction,
};
use crate::models::{TransactionWrapper, WalletEvent};
use crate::services::data_repository::{DataRepository, TransferParams};
use crate::utils::errors::panic_message;
use crate::utils::{ListenerError, WalletError};

/// Receives every transaction update and reset
pub trait TransactionListener: Send + Sync {
    /// `count` is the size of the transaction set after the upsert
    fn fire_transaction(&self, wrapper: &TransactionWrapper, count: usize)
        -> Result<(), ListenerError>;

    fn clear_transactions_count(&self) -> Result<(), ListenerError>;
}

/// Receives session events
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &WalletEvent) -> Result<(), ListenerError>;
}

#[derive(Default)]
struct TransactionState {
    /// Keyed by transaction id
    transactions: HashMap<String, TransactionWrapper>,
    active_device: Option<String>,
}

pub struct TransactionManager {
    state: Mutex<TransactionState>,
    transaction_listeners: Mutex<Vec<Arc<dyn TransactionListener>>>,
    event_listeners: Mutex<Vec<Arc<dyn EventListener>>>,
    repository: DataRepository,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // listener code never runs under these locks, so a poisoned guard still holds consistent data
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn same_listener<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Run `deliver` for each listener, isolating errors and panics per listener
fn notify_each<L: ?Sized, F>(listeners: &[Arc<L>], what: &str, deliver: F) -> usize
where
    F: Fn(&L) -> Result<(), ListenerError>,
{
    let mut failures = 0;
    for listener in listeners {
        let outcome = match catch_unwind(AssertUnwindSafe(|| deliver(listener.as_ref()))) {
            Ok(result) => result,
            Err(payload) => Err(ListenerError::Panicked(panic_message(payload.as_ref()))),
        };
        if let Err(e) = outcome {
            failures += 1;
            error!("{} listener failed: {}", what, e);
        }
    }
    failures
}

impl TransactionManager {
    pub fn new(repository: DataRepository) -> Self {
        Self {
            state: Mutex::new(TransactionState::default()),
            transaction_listeners: Mutex::new(Vec::new()),
            event_listeners: Mutex::new(Vec::new()),
            repository,
        }
    }

    pub fn repository(&self) -> &DataRepository {
        &self.repository
    }

    pub fn set_active_device(&self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        info!("Active device set to {}", device_id);
        lock(&self.state).active_device = Some(device_id);
    }

    pub fn active_device(&self) -> Option<String> {
        lock(&self.state).active_device.clone()
    }

    /// Insert or replace the payload by id; returns the stored entry and the
    /// resulting set size
    fn upsert(&self, wrapper: TransactionWrapper) -> (TransactionWrapper, usize) {
        let mut state = lock(&self.state);
        let stored = match state.transactions.entry(wrapper.id().to_string()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().update_from(wrapper);
                existing.get().clone()
            }
            Entry::Vacant(slot) => slot.insert(wrapper).clone(),
        };
        (stored, state.transactions.len())
    }

    /// Upsert the wrapper and tell every transaction listener about it
    ///
    /// The upsert is committed before any listener runs. A failing or
    /// panicking listener is logged and does not stop delivery to the rest.
    pub fn fire_transaction(&self, wrapper: TransactionWrapper) -> usize {
        let (wrapper, count) = self.upsert(wrapper);
        let listeners = lock(&self.transaction_listeners).clone();

        debug!(
            "Firing transaction {} ({}) to {} listener(s), count {}",
            wrapper.id(),
            wrapper.status(),
            listeners.len(),
            count
        );

        notify_each(&listeners, "Transaction", |l| {
            l.fire_transaction(&wrapper, count)
        });
        count
    }

    /// Upsert without notifying listeners
    pub fn update_transaction(&self, wrapper: TransactionWrapper) -> usize {
        self.upsert(wrapper).1
    }

    /// Transactions belonging to the active device, newest first
    pub fn get_transactions(&self) -> Vec<TransactionWrapper> {
        match self.active_device() {
            Some(device_id) => self.get_transactions_for(&device_id),
            None => Vec::new(),
        }
    }

    /// Transactions belonging to `device_id`, newest first
    pub fn get_transactions_for(&self, device_id: &str) -> Vec<TransactionWrapper> {
        let mut transactions: Vec<TransactionWrapper> = lock(&self.state)
            .transactions
            .values()
            .filter(|w| w.device_id == device_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        transactions
    }

    /// Local lookup by id, restricted to the active device
    pub fn get_transaction(&self, tx_id: &str) -> Option<TransactionWrapper> {
        let state = lock(&self.state);
        let device_id = state.active_device.as_deref()?;
        state
            .transactions
            .get(tx_id)
            .filter(|w| w.device_id == device_id)
            .cloned()
    }

    /// Size of the whole set across devices
    pub fn transaction_count(&self) -> usize {
        lock(&self.state).transactions.len()
    }

    /// Drop every stored transaction and reset listener counters
    pub fn clear_transactions(&self) {
        let removed = {
            let mut state = lock(&self.state);
            let removed = state.transactions.len();
            state.transactions.clear();
            removed
        };
        info!("Cleared {} transaction(s)", removed);

        let listeners = lock(&self.transaction_listeners).clone();
        notify_each(&listeners, "Transaction", |l| l.clear_transactions_count());
        self.fire_event(WalletEvent::TransactionsCleared);
    }

    /// Returns false if the same listener instance is already registered
    pub fn add_transaction_listener(&self, listener: Arc<dyn TransactionListener>) -> bool {
        let mut listeners = lock(&self.transaction_listeners);
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    pub fn remove_transaction_listener(&self, listener: &Arc<dyn TransactionListener>) -> bool {
        let mut listeners = lock(&self.transaction_listeners);
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn add_event_listener(&self, listener: Arc<dyn EventListener>) -> bool {
        let mut listeners = lock(&self.event_listeners);
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    pub fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut listeners = lock(&self.event_listeners);
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn fire_event(&self, event: WalletEvent) {
        let listeners = lock(&self.event_listeners).clone();
        debug!("Event: {}", event);
        notify_each(&listeners, "Event", |l| l.on_event(&event));
    }

    pub async fn cancel_transaction(&self, tx_id: &str) -> Result<(), WalletError> {
        let response = self
            .repository
            .cancel_transaction(tx_id)
            .await
            .map_err(|e| not_found_or(tx_id, e))?;
        if response.success {
            info!("Cancel requested for transaction {}", tx_id);
            Ok(())
        } else {
            warn!("Backend refused to cancel transaction {}", tx_id);
            Err(WalletError::Unavailable(format!(
                "cancel of {} was not accepted",
                tx_id
            )))
        }
    }

    pub async fn get_transaction_by_id(&self, tx_id: &str) -> Result<Transaction, WalletError> {
        self.repository
            .get_transaction_by_id(tx_id)
            .await
            .map_err(|e| not_found_or(tx_id, e))
    }

    pub async fn create_one_time_address_transaction(
        &self,
        params: &TransferParams,
        address: &str,
        tag: Option<&str>,
    ) -> Result<CreateTransactionResponse, WalletError> {
        Ok(self
            .repository
            .create_one_time_address_transaction(params, address, tag)
            .await?)
    }

    pub async fn create_contract_call_transaction(
        &self,
        params: &TransferParams,
        contract_address: &str,
        call_data: &str,
    ) -> Result<CreateTransactionResponse, WalletError> {
        Ok(self
            .repository
            .create_contract_call_transaction(params, contract_address, call_data)
            .await?)
    }

    pub async fn create_end_user_wallet_transaction(
        &self,
        params: &TransferParams,
        destination_wallet_id: &str,
        destination_account_id: &str,
    ) -> Result<CreateTransactionResponse, WalletError> {
        Ok(self
            .repository
            .create_end_user_wallet_transaction(params, destination_wallet_id, destination_account_id)
            .await?)
    }

    pub async fn create_vault_transaction(
        &self,
        params: &TransferParams,
        vault_account_id: &str,
    ) -> Result<CreateTransactionResponse, WalletError> {
        Ok(self
            .repository
            .create_vault_transaction(params, vault_account_id)
            .await?)
    }

    pub async fn estimate_transaction_fee(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<FeeEstimate, WalletError> {
        Ok(self.repository.estimate_transaction_fee(request).await?)
    }
}

fn not_found_or(tx_id: &str, e: ApiError) -> WalletError {
    match e {
        ApiError::NotFound(_) => WalletError::NotFound(tx_id.to_string()),
        other => WalletError::Api(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::wallet::TransactionStatus;
    use crate::testing::{tx, FakeWalletApi, ListenerMode, RecordingListener};
    use std::sync::atomic::Ordering;

    fn manager_with(api: Arc<FakeWalletApi>) -> TransactionManager {
        let manager = TransactionManager::new(DataRepository::new(api, "wallet-1"));
        manager.set_active_device("d1");
        manager
    }

    fn manager() -> TransactionManager {
        manager_with(Arc::new(FakeWalletApi::new()))
    }

    fn wrapper(device: &str, id: &str, status: TransactionStatus, created_at: i64) -> TransactionWrapper {
        TransactionWrapper::new(device, tx(id, status, created_at))
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let manager = manager();
        manager.fire_transaction(wrapper("d1", "1", TransactionStatus::PendingSignature, 100));
        let count = manager.fire_transaction(wrapper("d1", "1", TransactionStatus::Completed, 100));

        assert_eq!(count, 1);
        let stored = manager.get_transactions();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status(), TransactionStatus::Completed);
    }

    #[test]
    fn test_upsert_keeps_device_and_approval_mark() {
        let manager = manager();
        let listener = Arc::new(RecordingListener::new());
        manager.add_transaction_listener(listener.clone());

        let mut approved = wrapper("d1", "1", TransactionStatus::Broadcasting, 100);
        approved.just_approved = true;
        manager.update_transaction(approved);

        // a later poll of the same id, seen from another device
        manager.fire_transaction(wrapper("d2", "1", TransactionStatus::Completed, 100));

        let stored = manager.get_transaction("1").unwrap();
        assert_eq!(stored.device_id, "d1");
        assert_eq!(stored.status(), TransactionStatus::Completed);
        assert!(stored.just_approved);
        assert!(manager.get_transactions_for("d2").is_empty());
        assert_eq!(listener.fired_ids(), vec!["1"]);
    }

    #[test]
    fn test_reads_are_scoped_to_active_device() {
        let manager = manager();
        manager.fire_transaction(wrapper("d1", "1", TransactionStatus::Completed, 100));
        manager.fire_transaction(wrapper("d2", "2", TransactionStatus::Completed, 200));

        let ids: Vec<String> = manager
            .get_transactions()
            .iter()
            .map(|w| w.id().to_string())
            .collect();
        assert_eq!(ids, vec!["1"]);
        assert!(manager.get_transaction("2").is_none());
        assert_eq!(manager.get_transactions_for("d2").len(), 1);
        assert_eq!(manager.transaction_count(), 2);
    }

    #[test]
    fn test_no_active_device_reads_nothing() {
        let manager = TransactionManager::new(DataRepository::new(
            Arc::new(FakeWalletApi::new()),
            "wallet-1",
        ));
        manager.fire_transaction(wrapper("d1", "1", TransactionStatus::Completed, 100));
        assert!(manager.get_transactions().is_empty());
    }

    #[test]
    fn test_listener_counts_follow_insertion() {
        let manager = manager();
        let first = Arc::new(RecordingListener::new());
        let second = Arc::new(RecordingListener::new());
        manager.add_transaction_listener(first.clone());
        manager.add_transaction_listener(second.clone());

        for i in 1..=5 {
            manager.fire_transaction(wrapper("d1", &i.to_string(), TransactionStatus::Submitted, i));
        }

        assert_eq!(first.counts(), vec![1, 2, 3, 4, 5]);
        assert_eq!(second.counts(), vec![1, 2, 3, 4, 5]);
        assert_eq!(first.fired_ids(), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_duplicate_listener_registered_once() {
        let manager = manager();
        let listener = Arc::new(RecordingListener::new());
        assert!(manager.add_transaction_listener(listener.clone()));
        assert!(!manager.add_transaction_listener(listener.clone()));

        manager.fire_transaction(wrapper("d1", "1", TransactionStatus::Submitted, 1));
        assert_eq!(listener.counts(), vec![1]);

        let as_dyn: Arc<dyn TransactionListener> = listener.clone();
        assert!(manager.remove_transaction_listener(&as_dyn));
        manager.fire_transaction(wrapper("d1", "2", TransactionStatus::Submitted, 2));
        assert_eq!(listener.counts(), vec![1]);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let manager = manager();
        let failing = Arc::new(RecordingListener::with_mode(ListenerMode::Fail));
        let panicking = Arc::new(RecordingListener::with_mode(ListenerMode::Panic));
        let healthy = Arc::new(RecordingListener::new());
        manager.add_transaction_listener(failing.clone());
        manager.add_transaction_listener(panicking.clone());
        manager.add_transaction_listener(healthy.clone());

        manager.fire_transaction(wrapper("d1", "1", TransactionStatus::Submitted, 1));
        manager.fire_transaction(wrapper("d1", "2", TransactionStatus::Submitted, 2));

        assert_eq!(failing.counts(), vec![1, 2]);
        assert_eq!(panicking.counts(), vec![1, 2]);
        assert_eq!(healthy.counts(), vec![1, 2]);
        // the upsert survives listener failures
        assert_eq!(manager.get_transactions().len(), 2);
    }

    #[test]
    fn test_update_transaction_is_silent() {
        let manager = manager();
        let listener = Arc::new(RecordingListener::new());
        manager.add_transaction_listener(listener.clone());

        manager.update_transaction(wrapper("d1", "1", TransactionStatus::Broadcasting, 1));
        assert!(listener.counts().is_empty());
        assert_eq!(manager.get_transactions()[0].status(), TransactionStatus::Broadcasting);
    }

    #[test]
    fn test_clear_resets_set_and_listeners() {
        let manager = manager();
        let listener = Arc::new(RecordingListener::new());
        let other = Arc::new(RecordingListener::new());
        manager.add_transaction_listener(listener.clone());
        manager.add_transaction_listener(other.clone());
        manager.add_event_listener(listener.clone());

        manager.fire_transaction(wrapper("d1", "1", TransactionStatus::Submitted, 1));
        manager.fire_transaction(wrapper("d2", "2", TransactionStatus::Submitted, 2));
        manager.clear_transactions();

        assert!(manager.get_transactions().is_empty());
        assert_eq!(manager.transaction_count(), 0);
        assert_eq!(listener.clears.load(Ordering::SeqCst), 1);
        assert_eq!(other.clears.load(Ordering::SeqCst), 1);
        assert_eq!(
            *listener.events.lock().unwrap(),
            vec![WalletEvent::TransactionsCleared]
        );
    }

    #[test]
    fn test_newest_first_ordering() {
        let manager = manager();
        manager.fire_transaction(wrapper("d1", "old", TransactionStatus::Completed, 10));
        manager.fire_transaction(wrapper("d1", "new", TransactionStatus::Completed, 30));
        manager.fire_transaction(wrapper("d1", "mid", TransactionStatus::Completed, 20));

        let ids: Vec<String> = manager
            .get_transactions()
            .iter()
            .map(|w| w.id().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_forwarders_map_errors() {
        let api = Arc::new(FakeWalletApi::new());
        let manager = manager_with(api.clone());

        manager.cancel_transaction("tx-9").await.unwrap();
        assert_eq!(*api.cancelled.lock().unwrap(), vec!["tx-9".to_string()]);

        let err = manager.get_transaction_by_id("nope").await.unwrap_err();
        assert!(matches!(err, WalletError::NotFound(id) if id == "nope"));
    }
}
