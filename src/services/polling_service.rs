//! Per-device registry of background polling tasks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{TransactionWrapper, WalletEvent};
use crate::services::poller::TransactionPoller;
use crate::services::transaction_service::TransactionManager;

struct PollingHandle {
    poller: Arc<TransactionPoller>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Cooperative stop: the task exits at its next page boundary
    fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        self.poller.close();
    }
}

/// At most one polling task runs per device id
pub struct PollingTransactionsManager {
    runtime: Handle,
    pollers: Mutex<HashMap<String, PollingHandle>>,
}

impl PollingTransactionsManager {
    /// Polling tasks are spawned on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pollers: Mutex::new(HashMap::new()),
        }
    }

    fn pollers(&self) -> MutexGuard<'_, HashMap<String, PollingHandle>> {
        self.pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start polling for `device_id`, replacing any poller already running for it
    pub fn start_polling_transactions(
        &self,
        manager: Arc<TransactionManager>,
        device_id: &str,
        interval: Duration,
    ) {
        let mut pollers = self.pollers();

        if let Some(previous) = pollers.remove(device_id) {
            warn!("Replacing running poller for device {}", device_id);
            previous.stop();
        }

        let poller = Arc::new(TransactionPoller::new(Arc::clone(&manager), device_id));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stream = poller.poll_transactions(interval);
        let task_device_id = device_id.to_string();
        let task_manager = Arc::clone(&manager);

        let task = self.runtime.spawn(async move {
            futures::pin_mut!(stream);
            while let Some(page) = stream.next().await {
                if *shutdown_rx.borrow() {
                    debug!("Polling task for {} cancelled, dropping page", task_device_id);
                    break;
                }
                for transaction in page {
                    task_manager.fire_transaction(TransactionWrapper::new(
                        task_device_id.as_str(),
                        transaction,
                    ));
                }
            }
            debug!("Polling task for device {} finished", task_device_id);
        });

        pollers.insert(
            device_id.to_string(),
            PollingHandle {
                poller,
                shutdown_tx,
                task,
            },
        );
        drop(pollers);

        info!(
            "Started polling transactions for device {} every {}ms",
            device_id,
            interval.as_millis()
        );
        manager.fire_event(WalletEvent::PollingStarted {
            device_id: device_id.to_string(),
        });
    }

    /// Stop the poller for `device_id`; returns whether one was running
    pub fn stop_polling_transactions(&self, manager: &TransactionManager, device_id: &str) -> bool {
        let removed = self.pollers().remove(device_id);
        warn!("Stopping polling transactions for device {}", device_id);

        match removed {
            Some(handle) => {
                handle.stop();
                manager.fire_event(WalletEvent::PollingStopped {
                    device_id: device_id.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// Stop every running poller; returns the affected device ids
    pub fn stop_all(&self, manager: &TransactionManager) -> Vec<String> {
        let drained: Vec<(String, PollingHandle)> = self.pollers().drain().collect();
        let mut devices = Vec::with_capacity(drained.len());
        for (device_id, handle) in drained {
            handle.stop();
            manager.fire_event(WalletEvent::PollingStopped {
                device_id: device_id.clone(),
            });
            devices.push(device_id);
        }
        devices
    }

    pub fn is_polling(&self, device_id: &str) -> bool {
        self.pollers()
            .get(device_id)
            .map(|h| !h.task.is_finished())
            .unwrap_or(false)
    }

    pub fn active_devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self.pollers().keys().cloned().collect();
        devices.sort();
        devices
    }
}

impl Drop for PollingTransactionsManager {
    fn drop(&mut self) {
        for (_, handle) in self.pollers().drain() {
            handle.stop();
        }
    }
}
