//! Session level notifications

use crate::api::wallet::TransactionStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    PollingStarted { device_id: String },
    PollingStopped { device_id: String },
    TransactionsCleared,
    /// A full refresh stopped before the backend ran out of pages
    SyncIncomplete { device_id: String, fetched: usize },
    TransactionSettled {
        tx_id: String,
        status: TransactionStatus,
        attempts: u32,
    },
}

impl std::fmt::Display for WalletEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletEvent::PollingStarted { device_id } => {
                write!(f, "polling started for device {}", device_id)
            }
            WalletEvent::PollingStopped { device_id } => {
                write!(f, "polling stopped for device {}", device_id)
            }
            WalletEvent::TransactionsCleared => write!(f, "transactions cleared"),
            WalletEvent::SyncIncomplete { device_id, fetched } => write!(
                f,
                "sync incomplete for device {} ({} transactions fetched)",
                device_id, fetched
            ),
            WalletEvent::TransactionSettled {
                tx_id,
                status,
                attempts,
            } => write!(
                f,
                "transaction {} settled as {} after {} attempt(s)",
                tx_id, status, attempts
            ),
        }
    }
}
