pub mod data_repository;
pub mod poller;
pub mod polling_service;
pub mod settle_service;
pub mod transaction_service;

pub use data_repository::{DataRepository, PagedSync, TransferParams};
pub use poller::TransactionPoller;
pub use polling_service::PollingTransactionsManager;
pub use settle_service::{settle_transaction, SettleOutcome};
pub use transaction_service::{EventListener, TransactionListener, TransactionManager};
