//! Data models shared by the polling services and the session
//!
//! Wire-level types live in `api::wallet::models`; these wrap them with
//! device ownership and session events.

pub mod event;
pub mod transaction;

pub use event::WalletEvent;
pub use transaction::TransactionWrapper;
