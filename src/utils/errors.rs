use thiserror::Error;

use crate::api::wallet::ApiError;

/// Errors surfaced by the wallet session and transaction manager
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet API error: {0}")]
    Api(#[from] ApiError),
    #[error("Transaction not found: {0}")]
    NotFound(String),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a listener callback
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),
    #[error("Listener panicked: {0}")]
    Panicked(String),
}

/// Best-effort text of a caught panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
