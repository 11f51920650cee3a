use tracing::info;

use crate::models::{TransactionWrapper, WalletEvent};
use crate::services::{EventListener, TransactionListener};
use crate::utils::ListenerError;

/// Logs every transaction update and session event
pub struct ConsoleListener;

impl TransactionListener for ConsoleListener {
    fn fire_transaction(
        &self,
        wrapper: &TransactionWrapper,
        count: usize,
    ) -> Result<(), ListenerError> {
        info!(
            "📋 [{}] {} {} {} ({} known)",
            wrapper.device_id,
            wrapper.id(),
            wrapper.status(),
            wrapper.transaction.amount.as_deref().unwrap_or("-"),
            count
        );
        Ok(())
    }

    fn clear_transactions_count(&self) -> Result<(), ListenerError> {
        info!("📋 Transaction list reset");
        Ok(())
    }
}

impl EventListener for ConsoleListener {
    fn on_event(&self, event: &WalletEvent) -> Result<(), ListenerError> {
        info!("🔔 {}", event);
        Ok(())
    }
}
