//! Bounded status check after a local approval or denial

use tracing::{debug, info};

use crate::api::wallet::TransactionStatus;
use crate::config::SettlePolicy;
use crate::models::{TransactionWrapper, WalletEvent};
use crate::services::transaction_service::TransactionManager;

#[derive(Debug, Clone, PartialEq)]
pub struct SettleOutcome {
    pub wrapper: TransactionWrapper,
    pub attempts: u32,
    /// False when the attempt budget ran out while still awaiting signature
    pub left_pending_signature: bool,
}

/// Re-read the transaction until it leaves PENDING_SIGNATURE or the budget is spent
///
/// `assumed_status` is recorded when no lookup succeeds. The last observed
/// state is written back with `update_transaction`, whether or not it settled,
/// before `TransactionSettled` is announced. Local marks on `wrapper` such as
/// `just_approved` are kept.
pub async fn settle_transaction(
    manager: &TransactionManager,
    wrapper: TransactionWrapper,
    assumed_status: TransactionStatus,
    policy: SettlePolicy,
) -> SettleOutcome {
    let mut wrapper = wrapper;
    wrapper.transaction.status = assumed_status;
    let tx_id = wrapper.id().to_string();

    let mut attempts = 0;
    let mut left_pending_signature = false;

    while attempts < policy.attempts {
        tokio::time::sleep(policy.interval).await;
        attempts += 1;

        if let Ok(latest) = manager.repository().get_transaction_by_id(&tx_id).await {
            debug!(
                "Settle check {}/{} for {}: {}",
                attempts, policy.attempts, tx_id, latest.status
            );
            let status = latest.status;
            wrapper.transaction = latest;
            if status != TransactionStatus::PendingSignature {
                left_pending_signature = true;
                break;
            }
        }
    }

    info!(
        "Transaction {} settled as {} after {} attempt(s)",
        tx_id,
        wrapper.status(),
        attempts
    );
    manager.update_transaction(wrapper.clone());
    manager.fire_event(WalletEvent::TransactionSettled {
        tx_id,
        status: wrapper.status(),
        attempts,
    });

    SettleOutcome {
        wrapper,
        attempts,
        left_pending_signature,
    }
}
