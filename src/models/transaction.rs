//! Transaction models

use crate::api::wallet::{Transaction, TransactionStatus};

/// A backend transaction bound to the device it was observed on
///
/// Two wrappers describe the same logical transaction when their ids match,
/// whatever their device or payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionWrapper {
    pub device_id: String,
    pub transaction: Transaction,
    /// Set after a local approval settles; display only
    pub just_approved: bool,
}

impl TransactionWrapper {
    pub fn new(device_id: impl Into<String>, transaction: Transaction) -> Self {
        Self {
            device_id: device_id.into(),
            transaction,
            just_approved: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.transaction.status
    }

    pub fn created_at(&self) -> i64 {
        self.transaction.created_at
    }

    /// Replace the payload with a newer observation of the same transaction
    ///
    /// The owning device stays the one that first saw it, and an approval
    /// mark is only ever added, never cleared by a later poll.
    pub fn update_from(&mut self, other: TransactionWrapper) {
        self.transaction = other.transaction;
        self.just_approved |= other.just_approved;
    }
}
