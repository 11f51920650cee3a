//! Repeating fetch of the device's outgoing and incoming transactions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, FusedStream, Stream, StreamExt};
use tracing::{debug, warn};

use crate::api::wallet::{Transaction, TransactionFilter};
use crate::services::data_repository::PagedSync;
use crate::services::transaction_service::TransactionManager;

/// Lower bound for the next `after` query
///
/// Pending transactions keep the watermark at the oldest of them so they are
/// re-fetched until they settle. Once everything is final the watermark moves
/// one past the newest creation time.
pub fn compute_watermark<'a, I>(known: I) -> i64
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut oldest_pending: Option<i64> = None;
    let mut newest: Option<i64> = None;

    for transaction in known {
        newest = Some(newest.map_or(transaction.created_at, |n| n.max(transaction.created_at)));
        if !transaction.status.is_final() {
            oldest_pending = Some(
                oldest_pending.map_or(transaction.created_at, |p| p.min(transaction.created_at)),
            );
        }
    }

    match (oldest_pending, newest) {
        (Some(pending), _) => pending,
        (None, Some(newest)) => newest + 1,
        (None, None) => 0,
    }
}

pub struct TransactionPoller {
    manager: Arc<TransactionManager>,
    device_id: String,
    closed: AtomicBool,
}

impl TransactionPoller {
    pub fn new(manager: Arc<TransactionManager>, device_id: impl Into<String>) -> Self {
        Self {
            manager,
            device_id: device_id.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// Stop the stream; the in-flight iteration finishes without emitting
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Poller for device {} closed", self.device_id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn current_watermark(&self) -> i64 {
        let known = self.manager.get_transactions_for(&self.device_id);
        compute_watermark(known.iter().map(|w| &w.transaction))
    }

    fn directional_filters(after: i64) -> (TransactionFilter, TransactionFilter) {
        let outgoing = TransactionFilter {
            outgoing: Some(true),
            after: Some(after),
            ..Default::default()
        };
        let incoming = TransactionFilter {
            incoming: Some(true),
            after: Some(after),
            ..Default::default()
        };
        (outgoing, incoming)
    }

    /// One iteration's worth of data: both directions fetched concurrently
    async fn fetch_combined_page(&self) -> Vec<Transaction> {
        let after = self.current_watermark();
        let (outgoing, incoming) = Self::directional_filters(after);
        let repository = self.manager.repository();

        let (outgoing_page, incoming_page) = tokio::join!(
            repository.get_transactions(&outgoing),
            repository.get_transactions(&incoming)
        );

        let mut combined = outgoing_page.map(|p| p.data).unwrap_or_default();
        combined.extend(incoming_page.map(|p| p.data).unwrap_or_default());
        debug!(
            "Device {}: {} transaction(s) after {}",
            self.device_id,
            combined.len(),
            after
        );
        combined
    }

    /// Infinite stream of combined pages, one per `delay`
    ///
    /// Each call builds a new stream. Iterations never overlap: the next delay
    /// starts only after the consumer pulls again. Once closed the stream keeps
    /// yielding `None`.
    pub fn poll_transactions(
        self: &Arc<Self>,
        delay: Duration,
    ) -> impl Stream<Item = Vec<Transaction>> + FusedStream + Send + 'static {
        stream::unfold(Arc::clone(self), move |poller| async move {
            if poller.is_closed() {
                return None;
            }
            tokio::time::sleep(delay).await;
            if poller.is_closed() {
                return None;
            }

            let page = poller.fetch_combined_page().await;
            if poller.is_closed() {
                debug!(
                    "Dropping page of {} for closed poller {}",
                    page.len(),
                    poller.device_id
                );
                return None;
            }
            Some((page, poller))
        })
        .fuse()
    }

    /// Single full refresh following every cursor in both directions
    ///
    /// `None` when either direction could not be fetched at all.
    pub async fn get_all_transactions(&self) -> Option<PagedSync> {
        let after = self.current_watermark();
        let (outgoing, incoming) = Self::directional_filters(after);
        let repository = self.manager.repository();

        let (outgoing_sync, incoming_sync) = tokio::join!(
            repository.get_all_transactions(outgoing),
            repository.get_all_transactions(incoming)
        );

        let (outgoing_sync, incoming_sync) = match (outgoing_sync, incoming_sync) {
            (Some(o), Some(i)) => (o, i),
            _ => {
                warn!("Full refresh failed for device {}", self.device_id);
                return None;
            }
        };

        let complete = outgoing_sync.is_complete() && incoming_sync.is_complete();
        let mut combined = outgoing_sync.into_transactions();
        combined.extend(incoming_sync.into_transactions());

        Some(if complete {
            PagedSync::Complete(combined)
        } else {
            PagedSync::Incomplete(combined)
        })
    }
}
