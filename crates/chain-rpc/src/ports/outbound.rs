//! Outbound ports for the chain RPC facade.

use crate::domain::SubscriptionNotification;
use async_trait::async_trait;
use shared_bus::HeadListener;
use shared_types::{BlockNumber, BlockRef, Bytes, Hash, HeadTopic, Header};
use tokio::sync::mpsc;

/// Read-only view of the canonical chain.
///
/// Lookups are async so a backing store may hit disk or a remote node;
/// head accessors are synchronous snapshots.
#[async_trait]
pub trait ChainState: Send + Sync {
    /// Current best head.
    fn best_head(&self) -> BlockRef;

    /// Current finalized head.
    fn finalized_head(&self) -> BlockRef;

    /// Hash of the canonical block at `number`.
    async fn block_hash_at(&self, number: BlockNumber) -> Option<Hash>;

    /// Header of the block with `hash`.
    async fn header(&self, hash: &Hash) -> Option<Header>;

    /// Extrinsics of the block with `hash`.
    async fn extrinsics(&self, hash: &Hash) -> Option<Vec<Bytes>>;

    /// Register for head-change signals on `topic`. Dropping the listener
    /// unregisters it.
    fn head_listener(&self, topic: HeadTopic) -> HeadListener;

    /// Head for a topic.
    fn head(&self, topic: HeadTopic) -> BlockRef {
        match topic {
            HeadTopic::NewHead => self.best_head(),
            HeadTopic::FinalizedHead => self.finalized_head(),
        }
    }
}

/// Push channel back to the client that opened a subscription.
pub trait SubscriptionSink: Send + Sync {
    /// Hand a notification to the transport.
    ///
    /// `Err` means the client is gone and the subscription should end.
    fn send(&self, notification: SubscriptionNotification) -> Result<(), SinkClosed>;
}

/// The receiving side of a sink has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("subscription sink closed")]
pub struct SinkClosed;

impl SubscriptionSink for mpsc::UnboundedSender<SubscriptionNotification> {
    fn send(&self, notification: SubscriptionNotification) -> Result<(), SinkClosed> {
        mpsc::UnboundedSender::send(self, notification).map_err(|_| SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_sender_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notif = SubscriptionNotification::new(
            HeadTopic::NewHead,
            "0x1".into(),
            serde_json::Value::Null,
        );

        assert!(SubscriptionSink::send(&tx, notif.clone()).is_ok());
        assert_eq!(rx.try_recv().unwrap(), notif);

        drop(rx);
        assert_eq!(SubscriptionSink::send(&tx, notif), Err(SinkClosed));
    }
}
