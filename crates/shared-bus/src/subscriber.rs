//! # Head Listener

use crate::events::HeadEvent;
use shared_types::HeadTopic;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from listener operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// The bus was dropped.
    #[error("head event bus closed")]
    Closed,
}

/// Receives head changes for one topic.
pub struct HeadListener {
    topic: HeadTopic,
    receiver: broadcast::Receiver<HeadEvent>,
}

impl HeadListener {
    pub(crate) fn new(topic: HeadTopic, receiver: broadcast::Receiver<HeadEvent>) -> Self {
        Self { topic, receiver }
    }

    /// Wait for the next head change.
    ///
    /// Returns `None` once the bus is gone. A lagging listener skips the
    /// events it missed; the next retained event still signals a change.
    pub async fn recv(&mut self) -> Option<HeadEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(topic = %self.topic, lagged = count, "Head listener lagged");
                    continue;
                }
            }
        }
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<Option<HeadEvent>, ListenerError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(ListenerError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Drop every already-queued event and return how many were skipped.
    ///
    /// Used to coalesce a burst of changes into a single re-fetch.
    pub fn skip_pending(&mut self) -> usize {
        let mut skipped = 0;
        while let Ok(Some(_)) = self.try_recv() {
            skipped += 1;
        }
        skipped
    }

    pub fn topic(&self) -> HeadTopic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{HeadEventBus, HeadPublisher};
    use shared_types::{BlockRef, Hash};
    use std::time::Duration;
    use tokio::time::timeout;

    fn head(number: u64) -> BlockRef {
        BlockRef {
            hash: Hash::from_low_u64_be(number),
            number,
        }
    }

    #[tokio::test]
    async fn test_listener_recv() {
        let bus = HeadEventBus::new();
        let mut listener = bus.listen(HeadTopic::NewHead);

        bus.publish(HeadEvent::new_head(head(3)));

        let event = timeout(Duration::from_millis(100), listener.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(event.head.number, 3);
        assert_eq!(listener.topic(), HeadTopic::NewHead);
    }

    #[tokio::test]
    async fn test_listener_ignores_other_topic() {
        let bus = HeadEventBus::new();
        let mut listener = bus.listen(HeadTopic::FinalizedHead);

        bus.publish(HeadEvent::new_head(head(1)));
        assert_eq!(listener.try_recv(), Ok(None));

        bus.publish(HeadEvent::finalized(head(1)));
        assert!(matches!(listener.try_recv(), Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_listener_closed_when_bus_dropped() {
        let bus = HeadEventBus::new();
        let mut listener = bus.listen(HeadTopic::NewHead);
        drop(bus);

        assert!(listener.recv().await.is_none());
        assert_eq!(listener.try_recv(), Err(ListenerError::Closed));
    }

    #[test]
    fn test_skip_pending_coalesces() {
        let bus = HeadEventBus::new();
        let mut listener = bus.listen(HeadTopic::NewHead);

        for n in 1..=5 {
            bus.publish(HeadEvent::new_head(head(n)));
        }

        assert_eq!(listener.skip_pending(), 5);
        assert_eq!(listener.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_lagged_listener_still_signals() {
        let bus = HeadEventBus::with_capacity(2);
        let mut listener = bus.listen(HeadTopic::NewHead);

        for n in 1..=10 {
            bus.publish(HeadEvent::new_head(head(n)));
        }

        let event = timeout(Duration::from_millis(100), listener.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert!(event.head.number >= 9);
    }
}
