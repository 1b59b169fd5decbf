//! # Head Event Publisher

use crate::events::HeadEvent;
use crate::subscriber::HeadListener;
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::HeadTopic;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Publishing side of the bus.
pub trait HeadPublisher: Send + Sync {
    /// Publish a head change.
    ///
    /// Returns the number of listeners the event reached.
    fn publish(&self, event: HeadEvent) -> usize;
}

/// In-memory bus with one broadcast channel per topic.
///
/// Separate channels keep a burst of best-head changes from lagging
/// listeners that only care about finality.
pub struct HeadEventBus {
    new_heads: broadcast::Sender<HeadEvent>,
    finalized_heads: broadcast::Sender<HeadEvent>,
    capacity: usize,
}

impl HeadEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (new_heads, _) = broadcast::channel(capacity);
        let (finalized_heads, _) = broadcast::channel(capacity);
        Self {
            new_heads,
            finalized_heads,
            capacity,
        }
    }

    fn sender(&self, topic: HeadTopic) -> &broadcast::Sender<HeadEvent> {
        match topic {
            HeadTopic::NewHead => &self.new_heads,
            HeadTopic::FinalizedHead => &self.finalized_heads,
        }
    }

    /// Register a listener for one topic.
    ///
    /// The listener sees every event published after this call returns.
    /// Dropping it unregisters.
    #[must_use]
    pub fn listen(&self, topic: HeadTopic) -> HeadListener {
        debug!(topic = %topic, "Head listener registered");
        HeadListener::new(topic, self.sender(topic).subscribe())
    }

    /// Number of live listeners on a topic.
    #[must_use]
    pub fn listener_count(&self, topic: HeadTopic) -> usize {
        self.sender(topic).receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HeadEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadPublisher for HeadEventBus {
    fn publish(&self, event: HeadEvent) -> usize {
        match self.sender(event.topic).send(event) {
            Ok(receivers) => {
                trace!(
                    topic = %event.topic,
                    number = event.head.number,
                    receivers,
                    "Head event published"
                );
                receivers
            }
            // No listeners is the normal state before anyone subscribes.
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockRef, Hash};

    fn head(number: u64) -> BlockRef {
        BlockRef {
            hash: Hash::from_low_u64_be(number),
            number,
        }
    }

    #[test]
    fn test_publish_no_listeners() {
        let bus = HeadEventBus::new();
        assert_eq!(bus.publish(HeadEvent::new_head(head(1))), 0);
    }

    #[test]
    fn test_publish_reaches_topic_listeners_only() {
        let bus = HeadEventBus::new();
        let _best = bus.listen(HeadTopic::NewHead);
        let _best2 = bus.listen(HeadTopic::NewHead);
        let _fin = bus.listen(HeadTopic::FinalizedHead);

        assert_eq!(bus.publish(HeadEvent::new_head(head(1))), 2);
        assert_eq!(bus.publish(HeadEvent::finalized(head(1))), 1);
    }

    #[test]
    fn test_listener_drop_unregisters() {
        let bus = HeadEventBus::new();
        {
            let _a = bus.listen(HeadTopic::NewHead);
            let _b = bus.listen(HeadTopic::NewHead);
            assert_eq!(bus.listener_count(HeadTopic::NewHead), 2);
        }
        assert_eq!(bus.listener_count(HeadTopic::NewHead), 0);
    }

    #[test]
    fn test_custom_capacity() {
        let bus = HeadEventBus::with_capacity(8);
        assert_eq!(bus.capacity(), 8);
        assert_eq!(HeadEventBus::default().capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
