//! # Head Events

use shared_types::{BlockRef, HeadTopic};

/// A head pointer moved.
///
/// `head` records where it moved to at publish time; it may already be stale
/// when a listener observes the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadEvent {
    pub topic: HeadTopic,
    pub head: BlockRef,
}

impl HeadEvent {
    pub fn new_head(head: BlockRef) -> Self {
        Self {
            topic: HeadTopic::NewHead,
            head,
        }
    }

    pub fn finalized(head: BlockRef) -> Self {
        Self {
            topic: HeadTopic::FinalizedHead,
            head,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Hash;

    #[test]
    fn test_constructors_set_topic() {
        let head = BlockRef {
            hash: Hash::repeat_byte(1),
            number: 7,
        };
        assert_eq!(HeadEvent::new_head(head).topic, HeadTopic::NewHead);
        assert_eq!(HeadEvent::finalized(head).topic, HeadTopic::FinalizedHead);
        assert_eq!(HeadEvent::finalized(head).head, head);
    }
}
