//! # Shared Bus - Head-Change Event Bus
//!
//! Carries "head moved" signals from a chain state to any number of
//! listeners, one topic per head pointer.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   listen(topic)   ┌──────────┐
//! │ Chain State  │ ────────────→ │ HeadEventBus │ ────────────────→ │ Listener │
//! └──────────────┘               └──────────────┘                   └──────────┘
//! ```
//!
//! Events are signals. A listener that needs the header re-reads it from the
//! chain state instead of trusting the event payload, so several changes
//! that coalesce before the listener wakes still resolve to the freshest head.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::HeadEvent;
pub use publisher::{HeadEventBus, HeadPublisher};
pub use subscriber::{HeadListener, ListenerError};

/// Events buffered per listener before the oldest ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 256);
    }
}
