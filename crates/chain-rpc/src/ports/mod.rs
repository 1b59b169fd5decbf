//! Ports (hexagonal architecture).
//!
//! The facade reads chain state and pushes notifications only through
//! these traits.

pub mod outbound;

pub use outbound::{ChainState, SinkClosed, SubscriptionSink};
