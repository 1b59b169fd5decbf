//! WebSocket side of the facade.
//!
//! - `subscriptions`: the subscription registry
//! - `notifier`: head-change forwarding into the registry
//! - `handler`: axum WebSocket connections

pub mod handler;
pub mod notifier;
pub mod subscriptions;

pub use handler::{WebSocketHandler, WsSink};
pub use notifier::HeadNotifier;
pub use subscriptions::{DeliveryOutcome, SubscriptionRegistry};
