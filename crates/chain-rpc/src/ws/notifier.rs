//! Head notifier.
//!
//! Bridges chain-state head changes into the subscription registry. Each
//! subscription gets its own forwarder task holding its own head listener,
//! so unsubscribing tears down the listener as well as the record.

use super::subscriptions::{DeliveryOutcome, SubscriptionRegistry};
use crate::domain::{ConnectionId, ProcessedHeader, SubscriptionId};
use crate::ports::SubscriptionSink;
use crate::resolver::BlockResolver;
use dashmap::DashMap;
use shared_bus::HeadListener;
use shared_types::{Hash, HeadTopic};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Opens, forwards and closes head subscriptions.
pub struct HeadNotifier {
    resolver: BlockResolver,
    registry: Arc<SubscriptionRegistry>,
    forwarders: Arc<DashMap<SubscriptionId, AbortHandle>>,
}

impl HeadNotifier {
    pub fn new(resolver: BlockResolver, registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            resolver,
            registry,
            forwarders: Arc::new(DashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Open a subscription on `topic` for `connection`.
    ///
    /// The current header of the topic is pushed through `sink` before this
    /// returns; every later head change is pushed by a forwarder task. Must
    /// be called from within a Tokio runtime.
    pub async fn subscribe(
        &self,
        topic: HeadTopic,
        connection: ConnectionId,
        sink: Arc<dyn SubscriptionSink>,
    ) -> SubscriptionId {
        // Listen before reading the head so no change slips between the
        // snapshot and the first signal.
        let listener = self.resolver.chain().head_listener(topic);
        let id = self.registry.register(topic, connection);

        let mut last = None;
        if let Some(snapshot) = self.resolver.current_head(topic).await {
            if let Some(payload) = encode(&id, &snapshot.header) {
                self.registry.deliver(&id, payload);
                last = Some(snapshot.head.hash);
            }
        }

        if !self.registry.activate(&id, sink) {
            return id;
        }

        let handle = tokio::spawn(forward(
            id.clone(),
            listener,
            self.resolver.clone(),
            self.registry.clone(),
            self.forwarders.clone(),
            last,
        ))
        .abort_handle();
        self.forwarders.insert(id.clone(), handle);

        // The forwarder may already have exited (sink closed, or a racing
        // unsubscribe) before its handle was stored.
        if !self.registry.contains(&id) {
            self.stop_forwarder(&id);
        }

        debug!(
            subscription_id = %id,
            connection_id = %connection,
            topic = %topic,
            "Subscribed"
        );
        id
    }

    /// Close a subscription owned by `connection`.
    ///
    /// Unknown ids, already-closed ids and ids of other connections are
    /// ignored. Returns `true` if a live subscription was closed.
    pub fn unsubscribe(&self, connection: &ConnectionId, id: &str) -> bool {
        if self.registry.owner(id).as_ref() != Some(connection) {
            debug!(subscription_id = %id, connection_id = %connection, "Unsubscribe ignored");
            return false;
        }

        self.stop_forwarder(id);
        self.registry.cancel(id)
    }

    /// Close every subscription of a connection. Returns how many were closed.
    pub fn remove_connection(&self, connection: &ConnectionId) -> usize {
        let closed = self
            .registry
            .connection_subscriptions(connection)
            .iter()
            .filter(|id| self.unsubscribe(connection, id))
            .count();

        if closed > 0 {
            debug!(connection_id = %connection, closed, "Removed connection subscriptions");
        }
        closed
    }

    /// Number of running forwarder tasks.
    pub fn forwarder_count(&self) -> usize {
        self.forwarders.len()
    }

    fn stop_forwarder(&self, id: &str) {
        if let Some((_, handle)) = self.forwarders.remove(id) {
            handle.abort();
        }
    }
}

fn encode(id: &str, header: &ProcessedHeader) -> Option<serde_json::Value> {
    match serde_json::to_value(header) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(subscription_id = %id, error = %e, "Failed to encode header");
            None
        }
    }
}

/// Per-subscription forwarding loop.
///
/// Head events are signals only: a burst is coalesced and the current
/// header re-read, so the subscriber always sees the freshest head.
async fn forward(
    id: SubscriptionId,
    mut listener: HeadListener,
    resolver: BlockResolver,
    registry: Arc<SubscriptionRegistry>,
    forwarders: Arc<DashMap<SubscriptionId, AbortHandle>>,
    mut last: Option<Hash>,
) {
    let topic = listener.topic();

    while listener.recv().await.is_some() {
        listener.skip_pending();

        let Some(snapshot) = resolver.current_head(topic).await else {
            continue;
        };
        if last == Some(snapshot.head.hash) {
            continue;
        }
        let Some(payload) = encode(&id, &snapshot.header) else {
            continue;
        };

        match registry.deliver(&id, payload) {
            DeliveryOutcome::Gone => break,
            DeliveryOutcome::Delivered | DeliveryOutcome::Buffered => {
                last = Some(snapshot.head.hash);
            }
        }
    }

    forwarders.remove(&id);
    debug!(subscription_id = %id, topic = %topic, "Forwarder stopped");
}
