//! Subscription registry.
//!
//! Owns every subscription record from `register` to `cancel`. A record is
//! created `Pending`, which buffers the latest payload, becomes `Active`
//! once the caller hands over a sink, and ends `Cancelled`.
//!
//! The map lock and a record's state lock are never held together. Delivery
//! clones the record handle out of the map, drops the map lock, then locks
//! the record.

use crate::domain::{ConnectionId, SubscriptionId, SubscriptionNotification};
use crate::ports::SubscriptionSink;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared_types::HeadTopic;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Pushed to the sink.
    Delivered,
    /// Stored as the latest payload of a pending record.
    Buffered,
    /// Unknown or cancelled id, or the sink just failed.
    Gone,
}

enum RecordState {
    Pending { latest: Option<Value> },
    Active { sink: Arc<dyn SubscriptionSink> },
    Cancelled,
}

struct SubscriptionRecord {
    id: SubscriptionId,
    topic: HeadTopic,
    connection: ConnectionId,
    /// Registration order, used by `notify`.
    seq: u64,
    state: Mutex<RecordState>,
}

#[derive(Default)]
struct RegistryInner {
    records: HashMap<SubscriptionId, Arc<SubscriptionRecord>>,
    by_connection: HashMap<ConnectionId, Vec<SubscriptionId>>,
}

/// Registry of live subscriptions.
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
    /// Counter for generating subscription IDs
    id_counter: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            id_counter: AtomicU64::new(1),
        }
    }

    /// Create a `Pending` record and return its fresh id.
    pub fn register(&self, topic: HeadTopic, connection: ConnectionId) -> SubscriptionId {
        let seq = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("0x{:x}", seq);

        let record = Arc::new(SubscriptionRecord {
            id: id.clone(),
            topic,
            connection,
            seq,
            state: Mutex::new(RecordState::Pending { latest: None }),
        });

        {
            let mut inner = self.inner.write();
            inner.records.insert(id.clone(), record);
            inner
                .by_connection
                .entry(connection)
                .or_default()
                .push(id.clone());
        }

        debug!(
            subscription_id = %id,
            connection_id = %connection,
            topic = %topic,
            "Registered subscription"
        );
        id
    }

    /// Attach a sink and flush the buffered payload, if any.
    ///
    /// Returns `false` if the record is unknown, not pending, or the sink
    /// failed on the flush (which cancels the record).
    pub fn activate(&self, id: &str, sink: Arc<dyn SubscriptionSink>) -> bool {
        let Some(record) = self.record(id) else {
            return false;
        };

        let delivered = {
            let mut state = record.state.lock();
            let latest = match &mut *state {
                RecordState::Pending { latest } => latest.take(),
                RecordState::Active { .. } | RecordState::Cancelled => return false,
            };

            let flushed = match latest {
                Some(payload) => sink.send(record.notification(payload)).is_ok(),
                None => true,
            };

            *state = if flushed {
                RecordState::Active { sink }
            } else {
                RecordState::Cancelled
            };
            flushed
        };

        if delivered {
            debug!(subscription_id = %id, "Activated subscription");
        } else {
            warn!(subscription_id = %id, "Sink closed while activating subscription");
            self.remove(id);
        }
        delivered
    }

    /// Deliver one payload to one subscription.
    pub fn deliver(&self, id: &str, payload: Value) -> DeliveryOutcome {
        match self.record(id) {
            Some(record) => self.deliver_to(&record, payload),
            None => DeliveryOutcome::Gone,
        }
    }

    /// Deliver `payload` to every live record of `topic`, oldest first.
    ///
    /// Returns the number of records that received or buffered it.
    pub fn notify(&self, topic: HeadTopic, payload: &Value) -> usize {
        let mut targets: Vec<_> = self
            .inner
            .read()
            .records
            .values()
            .filter(|r| r.topic == topic)
            .cloned()
            .collect();
        targets.sort_by_key(|r| r.seq);

        targets
            .iter()
            .filter(|r| self.deliver_to(r, payload.clone()) != DeliveryOutcome::Gone)
            .count()
    }

    /// Cancel a subscription. Unknown or already-cancelled ids are a no-op.
    ///
    /// Returns `true` if a live record was removed.
    pub fn cancel(&self, id: &str) -> bool {
        let Some(record) = self.remove(id) else {
            return false;
        };
        *record.state.lock() = RecordState::Cancelled;

        debug!(subscription_id = %id, "Cancelled subscription");
        true
    }

    /// Connection that opened a live subscription.
    pub fn owner(&self, id: &str) -> Option<ConnectionId> {
        self.record(id).map(|r| r.connection)
    }

    /// Topic of a live subscription.
    pub fn topic(&self, id: &str) -> Option<HeadTopic> {
        self.record(id).map(|r| r.topic)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().records.contains_key(id)
    }

    /// Live subscription ids of a connection, in registration order.
    pub fn connection_subscriptions(&self, connection: &ConnectionId) -> Vec<SubscriptionId> {
        self.inner
            .read()
            .by_connection
            .get(connection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: &str) -> Option<Arc<SubscriptionRecord>> {
        self.inner.read().records.get(id).cloned()
    }

    fn deliver_to(&self, record: &SubscriptionRecord, payload: Value) -> DeliveryOutcome {
        let outcome = {
            let mut state = record.state.lock();
            match &mut *state {
                RecordState::Pending { latest } => {
                    *latest = Some(payload);
                    DeliveryOutcome::Buffered
                }
                RecordState::Active { sink } => {
                    if sink.send(record.notification(payload)).is_ok() {
                        DeliveryOutcome::Delivered
                    } else {
                        *state = RecordState::Cancelled;
                        DeliveryOutcome::Gone
                    }
                }
                RecordState::Cancelled => return DeliveryOutcome::Gone,
            }
        };

        if outcome == DeliveryOutcome::Gone {
            warn!(subscription_id = %record.id, "Sink closed, dropping subscription");
            self.remove(&record.id);
        }
        outcome
    }

    fn remove(&self, id: &str) -> Option<Arc<SubscriptionRecord>> {
        let mut inner = self.inner.write();
        let record = inner.records.remove(id)?;

        if let Some(ids) = inner.by_connection.get_mut(&record.connection) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                inner.by_connection.remove(&record.connection);
            }
        }
        Some(record)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRecord {
    fn notification(&self, payload: Value) -> SubscriptionNotification {
        SubscriptionNotification::new(self.topic, self.id.clone(), payload)
    }
}
