//! [`EventBus`]: per-subscriber bounded fan-out with monotonic event ids.

use crate::subscriber::{EventReceiver, Subscriber};
use conduit_core::{Event, EventType, SubscriberId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

/// Default per-subscriber queue depth when [`EventBus::subscribe`] is used
/// instead of [`EventBus::subscribe_with_capacity`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Fans out [`Event`]s to zero-or-more subscribers, each with its own
/// bounded queue.
///
/// `publish` never blocks on a slow subscriber: if that subscriber's queue
/// is full, the event is dropped for it alone and every other subscriber
/// still receives it (`SPEC_FULL.md` §4.6, tested property 8). The bus
/// itself does not emit the periodic `daemon_status` heartbeat — that is
/// the transport's responsibility (the Request Dispatcher), since the bus
/// has no notion of "idle".
pub struct EventBus {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    next_event_id: AtomicU64,
}

impl EventBus {
    /// Build an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_event_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber with the default queue depth
    /// ([`DEFAULT_QUEUE_CAPACITY`]).
    #[must_use]
    pub fn subscribe(&self) -> (SubscriberId, EventReceiver) {
        self.subscribe_with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Register a new subscriber with a caller-chosen queue depth.
    #[must_use]
    pub fn subscribe_with_capacity(&self, capacity: usize) -> (SubscriberId, EventReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let id = SubscriberId::new();
        self.subscribers
            .lock()
            .expect("subscriber registry mutex poisoned")
            .insert(id, Subscriber { sender });
        (id, EventReceiver::new(receiver))
    }

    /// Deregister `id`, closing its queue. Idempotent; returns `false` if
    /// `id` was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers
            .lock()
            .expect("subscriber registry mutex poisoned")
            .remove(&id)
            .is_some()
    }

    /// Current number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber registry mutex poisoned")
            .len()
    }

    /// Publish `event_type`/`data`, assigning the next monotonic event id
    /// and the current UTC timestamp. Delivers to every subscriber
    /// registered at the moment of the call, in a single fixed iteration
    /// order, so each subscriber that receives the event sees it in the
    /// same relative order as every other event published from this
    /// call-site.
    pub fn publish(&self, event_type: EventType, data: Value) -> Event {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            event_type,
            timestamp: conduit_core::time::to_rfc3339(chrono::Utc::now()),
            data,
        };

        let subscribers = self.subscribers.lock().expect("subscriber registry mutex poisoned");
        for (subscriber_id, subscriber) in subscribers.iter() {
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(subscriber = %subscriber_id, event_id = id, "subscriber queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    trace!(subscriber = %subscriber_id, event_id = id, "subscriber queue closed");
                }
            }
        }
        event
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_delivers_in_order_to_each_subscriber() {
        let bus = EventBus::new();
        let (_id1, mut r1) = bus.subscribe();
        let (_id2, mut r2) = bus.subscribe();

        bus.publish(EventType::InstanceCreated, json!({"n": 1}));
        bus.publish(EventType::InstanceStarted, json!({"n": 2}));

        assert_eq!(r1.recv().await.unwrap().data, json!({"n": 1}));
        assert_eq!(r1.recv().await.unwrap().data, json!({"n": 2}));
        assert_eq!(r2.recv().await.unwrap().data, json!({"n": 1}));
        assert_eq!(r2.recv().await.unwrap().data, json!({"n": 2}));
    }

    #[tokio::test]
    async fn event_ids_are_monotonic() {
        let bus = EventBus::new();
        let e1 = bus.publish(EventType::InstanceCreated, json!({}));
        let e2 = bus.publish(EventType::InstanceCreated, json!({}));
        assert!(e2.id > e1.id);
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_queue() {
        let bus = EventBus::new();
        let (id, mut receiver) = bus.subscribe();
        assert!(bus.unsubscribe(id));
        bus.publish(EventType::InstanceCreated, json!({}));
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let (id, _receiver) = bus.subscribe();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }

    #[tokio::test]
    async fn slow_subscriber_drops_without_blocking_others() {
        let bus = EventBus::new();
        let (_slow_id, mut slow) = bus.subscribe_with_capacity(1);
        let (_fast_id, mut fast) = bus.subscribe_with_capacity(8);

        for i in 0..4 {
            bus.publish(EventType::HealthCheck, json!({"n": i}));
        }

        // The slow subscriber's queue only ever held its first event;
        // later publishes were dropped for it, not blocked.
        let first = slow.recv().await.unwrap();
        assert_eq!(first.data, json!({"n": 0}));
        assert!(slow.try_recv().is_none());

        // The fast subscriber received every event.
        for i in 0..4 {
            assert_eq!(fast.recv().await.unwrap().data, json!({"n": i}));
        }
    }

    #[tokio::test]
    async fn subscriber_count_reflects_registration() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let (id, _r) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
