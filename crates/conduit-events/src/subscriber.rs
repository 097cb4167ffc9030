//! One subscriber's bounded event queue.

use conduit_core::Event;
use tokio::sync::mpsc;

/// A registered subscriber's bounded send side, held by the [`crate::EventBus`].
pub(crate) struct Subscriber {
    pub(crate) sender: mpsc::Sender<Event>,
}

/// The receive half returned by [`crate::EventBus::subscribe`].
///
/// Dropping this (or calling [`crate::EventBus::unsubscribe`]) closes the
/// subscriber's queue; further publishes silently skip it.
pub struct EventReceiver {
    receiver: mpsc::Receiver<Event>,
}

impl EventReceiver {
    pub(crate) fn new(receiver: mpsc::Receiver<Event>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. Returns `None` once the bus has dropped
    /// this subscriber (via [`crate::EventBus::unsubscribe`] or bus
    /// shutdown).
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Return an event if one is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}
