//! Event system for async status handling.
//!
//! Two mechanisms live here:
//! - [`EventDispatcher`] broadcasts session events (connection changes,
//!   login, every status push) to any number of [`Subscription`]s.
//! - [`CorrelationBus`] holds one-shot listeners keyed by output id, so a
//!   reply can be routed to the callers waiting for that output.

use std::collections::HashMap;

use tokio::sync::{broadcast, oneshot};

use crate::types::{OutputId, StatusEvent};

/// Event types that can be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Transport connected, login not yet complete.
    Connected,
    /// Login completed and queued commands were flushed.
    LoggedIn,
    /// Output status received, solicited or not.
    Status(StatusEvent),
    /// Connection lost or closed.
    Disconnected,
    /// The session engine stopped and will not reconnect.
    Stopped,
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the session has stopped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<Event>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: Event) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Pending one-shot listeners keyed by output id.
///
/// Publishing a status event removes and fires every listener registered
/// for that id at that instant; listeners for other ids are untouched.
#[derive(Debug, Default)]
pub struct CorrelationBus {
    listeners: HashMap<OutputId, Vec<oneshot::Sender<StatusEvent>>>,
}

impl CorrelationBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the next status event of `id`.
    ///
    /// Listeners whose caller gave up are pruned first, for every id.
    pub fn register(&mut self, id: OutputId, listener: oneshot::Sender<StatusEvent>) {
        self.prune();
        self.listeners.entry(id).or_default().push(listener);
    }

    /// Drops listeners whose receiver is gone.
    pub fn prune(&mut self) {
        self.listeners.retain(|_, listeners| {
            listeners.retain(|listener| !listener.is_closed());
            !listeners.is_empty()
        });
    }

    /// Delivers `event` to the listeners for its id.
    ///
    /// Returns the number of listeners that were still waiting.
    pub fn publish(&mut self, event: StatusEvent) -> usize {
        let Some(listeners) = self.listeners.remove(&event.id) else {
            return 0;
        };

        listeners
            .into_iter()
            .filter_map(|listener| listener.send(event).ok())
            .count()
    }

    /// Returns true if a live listener is waiting for `id`.
    pub fn has_pending(&mut self, id: OutputId) -> bool {
        let Some(listeners) = self.listeners.get_mut(&id) else {
            return false;
        };

        // Callers that gave up drop their receiver
        listeners.retain(|listener| !listener.is_closed());
        if listeners.is_empty() {
            self.listeners.remove(&id);
            return false;
        }
        true
    }

    /// Total number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: u32, level: f64) -> StatusEvent {
        StatusEvent {
            id: OutputId(id),
            level,
        }
    }

    #[tokio::test]
    async fn test_event_dispatch() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe();

        dispatcher.dispatch(Event::LoggedIn);

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap();

        assert_eq!(event, Some(Event::LoggedIn));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_dispatcher_dropped() {
        let dispatcher = EventDispatcher::new(4);
        let mut sub = dispatcher.subscribe();
        drop(dispatcher);

        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_publish_only_reaches_matching_id() {
        let mut bus = CorrelationBus::new();
        let (tx5, mut rx5) = oneshot::channel();
        let (tx6, mut rx6) = oneshot::channel();
        bus.register(OutputId(5), tx5);
        bus.register(OutputId(6), tx6);

        assert_eq!(bus.publish(status(5, 75.0)), 1);

        assert_eq!(rx5.try_recv().unwrap(), status(5, 75.0));
        assert!(rx6.try_recv().is_err());
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_listeners_fire_once() {
        let mut bus = CorrelationBus::new();
        let (tx_a, mut rx_a) = oneshot::channel();
        let (tx_b, mut rx_b) = oneshot::channel();
        bus.register(OutputId(2), tx_a);
        bus.register(OutputId(2), tx_b);

        assert_eq!(bus.publish(status(2, 10.0)), 2);
        assert_eq!(bus.publish(status(2, 20.0)), 0);

        assert_eq!(rx_a.try_recv().unwrap().level, 10.0);
        assert_eq!(rx_b.try_recv().unwrap().level, 10.0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_has_pending_prunes_abandoned_listeners() {
        let mut bus = CorrelationBus::new();
        let (tx, rx) = oneshot::channel();
        bus.register(OutputId(4), tx);

        assert!(bus.has_pending(OutputId(4)));
        drop(rx);
        assert!(!bus.has_pending(OutputId(4)));
        assert!(bus.is_empty());
        assert_eq!(bus.publish(status(4, 1.0)), 0);
    }

    #[test]
    fn test_register_prunes_abandoned_listeners_of_every_id() {
        let mut bus = CorrelationBus::new();
        for _ in 0..50 {
            let (tx, rx) = oneshot::channel();
            bus.register(OutputId(42), tx);
            drop(rx);
        }

        let (tx, _rx) = oneshot::channel();
        bus.register(OutputId(3), tx);

        assert_eq!(bus.len(), 1);
        assert!(bus.has_pending(OutputId(3)));
        assert!(!bus.has_pending(OutputId(42)));
    }
}
