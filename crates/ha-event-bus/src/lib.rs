//! Event bus with typed pub/sub
//!
//! The tracker store publishes location changes here and the proximity
//! service publishes its computed results. Subscribers either pull from a
//! broadcast receiver or register a callback with [`EventBus::listen_typed`],
//! which returns a handle used to unsubscribe.

use dashmap::DashMap;
use ha_core::{Event, EventData, EventType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A unique identifier for an event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The event bus for publishing and subscribing to events
pub struct EventBus {
    /// Map of event types to their broadcast senders
    channels: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
    /// Counter for generating unique listener IDs
    next_listener_id: AtomicU64,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
            capacity,
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(
        &self,
        event_type: impl Into<EventType>,
    ) -> broadcast::Receiver<Event<serde_json::Value>> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");

        self.channels
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to a typed event, receiving parsed data
    pub fn subscribe_typed<T: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> TypedEventReceiver<T> {
        TypedEventReceiver::new(self.subscribe(T::event_type()))
    }

    /// Register a callback for a typed event
    ///
    /// The callback runs on a dedicated task, one event at a time and in
    /// firing order. Dropping the returned handle keeps the listener alive;
    /// call [`ListenerHandle::remove`] to unsubscribe.
    pub fn listen_typed<T, F>(&self, mut callback: F) -> ListenerHandle
    where
        T: EventData + serde::de::DeserializeOwned,
        F: FnMut(Event<T>) + Send + 'static,
    {
        let id = self.next_listener_id();
        let mut rx = self.subscribe_typed::<T>();
        let event_type = T::event_type();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(event_type, skipped, "Listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            trace!(event_type, "Listener finished");
        });

        debug!(event_type, listener = id.0, "Registered listener");
        ListenerHandle { id, task }
    }

    /// Fire an event to all subscribers of its type
    pub fn fire(&self, event: Event<serde_json::Value>) {
        trace!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.channels.get(&event.event_type) {
            // Ignore send errors - they just mean no active receivers
            let _ = sender.send(event);
        }
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T) {
        match serde_json::to_value(&data) {
            Ok(json) => self.fire(Event::typed(data).map(|_| json)),
            Err(err) => warn!(event_type = T::event_type(), %err, "Dropping unserializable event"),
        }
    }

    /// Generate a new unique listener ID
    pub fn next_listener_id(&self) -> ListenerId {
        ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Number of live receivers for an event type
    pub fn receiver_count(&self, event_type: impl Into<EventType>) -> usize {
        self.channels
            .get(&event_type.into())
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`EventBus::listen_typed`]
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Check if the listener is still receiving events
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Unsubscribe the listener
    pub fn remove(self) {
        debug!(listener = self.id.0, "Removing listener");
        self.task.abort();
    }
}

/// A receiver for typed events
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<Event<serde_json::Value>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: EventData + serde::de::DeserializeOwned> TypedEventReceiver<T> {
    fn new(rx: broadcast::Receiver<Event<serde_json::Value>>) -> Self {
        Self {
            rx,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Receive the next typed event
    ///
    /// Events whose data does not deserialize into `T` are skipped.
    pub async fn recv(&mut self) -> Result<Event<T>, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            match serde_json::from_value::<T>(event.data.clone()) {
                Ok(data) => return Ok(event.map(|_| data)),
                Err(err) => trace!(%err, "Skipping malformed event"),
            }
        }
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;
