//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans [`SignageEvent`]s out to every subscriber. Share it via
//! `Arc<EventBus>`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use zonecast_core::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// SignageEvent
// ---------------------------------------------------------------------------

/// A notification-worthy event.
///
/// Built with [`SignageEvent::new`] and the builder methods
/// [`with_source`](SignageEvent::with_source),
/// [`with_actor`](SignageEvent::with_actor) and
/// [`with_payload`](SignageEvent::with_payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignageEvent {
    /// Dot-separated event name, e.g. `"approval.requested"`.
    pub event_type: String,

    /// Kind of the entity the event is about (`"schedule"`, `"quickplay"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<EntityId>,

    /// User that triggered the event, if any. Clock-driven events have none.
    pub actor_id: Option<EntityId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl SignageEvent {
    /// An event with no source, no actor and an empty object payload.
    pub fn new(event_type: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp,
        }
    }

    /// Set the entity the event is about.
    pub fn with_source(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<EntityId>,
    ) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id.into());
        self
    }

    /// Set the user that triggered the event.
    pub fn with_actor(mut self, actor_id: impl Into<EntityId>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Replace the payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out event bus.
///
/// ```rust
/// use zonecast_events::bus::{EventBus, SignageEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SignageEvent::new("quickplay.completed", chrono::Utc::now()));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SignageEvent>,
}

impl EventBus {
    /// Slow receivers observe `RecvError::Lagged` once `capacity` events are
    /// buffered.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many received it;
    /// with no subscribers the event is dropped.
    pub fn publish(&self, event: SignageEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event_type = %event.event_type, "No subscribers, event dropped");
                0
            }
        }
    }

    /// New receiver; it sees only events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SignageEvent> {
        self.sender.subscribe()
    }

    /// Receivers currently alive.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
