//! In-process alert bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the analysis runner
//! (publisher) and the alert dispatcher (subscriber).

use aurora_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Published once per created violation event.
pub const KIND_VIOLATION_CREATED: &str = "violation.created";

/// Published when a predictive alert triggers during an early-warning report.
pub const KIND_WARNING_PREDICTED: &str = "warning.predicted";

// ---------------------------------------------------------------------------
// AlertEvent
// ---------------------------------------------------------------------------

/// An alert raised for an area of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Dot-separated kind, e.g. `"violation.created"`.
    pub kind: String,

    pub aoi_id: DbId,

    /// Serialized violation event or predictive alert.
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl AlertEvent {
    /// Create an alert with an empty payload.
    pub fn new(kind: impl Into<String>, aoi_id: DbId) -> Self {
        Self {
            kind: kind.into(),
            aoi_id,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn violation_created(aoi_id: DbId, payload: serde_json::Value) -> Self {
        Self::new(KIND_VIOLATION_CREATED, aoi_id).with_payload(payload)
    }

    pub fn warning_predicted(aoi_id: DbId, payload: serde_json::Value) -> Self {
        Self::new(KIND_WARNING_PREDICTED, aoi_id).with_payload(payload)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out alert bus.
///
/// ```rust
/// use aurora_events::bus::{AlertEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AlertEvent::new("violation.created", 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<AlertEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an alert to all current subscribers. Dropped silently when
    /// nobody is subscribed.
    pub fn publish(&self, event: AlertEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(AlertEvent::violation_created(
            42,
            serde_json::json!({"severity": "HIGH"}),
        ));

        let received = rx.recv().await.expect("should receive the alert");
        assert_eq!(received.kind, KIND_VIOLATION_CREATED);
        assert_eq!(received.aoi_id, 42);
        assert_eq!(received.payload["severity"], "HIGH");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_alert() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(AlertEvent::warning_predicted(3, serde_json::json!({})));

        assert_eq!(rx1.recv().await.unwrap().kind, KIND_WARNING_PREDICTED);
        assert_eq!(rx2.recv().await.unwrap().kind, KIND_WARNING_PREDICTED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(AlertEvent::new("orphan.alert", 1));
    }

    #[test]
    fn new_alert_has_empty_object_payload() {
        let event = AlertEvent::new("bare.alert", 9);
        assert!(event.payload.is_object());
        assert_eq!(event.payload.as_object().map(|o| o.len()), Some(0));
    }

    #[tokio::test]
    async fn slow_receiver_observes_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..4 {
            bus.publish(AlertEvent::new("flood", i));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().aoi_id, 2);
    }
}
