//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PipelineEvent`]s. It is
//! shared via `Arc<EventBus>` between the orchestrator and any observers.

use chrono::Utc;
use longcut_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::orchestration::OrchestrationEvent;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// An [`OrchestrationEvent`] stamped with the run it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub run_id: String,

    #[serde(flatten)]
    pub event: OrchestrationEvent,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl PipelineEvent {
    pub fn new(run_id: impl Into<String>, event: OrchestrationEvent) -> Self {
        Self {
            run_id: run_id.into(),
            event,
            timestamp: Utc::now(),
        }
    }

    /// Kebab-case event name, e.g. `"step-updated"`.
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
///
/// # Usage
///
/// ```rust
/// use longcut_events::bus::{EventBus, PipelineEvent};
/// use longcut_events::OrchestrationEvent;
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEvent::new("run-1", OrchestrationEvent::OrchestrationStarted {
///     title: "Coastline".into(),
///     total_duration_secs: 15.0,
/// }));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is dropped.
    pub fn publish(&self, event: PipelineEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Event published with no subscribers");
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
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
    use longcut_core::step::{ProcessingStep, StepStatus};

    use super::*;

    fn step_event(run_id: &str) -> PipelineEvent {
        PipelineEvent::new(
            run_id,
            OrchestrationEvent::StepUpdated {
                step: ProcessingStep::new("planning", StepStatus::Completed, 100),
            },
        )
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(step_event("run-1"));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.run_id, "run-1");
        assert_eq!(received.event_type(), "step-updated");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(step_event("run-2"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(step_event("orphan"));
    }

    #[test]
    fn envelope_serializes_flat() {
        let json = serde_json::to_value(step_event("run-3")).unwrap();
        assert_eq!(json["run_id"], "run-3");
        assert_eq!(json["type"], "step-updated");
        assert_eq!(json["step"]["name"], "planning");
        assert!(json["timestamp"].is_string());
    }
}
