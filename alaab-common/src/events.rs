//! Event types for the Alaab notification sink
//!
//! Review-side mutations broadcast an [`AlaabEvent`] after their transaction
//! commits. Subscribers (dashboard SSE bridges, notification mailers) are
//! optional, so emission never fails the operation that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::{MatchStatus, ReviewStatus};

/// Alaab event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlaabEvent {
    /// A new pending similarity entered the review queue
    MatchProposed {
        similarity_id: Uuid,
        game_a_id: Uuid,
        game_b_id: Uuid,
        overall_score: f64,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer decided on a similarity
    MatchResolved {
        similarity_id: Uuid,
        status: MatchStatus,
        concept_id: Option<Uuid>,
        reviewer_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A concept was created, explicitly or by accepting a match
    ConceptCreated {
        concept_id: Uuid,
        name: String,
        created_by: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A game moved through the submission workflow
    ReviewStatusChanged {
        game_id: Uuid,
        old_status: ReviewStatus,
        new_status: ReviewStatus,
        actor_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl AlaabEvent {
    /// Event type name as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            AlaabEvent::MatchProposed { .. } => "MatchProposed",
            AlaabEvent::MatchResolved { .. } => "MatchResolved",
            AlaabEvent::ConceptCreated { .. } => "ConceptCreated",
            AlaabEvent::ReviewStatusChanged { .. } => "ReviewStatusChanged",
        }
    }
}

/// Broadcast channel for [`AlaabEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AlaabEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use alaab_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AlaabEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AlaabEvent) {
        tracing::debug!(event_type = event.event_type(), "Emitting event");
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
