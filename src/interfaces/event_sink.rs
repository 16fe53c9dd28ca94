//! Outbound event delivery interface.

use async_trait::async_trait;

use crate::model::{Relation, Resource};

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors from event delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Emitting without a configured sink is a precondition violation, fatal
    /// to the triggering call.
    #[error("No event sink configured")]
    NotConfigured,

    #[error("Event delivery failed: {0}")]
    Delivery(String),
}

/// Why an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    Added,
    Modified,
    Deleted,
}

impl EventReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        }
    }
}

/// One topology change event, carrying the affected entity's full attribute
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyEvent {
    Resource {
        reason: EventReason,
        resource: Resource,
    },
    Relation {
        reason: EventReason,
        domain: String,
        relation: Relation,
    },
}

impl TopologyEvent {
    pub fn reason(&self) -> EventReason {
        match self {
            Self::Resource { reason, .. } | Self::Relation { reason, .. } => *reason,
        }
    }
}

/// Consumer of topology change events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event. Delivery order is significant and must be
    /// preserved by implementations.
    async fn emit(&self, event: TopologyEvent) -> Result<()>;
}
