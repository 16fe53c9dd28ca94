//! Boundary contracts toward external collaborators.
//!
//! The core consumes `ClusterQuery` (engine queries), `ChangeNotifier`
//! (cluster change wakeups) and `ControlChannel` (fire-and-forget commands),
//! and pushes topology change events to an `EventSink`.

pub mod cluster_query;
pub mod control;
pub mod event_sink;
pub mod notifier;

pub use cluster_query::{ClusterQuery, QueryError, Reply};
pub use control::{ControlChannel, ControlError};
pub use event_sink::{EventReason, EventSink, SinkError, TopologyEvent};
pub use notifier::{ChangeNotifier, ChangeToken, NotifierError};
