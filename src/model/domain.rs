//! Domain record: identity and health summary of the managed cluster.

use chrono::{DateTime, Utc};

/// Overall domain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    Online,
    Offline,
    Degraded,
}

/// State of the communication channel to the cluster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationState {
    Ok,
    Broken,
}

/// Active automation policy descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyInfo {
    pub name: String,
    pub activation_time: DateTime<Utc>,
}

/// One process-wide record describing the managed cluster.
///
/// Created at synchronization start and replaced wholesale on each rebuild;
/// never partially mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub name: String,
    pub state: DomainState,
    pub communication: CommunicationState,
    pub automation_product: String,
    pub automation_version: String,
    pub automation_startup: DateTime<Utc>,
    pub adapter_product: String,
    pub adapter_version: String,
    pub adapter_location: String,
    pub adapter_startup: DateTime<Utc>,
    pub policy: PolicyInfo,
}
