//! Enumeration and request surface over the topology store.
//!
//! This is what the external dispatch layer calls into: key- and
//! filter-based resource enumeration, relation enumeration, group-member
//! expansion, subscription bookkeeping, and fire-and-forget control
//! requests toward the engine.

use std::sync::Arc;

use tracing::{debug, info};

use crate::filter::{self, Criterion, FilterOp, RelationDirection};
use crate::interfaces::control::{ControlChannel, ControlError};
use crate::model::{
    Relation, RelationCategory, RelationKind, Resource, ResourceKey, ResourceType,
};
use crate::store::TopologyStore;

/// Result type for adapter requests.
pub type Result<T> = std::result::Result<T, RequestError>;

/// Errors from adapter requests.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The request names a resource the current snapshot does not contain.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// The request names an action this adapter does not implement. Always
    /// reported, never silently ignored.
    #[error("Request not supported: {0}")]
    NotSupported(String),

    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Control request kinds accepted by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Bring a resource (or group, or node) online.
    Online,
    /// Take a resource offline.
    Offline,
    /// Take a node out of standby.
    IncludeNode,
    /// Put a node into standby.
    ExcludeNode,
    /// Accepted for compatibility; performs nothing.
    ResetFromNonRecoverableError,
}

/// Enumeration and request entry point.
pub struct TopologyAdapter {
    store: Arc<TopologyStore>,
    control: Arc<dyn ControlChannel>,
}

impl TopologyAdapter {
    pub fn new(store: Arc<TopologyStore>, control: Arc<dyn ControlChannel>) -> Self {
        Self { store, control }
    }

    /// Resources matching the given composite keys; unknown keys are
    /// skipped.
    pub async fn enumerate_by_key(&self, keys: &[ResourceKey]) -> Vec<Resource> {
        let mut list = Vec::new();
        for key in keys {
            if let Some(rsc) = self.store.find_resource_by_key(key).await {
                list.push(rsc);
            }
        }
        list
    }

    /// Resources matching a conjunction of criteria.
    ///
    /// A reserved first criterion short-circuits: `TopLevel` returns the
    /// top-level resources, `All` returns everything unconditionally.
    pub async fn enumerate_by_filter(&self, criteria: &[Criterion]) -> Vec<Resource> {
        match criteria.first() {
            Some(Criterion::TopLevel) => {
                debug!("Enumerating top-level resources");
                self.store
                    .resources()
                    .await
                    .into_iter()
                    .filter(|r| r.top_level)
                    .collect()
            }
            Some(Criterion::All) => self.store.resources().await,
            _ => filter::filter_resources(self.store.resources().await, criteria),
        }
    }

    /// Member resources of a group, resolved through its HAS_MEMBER
    /// relations.
    pub async fn enumerate_group_members(&self, key: &ResourceKey) -> Vec<Resource> {
        let relations = self
            .store
            .find_relations(
                Some(RelationCategory::GroupMembership),
                Some(RelationKind::HasMember),
                Some(key),
                None,
            )
            .await;

        let mut members = Vec::new();
        for rel in relations {
            if let Some(rsc) = self.store.find_resource_by_key(&rel.target).await {
                members.push(rsc);
            }
        }
        members
    }

    /// Relations matching a mixed criteria list.
    ///
    /// Resource-side criteria select the resources whose relations are
    /// collected (following the direction flag, default forward);
    /// relation-side criteria then narrow the relation set. Without
    /// resource-side criteria every relation is a candidate.
    pub async fn enumerate_relations(&self, criteria: &[Criterion]) -> Vec<Relation> {
        let mut resource_criteria = Vec::new();
        let mut relation_criteria = Vec::new();
        let mut direction = RelationDirection::Forward;

        for criterion in criteria {
            match criterion {
                Criterion::Resource { .. } => resource_criteria.push(criterion.clone()),
                Criterion::Relation { .. } => relation_criteria.push(criterion.clone()),
                Criterion::Direction { op, value } => {
                    // Only an EQUAL criterion carries a direction; any other
                    // shape keeps the forward default.
                    if *op == FilterOp::Equal {
                        direction = *value;
                    }
                }
                Criterion::TopLevel | Criterion::All => {}
            }
        }

        let mut relations: Vec<Relation> = Vec::new();
        if resource_criteria.is_empty() {
            relations = self.store.relations().await;
        } else {
            let selected = self.enumerate_by_filter(&resource_criteria).await;
            if selected.is_empty() {
                return Vec::new();
            }
            for rsc in selected {
                let key = rsc.key();
                let found = match direction {
                    RelationDirection::Forward => {
                        self.store.find_relations(None, None, Some(&key), None).await
                    }
                    RelationDirection::Backward => {
                        self.store.find_relations(None, None, None, Some(&key)).await
                    }
                };
                for rel in found {
                    if !relations.contains(&rel) {
                        relations.push(rel);
                    }
                }
            }
        }

        filter::filter_relations(relations, &relation_criteria)
    }

    /// Mark resources as subscribed; returns the keys that could not be
    /// resolved.
    pub async fn subscribe(&self, keys: &[ResourceKey]) -> Vec<ResourceKey> {
        self.set_subscription(keys, true).await
    }

    /// Clear subscriptions; returns the keys that could not be resolved.
    pub async fn unsubscribe(&self, keys: &[ResourceKey]) -> Vec<ResourceKey> {
        self.set_subscription(keys, false).await
    }

    async fn set_subscription(&self, keys: &[ResourceKey], subscribed: bool) -> Vec<ResourceKey> {
        let mut failed = Vec::new();
        for key in keys {
            if !self.store.set_subscribed(&key.name, subscribed).await {
                failed.push(key.clone());
            }
        }
        failed
    }

    /// Execute a control request against the resource named by `key`.
    ///
    /// Requests are fire-and-forget commands to the engine; the topology
    /// store is untouched until the next change-driven rebuild reports
    /// their effect. Online/offline on a group fans out to the members
    /// before the group itself.
    pub async fn request(&self, key: &ResourceKey, request: RequestKind) -> Result<()> {
        let rsc = self
            .store
            .find_resource_by_key(key)
            .await
            .ok_or_else(|| RequestError::UnknownResource(key.name.clone()))?;

        info!(resource = %rsc.name, request = ?request, "Control request");
        match request {
            RequestKind::Online | RequestKind::Offline => {
                let online = request == RequestKind::Online;
                if rsc.resource_type() == ResourceType::ResourceGroup {
                    for member in self.enumerate_group_members(key).await {
                        self.activate(&member, online).await?;
                    }
                }
                self.activate(&rsc, online).await
            }
            RequestKind::IncludeNode | RequestKind::ExcludeNode => {
                let standby = request == RequestKind::ExcludeNode;
                self.control
                    .set_node_standby(&rsc.name, standby)
                    .await
                    .map_err(Into::into)
            }
            RequestKind::ResetFromNonRecoverableError => Ok(()),
        }
    }

    async fn activate(&self, rsc: &Resource, online: bool) -> Result<()> {
        match rsc.resource_type() {
            ResourceType::Resource | ResourceType::ResourceGroup => self
                .control
                .set_resource_target_role(&rsc.name, online)
                .await
                .map_err(Into::into),
            ResourceType::Node => self
                .control
                .set_node_active(&rsc.name, online)
                .await
                .map_err(Into::into),
        }
    }
}

/// Convenience for dispatch layers mapping external request names; unknown
/// names surface as `NotSupported`.
pub fn parse_request(name: &str) -> Result<RequestKind> {
    match name {
        "Online" => Ok(RequestKind::Online),
        "Offline" => Ok(RequestKind::Offline),
        "IncludeNode" => Ok(RequestKind::IncludeNode),
        "ExcludeNode" => Ok(RequestKind::ExcludeNode),
        "ResetFromNonRecoverableError" => Ok(RequestKind::ResetFromNonRecoverableError),
        other => Err(RequestError::NotSupported(other.to_string())),
    }
}
