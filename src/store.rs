//! Topology store: the single authoritative snapshot.
//!
//! Holds the (domain, resources, relations) triple behind one lock. Installs
//! are atomic with respect to every read: a reader sees either the pre- or
//! the post-rebuild snapshot, never a mix. Reads return fresh lists that the
//! caller may mutate freely.

use tokio::sync::RwLock;
use tracing::debug;

use crate::model::{Domain, Relation, RelationCategory, RelationKind, Resource, ResourceKey};

struct Inner {
    domain: Domain,
    resources: Vec<Resource>,
    relations: Vec<Relation>,
}

/// Lock-guarded topology snapshot. All mutating and multi-step reading
/// operations go through the one `RwLock`, so no read ever observes the
/// store mid-install.
pub struct TopologyStore {
    inner: RwLock<Inner>,
}

impl TopologyStore {
    /// Create a store with an initial domain and no resources or relations.
    pub fn new(domain: Domain) -> Self {
        Self {
            inner: RwLock::new(Inner {
                domain,
                resources: Vec::new(),
                relations: Vec::new(),
            }),
        }
    }

    /// Install a new snapshot atomically, replacing the previous one
    /// wholesale.
    pub async fn replace_snapshot(
        &self,
        domain: Domain,
        resources: Vec<Resource>,
        relations: Vec<Relation>,
    ) {
        let mut inner = self.inner.write().await;
        debug!(
            resources = resources.len(),
            relations = relations.len(),
            "Installing topology snapshot"
        );
        inner.domain = domain;
        inner.resources = resources;
        inner.relations = relations;
    }

    pub async fn domain(&self) -> Domain {
        self.inner.read().await.domain.clone()
    }

    /// The current resource list as a fresh vector.
    pub async fn resources(&self) -> Vec<Resource> {
        self.inner.read().await.resources.clone()
    }

    /// The current relation list as a fresh vector.
    pub async fn relations(&self) -> Vec<Relation> {
        self.inner.read().await.relations.clone()
    }

    /// The whole current snapshot under a single lock acquisition.
    pub async fn snapshot(&self) -> (Domain, Vec<Resource>, Vec<Relation>) {
        let inner = self.inner.read().await;
        (
            inner.domain.clone(),
            inner.resources.clone(),
            inner.relations.clone(),
        )
    }

    /// Find a resource by its name, ignoring domain, node and class.
    pub async fn find_resource_by_identity(&self, name: &str) -> Option<Resource> {
        let inner = self.inner.read().await;
        inner.resources.iter().find(|r| r.name == name).cloned()
    }

    /// Find a resource by its full composite key.
    pub async fn find_resource_by_key(&self, key: &ResourceKey) -> Option<Resource> {
        let inner = self.inner.read().await;
        inner.resources.iter().find(|r| r.key() == *key).cloned()
    }

    /// Find relations matching every given filter; `None` means
    /// unconstrained.
    pub async fn find_relations(
        &self,
        category: Option<RelationCategory>,
        kind: Option<RelationKind>,
        source: Option<&ResourceKey>,
        target: Option<&ResourceKey>,
    ) -> Vec<Relation> {
        let inner = self.inner.read().await;
        inner
            .relations
            .iter()
            .filter(|rel| {
                category.is_none_or(|c| rel.kind.category() == c)
                    && kind.is_none_or(|k| rel.kind == k)
                    && source.is_none_or(|s| rel.source == *s)
                    && target.is_none_or(|t| rel.target == *t)
            })
            .cloned()
            .collect()
    }

    /// Flip a resource's subscription flag; returns false when the identity
    /// is unknown. Subscription is adapter-side metadata, the only attribute
    /// touched in place between rebuilds.
    pub async fn set_subscribed(&self, name: &str, subscribed: bool) -> bool {
        let mut inner = self.inner.write().await;
        match inner.resources.iter_mut().find(|r| r.name == name) {
            Some(rsc) => {
                rsc.subscribed = subscribed;
                true
            }
            None => false,
        }
    }
}
