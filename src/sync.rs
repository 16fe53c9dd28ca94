//! Topology synchronizer: full rebuild cycles and the change-detection loop.
//!
//! One background task waits on the change notifier. Each notification
//! triggers capture-old, rebuild, install, diff as a single coordinated
//! transaction, so a second trigger can never interleave with an in-flight
//! cycle. Readers only ever block for the duration of the snapshot install.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::builder;
use crate::config::AdapterConfig;
use crate::diff::ChangeDiffEngine;
use crate::interfaces::cluster_query::{ClusterQuery, QueryError};
use crate::interfaces::event_sink::{EventSink, SinkError};
use crate::interfaces::notifier::ChangeNotifier;
use crate::model::{
    CommunicationState, ConstraintKind, Domain, DomainState, PolicyInfo, Relation, RelationKind,
    Resource,
};
use crate::store::TopologyStore;
use crate::translate;

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors from a synchronization cycle. A failed cycle leaves the store on
/// its last good snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Synchronizer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Rebuilding,
    WaitingForChange,
}

/// Orchestrates rebuild cycles against the cluster engine and installs the
/// results into the topology store.
pub struct TopologySynchronizer {
    query: Arc<dyn ClusterQuery>,
    notifier: Arc<dyn ChangeNotifier>,
    store: Arc<TopologyStore>,
    diff: ChangeDiffEngine,
    config: AdapterConfig,
    startup: DateTime<Utc>,
    state: RwLock<SyncState>,
    /// Serializes whole capture-rebuild-install-diff transactions.
    cycle: Mutex<()>,
}

impl TopologySynchronizer {
    pub fn new(
        query: Arc<dyn ClusterQuery>,
        notifier: Arc<dyn ChangeNotifier>,
        sink: Option<Arc<dyn EventSink>>,
        store: Arc<TopologyStore>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            query,
            notifier,
            store,
            diff: ChangeDiffEngine::new(sink),
            config,
            startup: Utc::now(),
            state: RwLock::new(SyncState::Idle),
            cycle: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    pub fn store(&self) -> &Arc<TopologyStore> {
        &self.store
    }

    /// Query domain metadata and compose the domain record. Startup
    /// timestamps stay fixed across rebuilds.
    async fn build_domain(&self) -> Result<Domain> {
        let (name, automation_version) =
            builder::fetch_domain_attributes(self.query.as_ref()).await?;
        Ok(Domain {
            name,
            state: DomainState::Online,
            communication: CommunicationState::Ok,
            automation_product: self.config.automation_product.clone(),
            automation_version,
            automation_startup: self.startup,
            adapter_product: self.config.adapter_product.clone(),
            adapter_version: self.config.adapter_version.clone(),
            adapter_location: self.config.adapter_location.clone(),
            adapter_startup: self.startup,
            policy: PolicyInfo {
                name: self.config.policy_name.clone(),
                activation_time: self.startup,
            },
        })
    }

    /// One full rebuild pass: nodes, top-level natives, group members and
    /// group shells, then constraint translation (which may rewrite node
    /// placements), then group aggregation and relation assembly against the
    /// final resource keys.
    async fn rebuild(&self, domain_name: &str) -> Result<(Vec<Resource>, Vec<Relation>)> {
        let query = self.query.as_ref();
        let mut resources = Vec::new();
        let mut relations = Vec::new();

        for mut node in builder::node_resources(query).await? {
            node.domain = domain_name.to_string();
            node.complete();
            resources.push(node);
        }

        for mut native in builder::native_resources(query).await? {
            native.domain = domain_name.to_string();
            native.complete();
            resources.push(native);
        }

        let mut memberships: Vec<(String, Vec<String>)> = Vec::new();
        for group_name in builder::group_names(query).await? {
            let mut members = builder::group_members(query, &group_name).await?;
            for member in &mut members {
                member.domain = domain_name.to_string();
                member.top_level = false;
                member.complete();
            }

            let mut group = Resource::group(&group_name);
            group.domain = domain_name.to_string();
            memberships.push((
                group_name,
                members.iter().map(|m| m.name.clone()).collect(),
            ));
            resources.extend(members);
            resources.push(group);
        }

        let mut constraints = Vec::new();
        for kind in [
            ConstraintKind::Location,
            ConstraintKind::Colocation,
            ConstraintKind::Order,
        ] {
            constraints.extend(builder::constraints(query, kind).await?);
        }
        let translation = translate::translate(&constraints, &mut resources);
        if !translation.warnings.is_empty() {
            warn!(
                warnings = translation.warnings.len(),
                "Constraint translation reported unsupported values"
            );
        }

        // Aggregation runs after translation so the groups and their
        // membership relations see the members' final node placements.
        for (group_name, member_names) in &memberships {
            let members: Vec<Resource> = member_names
                .iter()
                .filter_map(|name| resources.iter().find(|r| &r.name == name).cloned())
                .collect();
            let Some(group) = resources.iter_mut().find(|r| &r.name == group_name) else {
                continue;
            };
            builder::aggregate_group(group, &members);
            group.complete();

            let group_key = group.key();
            for member in &members {
                relations.push(Relation::new(
                    RelationKind::HasMember,
                    group_key.clone(),
                    member.key(),
                ));
            }
        }
        relations.extend(translation.relations);

        info!(
            resources = resources.len(),
            relations = relations.len(),
            "Topology rebuild complete"
        );
        Ok((resources, relations))
    }

    async fn set_state(&self, state: SyncState) {
        *self.state.write().await = state;
    }

    /// Build the initial snapshot and install it. Call once, then `spawn`
    /// the background loop.
    pub async fn initialize(&self) -> Result<Domain> {
        let _cycle = self.cycle.lock().await;
        self.set_state(SyncState::Rebuilding).await;

        let result = async {
            let domain = self.build_domain().await?;
            let (resources, relations) = self.rebuild(&domain.name).await?;
            self.store
                .replace_snapshot(domain.clone(), resources, relations)
                .await;
            Ok(domain)
        }
        .await;

        match result {
            Ok(domain) => {
                self.set_state(SyncState::WaitingForChange).await;
                info!(domain = %domain.name, "Topology synchronizer initialized");
                Ok(domain)
            }
            Err(err) => {
                self.set_state(SyncState::Idle).await;
                Err(err)
            }
        }
    }

    /// One change-driven cycle: capture the published snapshot, rebuild,
    /// install, diff old against new. A query failure aborts the cycle and
    /// keeps the previous snapshot readable.
    pub async fn handle_change(&self) -> Result<()> {
        let _cycle = self.cycle.lock().await;
        self.set_state(SyncState::Rebuilding).await;

        let result = async {
            let (_, old_resources, old_relations) = self.store.snapshot().await;

            let domain = self.build_domain().await?;
            let (resources, relations) = self.rebuild(&domain.name).await?;
            self.store
                .replace_snapshot(domain.clone(), resources.clone(), relations.clone())
                .await;

            self.diff
                .publish_changes(
                    &domain.name,
                    &old_resources,
                    &old_relations,
                    &resources,
                    &relations,
                )
                .await?;
            Ok(())
        }
        .await;

        self.set_state(SyncState::WaitingForChange).await;
        result
    }

    /// Start the background change-detection loop.
    ///
    /// The loop blocks on the notifier, runs `handle_change` per token, and
    /// ends on a shutdown signal or a notifier failure (terminal).
    pub fn spawn(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            info!("Change-detection loop started");
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Change-detection loop shutting down");
                            break;
                        }
                    }
                    token = sync.notifier.wait() => match token {
                        Ok(token) => {
                            info!(token = %token.0, "Cluster change notification");
                            if let Err(err) = sync.handle_change().await {
                                error!(error = %err, "Change cycle failed; keeping last snapshot");
                            }
                        }
                        Err(err) => {
                            error!(error = %err, "Change notifier failed; loop terminating");
                            break;
                        }
                    }
                }
            }
        })
    }
}
