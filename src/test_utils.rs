//! Test utilities and mock implementations.
//!
//! Mock implementations of the boundary traits for testing without a live
//! cluster engine.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::interfaces::cluster_query::{
    ClusterQuery, QueryError, Reply, Result as QueryResult,
};
use crate::interfaces::control::{ControlChannel, ControlError, Result as ControlResult};
use crate::interfaces::event_sink::{EventSink, Result as SinkResult, SinkError, TopologyEvent};
use crate::interfaces::notifier::{
    ChangeNotifier, ChangeToken, NotifierError, Result as NotifierResult,
};
use crate::model::ConstraintKind;

#[derive(Default)]
struct QueryState {
    nodes: Vec<String>,
    node_configs: HashMap<String, Reply>,
    resources: Vec<String>,
    resource_types: HashMap<String, String>,
    resource_status: HashMap<String, Reply>,
    resource_params: HashMap<String, Reply>,
    group_members: HashMap<String, Vec<String>>,
    constraints: Vec<(ConstraintKind, String, Reply)>,
}

/// Mock cluster engine that answers queries from in-memory records.
pub struct MockClusterQuery {
    cluster_name: String,
    automation_version: String,
    state: RwLock<QueryState>,
    fail: RwLock<bool>,
    delay: RwLock<Option<Duration>>,
}

impl MockClusterQuery {
    pub fn new(cluster_name: &str, automation_version: &str) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            automation_version: automation_version.to_string(),
            state: RwLock::new(QueryState::default()),
            fail: RwLock::new(false),
            delay: RwLock::new(None),
        }
    }

    /// Make every query fail with a communication error.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Delay the cluster config query, stretching out rebuild cycles so
    /// tests can interleave concurrent readers.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn add_node(&self, name: &str, online: bool, standby: bool) {
        let config = Reply::ok([
            name,
            if online { "True" } else { "False" },
            if standby { "True" } else { "False" },
            "False",
            "False",
            "True",
            "False",
            "member",
        ]);
        let mut state = self.state.write().await;
        state.nodes.push(name.to_string());
        state.node_configs.insert(name.to_string(), config);
    }

    pub async fn add_native(&self, name: &str, status: &str, target_role: &str) {
        let mut state = self.state.write().await;
        state.resources.push(name.to_string());
        state
            .resource_types
            .insert(name.to_string(), "native".to_string());
        state
            .resource_status
            .insert(name.to_string(), Reply::ok([status]));
        state.resource_params.insert(
            name.to_string(),
            Reply::Ok(vec![
                format!("{name}-param-1"),
                "target_role".to_string(),
                target_role.to_string(),
            ]),
        );
    }

    /// Update an already registered native's status and target role.
    pub async fn set_native_status(&self, name: &str, status: &str, target_role: &str) {
        let mut state = self.state.write().await;
        state
            .resource_status
            .insert(name.to_string(), Reply::ok([status]));
        state.resource_params.insert(
            name.to_string(),
            Reply::Ok(vec![
                format!("{name}-param-1"),
                "target_role".to_string(),
                target_role.to_string(),
            ]),
        );
    }

    /// Register a group over previously added natives. Members keep their
    /// own status records; they stop being reported as top-level.
    pub async fn add_group(&self, name: &str, members: &[&str]) {
        let mut state = self.state.write().await;
        state.resources.retain(|r| !members.contains(&r.as_str()));
        state.resources.push(name.to_string());
        state
            .resource_types
            .insert(name.to_string(), "group".to_string());
        state.group_members.insert(
            name.to_string(),
            members.iter().map(|m| (*m).to_string()).collect(),
        );
    }

    pub async fn add_location(
        &self,
        id: &str,
        resource: &str,
        score: &str,
        rules: &[(&str, &str, &str)],
    ) {
        let mut fields = vec![id.to_string(), resource.to_string(), score.to_string()];
        for (index, (attribute, operation, value)) in rules.iter().enumerate() {
            fields.push(format!("{id}-rule-{index}"));
            fields.push((*attribute).to_string());
            fields.push((*operation).to_string());
            fields.push((*value).to_string());
        }
        self.state.write().await.constraints.push((
            ConstraintKind::Location,
            id.to_string(),
            Reply::Ok(fields),
        ));
    }

    pub async fn add_colocation(&self, id: &str, from: &str, to: &str, score: &str) {
        self.state.write().await.constraints.push((
            ConstraintKind::Colocation,
            id.to_string(),
            Reply::ok([id, from, to, score]),
        ));
    }

    pub async fn add_order(&self, id: &str, from: &str, action: &str, to: &str) {
        self.state.write().await.constraints.push((
            ConstraintKind::Order,
            id.to_string(),
            Reply::ok([id, from, action, to]),
        ));
    }

    async fn check_fail(&self) -> QueryResult<()> {
        if *self.fail.read().await {
            return Err(QueryError::Communication("mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterQuery for MockClusterQuery {
    async fn cluster_config(&self) -> QueryResult<Reply> {
        self.check_fail().await?;
        if let Some(delay) = *self.delay.read().await {
            tokio::time::sleep(delay).await;
        }
        // The config record carries many unrelated fields; only the
        // automation version and cluster name offsets matter here.
        let mut fields = vec![String::new(); 22];
        fields[7] = self.automation_version.clone();
        fields[21] = self.cluster_name.clone();
        Ok(Reply::Ok(fields))
    }

    async fn all_nodes(&self) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(Reply::Ok(self.state.read().await.nodes.clone()))
    }

    async fn node_config(&self, node: &str) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(self
            .state
            .read()
            .await
            .node_configs
            .get(node)
            .cloned()
            .unwrap_or(Reply::NoData))
    }

    async fn all_resources(&self) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(Reply::Ok(self.state.read().await.resources.clone()))
    }

    async fn resource_type(&self, name: &str) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(self
            .state
            .read()
            .await
            .resource_types
            .get(name)
            .map(|kind| Reply::ok([kind.as_str()]))
            .unwrap_or(Reply::NoData))
    }

    async fn resource_status(&self, name: &str) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(self
            .state
            .read()
            .await
            .resource_status
            .get(name)
            .cloned()
            .unwrap_or(Reply::NoData))
    }

    async fn resource_params(&self, name: &str) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(self
            .state
            .read()
            .await
            .resource_params
            .get(name)
            .cloned()
            .unwrap_or(Reply::NoData))
    }

    async fn sub_resources(&self, group: &str) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(self
            .state
            .read()
            .await
            .group_members
            .get(group)
            .map(|members| Reply::Ok(members.clone()))
            .unwrap_or(Reply::NoData))
    }

    async fn constraint_ids(&self, kind: ConstraintKind) -> QueryResult<Reply> {
        self.check_fail().await?;
        let ids = self
            .state
            .read()
            .await
            .constraints
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, id, _)| id.clone())
            .collect();
        Ok(Reply::Ok(ids))
    }

    async fn constraint_detail(&self, kind: ConstraintKind, id: &str) -> QueryResult<Reply> {
        self.check_fail().await?;
        Ok(self
            .state
            .read()
            .await
            .constraints
            .iter()
            .find(|(k, i, _)| *k == kind && i == id)
            .map(|(_, _, detail)| detail.clone())
            .unwrap_or(Reply::NoData))
    }
}

/// Sender side of a [`MockNotifier`].
pub struct NotifierHandle {
    tx: mpsc::Sender<String>,
}

impl NotifierHandle {
    /// Deliver one change notification. Errors if the notifier is gone.
    pub async fn notify(&self, token: &str) -> Result<(), NotifierError> {
        self.tx
            .send(token.to_string())
            .await
            .map_err(|_| NotifierError::Closed)
    }
}

/// Mock change notifier fed from a channel. Dropping the handle closes the
/// channel, which the synchronization loop treats as terminal.
pub struct MockNotifier {
    rx: Mutex<mpsc::Receiver<String>>,
}

impl MockNotifier {
    pub fn new() -> (Self, NotifierHandle) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                rx: Mutex::new(rx),
            },
            NotifierHandle { tx },
        )
    }
}

#[async_trait]
impl ChangeNotifier for MockNotifier {
    async fn wait(&self) -> NotifierResult<ChangeToken> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(token) => Ok(ChangeToken(token)),
            None => Err(NotifierError::Closed),
        }
    }
}

/// Event sink that collects everything emitted to it.
#[derive(Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<TopologyEvent>>,
    fail: RwLock<bool>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Drain and return the collected events in delivery order.
    pub async fn take_events(&self) -> Vec<TopologyEvent> {
        std::mem::take(&mut *self.events.write().await)
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: TopologyEvent) -> SinkResult<()> {
        if *self.fail.read().await {
            return Err(SinkError::Delivery("mock failure".to_string()));
        }
        self.events.write().await.push(event);
        Ok(())
    }
}

/// One recorded control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    TargetRole { resource: String, online: bool },
    Standby { node: String, standby: bool },
    NodeActive { node: String, online: bool },
}

/// Control channel that records commands instead of executing them.
#[derive(Default)]
pub struct MockControlChannel {
    commands: RwLock<Vec<ControlCommand>>,
    fail: RwLock<bool>,
}

impl MockControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Drain and return the recorded commands in issue order.
    pub async fn take_commands(&self) -> Vec<ControlCommand> {
        std::mem::take(&mut *self.commands.write().await)
    }

    async fn record(&self, command: ControlCommand) -> ControlResult<()> {
        if *self.fail.read().await {
            return Err(ControlError::Communication("mock failure".to_string()));
        }
        self.commands.write().await.push(command);
        Ok(())
    }
}

#[async_trait]
impl ControlChannel for MockControlChannel {
    async fn set_resource_target_role(&self, resource: &str, online: bool) -> ControlResult<()> {
        self.record(ControlCommand::TargetRole {
            resource: resource.to_string(),
            online,
        })
        .await
    }

    async fn set_node_standby(&self, node: &str, standby: bool) -> ControlResult<()> {
        self.record(ControlCommand::Standby {
            node: node.to_string(),
            standby,
        })
        .await
    }

    async fn set_node_active(&self, node: &str, online: bool) -> ControlResult<()> {
        self.record(ControlCommand::NodeActive {
            node: node.to_string(),
            online,
        })
        .await
    }
}
