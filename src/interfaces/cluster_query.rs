//! Query interface to the cluster engine.
//!
//! The engine answers every query with a structured text record. The wire
//! protocol itself lives in the implementing collaborator; the core only
//! sees the record fields.

use async_trait::async_trait;

use crate::model::ConstraintKind;

/// Result type for engine queries.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors from engine queries.
///
/// A communication failure aborts the current rebuild cycle; the store keeps
/// its last good snapshot. The core never retries.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Engine communication failed: {0}")]
    Communication(String),
}

/// One engine reply: the record fields following the status sentinel, or
/// `NoData` when the engine answered with its failure sentinel. `NoData`
/// means "nothing to report", not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(Vec<String>),
    NoData,
}

impl Reply {
    pub fn ok<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Ok(fields.into_iter().map(Into::into).collect())
    }

    /// The record fields; empty for `NoData`.
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Ok(fields) => fields,
            Self::NoData => &[],
        }
    }

    /// Field at `index`, or the empty string when the record is shorter.
    pub fn field(&self, index: usize) -> &str {
        self.fields().get(index).map_or("", String::as_str)
    }
}

/// Request/response primitives against the cluster engine.
///
/// No timeouts are imposed here; an implementation intended for production
/// should bound its own calls.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// Cluster-wide configuration record (automation version, cluster name).
    async fn cluster_config(&self) -> Result<Reply>;

    /// Names of all configured nodes.
    async fn all_nodes(&self) -> Result<Reply>;

    /// Per-node configuration: uname, online, standby, unclean, shutdown,
    /// expected_up, is_dc, ping.
    async fn node_config(&self, node: &str) -> Result<Reply>;

    /// Names of all top-level resources.
    async fn all_resources(&self) -> Result<Reply>;

    /// Kind tag of a resource: native, group, clone or master.
    async fn resource_type(&self, name: &str) -> Result<Reply>;

    /// Status string of a resource (running, stopped, failed, ...).
    async fn resource_status(&self, name: &str) -> Result<Reply>;

    /// Resource parameters as (id, name, value) triples.
    async fn resource_params(&self, name: &str) -> Result<Reply>;

    /// Member names of a group.
    async fn sub_resources(&self, group: &str) -> Result<Reply>;

    /// Ids of all constraints of one kind.
    async fn constraint_ids(&self, kind: ConstraintKind) -> Result<Reply>;

    /// Detail record of one constraint.
    async fn constraint_detail(&self, kind: ConstraintKind, id: &str) -> Result<Reply>;
}
