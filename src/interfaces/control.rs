//! Fire-and-forget control commands toward the cluster engine.
//!
//! Control actions never mutate the topology store directly; their effect
//! becomes visible through the next notification-triggered rebuild.

use async_trait::async_trait;

/// Result type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors from control commands.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Engine communication failed: {0}")]
    Communication(String),
}

/// Command primitives against the cluster engine.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Set a resource's target role: started when `online`, stopped otherwise.
    async fn set_resource_target_role(&self, resource: &str, online: bool) -> Result<()>;

    /// Put a node into or out of standby.
    async fn set_node_standby(&self, node: &str, standby: bool) -> Result<()>;

    /// Start or stop the cluster membership service on a node.
    async fn set_node_active(&self, node: &str, online: bool) -> Result<()>;
}
