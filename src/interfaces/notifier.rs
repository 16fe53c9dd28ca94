//! Change notification interface.

use async_trait::async_trait;

/// Result type for notifier operations.
pub type Result<T> = std::result::Result<T, NotifierError>;

/// Errors from the change notifier. Any error is terminal for the
/// synchronization loop.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Notification wait failed: {0}")]
    Failed(String),
}

/// Opaque token describing one cluster change. The core treats every token
/// identically and never interprets its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeToken(pub String);

/// Blocking wait for cluster state changes.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    /// Block until the cluster reports a change. May block forever; there is
    /// no timeout.
    async fn wait(&self) -> Result<ChangeToken>;
}
