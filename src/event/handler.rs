use async_trait::async_trait;
use thiserror::Error;

use super::events::AppEvent;

/// Errors that can occur when handling events
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("Subscriber is no longer listening")]
    Closed,
}

impl EventError {
    /// Create a handler error from any message
    pub fn handler(msg: impl Into<String>) -> Self {
        EventError::Handler(msg.into())
    }
}

/// Trait for components that react to bus events with async work
///
/// The bus itself calls plain synchronous closures. Components that need to
/// go back to a gateway when notified implement this trait and are attached
/// through an [`EventSubscription`](super::EventSubscription), which runs the
/// handler on its own task.
#[async_trait]
pub trait AsyncEventHandler: Send + Sync {
    /// Handle an event
    ///
    /// Return Ok(()) on success or EventError on failure. Failures are logged
    /// by the subscription and do not stop it.
    async fn handle_event(&self, event: AppEvent) -> Result<(), EventError>;

    /// Get a human-readable name for this handler (for logging/debugging)
    fn handler_name(&self) -> &'static str;
}
