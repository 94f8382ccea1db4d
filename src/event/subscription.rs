use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{
    bus::{EventBus, Subscription},
    events::AppEvent,
    handler::{AsyncEventHandler, EventError},
};

/// Attaches an async handler to one event on the bus
pub struct EventSubscription {
    event: AppEvent,
    handler: Arc<dyn AsyncEventHandler>,
    event_bus: EventBus,
}

impl EventSubscription {
    pub fn new(event: AppEvent, handler: Arc<dyn AsyncEventHandler>, event_bus: EventBus) -> Self {
        Self {
            event,
            handler,
            event_bus,
        }
    }

    /// Start the subscription - registers a forwarding handler on the bus and
    /// spawns a background task that routes each emission to the async handler
    ///
    /// Emissions are handled one at a time in the order they were emitted.
    pub fn start(self) -> SubscriptionHandle {
        let event = self.event;
        let handler_name = self.handler.handler_name();

        info!(
            event = %event,
            handler = handler_name,
            "Starting event subscription"
        );

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscription = self.event_bus.subscribe(event, move |event| {
            sender.send(event).map_err(|_| EventError::Closed)
        });

        let handler = self.handler;
        let task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                info!(
                    event = %event,
                    handler = handler_name,
                    "Received event"
                );

                if let Err(e) = handler.handle_event(event).await {
                    warn!(
                        event = %event,
                        handler = handler_name,
                        error = %e,
                        "Event handler failed"
                    );
                }
            }

            info!(
                event = %event,
                handler = handler_name,
                "Event subscription ended - no more events"
            );
        });

        SubscriptionHandle {
            subscription: Some(subscription),
            task,
        }
    }
}

/// Owns a running [`EventSubscription`]
///
/// Cancelling or dropping the handle removes the bus registration and aborts
/// the task, including any handler call still in progress.
pub struct SubscriptionHandle {
    subscription: Option<Subscription>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Whether the handler is still registered on the bus
    pub fn is_active(&self) -> bool {
        self.subscription.is_some() && !self.task.is_finished()
    }

    /// Stops listening for events
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            info!(event = %subscription.event(), "Cancelling event subscription");
            subscription.unsubscribe();
        }
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
