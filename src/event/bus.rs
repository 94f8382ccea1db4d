use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, warn};

use super::events::AppEvent;
use super::handler::EventError;

type Handler = Arc<dyn Fn(AppEvent) -> Result<(), EventError> + Send + Sync>;

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    /// event -> handlers in registration order
    handlers: HashMap<AppEvent, Vec<Registration>>,
}

impl Registry {
    fn contains(&self, event: AppEvent, id: u64) -> bool {
        self.handlers
            .get(&event)
            .is_some_and(|registrations| registrations.iter().any(|r| r.id == id))
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event bus for distributing invalidation signals between components
///
/// One bus is created per application session and cloned into every
/// component that publishes or listens. Delivery is synchronous: `emit`
/// returns after every handler registered for the event has run.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Creates a new event bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, event: AppEvent, handler: F) -> Subscription
    where
        F: Fn(AppEvent) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;

        let registrations = registry.handlers.entry(event).or_default();
        registrations.push(Registration {
            id,
            handler: Arc::new(handler),
        });

        debug!(
            event = %event,
            subscription_id = id,
            subscribers = registrations.len(),
            "Handler subscribed"
        );

        Subscription {
            id,
            event,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Emits an event to every handler currently registered for it
    ///
    /// Handlers run in registration order on the caller's task. A handler
    /// that returns an error or panics is logged and skipped; the remaining
    /// handlers still run. Returns the number of handlers invoked.
    pub fn emit(&self, event: AppEvent) -> usize {
        // The registry lock is released before any handler runs so handlers
        // can subscribe, unsubscribe or emit themselves.
        let snapshot: Vec<(u64, Handler)> = lock(&self.registry)
            .handlers
            .get(&event)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|r| (r.id, Arc::clone(&r.handler)))
                    .collect()
            })
            .unwrap_or_default();

        if snapshot.is_empty() {
            debug!(event = %event, "Event emitted with no subscribers");
            return 0;
        }

        let mut invoked = 0;
        for (id, handler) in snapshot {
            // Skip handlers removed by an earlier handler during this emit
            if !lock(&self.registry).contains(event, id) {
                continue;
            }

            invoked += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        event = %event,
                        subscription_id = id,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(payload) => {
                    let e = EventError::Panic(panic_message(payload.as_ref()));
                    error!(
                        event = %event,
                        subscription_id = id,
                        error = %e,
                        "Event handler panicked"
                    );
                }
            }
        }

        debug!(event = %event, receivers = invoked, "Event emitted");
        invoked
    }

    /// Number of handlers currently registered for `event`
    pub fn subscriber_count(&self, event: AppEvent) -> usize {
        lock(&self.registry)
            .handlers
            .get(&event)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        let subscribers: usize = registry.handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("events", &registry.handlers.len())
            .field("subscribers", &subscribers)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Disposer for a bus registration
///
/// Dropping it removes the handler, so a subscription owned by a component
/// goes away together with that component.
#[must_use = "dropping a Subscription unsubscribes its handler immediately"]
pub struct Subscription {
    id: u64,
    event: AppEvent,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// The event this subscription listens to
    pub fn event(&self) -> AppEvent {
        self.event
    }

    /// Removes the handler from the bus
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Bus already gone
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        let removed = {
            let mut registry = lock(&registry);
            let Some(registrations) = registry.handlers.get_mut(&self.event) else {
                return;
            };
            let removed = registrations
                .iter()
                .position(|r| r.id == self.id)
                .map(|index| registrations.remove(index));
            if registrations.is_empty() {
                registry.handlers.remove(&self.event);
            }
            removed
        };

        // The handler may own resources that touch the bus when dropped,
        // so it is released outside the lock.
        if removed.is_some() {
            debug!(event = %self.event, subscription_id = self.id, "Handler unsubscribed");
        }
        drop(removed);
    }
}
