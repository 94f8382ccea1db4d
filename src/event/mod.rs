// Event-driven communication between otherwise unrelated components
//
// The bus is the only shared mutable state between workflows: the join
// workflow publishes, the class list listens, and neither knows the other.

// Public API - what other modules can use
pub use bus::{EventBus, Subscription};
pub use events::AppEvent;
pub use handler::{AsyncEventHandler, EventError};
pub use subscription::{EventSubscription, SubscriptionHandle};

// Internal modules
mod bus;
mod events;
mod handler;
mod subscription;
