// Library crate for the classhub classroom client core
// This file exposes the public API for integration tests and the demo binary

pub mod announcement;
pub mod classroom;
pub mod config;
pub mod event;
pub mod session;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use announcement::{AnnouncementComposer, ComposerState, PostOutcome};
pub use classroom::{ClassListAggregator, ClassListState, JoinOutcome, JoinState, JoinWorkflow};
pub use config::AppConfig;
pub use event::{AppEvent, EventBus, Subscription};
pub use session::{AuthContext, AuthState, StaticAuthContext, UserProfile};
pub use shared::{AppContext, AppError, Notification};
