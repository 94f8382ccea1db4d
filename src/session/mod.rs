// Public API - what other modules can use
pub use context::{AuthContext, StaticAuthContext};
pub use models::{AuthState, UserProfile};

// Internal modules
mod context;
mod models;
