use std::sync::{PoisonError, RwLock};
use tracing::info;

use super::models::{AuthState, UserProfile};

/// Source of the current authentication state
///
/// Session issuance lives outside this crate; workflows only ask who is
/// signed in right now and refuse to act for anyone else.
pub trait AuthContext: Send + Sync {
    fn current(&self) -> AuthState;

    /// The signed-in user, or None while loading or signed out
    fn current_user(&self) -> Option<UserProfile> {
        match self.current() {
            AuthState::Authenticated(user) => Some(user),
            AuthState::Loading | AuthState::Unauthenticated => None,
        }
    }
}

/// Auth context holding a state that can be swapped at runtime
#[derive(Debug, Default)]
pub struct StaticAuthContext {
    state: RwLock<AuthState>,
}

impl StaticAuthContext {
    pub fn new(state: AuthState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn signed_in(user: UserProfile) -> Self {
        Self::new(AuthState::Authenticated(user))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthState::Unauthenticated)
    }

    pub fn set_state(&self, state: AuthState) {
        info!(
            authenticated = state.user().is_some(),
            "Authentication state changed"
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl AuthContext for StaticAuthContext {
    fn current(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
