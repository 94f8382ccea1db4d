use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in user as exposed by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,            // Provider-issued user identifier
    pub name: String,          // Display name
    pub image: Option<String>, // Avatar URL
}

impl UserProfile {
    /// Creates a profile with a freshly generated identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Authentication state as seen by the workflows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Session lookup has not finished yet
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(UserProfile),
}

impl AuthState {
    /// The signed-in user, if there is one
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            AuthState::Loading | AuthState::Unauthenticated => None,
        }
    }
}
