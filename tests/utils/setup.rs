use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use classhub::{
    announcement::InMemoryAnnouncementGateway,
    classroom::{Classroom, ClassroomGateway, CreateClassroomRequest},
    AppConfig, AppContext, AuthState, StaticAuthContext, UserProfile,
};

use super::mocks::{MockClassroomGateway, MockUploadGateway};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub context: AppContext,
    pub classrooms: Arc<MockClassroomGateway>,
    pub announcements: Arc<InMemoryAnnouncementGateway>,
    pub auth: Arc<StaticAuthContext>,
    pub user: UserProfile,
    classes: HashMap<String, Classroom>,
}

impl TestSetup {
    /// A classroom created during setup, looked up by name
    pub fn class(&self, name: &str) -> &Classroom {
        self.classes
            .get(name)
            .unwrap_or_else(|| panic!("no classroom named {name} in setup"))
    }
}

pub struct TestSetupBuilder {
    user: UserProfile,
    auth_state: Option<AuthState>,
    teaching: Vec<String>,
    others: Vec<String>,
    hold_joins: bool,
    upload_delays: HashMap<String, Duration>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            user: UserProfile::new("ada").with_image("https://avatars.test/ada.png"),
            auth_state: None,
            teaching: vec![],
            others: vec![],
            hold_joins: false,
            upload_delays: HashMap::new(),
        }
    }

    /// Classroom authored by the signed-in user
    pub fn teaching(mut self, name: &str) -> Self {
        self.teaching.push(name.to_string());
        self
    }

    /// Classroom authored by someone else, joinable by code
    pub fn with_other_class(mut self, name: &str) -> Self {
        self.others.push(name.to_string());
        self
    }

    pub fn holding_joins(mut self) -> Self {
        self.hold_joins = true;
        self
    }

    pub fn with_upload_delay(mut self, file_name: &str, millis: u64) -> Self {
        self.upload_delays
            .insert(file_name.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn signed_out(mut self) -> Self {
        self.auth_state = Some(AuthState::Unauthenticated);
        self
    }

    pub async fn build(self) -> TestSetup {
        let classrooms = Arc::new(MockClassroomGateway::new(self.hold_joins));
        let announcements = Arc::new(InMemoryAnnouncementGateway::new(classrooms.store()));

        let mut classes = HashMap::new();
        let authored = self
            .teaching
            .iter()
            .map(|name| (name, self.user.id.clone()))
            .chain(self.others.iter().map(|name| (name, "grace".to_string())));
        for (name, author_id) in authored {
            let classroom = classrooms
                .create_classroom(CreateClassroomRequest::new(name, author_id))
                .await
                .unwrap();
            classes.insert(name.clone(), classroom);
        }

        let auth = Arc::new(match self.auth_state {
            Some(state) => StaticAuthContext::new(state),
            None => StaticAuthContext::signed_in(self.user.clone()),
        });

        let context = AppContext::new(
            classrooms.clone(),
            announcements.clone(),
            Arc::new(MockUploadGateway::new(self.upload_delays)),
            auth.clone(),
            AppConfig::default(),
        );

        TestSetup {
            context,
            classrooms,
            announcements,
            auth,
            user: self.user,
            classes,
        }
    }
}
