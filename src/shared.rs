use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::announcement::{AnnouncementComposer, AnnouncementGateway, UploadGateway};
use crate::classroom::{ClassListAggregator, ClassroomGateway, JoinWorkflow, MountedClassList};
use crate::config::AppConfig;
use crate::event::EventBus;
use crate::session::AuthContext;

/// Shared application context containing all dependencies
///
/// Workflows are built from here so they all share one event bus.
#[derive(Clone)]
pub struct AppContext {
    pub event_bus: EventBus,
    pub classrooms: Arc<dyn ClassroomGateway>,
    pub announcements: Arc<dyn AnnouncementGateway>,
    pub uploads: Arc<dyn UploadGateway>,
    pub auth: Arc<dyn AuthContext>,
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(
        classrooms: Arc<dyn ClassroomGateway>,
        announcements: Arc<dyn AnnouncementGateway>,
        uploads: Arc<dyn UploadGateway>,
        auth: Arc<dyn AuthContext>,
        config: AppConfig,
    ) -> Self {
        Self {
            event_bus: EventBus::new(),
            classrooms,
            announcements,
            uploads,
            auth,
            config,
        }
    }

    pub fn join_workflow(&self) -> JoinWorkflow {
        JoinWorkflow::new(
            self.classrooms.clone(),
            self.event_bus.clone(),
            self.auth.clone(),
            self.config.request_timeout,
        )
    }

    pub fn class_list(&self, user_id: impl Into<String>) -> Arc<ClassListAggregator> {
        Arc::new(ClassListAggregator::new(
            self.classrooms.clone(),
            user_id,
            self.config.request_timeout,
        ))
    }

    /// Builds a class list for `user_id` and mounts it on this context's bus
    pub async fn mount_class_list(&self, user_id: impl Into<String>) -> MountedClassList {
        self.class_list(user_id).mount(&self.event_bus).await
    }

    pub fn composer(&self, classroom_id: impl Into<String>) -> AnnouncementComposer {
        AnnouncementComposer::new(
            classroom_id,
            self.announcements.clone(),
            self.uploads.clone(),
            self.auth.clone(),
            self.config.picker.clone(),
            self.config.request_timeout,
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error")]
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient notice shown after an action completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn joined() -> Self {
        Self::success("Success", "You have joined the class")
    }
}
