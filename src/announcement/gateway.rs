use async_trait::async_trait;
use std::cmp::Reverse;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use super::models::{Announcement, CreatedAnnouncement, NewAnnouncement};
use crate::classroom::gateway::InMemoryClassroomGateway;
use crate::shared::AppError;

/// Announcement operations of the remote data service
#[async_trait]
pub trait AnnouncementGateway: Send + Sync {
    async fn create_announcement(
        &self,
        request: NewAnnouncement,
    ) -> Result<CreatedAnnouncement, AppError>;

    /// Announcements of a classroom, newest first
    async fn list_announcements(&self, classroom_id: &str)
        -> Result<Vec<Announcement>, AppError>;
}

/// In-memory implementation of AnnouncementGateway backed by the
/// in-memory classroom store for membership checks
pub struct InMemoryAnnouncementGateway {
    classrooms: Arc<InMemoryClassroomGateway>,
    announcements: Mutex<Vec<Announcement>>,
}

impl InMemoryAnnouncementGateway {
    pub fn new(classrooms: Arc<InMemoryClassroomGateway>) -> Self {
        Self {
            classrooms,
            announcements: Mutex::new(Vec::new()),
        }
    }

    fn announcements(&self) -> MutexGuard<'_, Vec<Announcement>> {
        self.announcements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn count(&self) -> usize {
        self.announcements().len()
    }
}

#[async_trait]
impl AnnouncementGateway for InMemoryAnnouncementGateway {
    #[instrument(skip(self, request), fields(
        classroom_id = %request.classroom_id,
        user_id = %request.user_id,
    ))]
    async fn create_announcement(
        &self,
        request: NewAnnouncement,
    ) -> Result<CreatedAnnouncement, AppError> {
        if self.classrooms.get_classroom(&request.classroom_id).is_none() {
            warn!("Classroom not found");
            return Err(AppError::NotFound(format!(
                "Classroom {} not found",
                request.classroom_id
            )));
        }
        if self
            .classrooms
            .role_of(&request.classroom_id, &request.user_id)
            .is_none()
        {
            warn!("Author is not a member of the classroom");
            return Err(AppError::Unauthorized(
                "Only class members can post announcements".to_string(),
            ));
        }
        if request.is_empty() {
            return Err(AppError::Validation(
                "Announcement needs text or an attachment".to_string(),
            ));
        }

        let announcement = Announcement::from_request(request);
        let created = CreatedAnnouncement {
            text: announcement.text.clone(),
            links: announcement.links.clone(),
        };
        info!(
            announcement_id = %announcement.id,
            links = announcement.link_list().len(),
            "Announcement created"
        );
        self.announcements().push(announcement);
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn list_announcements(
        &self,
        classroom_id: &str,
    ) -> Result<Vec<Announcement>, AppError> {
        // Insertion order breaks timestamp ties, newest first
        let mut announcements: Vec<Announcement> = self
            .announcements()
            .iter()
            .rev()
            .filter(|a| a.classroom_id == classroom_id)
            .cloned()
            .collect();
        announcements.sort_by_key(|a| Reverse(a.created_at));

        debug!(count = announcements.len(), "Listed announcements");
        Ok(announcements)
    }
}
