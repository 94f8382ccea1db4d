use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use super::models::{
    Classroom, ClassroomSummary, CreateClassroomRequest, JoinResponse, Membership, Role,
};
use crate::shared::AppError;

/// Length of generated join codes
pub const JOIN_CODE_LENGTH: usize = 7;

/// Classroom operations of the remote data service
#[async_trait]
pub trait ClassroomGateway: Send + Sync {
    async fn create_classroom(&self, request: CreateClassroomRequest)
        -> Result<Classroom, AppError>;

    /// Joins the classroom identified by `code`
    ///
    /// A code the service refuses (unknown, already a member) is reported
    /// through the response status, not as an error.
    async fn join_classroom(
        &self,
        code: &str,
        user_id: &str,
        is_teacher: bool,
    ) -> Result<JoinResponse, AppError>;

    /// Classrooms where the user holds a teacher membership
    async fn list_taught_classrooms(&self, user_id: &str)
        -> Result<Vec<ClassroomSummary>, AppError>;

    /// Classrooms where the user holds a student membership
    async fn list_enrolled_classrooms(
        &self,
        user_id: &str,
    ) -> Result<Vec<ClassroomSummary>, AppError>;
}

/// In-memory implementation of ClassroomGateway for development and testing
pub struct InMemoryClassroomGateway {
    classrooms: Mutex<Vec<Classroom>>,
}

impl Default for InMemoryClassroomGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryClassroomGateway {
    /// Creates a new empty in-memory gateway
    pub fn new() -> Self {
        Self {
            classrooms: Mutex::new(Vec::new()),
        }
    }

    fn classrooms(&self) -> MutexGuard<'_, Vec<Classroom>> {
        self.classrooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets a classroom by ID
    pub fn get_classroom(&self, classroom_id: &str) -> Option<Classroom> {
        self.classrooms()
            .iter()
            .find(|c| c.id == classroom_id)
            .cloned()
    }

    /// Role the user holds in the classroom, if any
    pub fn role_of(&self, classroom_id: &str, user_id: &str) -> Option<Role> {
        self.classrooms()
            .iter()
            .find(|c| c.id == classroom_id)
            .and_then(|c| c.role_of(user_id))
    }

    /// All memberships across all classrooms
    pub fn memberships(&self) -> Vec<Membership> {
        self.classrooms()
            .iter()
            .flat_map(Classroom::memberships)
            .collect()
    }

    fn generate_join_code(existing: &[Classroom]) -> String {
        loop {
            let code: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(JOIN_CODE_LENGTH)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            if !existing.iter().any(|c| c.matches_code(&code)) {
                return code;
            }
        }
    }
}

#[async_trait]
impl ClassroomGateway for InMemoryClassroomGateway {
    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_classroom(
        &self,
        request: CreateClassroomRequest,
    ) -> Result<Classroom, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Classroom name is required".to_string(),
            ));
        }

        let mut classrooms = self.classrooms();
        let code = Self::generate_join_code(&classrooms);
        let classroom = Classroom::new(request, code);
        classrooms.push(classroom.clone());

        info!(
            classroom_id = %classroom.id,
            code = %classroom.code,
            "Classroom created in memory"
        );
        Ok(classroom)
    }

    #[instrument(skip(self))]
    async fn join_classroom(
        &self,
        code: &str,
        user_id: &str,
        is_teacher: bool,
    ) -> Result<JoinResponse, AppError> {
        debug!("Attempting to join classroom by code");

        let mut classrooms = self.classrooms();

        let Some(classroom) = classrooms.iter_mut().find(|c| c.matches_code(code)) else {
            debug!("No classroom matches code");
            return Ok(JoinResponse::rejected("Invalid class code"));
        };

        let role = Role::from_teacher_flag(is_teacher);
        if !classroom.add_member(user_id, role) {
            warn!(classroom_id = %classroom.id, "User is already a member");
            return Ok(JoinResponse::rejected(
                "You are already a member of this class",
            ));
        }

        info!(
            classroom_id = %classroom.id,
            role = %role,
            "User joined classroom"
        );
        Ok(JoinResponse::success())
    }

    #[instrument(skip(self))]
    async fn list_taught_classrooms(
        &self,
        user_id: &str,
    ) -> Result<Vec<ClassroomSummary>, AppError> {
        let taught: Vec<ClassroomSummary> = self
            .classrooms()
            .iter()
            .filter(|c| c.role_of(user_id) == Some(Role::Teacher))
            .map(Classroom::summary)
            .collect();

        debug!(count = taught.len(), "Listed taught classrooms");
        Ok(taught)
    }

    #[instrument(skip(self))]
    async fn list_enrolled_classrooms(
        &self,
        user_id: &str,
    ) -> Result<Vec<ClassroomSummary>, AppError> {
        let enrolled: Vec<ClassroomSummary> = self
            .classrooms()
            .iter()
            .filter(|c| c.role_of(user_id) == Some(Role::Student))
            .map(Classroom::summary)
            .collect();

        debug!(count = enrolled.len(), "Listed enrolled classrooms");
        Ok(enrolled)
    }
}
