use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Message the data service returns for a successful join
pub const JOIN_SUCCESS_MESSAGE: &str = "success";

/// Role a user holds in a classroom
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    /// Maps the "join as a teacher" toggle to a role
    pub fn from_teacher_flag(is_teacher: bool) -> Self {
        if is_teacher {
            Role::Teacher
        } else {
            Role::Student
        }
    }
}

/// Classroom record as held by the data service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: String,
    pub name: String,
    pub subject: Option<String>,
    pub section: Option<String>,
    pub code: String,                // Join code handed out to members
    pub author_id: String,           // User who created the classroom
    pub teacher_ids: Vec<String>,    // Users with a teacher membership
    pub student_ids: Vec<String>,    // Users with a student membership
    pub created_at: DateTime<Utc>,
}

impl Classroom {
    /// Creates a classroom from a request; the author is its first teacher
    pub fn new(request: CreateClassroomRequest, code: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name,
            subject: request.subject,
            section: request.section,
            code,
            teacher_ids: vec![request.author_id.clone()],
            student_ids: vec![],
            author_id: request.author_id,
            created_at: Utc::now(),
        }
    }

    /// Role the user holds here, if any
    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        if self.teacher_ids.iter().any(|id| id == user_id) {
            Some(Role::Teacher)
        } else if self.student_ids.iter().any(|id| id == user_id) {
            Some(Role::Student)
        } else {
            None
        }
    }

    /// Adds a membership; returns false if the user is already a member
    pub fn add_member(&mut self, user_id: &str, role: Role) -> bool {
        if self.role_of(user_id).is_some() {
            return false;
        }
        match role {
            Role::Teacher => self.teacher_ids.push(user_id.to_string()),
            Role::Student => self.student_ids.push(user_id.to_string()),
        }
        true
    }

    /// Whether `code` is this classroom's join code (case-insensitive)
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    pub fn memberships(&self) -> Vec<Membership> {
        let teachers = self.teacher_ids.iter().map(|id| (id, Role::Teacher));
        let students = self.student_ids.iter().map(|id| (id, Role::Student));
        teachers
            .chain(students)
            .map(|(user_id, role)| Membership {
                user_id: user_id.clone(),
                classroom_id: self.id.clone(),
                role,
            })
            .collect()
    }

    pub fn summary(&self) -> ClassroomSummary {
        ClassroomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// A user's role-scoped association with a classroom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: String,
    pub classroom_id: String,
    pub role: Role,
}

/// List projection of a classroom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomSummary {
    pub id: String,
    pub name: String,
}

impl ClassroomSummary {
    /// Path of the classroom page
    pub fn href(&self) -> String {
        format!("/class/{}", self.id)
    }
}

/// Request payload for creating a classroom
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassroomRequest {
    pub name: String,
    pub section: Option<String>,
    pub subject: Option<String>,
    pub author_id: String,
}

impl CreateClassroomRequest {
    pub fn new(name: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            section: None,
            subject: None,
            author_id: author_id.into(),
        }
    }
}

/// Outcome indicator of a join mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Success,
    Rejected,
}

/// Response of the join mutation: a status and a user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JoinStatus>, // Absent from services that only send a message
    pub message: String,
}

impl JoinResponse {
    pub fn success() -> Self {
        Self {
            status: Some(JoinStatus::Success),
            message: JOIN_SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: Some(JoinStatus::Rejected),
            message: message.into(),
        }
    }

    /// An explicit status wins; without one the message "success" signals it
    pub fn is_success(&self) -> bool {
        match self.status {
            Some(status) => status == JoinStatus::Success,
            None => self.message == JOIN_SUCCESS_MESSAGE,
        }
    }
}
