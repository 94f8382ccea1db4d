use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use classhub::{
    announcement::{LocalFile, UploadError, UploadGateway, UploadedFile},
    classroom::{
        Classroom, ClassroomGateway, ClassroomSummary, CreateClassroomRequest,
        InMemoryClassroomGateway, JoinResponse,
    },
    AppError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Classroom gateway backed by the in-memory store that counts calls and can
/// hold join requests until the test releases them
pub struct MockClassroomGateway {
    store: Arc<InMemoryClassroomGateway>,
    hold_joins: bool,
    join_calls: AtomicU32,
    list_calls: AtomicU32,
    join_started: Notify,
    join_released: Notify,
}

impl MockClassroomGateway {
    pub fn new(hold_joins: bool) -> Self {
        Self {
            store: Arc::new(InMemoryClassroomGateway::new()),
            hold_joins,
            join_calls: AtomicU32::new(0),
            list_calls: AtomicU32::new(0),
            join_started: Notify::new(),
            join_released: Notify::new(),
        }
    }

    pub fn store(&self) -> Arc<InMemoryClassroomGateway> {
        self.store.clone()
    }

    pub fn join_calls(&self) -> u32 {
        self.join_calls.load(Ordering::SeqCst)
    }

    /// Number of taught-list queries, one per class list refresh
    pub fn refreshes(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Resolves once a held join request has reached the gateway
    pub async fn join_started(&self) {
        self.join_started.notified().await;
    }

    pub fn release_join(&self) {
        self.join_released.notify_one();
    }
}

#[async_trait]
impl ClassroomGateway for MockClassroomGateway {
    async fn create_classroom(&self, request: CreateClassroomRequest) -> Result<Classroom, AppError> {
        self.store.create_classroom(request).await
    }

    async fn join_classroom(
        &self,
        code: &str,
        user_id: &str,
        is_teacher: bool,
    ) -> Result<JoinResponse, AppError> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_joins {
            self.join_started.notify_one();
            self.join_released.notified().await;
        }
        self.store.join_classroom(code, user_id, is_teacher).await
    }

    async fn list_taught_classrooms(
        &self,
        user_id: &str,
    ) -> Result<Vec<ClassroomSummary>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.store.list_taught_classrooms(user_id).await
    }

    async fn list_enrolled_classrooms(
        &self,
        user_id: &str,
    ) -> Result<Vec<ClassroomSummary>, AppError> {
        self.store.list_enrolled_classrooms(user_id).await
    }
}

/// Upload gateway that resolves each file after a configured delay
#[derive(Default)]
pub struct MockUploadGateway {
    delays: HashMap<String, Duration>,
}

impl MockUploadGateway {
    pub fn new(delays: HashMap<String, Duration>) -> Self {
        Self { delays }
    }

    pub fn url_for(name: &str) -> String {
        format!("https://cdn.test/{name}")
    }
}

#[async_trait]
impl UploadGateway for MockUploadGateway {
    async fn upload(&self, file: &LocalFile) -> Result<UploadedFile, UploadError> {
        if let Some(delay) = self.delays.get(&file.name) {
            tokio::time::sleep(*delay).await;
        }
        Ok(UploadedFile {
            file_name: file.name.clone(),
            url: Self::url_for(&file.name),
        })
    }
}
