// Public API - what other modules can use
pub use gateway::{ClassroomGateway, InMemoryClassroomGateway};
pub use join::{JoinForm, JoinOutcome, JoinState, JoinWorkflow};
pub use list::{ClassListAggregator, ClassListState, ClassListView, MountedClassList, Partition};
pub use models::{
    Classroom, ClassroomSummary, CreateClassroomRequest, JoinResponse, JoinStatus, Membership,
    Role,
};

// Internal modules
pub mod gateway;
pub mod join;
pub mod list;
pub mod models;
