pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{class_names, next_ready_view, ready_view};
#[allow(unused_imports)]
pub use mocks::{MockClassroomGateway, MockUploadGateway};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
