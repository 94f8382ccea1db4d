use std::time::Duration;
use tokio::sync::watch;

use classhub::{
    classroom::{ClassListView, Partition},
    ClassListState,
};

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Waits for the next class list update and returns the ready view
pub async fn next_ready_view(changes: &mut watch::Receiver<ClassListState>) -> ClassListView {
    tokio::time::timeout(Duration::from_secs(1), changes.changed())
        .await
        .expect("class list did not refresh in time")
        .expect("class list was dropped");

    match changes.borrow_and_update().clone() {
        ClassListState::Ready(view) => view,
        other => panic!("expected a ready class list, got {other:?}"),
    }
}

/// Current ready view, panicking on loading or failure
pub fn ready_view(state: ClassListState) -> ClassListView {
    match state {
        ClassListState::Ready(view) => view,
        other => panic!("expected a ready class list, got {other:?}"),
    }
}

pub fn class_names(partition: &Partition) -> Vec<String> {
    partition
        .classes()
        .iter()
        .map(|class| class.name.clone())
        .collect()
}
