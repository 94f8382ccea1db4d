use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{gateway::ClassroomGateway, models::ClassroomSummary};
use crate::event::{
    AppEvent, AsyncEventHandler, EventBus, EventError, EventSubscription, SubscriptionHandle,
};
use crate::shared::AppError;

pub const NO_CLASSES_MESSAGE: &str = "No classes to show";
pub const LIST_FAILURE_MESSAGE: &str = "Something went wrong";

/// One role-scoped half of the class list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "classes", rename_all = "snake_case")]
pub enum Partition {
    /// Rendered as an explicit "no classes" indicator
    Empty,
    Classes(Vec<ClassroomSummary>),
}

impl Partition {
    pub fn from_classes(classes: Vec<ClassroomSummary>) -> Self {
        if classes.is_empty() {
            Partition::Empty
        } else {
            Partition::Classes(classes)
        }
    }

    pub fn classes(&self) -> &[ClassroomSummary] {
        match self {
            Partition::Empty => &[],
            Partition::Classes(classes) => classes,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, heading: &str) -> fmt::Result {
        writeln!(f, "{heading}")?;
        match self {
            Partition::Empty => writeln!(f, "  {NO_CLASSES_MESSAGE}"),
            Partition::Classes(classes) => classes
                .iter()
                .try_for_each(|class| writeln!(f, "  - {} ({})", class.name, class.href())),
        }
    }
}

/// Both halves of the class list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassListView {
    pub teaching: Partition,
    pub enrolled: Partition,
}

impl ClassListView {
    pub fn new(taught: Vec<ClassroomSummary>, enrolled: Vec<ClassroomSummary>) -> Self {
        Self {
            teaching: Partition::from_classes(taught),
            enrolled: Partition::from_classes(enrolled),
        }
    }
}

impl fmt::Display for ClassListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.teaching.render(f, "Teaching")?;
        self.enrolled.render(f, "Enrolled")
    }
}

/// What the class list surface shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ClassListState {
    Loading,
    Ready(ClassListView),
    /// Either query failed; nothing is rendered partially
    Failed(String),
}

/// Fetches the taught and enrolled lists for one user and keeps them fresh
pub struct ClassListAggregator {
    gateway: Arc<dyn ClassroomGateway>,
    user_id: String,
    request_timeout: Duration,
    state: watch::Sender<ClassListState>,
    /// Latest refresh started; older results are dropped
    generation: AtomicU64,
}

impl ClassListAggregator {
    pub fn new(
        gateway: Arc<dyn ClassroomGateway>,
        user_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ClassListState::Loading);
        Self {
            gateway,
            user_id: user_id.into(),
            request_timeout,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ClassListState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified every time a refresh lands
    pub fn watch(&self) -> watch::Receiver<ClassListState> {
        self.state.subscribe()
    }

    /// Subscribes to `classes_changed` and loads both lists
    ///
    /// The subscription is registered before the first fetch so a change that
    /// lands during the initial load still triggers a refetch.
    pub async fn mount(self: Arc<Self>, event_bus: &EventBus) -> MountedClassList {
        info!(user_id = %self.user_id, "Mounting class list");

        let subscription = EventSubscription::new(
            AppEvent::ClassesChanged,
            self.clone(),
            event_bus.clone(),
        )
        .start();
        self.refresh().await;

        MountedClassList {
            aggregator: self,
            subscription,
        }
    }

    /// Issues both list queries and publishes the combined result
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn refresh(&self) -> ClassListState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation = generation, "Refreshing class list");

        let (taught, enrolled) = tokio::join!(
            self.query(
                "teaching",
                self.gateway.list_taught_classrooms(&self.user_id)
            ),
            self.query(
                "enrolled",
                self.gateway.list_enrolled_classrooms(&self.user_id)
            ),
        );

        let next = match (taught, enrolled) {
            (Ok(taught), Ok(enrolled)) => {
                info!(
                    generation = generation,
                    teaching = taught.len(),
                    enrolled = enrolled.len(),
                    "Class list loaded"
                );
                ClassListState::Ready(ClassListView::new(taught, enrolled))
            }
            _ => ClassListState::Failed(LIST_FAILURE_MESSAGE.to_string()),
        };

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next.clone();
            true
        });

        if !applied {
            debug!(generation = generation, "Dropping superseded class list result");
            return self.state();
        }
        next
    }

    async fn query<F>(&self, partition: &'static str, request: F) -> Result<Vec<ClassroomSummary>, AppError>
    where
        F: Future<Output = Result<Vec<ClassroomSummary>, AppError>>,
    {
        let result = match timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout),
        };
        if let Err(e) = &result {
            warn!(partition = partition, error = %e, "Class list query failed");
        }
        result
    }
}

#[async_trait]
impl AsyncEventHandler for ClassListAggregator {
    async fn handle_event(&self, event: AppEvent) -> Result<(), EventError> {
        match event {
            AppEvent::ClassesChanged => match self.refresh().await {
                ClassListState::Failed(message) => Err(EventError::handler(message)),
                ClassListState::Loading | ClassListState::Ready(_) => Ok(()),
            },
        }
    }

    fn handler_name(&self) -> &'static str {
        "ClassListAggregator"
    }
}

/// A class list that is on screen and listening for changes
///
/// Dropping it has the same effect as [`MountedClassList::dismiss`].
pub struct MountedClassList {
    aggregator: Arc<ClassListAggregator>,
    subscription: SubscriptionHandle,
}

impl MountedClassList {
    pub fn aggregator(&self) -> &Arc<ClassListAggregator> {
        &self.aggregator
    }

    pub fn state(&self) -> ClassListState {
        self.aggregator.state()
    }

    pub fn watch(&self) -> watch::Receiver<ClassListState> {
        self.aggregator.watch()
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.is_active()
    }

    /// Takes the list off screen and stops listening for changes
    pub fn dismiss(self) {
        info!(user_id = %self.aggregator.user_id, "Dismissing class list");
        self.subscription.cancel();
    }
}
