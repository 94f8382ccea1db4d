use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{gateway::ClassroomGateway, models::JoinResponse};
use crate::event::{AppEvent, EventBus};
use crate::session::AuthContext;
use crate::shared::{AppError, Notification};

pub const EMPTY_CODE_MESSAGE: &str = "Class code is required";
pub const SIGN_IN_MESSAGE: &str = "Sign in to join a class";

/// Values entered in the join form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinForm {
    pub code: String,
    pub as_teacher: bool,      // "Join as a teacher" toggle, off by default
    pub error: Option<String>, // Shown under the code field
}

/// State of a join workflow
///
/// A successful join returns straight to `Idle` carrying the success
/// notification; a failed one returns to `Open` with `error` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    Idle { notification: Option<Notification> },
    Open(JoinForm),
    Submitting(JoinForm),
}

impl Default for JoinState {
    fn default() -> Self {
        JoinState::Idle { notification: None }
    }
}

impl JoinState {
    /// The form, while it is visible
    pub fn form(&self) -> Option<&JoinForm> {
        match self {
            JoinState::Open(form) | JoinState::Submitting(form) => Some(form),
            JoinState::Idle { .. } => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, JoinState::Submitting(_))
    }
}

/// Result of a call to [`JoinWorkflow::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Membership created; the form is closed
    Joined,
    /// The service refused the code; message attached to the form
    Rejected(String),
    /// The call itself failed; message attached to the form
    Failed(String),
    /// Input failed validation; no call was made
    Invalid(String),
    /// Nobody is signed in; no call was made
    Unauthenticated,
    /// A submission is already in flight; no call was made
    AlreadySubmitting,
    /// The form is not open
    NotOpen,
    /// The form was closed while the call was in flight
    Discarded,
}

struct JoinMachine {
    state: JoinState,
    /// Incremented per submission; a result is applied only while its
    /// attempt is still the one in flight
    attempt: u64,
    /// Set while a gateway call is running, even after the form was closed
    in_flight: bool,
}

impl JoinMachine {
    fn is_current(&self, attempt: u64) -> bool {
        self.attempt == attempt && self.state.is_submitting()
    }
}

/// Clears the in-flight marker once the gateway call settles or is dropped
struct InFlight<'a>(&'a JoinWorkflow);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.machine().in_flight = false;
    }
}

struct JoinInner {
    gateway: Arc<dyn ClassroomGateway>,
    event_bus: EventBus,
    auth: Arc<dyn AuthContext>,
    request_timeout: Duration,
    machine: Mutex<JoinMachine>,
}

/// Drives the "enter code, submit, join" flow
///
/// Cloning yields another handle to the same workflow instance.
#[derive(Clone)]
pub struct JoinWorkflow {
    inner: Arc<JoinInner>,
}

impl JoinWorkflow {
    pub fn new(
        gateway: Arc<dyn ClassroomGateway>,
        event_bus: EventBus,
        auth: Arc<dyn AuthContext>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(JoinInner {
                gateway,
                event_bus,
                auth,
                request_timeout,
                machine: Mutex::new(JoinMachine {
                    state: JoinState::default(),
                    attempt: 0,
                    in_flight: false,
                }),
            }),
        }
    }

    fn machine(&self) -> MutexGuard<'_, JoinMachine> {
        self.inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> JoinState {
        self.machine().state.clone()
    }

    /// Opens the form with a blank code, joining as a student
    pub fn open(&self) {
        let mut machine = self.machine();
        if let JoinState::Idle { .. } = machine.state {
            debug!("Opening join form");
            machine.state = JoinState::Open(JoinForm::default());
        }
    }

    pub fn set_code(&self, code: impl Into<String>) {
        if let JoinState::Open(form) = &mut self.machine().state {
            form.code = code.into();
        }
    }

    pub fn set_teacher(&self, as_teacher: bool) {
        if let JoinState::Open(form) = &mut self.machine().state {
            form.as_teacher = as_teacher;
        }
    }

    pub fn toggle_teacher(&self) {
        if let JoinState::Open(form) = &mut self.machine().state {
            form.as_teacher = !form.as_teacher;
        }
    }

    /// Closes the form and discards what was entered
    ///
    /// If a submission is in flight its result will be discarded when it
    /// arrives, and a reopened form cannot submit until then.
    pub fn cancel(&self) {
        let mut machine = self.machine();
        match machine.state {
            JoinState::Open(_) => debug!("Join form cancelled"),
            JoinState::Submitting(_) => {
                info!(attempt = machine.attempt, "Join form closed with a submission in flight")
            }
            JoinState::Idle { .. } => return,
        }
        machine.state = JoinState::default();
    }

    /// Consumes the transient success notification, if one is showing
    pub fn take_notification(&self) -> Option<Notification> {
        match &mut self.machine().state {
            JoinState::Idle { notification } => notification.take(),
            JoinState::Open(_) | JoinState::Submitting(_) => None,
        }
    }

    /// Submits the form
    ///
    /// At most one submission is in flight at a time; a second call while
    /// one is pending returns `AlreadySubmitting` without touching the
    /// gateway. This holds across a cancel and reopen.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> JoinOutcome {
        let (attempt, form, user_id) = {
            let mut machine = self.machine();
            let in_flight = machine.in_flight;
            let form = match &mut machine.state {
                JoinState::Open(_) if in_flight => {
                    debug!("Earlier submission has not settled, ignoring");
                    return JoinOutcome::AlreadySubmitting;
                }
                JoinState::Open(form) => form,
                JoinState::Submitting(_) => {
                    debug!("Submission already in flight, ignoring");
                    return JoinOutcome::AlreadySubmitting;
                }
                JoinState::Idle { .. } => return JoinOutcome::NotOpen,
            };

            if form.code.trim().is_empty() {
                form.error = Some(EMPTY_CODE_MESSAGE.to_string());
                return JoinOutcome::Invalid(EMPTY_CODE_MESSAGE.to_string());
            }

            let Some(user) = self.inner.auth.current_user() else {
                warn!("Join attempted without a signed-in user");
                form.error = Some(SIGN_IN_MESSAGE.to_string());
                return JoinOutcome::Unauthenticated;
            };

            form.error = None;
            let form = form.clone();
            machine.attempt += 1;
            machine.in_flight = true;
            machine.state = JoinState::Submitting(form.clone());
            (machine.attempt, form, user.id)
        };
        let in_flight = InFlight(self);

        info!(
            attempt = attempt,
            as_teacher = form.as_teacher,
            "Submitting join request"
        );

        let request = self
            .inner
            .gateway
            .join_classroom(form.code.trim(), &user_id, form.as_teacher);
        let result = match timeout(self.inner.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout),
        };
        drop(in_flight);

        self.complete(attempt, result)
    }

    fn complete(&self, attempt: u64, result: Result<JoinResponse, AppError>) -> JoinOutcome {
        match result {
            Ok(response) if response.is_success() => self.succeed(attempt),
            Ok(response) => {
                info!(attempt = attempt, message = %response.message, "Join rejected");
                if self.fail(attempt, response.message.clone()) {
                    JoinOutcome::Rejected(response.message)
                } else {
                    JoinOutcome::Discarded
                }
            }
            Err(e) => {
                warn!(attempt = attempt, error = %e, "Join request failed");
                let message = e.to_string();
                if self.fail(attempt, message.clone()) {
                    JoinOutcome::Failed(message)
                } else {
                    JoinOutcome::Discarded
                }
            }
        }
    }

    fn succeed(&self, attempt: u64) -> JoinOutcome {
        let still_current = {
            let mut machine = self.machine();
            let current = machine.is_current(attempt);
            if let JoinState::Submitting(form) = &mut machine.state {
                if current {
                    form.error = None;
                }
            }
            current
        };

        // The membership exists either way, so listeners are told even when
        // nobody is looking at the form anymore.
        self.inner.event_bus.emit(AppEvent::ClassesChanged);

        if !still_current {
            info!(attempt = attempt, "Join succeeded after the form was closed");
            return JoinOutcome::Discarded;
        }

        let mut machine = self.machine();
        if machine.is_current(attempt) {
            machine.state = JoinState::Idle {
                notification: Some(Notification::joined()),
            };
        }

        info!(attempt = attempt, "Joined classroom");
        JoinOutcome::Joined
    }

    /// Returns the form to `Open` with `message`; false if the result is stale
    fn fail(&self, attempt: u64, message: String) -> bool {
        let mut machine = self.machine();
        if !machine.is_current(attempt) {
            debug!(attempt = attempt, "Discarding stale join result");
            return false;
        }

        if let JoinState::Submitting(mut form) = std::mem::take(&mut machine.state) {
            form.error = Some(message);
            machine.state = JoinState::Open(form);
        }
        true
    }
}
