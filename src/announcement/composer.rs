use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::gateway::AnnouncementGateway;
use super::models::{CreatedAnnouncement, NewAnnouncement, StagedAttachment};
use super::picker::PickerConfig;
use super::upload::{LocalFile, UploadError, UploadGateway, UploadedFile};
use crate::session::AuthContext;
use crate::shared::AppError;

pub const PROMPT_LABEL: &str = "Announce something to your class";

/// Errors shown inside the composer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    #[error("Write something or attach a file before posting")]
    EmptyAnnouncement,

    #[error("Wait for uploads to finish before posting")]
    UploadsPending,

    #[error("Sign in to post an announcement")]
    Unauthenticated,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Could not post announcement: {0}")]
    Post(String),
}

/// Announcement being written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    /// In upload-completion order
    pub attachments: Vec<StagedAttachment>,
    pub uploads_in_flight: usize,
    pub error: Option<ComposerError>,
}

impl Draft {
    /// Blank text and nothing attached
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.attachments.iter().map(|a| a.url.as_str()).collect()
    }

    /// Stages a resolved file, or records why it could not be
    fn stage(&mut self, file: UploadedFile) {
        match StagedAttachment::try_from(file) {
            Ok(attachment) => {
                debug!(file_name = %attachment.file_name, url = %attachment.url, "Attachment staged");
                self.attachments.push(attachment);
            }
            Err(e) => {
                warn!(error = %e, "Upload resolved without a usable URL");
                self.error = Some(e.into());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ComposerState {
    /// Only the prompt is showing
    #[default]
    Collapsed,
    Expanded(Draft),
    PickerOpen(Draft),
    Posting(Draft),
}

impl ComposerState {
    pub fn draft(&self) -> Option<&Draft> {
        match self {
            ComposerState::Collapsed => None,
            ComposerState::Expanded(draft)
            | ComposerState::PickerOpen(draft)
            | ComposerState::Posting(draft) => Some(draft),
        }
    }

    fn draft_mut(&mut self) -> Option<&mut Draft> {
        match self {
            ComposerState::Collapsed => None,
            ComposerState::Expanded(draft)
            | ComposerState::PickerOpen(draft)
            | ComposerState::Posting(draft) => Some(draft),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, ComposerState::Collapsed)
    }
}

/// Result of a call to [`AnnouncementComposer::post`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Created; the draft is cleared and the composer collapsed, unless
    /// uploads landed during the post and now start a new draft
    Posted(CreatedAnnouncement),
    /// Refused before any call; the error is also set on the draft
    Invalid(ComposerError),
    /// The call failed; the draft is kept and the error set on it
    Failed(String),
    /// The composer is not expanded
    NotReady,
    /// The composer was cancelled while the call was in flight
    Discarded,
}

/// Tally of one [`AnnouncementComposer::upload`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub staged: usize,
    pub failed: usize,
    /// Refused by the picker before uploading
    pub rejected: usize,
    /// Finished after the draft was discarded
    pub discarded: usize,
}

/// Collapsed prompt: the author's avatar and an invitation to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerPrompt {
    pub avatar: Option<String>,
    pub label: &'static str,
}

struct ComposerMachine {
    state: ComposerState,
    /// Incremented whenever the draft is discarded; in-flight uploads and
    /// posts tagged with an older epoch are dropped
    epoch: u64,
}

impl ComposerMachine {
    fn discard_draft(&mut self) {
        self.epoch += 1;
        self.state = ComposerState::Collapsed;
    }
}

struct ComposerInner {
    classroom_id: String,
    announcements: Arc<dyn AnnouncementGateway>,
    uploads: Arc<dyn UploadGateway>,
    auth: Arc<dyn AuthContext>,
    picker: PickerConfig,
    request_timeout: Duration,
    machine: Mutex<ComposerMachine>,
}

/// Writes and posts announcements to one classroom
///
/// Cloning yields another handle to the same composer.
#[derive(Clone)]
pub struct AnnouncementComposer {
    inner: Arc<ComposerInner>,
}

impl AnnouncementComposer {
    pub fn new(
        classroom_id: impl Into<String>,
        announcements: Arc<dyn AnnouncementGateway>,
        uploads: Arc<dyn UploadGateway>,
        auth: Arc<dyn AuthContext>,
        picker: PickerConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ComposerInner {
                classroom_id: classroom_id.into(),
                announcements,
                uploads,
                auth,
                picker,
                request_timeout,
                machine: Mutex::new(ComposerMachine {
                    state: ComposerState::Collapsed,
                    epoch: 0,
                }),
            }),
        }
    }

    fn machine(&self) -> MutexGuard<'_, ComposerMachine> {
        self.inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ComposerState {
        self.machine().state.clone()
    }

    /// The collapsed prompt; `None` until someone is signed in
    pub fn prompt(&self) -> Option<ComposerPrompt> {
        self.inner.auth.current_user().map(|user| ComposerPrompt {
            avatar: user.image,
            label: PROMPT_LABEL,
        })
    }

    pub fn expand(&self) {
        let mut machine = self.machine();
        if machine.state.is_collapsed() {
            debug!(classroom_id = %self.inner.classroom_id, "Expanding composer");
            machine.state = ComposerState::Expanded(Draft::default());
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        match &mut self.machine().state {
            ComposerState::Expanded(draft) | ComposerState::PickerOpen(draft) => {
                draft.text = text.into();
            }
            ComposerState::Collapsed | ComposerState::Posting(_) => {}
        }
    }

    pub fn open_picker(&self) {
        let mut machine = self.machine();
        machine.state = match std::mem::take(&mut machine.state) {
            ComposerState::Expanded(draft) => {
                debug!("Opening upload picker");
                ComposerState::PickerOpen(draft)
            }
            other => other,
        };
    }

    /// Closes the picker; staged attachments stay on the draft
    pub fn close_picker(&self) {
        let mut machine = self.machine();
        Self::close_picker_locked(&mut machine);
    }

    /// Discards the draft, including anything still uploading or posting
    pub fn cancel(&self) {
        let mut machine = self.machine();
        if machine.state.is_collapsed() {
            return;
        }
        info!(
            classroom_id = %self.inner.classroom_id,
            epoch = machine.epoch,
            "Composer cancelled, draft discarded"
        );
        machine.discard_draft();
    }

    /// Upload service callback: stages resolved files in the order reported
    ///
    /// Files landing while a post is in flight are not part of it; they stay
    /// staged on the draft that follows.
    pub fn on_upload_done(&self, files: Vec<UploadedFile>) {
        let mut machine = self.machine();
        let Some(draft) = machine.state.draft_mut() else {
            debug!("Upload finished with no draft, ignoring");
            return;
        };
        for file in files {
            draft.stage(file);
        }
        if self.inner.picker.close_on_complete && draft.uploads_in_flight == 0 {
            Self::close_picker_locked(&mut machine);
        }
    }

    /// Upload service callback: shows the error, staged files are untouched
    pub fn on_upload_error(&self, error: UploadError) {
        if let Some(draft) = self.machine().state.draft_mut() {
            warn!(error = %error, "Upload failed");
            draft.error = Some(error.into());
        }
    }

    /// Validates a pick and uploads the accepted files concurrently
    ///
    /// Each file is staged as soon as its own upload finishes, so attachments
    /// land in completion order rather than pick order. Returns `None` if the
    /// picker is not open.
    #[instrument(skip(self, files), fields(classroom_id = %self.inner.classroom_id, picked = files.len()))]
    pub async fn upload(&self, files: Vec<LocalFile>) -> Option<UploadReport> {
        let mut report = UploadReport::default();
        let (epoch, accepted) = {
            let mut machine = self.machine();
            let epoch = machine.epoch;
            let ComposerState::PickerOpen(draft) = &mut machine.state else {
                debug!("Upload requested while the picker is closed");
                return None;
            };

            let validation = match self.inner.picker.validate_pick(files) {
                Ok(validation) => validation,
                Err(e) => {
                    warn!(error = %e, "Pick refused");
                    if let UploadError::TooManyFiles { count, .. } = e {
                        report.rejected = count;
                    }
                    draft.error = Some(e.into());
                    return Some(report);
                }
            };

            report.rejected = validation.rejected.len();
            if let Some(e) = validation.rejected.into_iter().last() {
                draft.error = Some(e.into());
            }
            draft.uploads_in_flight += validation.accepted.len();
            (epoch, validation.accepted)
        };

        let mut pending: FuturesUnordered<_> = accepted
            .into_iter()
            .map(|file| {
                let uploads = self.inner.uploads.clone();
                async move {
                    let result = uploads.upload(&file).await;
                    (file, result)
                }
            })
            .collect();

        while let Some((file, result)) = pending.next().await {
            let applied = self.finish_upload(epoch, &file, result.clone());
            match (applied, result) {
                (false, _) => report.discarded += 1,
                (true, Ok(_)) => report.staged += 1,
                (true, Err(_)) => report.failed += 1,
            }
        }

        info!(
            staged = report.staged,
            failed = report.failed,
            rejected = report.rejected,
            discarded = report.discarded,
            "Upload batch finished"
        );
        Some(report)
    }

    /// Applies one upload result; false if the draft it belonged to is gone
    fn finish_upload(
        &self,
        epoch: u64,
        file: &LocalFile,
        result: Result<UploadedFile, UploadError>,
    ) -> bool {
        let mut machine = self.machine();
        if machine.epoch != epoch {
            debug!(name = %file.name, "Dropping upload for a discarded draft");
            return false;
        }
        let Some(draft) = machine.state.draft_mut() else {
            return false;
        };

        draft.uploads_in_flight = draft.uploads_in_flight.saturating_sub(1);
        match result {
            Ok(uploaded) => draft.stage(uploaded),
            Err(e) => {
                warn!(name = %file.name, error = %e, "Upload failed");
                draft.error = Some(e.into());
            }
        }

        if self.inner.picker.close_on_complete && draft.uploads_in_flight == 0 {
            Self::close_picker_locked(&mut machine);
        }
        true
    }

    /// Posts the draft to the classroom
    #[instrument(skip(self), fields(classroom_id = %self.inner.classroom_id))]
    pub async fn post(&self) -> PostOutcome {
        let (epoch, sent, request) = {
            let mut machine = self.machine();
            let epoch = machine.epoch;
            let ComposerState::Expanded(draft) = &mut machine.state else {
                debug!("Post requested while the composer is not expanded");
                return PostOutcome::NotReady;
            };

            let user = self.inner.auth.current_user();
            let refusal = if draft.uploads_in_flight > 0 {
                Err(ComposerError::UploadsPending)
            } else if draft.is_empty() {
                Err(ComposerError::EmptyAnnouncement)
            } else {
                user.ok_or(ComposerError::Unauthenticated)
            };
            let user = match refusal {
                Ok(user) => user,
                Err(error) => {
                    debug!(error = %error, "Post refused");
                    draft.error = Some(error.clone());
                    return PostOutcome::Invalid(error);
                }
            };
            draft.error = None;
            let request = NewAnnouncement::new(
                user.id,
                self.inner.classroom_id.as_str(),
                &draft.text,
                &draft.urls(),
            );
            let sent = draft.attachments.len();
            let draft = std::mem::take(draft);
            machine.state = ComposerState::Posting(draft);
            (epoch, sent, request)
        };

        info!(
            has_text = request.text.is_some(),
            has_links = request.links.is_some(),
            "Posting announcement"
        );

        let call = self.inner.announcements.create_announcement(request);
        let result = match timeout(self.inner.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout),
        };

        let mut machine = self.machine();
        if machine.epoch != epoch || !matches!(machine.state, ComposerState::Posting(_)) {
            debug!("Dropping post result for a discarded draft");
            return PostOutcome::Discarded;
        }

        match result {
            Ok(created) => {
                info!("Announcement posted");
                let late = match std::mem::take(&mut machine.state) {
                    ComposerState::Posting(mut draft) => {
                        draft.attachments.split_off(sent.min(draft.attachments.len()))
                    }
                    _ => Vec::new(),
                };
                machine.discard_draft();
                if !late.is_empty() {
                    info!(carried = late.len(), "Keeping attachments staged during the post");
                    machine.state = ComposerState::Expanded(Draft {
                        attachments: late,
                        ..Draft::default()
                    });
                }
                PostOutcome::Posted(created)
            }
            Err(e) => {
                warn!(error = %e, "Posting announcement failed");
                let message = e.to_string();
                if let ComposerState::Posting(mut draft) = std::mem::take(&mut machine.state) {
                    draft.error = Some(ComposerError::Post(message.clone()));
                    machine.state = ComposerState::Expanded(draft);
                }
                PostOutcome::Failed(message)
            }
        }
    }

    fn close_picker_locked(machine: &mut ComposerMachine) {
        machine.state = match std::mem::take(&mut machine.state) {
            ComposerState::PickerOpen(draft) => {
                debug!(staged = draft.attachments.len(), "Closing upload picker");
                ComposerState::Expanded(draft)
            }
            other => other,
        };
    }
}
