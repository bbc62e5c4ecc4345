use std::fmt;
use std::sync::Arc;

use crate::view_model::{AppViewModel, RenderMode};
use crate::{SubmissionError, TrustedFragment};

/// Identifies one submission attempt. Engine messages carry the ticket they
/// were started with; anything not matching the current ticket is stale.
pub type Ticket = u64;

/// Opaque job identifier handed out by the intake endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user-selected GPX payload.
#[derive(Clone, PartialEq, Eq)]
pub struct GpxFile {
    name: String,
    contents: Arc<[u8]>,
}

impl GpxFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl fmt::Debug for GpxFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpxFile")
            .field("name", &self.name)
            .field("len", &self.contents.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Submitting,
    Polling,
    Complete,
    Failed,
}

/// Why a job with an id ended without a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    TimedOut { attempts: u32 },
}

/// Blocking prompt shown to the user until dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoFileSelected,
}

// Each variant carries exactly the fields that may be set in that status,
// so `job_id`/`result` can never disagree with the status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Submitting,
    Polling {
        job_id: JobId,
    },
    Complete {
        job_id: JobId,
        result: TrustedFragment,
    },
    Failed {
        job_id: JobId,
        reason: FailureReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadJob {
    file: Option<GpxFile>,
    phase: Phase,
}

impl UploadJob {
    pub fn file(&self) -> Option<&GpxFile> {
        self.file.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        match self.phase {
            Phase::Idle => JobStatus::Idle,
            Phase::Submitting => JobStatus::Submitting,
            Phase::Polling { .. } => JobStatus::Polling,
            Phase::Complete { .. } => JobStatus::Complete,
            Phase::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match &self.phase {
            Phase::Idle | Phase::Submitting => None,
            Phase::Polling { job_id }
            | Phase::Complete { job_id, .. }
            | Phase::Failed { job_id, .. } => Some(job_id),
        }
    }

    pub fn result(&self) -> Option<&TrustedFragment> {
        match &self.phase {
            Phase::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.phase {
            Phase::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Submit is only allowed with a file in hand and nothing in progress.
    pub fn can_submit(&self) -> bool {
        self.file.is_some() && matches!(self.phase, Phase::Idle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    upload: UploadJob,
    ticket: Ticket,
    checks: u32,
    notice: Option<Notice>,
    last_error: Option<String>,
    torn_down: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&self) -> &UploadJob {
        &self.upload
    }

    /// Ticket of the most recent submission, if any was made.
    pub fn current_ticket(&self) -> Option<Ticket> {
        (self.ticket > 0).then_some(self.ticket)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn view(&self) -> AppViewModel {
        let mode = match &self.upload.phase {
            Phase::Idle | Phase::Failed { .. } => RenderMode::AwaitingSelection,
            Phase::Submitting | Phase::Polling { .. } => RenderMode::AwaitingResult,
            Phase::Complete { result, .. } => RenderMode::ResultReady(result.clone()),
        };
        AppViewModel {
            mode,
            status: self.upload.status(),
            file_name: self.upload.file().map(|file| file.name().to_string()),
            submit_enabled: self.upload.can_submit() && !self.torn_down,
            job_id: self.upload.job_id().cloned(),
            checks: self.checks,
            notice: self.notice,
            last_error: self.last_error.clone(),
            failure: self.upload.failure().cloned(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        !self.torn_down && self.ticket != 0 && ticket == self.ticket
    }

    pub(crate) fn select_file(&mut self, file: Option<GpxFile>) {
        self.upload.file = file;
        if self.upload.file.is_some() {
            self.notice = None;
        }
        self.mark_dirty();
    }

    pub(crate) fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn dismiss_notice(&mut self) {
        if self.notice.take().is_some() {
            self.mark_dirty();
        }
    }

    /// Idle -> Submitting. Returns the new ticket and the file to send.
    pub(crate) fn begin_submission(&mut self) -> Option<(Ticket, GpxFile)> {
        if !self.upload.can_submit() {
            return None;
        }
        let file = self.upload.file.clone()?;
        self.ticket += 1;
        self.upload.phase = Phase::Submitting;
        self.last_error = None;
        self.notice = None;
        self.mark_dirty();
        Some((self.ticket, file))
    }

    /// Submitting -> Polling.
    pub(crate) fn accept_job_id(&mut self, job_id: JobId) -> bool {
        if !matches!(self.upload.phase, Phase::Submitting) {
            return false;
        }
        self.upload.phase = Phase::Polling { job_id };
        self.checks = 0;
        self.mark_dirty();
        true
    }

    /// Submitting -> Idle, nothing stored but the diagnostic.
    pub(crate) fn reject_submission(&mut self, error: SubmissionError) {
        if !matches!(self.upload.phase, Phase::Submitting) {
            return;
        }
        self.upload.phase = Phase::Idle;
        match error {
            SubmissionError::NoFileSelected => self.notice = Some(Notice::NoFileSelected),
            SubmissionError::TransportFailure { cause } => self.last_error = Some(cause),
        }
        self.mark_dirty();
    }

    pub(crate) fn record_check(&mut self, attempt: u32) {
        if matches!(self.upload.phase, Phase::Polling { .. }) && attempt > self.checks {
            self.checks = attempt;
            self.mark_dirty();
        }
    }

    /// Polling -> Complete.
    pub(crate) fn complete(&mut self, result: TrustedFragment) {
        if let Phase::Polling { job_id } = &self.upload.phase {
            let job_id = job_id.clone();
            self.upload.phase = Phase::Complete { job_id, result };
            self.mark_dirty();
        }
    }

    /// Polling -> Failed.
    pub(crate) fn fail(&mut self, reason: FailureReason) {
        if let Phase::Polling { job_id } = &self.upload.phase {
            let job_id = job_id.clone();
            self.upload.phase = Phase::Failed { job_id, reason };
            self.mark_dirty();
        }
    }

    /// Back to a fresh Idle job. Returns the ticket whose polling must stop.
    pub(crate) fn reset(&mut self) -> Option<Ticket> {
        let to_cancel = self.polling_ticket();
        self.upload = UploadJob::default();
        // Bump so that anything still in flight for the old flow is stale.
        self.ticket += 1;
        self.checks = 0;
        self.notice = None;
        self.last_error = None;
        self.mark_dirty();
        to_cancel
    }

    /// Marks the view as gone. Returns the ticket whose polling must stop.
    pub(crate) fn teardown(&mut self) -> Option<Ticket> {
        let to_cancel = self.polling_ticket();
        self.torn_down = true;
        to_cancel
    }

    fn polling_ticket(&self) -> Option<Ticket> {
        match self.upload.phase {
            Phase::Polling { .. } if !self.torn_down => Some(self.ticket),
            _ => None,
        }
    }
}
