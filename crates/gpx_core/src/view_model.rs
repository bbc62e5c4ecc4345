use crate::{FailureReason, JobId, JobStatus, Notice, TrustedFragment};

/// Which of the three mutually exclusive screens is shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Upload control (file picker + submit button).
    #[default]
    AwaitingSelection,
    /// Submission or polling in progress.
    AwaitingResult,
    /// The job engine's fragment, rendered verbatim.
    ResultReady(TrustedFragment),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub mode: RenderMode,
    pub status: JobStatus,
    pub file_name: Option<String>,
    pub submit_enabled: bool,
    pub job_id: Option<JobId>,
    pub checks: u32,
    pub notice: Option<Notice>,
    pub last_error: Option<String>,
    pub failure: Option<FailureReason>,
    pub dirty: bool,
}
