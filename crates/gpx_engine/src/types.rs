use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Opaque identifier assigned by the intake endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A GPX file ready to be sent as the `file` field of the intake form.
#[derive(Clone, PartialEq, Eq)]
pub struct GpxUpload {
    pub file_name: String,
    pub contents: Bytes,
}

impl GpxUpload {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

impl fmt::Debug for GpxUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpxUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// Terminal output of a completed job: the rendered map as an HTML fragment.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub html: String,
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.html.len())
            .finish()
    }
}

/// Result of one status request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    Pending,
    Ready(Artifact),
    TransientError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Ready,
    TransientError(String),
}

impl From<&StatusCheck> for AttemptOutcome {
    fn from(check: &StatusCheck) -> Self {
        match check {
            StatusCheck::Pending => AttemptOutcome::Pending,
            StatusCheck::Ready(_) => AttemptOutcome::Ready,
            StatusCheck::TransientError(message) => AttemptOutcome::TransientError(message.clone()),
        }
    }
}

/// One scheduled status check, reported once it has resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt {
    pub job_id: JobId,
    /// 1-based count of checks issued for this job.
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

/// How a poll schedule ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(Artifact),
    TimedOut { attempts: u32 },
    Cancelled,
}

/// Tag that ties engine events back to the submission that caused them.
pub type Ticket = u64;

#[derive(Debug)]
pub enum EngineEvent {
    SubmissionCompleted {
        ticket: Ticket,
        result: Result<JobId, crate::SubmissionError>,
    },
    PollAttempted {
        ticket: Ticket,
        attempt: PollAttempt,
    },
    PollFinished {
        ticket: Ticket,
        job_id: JobId,
        outcome: PollOutcome,
    },
    /// Ctrl-C (or the platform equivalent) was received.
    Interrupted,
}
