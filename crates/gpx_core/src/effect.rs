use crate::{GpxFile, JobId, Ticket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the file to the intake endpoint, exactly once.
    SubmitUpload { ticket: Ticket, file: GpxFile },
    /// Start the poll scheduler for a freshly assigned job id.
    StartPolling { ticket: Ticket, job_id: JobId },
    /// Stop the poll scheduler started for `ticket`.
    CancelPolling { ticket: Ticket },
}
