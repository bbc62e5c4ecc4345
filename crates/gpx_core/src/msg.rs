use crate::{GpxFile, JobId, SubmissionError, Ticket, TrustedFragment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a file (or cleared the selection).
    FileSelected(Option<GpxFile>),
    /// User clicked Upload.
    SubmitClicked,
    /// Intake endpoint answered (or failed) for the submission `ticket`.
    SubmissionFinished {
        ticket: Ticket,
        result: Result<JobId, SubmissionError>,
    },
    /// One poll tick completed without ending the schedule.
    PollAttempted {
        ticket: Ticket,
        attempt: u32,
        outcome: AttemptOutcome,
    },
    /// The poll scheduler reached a terminal state.
    PollFinished { ticket: Ticket, result: PollResult },
    /// User restarts the flow from scratch.
    ResetClicked,
    /// The view is going away; stop everything in flight.
    Teardown,
    /// User acknowledged the blocking prompt.
    NoticeDismissed,
    /// Render tick.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Outcome of a single non-terminal status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    TransientError(String),
}

/// Terminal outcome of a poll schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Ready(TrustedFragment),
    TimedOut { attempts: u32 },
}
