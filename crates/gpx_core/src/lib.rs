//! GPX Tools core: pure upload/poll state machine, view model and session gate.
mod effect;
mod error;
mod fragment;
mod gate;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::SubmissionError;
pub use fragment::TrustedFragment;
pub use gate::{
    AllowRule, GateDecision, GateRequest, NonEmptyToken, OpenGate, SessionGate, TokenGate,
    TokenValidator, CALLBACK_PARAM, SIGN_IN_PATH,
};
pub use msg::{AttemptOutcome, Msg, PollResult};
pub use state::{AppState, FailureReason, GpxFile, JobId, JobStatus, Notice, Ticket, UploadJob};
pub use update::update;
pub use view_model::{AppViewModel, RenderMode};
