//! GPX Tools engine: job engine client, upload submitter and poll scheduler.
mod client;
mod engine;
mod error;
mod persist;
mod poll;
mod routes;
mod scheduler;
mod submit;
mod types;

pub use client::{ClientSettings, JobEngineClient, ReqwestJobClient, FILE_FIELD};
pub use engine::{EngineConfig, EngineHandle};
pub use error::{EngineError, SubmissionError, TransportError};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{start_polling, PollHandle, PollSink};
pub use routes::{BackendRoutes, DEFAULT_ROUTE_PREFIX};
pub use scheduler::{
    Backoff, CheckVerdict, PollPhase, PollPolicy, PollScheduler, TickAction,
    DEFAULT_POLL_INTERVAL,
};
pub use submit::UploadSubmitter;
pub use types::{
    Artifact, AttemptOutcome, EngineEvent, GpxUpload, JobId, PollAttempt, PollOutcome,
    StatusCheck, Ticket,
};
