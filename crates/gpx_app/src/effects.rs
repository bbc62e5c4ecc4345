use std::time::Duration;

use gpx_core::{AttemptOutcome, Effect, GpxFile, Msg, PollResult, SubmissionError, TrustedFragment};
use gpx_engine::{EngineEvent, EngineHandle, GpxUpload, PollHandle, PollOutcome, Ticket};
use gpx_logging::{gpx_debug, gpx_info};

/// Turns core effects into engine calls and engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    active_poll: Option<(Ticket, PollHandle)>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            active_poll: None,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitUpload { ticket, file } => {
                    gpx_info!(
                        "SubmitUpload ticket={} file={} bytes={}",
                        ticket,
                        file.name(),
                        file.len()
                    );
                    self.engine.submit(ticket, Some(to_upload(&file)));
                }
                Effect::StartPolling { ticket, job_id } => {
                    gpx_info!("StartPolling ticket={} job_id={}", ticket, job_id);
                    // At most one schedule per view.
                    if let Some((_, previous)) = self.active_poll.take() {
                        previous.cancel();
                    }
                    let handle = self
                        .engine
                        .start_polling(ticket, gpx_engine::JobId::new(job_id.as_str()));
                    self.active_poll = Some((ticket, handle));
                }
                Effect::CancelPolling { ticket } => {
                    match self.active_poll.take() {
                        Some((active, handle)) if active == ticket => {
                            gpx_info!("CancelPolling ticket={} job_id={}", ticket, handle.job_id());
                            handle.cancel();
                        }
                        other => self.active_poll = other,
                    }
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine event. Returns `Msg::Tick`
    /// when nothing arrived.
    pub fn next_msg(&self, timeout: Duration) -> Msg {
        match self.engine.recv_timeout(timeout) {
            Some(event) => map_event(event).unwrap_or(Msg::NoOp),
            None => Msg::Tick,
        }
    }
}

/// Maps an engine event onto a core message. Events the core has no use for
/// map to `None`.
pub fn map_event(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::SubmissionCompleted { ticket, result } => Some(Msg::SubmissionFinished {
            ticket,
            result: result
                .map(|job_id| gpx_core::JobId::new(job_id.into_string()))
                .map_err(map_submission_error),
        }),
        EngineEvent::PollAttempted { ticket, attempt } => {
            let outcome = match attempt.outcome {
                gpx_engine::AttemptOutcome::Pending => AttemptOutcome::Pending,
                gpx_engine::AttemptOutcome::TransientError(message) => {
                    AttemptOutcome::TransientError(message)
                }
                // PollFinished follows with the artifact.
                gpx_engine::AttemptOutcome::Ready => return None,
            };
            Some(Msg::PollAttempted {
                ticket,
                attempt: attempt.attempt,
                outcome,
            })
        }
        EngineEvent::PollFinished {
            ticket,
            job_id,
            outcome,
        } => match outcome {
            PollOutcome::Ready(artifact) => Some(Msg::PollFinished {
                ticket,
                result: PollResult::Ready(TrustedFragment::from_job_engine(artifact.html)),
            }),
            PollOutcome::TimedOut { attempts } => Some(Msg::PollFinished {
                ticket,
                result: PollResult::TimedOut { attempts },
            }),
            PollOutcome::Cancelled => {
                gpx_debug!("Polling for job {} cancelled", job_id);
                None
            }
        },
        EngineEvent::Interrupted => Some(Msg::Teardown),
    }
}

fn map_submission_error(err: gpx_engine::SubmissionError) -> SubmissionError {
    match err {
        gpx_engine::SubmissionError::NoFileSelected => SubmissionError::NoFileSelected,
        gpx_engine::SubmissionError::TransportFailure(cause) => SubmissionError::TransportFailure {
            cause: cause.to_string(),
        },
    }
}

fn to_upload(file: &GpxFile) -> GpxUpload {
    GpxUpload::new(file.name(), file.contents().to_vec())
}

#[cfg(test)]
mod tests {
    use gpx_engine::{Artifact, TransportError};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn submission_result_maps_to_core_types() {
        let ok = map_event(EngineEvent::SubmissionCompleted {
            ticket: 3,
            result: Ok(gpx_engine::JobId::new("abc123")),
        });
        assert_eq!(
            ok,
            Some(Msg::SubmissionFinished {
                ticket: 3,
                result: Ok(gpx_core::JobId::new("abc123")),
            })
        );

        let failed = map_event(EngineEvent::SubmissionCompleted {
            ticket: 4,
            result: Err(gpx_engine::SubmissionError::TransportFailure(
                TransportError::HttpStatus(500),
            )),
        });
        assert_eq!(
            failed,
            Some(Msg::SubmissionFinished {
                ticket: 4,
                result: Err(SubmissionError::TransportFailure {
                    cause: "http status 500".to_string(),
                }),
            })
        );
    }

    #[test]
    fn ready_artifact_becomes_trusted_fragment() {
        let msg = map_event(EngineEvent::PollFinished {
            ticket: 1,
            job_id: gpx_engine::JobId::new("abc123"),
            outcome: PollOutcome::Ready(Artifact {
                html: "<div>map</div>".to_string(),
            }),
        });
        assert_eq!(
            msg,
            Some(Msg::PollFinished {
                ticket: 1,
                result: PollResult::Ready(TrustedFragment::from_job_engine("<div>map</div>")),
            })
        );
    }

    #[test]
    fn cancelled_schedule_is_dropped() {
        let msg = map_event(EngineEvent::PollFinished {
            ticket: 1,
            job_id: gpx_engine::JobId::new("abc123"),
            outcome: PollOutcome::Cancelled,
        });
        assert_eq!(msg, None);
    }

    #[test]
    fn interrupt_tears_down() {
        assert_eq!(map_event(EngineEvent::Interrupted), Some(Msg::Teardown));
    }
}
