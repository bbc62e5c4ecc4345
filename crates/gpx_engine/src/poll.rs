use std::sync::Arc;

use chrono::Utc;
use futures_util::future::BoxFuture;
use gpx_logging::{gpx_debug, gpx_info, gpx_warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{CheckVerdict, PollPolicy, PollScheduler, TickAction};
use crate::{AttemptOutcome, JobEngineClient, JobId, PollAttempt, PollOutcome, StatusCheck};

/// Receives the progress of one poll schedule.
pub trait PollSink: Send + Sync {
    fn attempt(&self, attempt: PollAttempt);
    /// Called once, for `Ready` or `TimedOut`. Never called after cancellation.
    fn finished(&self, job_id: &JobId, outcome: &PollOutcome);
}

/// Owned handle to a running poll schedule.
///
/// Dropping the handle cancels the schedule.
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stops all future checks. A check already in flight is dropped and its
    /// result never reaches the sink.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the schedule to end.
    pub async fn finished(mut self) -> PollOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Cancelled),
            None => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts polling `job_id` on the current Tokio runtime.
///
/// Must be called from within a Tokio runtime.
pub fn start_polling(
    client: Arc<dyn JobEngineClient>,
    job_id: JobId,
    policy: PollPolicy,
    sink: Arc<dyn PollSink>,
) -> PollHandle {
    spawn_polling(&Handle::current(), client, job_id, policy, sink)
}

pub(crate) fn spawn_polling(
    runtime: &Handle,
    client: Arc<dyn JobEngineClient>,
    job_id: JobId,
    policy: PollPolicy,
    sink: Arc<dyn PollSink>,
) -> PollHandle {
    let cancel = CancellationToken::new();
    gpx_info!(
        "Polling job {} every {:?} (max attempts: {:?})",
        job_id,
        policy.interval,
        policy.max_attempts
    );
    let task = runtime.spawn(drive(
        client,
        job_id.clone(),
        PollScheduler::new(policy),
        sink,
        cancel.clone(),
    ));
    PollHandle {
        job_id,
        cancel,
        task: Some(task),
    }
}

type InFlight = Option<BoxFuture<'static, StatusCheck>>;

async fn drive(
    client: Arc<dyn JobEngineClient>,
    job_id: JobId,
    mut scheduler: PollScheduler,
    sink: Arc<dyn PollSink>,
    cancel: CancellationToken,
) -> PollOutcome {
    let mut next_tick = Box::pin(tokio::time::sleep(scheduler.next_delay()));
    let mut in_flight: InFlight = None;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                scheduler.cancel();
                if in_flight.is_some() {
                    gpx_debug!("Poll for job {} cancelled; dropping the outstanding check", job_id);
                } else {
                    gpx_debug!("Poll for job {} cancelled", job_id);
                }
                return PollOutcome::Cancelled;
            }

            check = wait_for(&mut in_flight) => {
                in_flight = None;
                let attempt = PollAttempt {
                    job_id: job_id.clone(),
                    attempt: scheduler.attempts(),
                    timestamp: Utc::now(),
                    outcome: AttemptOutcome::from(&check),
                };
                log_attempt(&attempt);

                match scheduler.on_check_result(check) {
                    CheckVerdict::Continue => sink.attempt(attempt),
                    CheckVerdict::Delivered(artifact) => {
                        sink.attempt(attempt);
                        return finish(sink.as_ref(), &job_id, PollOutcome::Ready(artifact));
                    }
                    CheckVerdict::TimedOut { attempts } => {
                        sink.attempt(attempt);
                        return finish(sink.as_ref(), &job_id, PollOutcome::TimedOut { attempts });
                    }
                    CheckVerdict::Discarded => {}
                }
            }

            () = &mut next_tick => {
                match scheduler.on_tick() {
                    TickAction::Check { attempt } => {
                        gpx_debug!("Checking job {} (attempt {})", job_id, attempt);
                        let client = client.clone();
                        let id = job_id.clone();
                        in_flight = Some(Box::pin(async move { client.check_status(&id).await }));
                    }
                    TickAction::SkipInFlight => {
                        gpx_debug!("Tick for job {} skipped; previous check still in flight", job_id);
                    }
                    TickAction::Exhausted { attempts } => {
                        return finish(sink.as_ref(), &job_id, PollOutcome::TimedOut { attempts });
                    }
                    TickAction::Stopped => return PollOutcome::Cancelled,
                }
                next_tick.as_mut().reset(Instant::now() + scheduler.next_delay());
            }
        }
    }
}

async fn wait_for(slot: &mut InFlight) -> StatusCheck {
    match slot.as_mut() {
        Some(check) => check.await,
        None => std::future::pending().await,
    }
}

fn log_attempt(attempt: &PollAttempt) {
    match &attempt.outcome {
        AttemptOutcome::Pending => gpx_debug!(
            "Job {} not ready after attempt {}",
            attempt.job_id,
            attempt.attempt
        ),
        AttemptOutcome::Ready => gpx_info!(
            "Job {} ready after {} attempt(s)",
            attempt.job_id,
            attempt.attempt
        ),
        AttemptOutcome::TransientError(message) => gpx_warn!(
            "Transient error polling job {} (attempt {}): {}",
            attempt.job_id,
            attempt.attempt,
            message
        ),
    }
}

fn finish(sink: &dyn PollSink, job_id: &JobId, outcome: PollOutcome) -> PollOutcome {
    if let PollOutcome::TimedOut { attempts } = &outcome {
        gpx_warn!("Gave up on job {} after {} attempt(s)", job_id, attempts);
    }
    sink.finished(job_id, &outcome);
    outcome
}
