use std::sync::{mpsc, Arc};
use std::time::Duration;

use gpx_logging::gpx_info;
use tokio::runtime::Runtime;

use crate::client::{ClientSettings, JobEngineClient, ReqwestJobClient};
use crate::poll::{spawn_polling, PollHandle, PollSink};
use crate::scheduler::PollPolicy;
use crate::submit::UploadSubmitter;
use crate::{
    EngineError, EngineEvent, GpxUpload, JobId, PollAttempt, PollOutcome, Ticket, TransportError,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub client: ClientSettings,
    pub poll: PollPolicy,
}

/// Runs submissions and poll schedules on an owned Tokio runtime and hands
/// their results back over a channel, so callers can stay synchronous.
pub struct EngineHandle {
    runtime: Runtime,
    client: Arc<dyn JobEngineClient>,
    policy: PollPolicy,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = ReqwestJobClient::new(config.client)?;
        Self::with_client(Arc::new(client), config.poll)
    }

    pub fn with_client(
        client: Arc<dyn JobEngineClient>,
        policy: PollPolicy,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gpx-engine")
            .enable_all()
            .build()?;
        let (event_tx, event_rx) = mpsc::channel();
        Ok(Self {
            runtime,
            client,
            policy,
            event_tx,
            event_rx,
        })
    }

    /// Submits `upload` once; the result arrives as
    /// [`EngineEvent::SubmissionCompleted`].
    pub fn submit(&self, ticket: Ticket, upload: Option<GpxUpload>) {
        let submitter = UploadSubmitter::new(self.client.clone());
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            let result = submitter.submit(upload.as_ref()).await;
            let _ = event_tx.send(EngineEvent::SubmissionCompleted { ticket, result });
        });
    }

    /// Starts the poll schedule for `job_id`. The caller owns the returned
    /// handle; dropping it stops the schedule.
    pub fn start_polling(&self, ticket: Ticket, job_id: JobId) -> PollHandle {
        let sink = Arc::new(ChannelPollSink {
            ticket,
            tx: self.event_tx.clone(),
        });
        spawn_polling(
            self.runtime.handle(),
            self.client.clone(),
            job_id,
            self.policy,
            sink,
        )
    }

    /// Reports Ctrl-C as [`EngineEvent::Interrupted`].
    pub fn watch_interrupts(&self) {
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                gpx_info!("Interrupt received");
                let _ = event_tx.send(EngineEvent::Interrupted);
            }
        });
    }

    /// Blocking healthcheck against the job engine.
    pub fn healthcheck(&self) -> Result<(), TransportError> {
        self.runtime.block_on(self.client.healthcheck())
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct ChannelPollSink {
    ticket: Ticket,
    tx: mpsc::Sender<EngineEvent>,
}

impl PollSink for ChannelPollSink {
    fn attempt(&self, attempt: PollAttempt) {
        let _ = self.tx.send(EngineEvent::PollAttempted {
            ticket: self.ticket,
            attempt,
        });
    }

    fn finished(&self, job_id: &JobId, outcome: &PollOutcome) {
        let _ = self.tx.send(EngineEvent::PollFinished {
            ticket: self.ticket,
            job_id: job_id.clone(),
            outcome: outcome.clone(),
        });
    }
}
