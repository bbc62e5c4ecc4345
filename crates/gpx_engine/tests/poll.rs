use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gpx_engine::{
    start_polling, Artifact, AttemptOutcome, Backoff, ClientSettings, GpxUpload,
    JobEngineClient, JobId, PollAttempt, PollOutcome, PollPolicy, PollSink, ReqwestJobClient,
    StatusCheck, TransportError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Notify;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TICK: Duration = Duration::from_millis(20);

#[derive(Default)]
struct RecordingSink {
    attempts: Mutex<Vec<PollAttempt>>,
    finished: Mutex<Vec<PollOutcome>>,
}

impl RecordingSink {
    fn outcomes(&self) -> Vec<AttemptOutcome> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|attempt| attempt.outcome.clone())
            .collect()
    }

    fn attempt_numbers(&self) -> Vec<u32> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|attempt| attempt.attempt)
            .collect()
    }

    fn finished(&self) -> Vec<PollOutcome> {
        self.finished.lock().unwrap().clone()
    }
}

impl PollSink for RecordingSink {
    fn attempt(&self, attempt: PollAttempt) {
        self.attempts.lock().unwrap().push(attempt);
    }

    fn finished(&self, _job_id: &JobId, outcome: &PollOutcome) {
        self.finished.lock().unwrap().push(outcome.clone());
    }
}

fn http_client(server: &MockServer) -> Arc<dyn JobEngineClient> {
    let settings = ClientSettings::new(Url::parse(&server.uri()).unwrap());
    Arc::new(ReqwestJobClient::new(settings).unwrap())
}

fn map() -> Artifact {
    Artifact {
        html: "<div>map</div>".to_string(),
    }
}

async fn status_requests(server: &MockServer, job: &str) -> usize {
    let wanted = format!("/map/{job}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == wanted)
        .count()
}

#[tokio::test]
async fn stops_after_first_ready_check() {
    gpx_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/abc123"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/map/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("<div>map</div>")))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let handle = start_polling(
        http_client(&server),
        JobId::new("abc123"),
        PollPolicy::fixed(TICK),
        sink.clone(),
    );

    assert_eq!(handle.finished().await, PollOutcome::Ready(map()));

    // Give a stray tick every chance to fire.
    tokio::time::sleep(TICK * 5).await;
    assert_eq!(status_requests(&server, "abc123").await, 4);
    assert_eq!(
        sink.outcomes(),
        vec![
            AttemptOutcome::Pending,
            AttemptOutcome::Pending,
            AttemptOutcome::Pending,
            AttemptOutcome::Ready,
        ]
    );
    assert_eq!(sink.attempt_numbers(), vec![1, 2, 3, 4]);
    assert_eq!(sink.finished(), vec![PollOutcome::Ready(map())]);
}

#[tokio::test]
async fn transient_errors_do_not_stop_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ truncated"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/map/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("<div>map</div>")))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let handle = start_polling(
        http_client(&server),
        JobId::new("flaky"),
        PollPolicy::fixed(TICK),
        sink.clone(),
    );

    assert_eq!(handle.finished().await, PollOutcome::Ready(map()));
    let outcomes = sink.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], AttemptOutcome::TransientError(_)));
    assert!(matches!(outcomes[1], AttemptOutcome::TransientError(_)));
    assert_eq!(outcomes[2], AttemptOutcome::Ready);
}

#[tokio::test]
async fn pending_indicator_and_empty_bodies_keep_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/slow-job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "pending" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/map/slow-job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/map/slow-job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("<div>map</div>")))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let handle = start_polling(
        http_client(&server),
        JobId::new("slow-job"),
        PollPolicy::fixed(TICK),
        sink.clone(),
    );

    assert_eq!(handle.finished().await, PollOutcome::Ready(map()));
    assert_eq!(
        sink.outcomes(),
        vec![
            AttemptOutcome::Pending,
            AttemptOutcome::Pending,
            AttemptOutcome::Ready,
        ]
    );
}

#[tokio::test]
async fn attempt_budget_ends_in_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/stuck"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let policy = PollPolicy {
        max_attempts: Some(3),
        ..PollPolicy::fixed(TICK)
    };
    let handle = start_polling(http_client(&server), JobId::new("stuck"), policy, sink.clone());

    assert_eq!(
        handle.finished().await,
        PollOutcome::TimedOut { attempts: 3 }
    );
    tokio::time::sleep(TICK * 4).await;
    assert_eq!(status_requests(&server, "stuck").await, 3);
    assert_eq!(sink.finished(), vec![PollOutcome::TimedOut { attempts: 3 }]);
}

#[tokio::test]
async fn ids_are_sent_as_a_single_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/map/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("<div>map</div>")))
        .expect(1)
        .mount(&server)
        .await;

    let handle = start_polling(
        http_client(&server),
        JobId::new("a/b"),
        PollPolicy::fixed(TICK),
        Arc::new(RecordingSink::default()),
    );
    assert_eq!(handle.finished().await, PollOutcome::Ready(map()));
}

/// Answers slowly and records how many checks overlap.
struct SlowClient {
    delay: Duration,
    ready_on: u32,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowClient {
    fn new(delay: Duration, ready_on: u32) -> Self {
        Self {
            delay,
            ready_on,
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl JobEngineClient for SlowClient {
    async fn submit_upload(&self, _upload: &GpxUpload) -> Result<JobId, TransportError> {
        Err(TransportError::MissingId)
    }

    async fn check_status(&self, _job_id: &JobId) -> StatusCheck {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if call >= self.ready_on {
            StatusCheck::Ready(map())
        } else {
            StatusCheck::Pending
        }
    }

    async fn healthcheck(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test]
async fn slow_checks_never_overlap() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(60), 3));
    let sink = Arc::new(RecordingSink::default());

    // Ticks fire every 10ms while each check takes 60ms.
    let handle = start_polling(
        client.clone(),
        JobId::new("busy"),
        PollPolicy::fixed(Duration::from_millis(10)),
        sink.clone(),
    );

    assert_eq!(handle.finished().await, PollOutcome::Ready(map()));
    assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    assert_eq!(sink.attempt_numbers(), vec![1, 2, 3]);
}

/// Blocks every check until released.
#[derive(Default)]
struct GatedClient {
    calls: AtomicU32,
    started: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl JobEngineClient for GatedClient {
    async fn submit_upload(&self, _upload: &GpxUpload) -> Result<JobId, TransportError> {
        Err(TransportError::MissingId)
    }

    async fn check_status(&self, _job_id: &JobId) -> StatusCheck {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        StatusCheck::Ready(map())
    }

    async fn healthcheck(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test]
async fn cancelled_schedule_discards_the_outstanding_check() {
    let client = Arc::new(GatedClient::default());
    let sink = Arc::new(RecordingSink::default());
    let handle = start_polling(
        client.clone(),
        JobId::new("gone"),
        PollPolicy::fixed(TICK),
        sink.clone(),
    );

    client.started.notified().await;
    handle.cancel();
    client.release.notify_waiters();

    assert_eq!(handle.finished().await, PollOutcome::Cancelled);
    tokio::time::sleep(TICK * 4).await;
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert!(sink.outcomes().is_empty());
    assert!(sink.finished().is_empty());
}

#[tokio::test]
async fn dropping_the_handle_cancels() {
    let client = Arc::new(GatedClient::default());
    let sink = Arc::new(RecordingSink::default());
    let handle = start_polling(
        client.clone(),
        JobId::new("dropped"),
        PollPolicy::fixed(TICK),
        sink.clone(),
    );

    client.started.notified().await;
    drop(handle);
    client.release.notify_waiters();

    tokio::time::sleep(TICK * 4).await;
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert!(sink.finished().is_empty());
}

#[tokio::test]
async fn exponential_backoff_still_terminates() {
    let client = Arc::new(SlowClient::new(Duration::from_millis(1), 3));
    let sink = Arc::new(RecordingSink::default());
    let policy = PollPolicy {
        interval: Duration::from_millis(5),
        backoff: Backoff::Exponential {
            factor: 2,
            max_interval: Duration::from_millis(15),
        },
        max_attempts: None,
    };

    let handle = start_polling(client.clone(), JobId::new("backoff"), policy, sink.clone());

    assert_eq!(handle.finished().await, PollOutcome::Ready(map()));
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
}
