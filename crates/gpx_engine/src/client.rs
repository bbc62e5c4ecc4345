use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{
    Artifact, BackendRoutes, EngineError, GpxUpload, JobId, StatusCheck, TransportError,
};

/// Multipart field the intake endpoint reads the upload from.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub routes: BackendRoutes,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientSettings {
    pub fn new(backend_base: Url) -> Self {
        Self {
            routes: BackendRoutes::new(backend_base),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The job engine as seen from the client.
#[async_trait::async_trait]
pub trait JobEngineClient: Send + Sync {
    /// Sends one multipart upload to the intake endpoint.
    async fn submit_upload(&self, upload: &GpxUpload) -> Result<JobId, TransportError>;

    /// Asks once whether the job's artifact is ready. Never fails: errors
    /// come back as [`StatusCheck::TransientError`].
    async fn check_status(&self, job_id: &JobId) -> StatusCheck;

    async fn healthcheck(&self) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobClient {
    client: reqwest::Client,
    routes: BackendRoutes,
}

impl ReqwestJobClient {
    pub fn new(settings: ClientSettings) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(EngineError::Client)?;
        Ok(Self {
            client,
            routes: settings.routes,
        })
    }

    pub fn routes(&self) -> &BackendRoutes {
        &self.routes
    }
}

#[derive(Debug, Deserialize)]
struct IntakeResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[async_trait::async_trait]
impl JobEngineClient for ReqwestJobClient {
    async fn submit_upload(&self, upload: &GpxUpload) -> Result<JobId, TransportError> {
        let url = self.routes.intake()?;
        let part = Part::stream_with_length(upload.contents.clone(), upload.contents.len() as u64)
            .file_name(upload.file_name.clone());
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest)?;
        let parsed: IntakeResponse = serde_json::from_slice(&body)?;
        match parsed.id {
            Some(id) if !id.trim().is_empty() => Ok(JobId::new(id)),
            _ => Err(TransportError::MissingId),
        }
    }

    async fn check_status(&self, job_id: &JobId) -> StatusCheck {
        let url = match self.routes.status(job_id) {
            Ok(url) => url,
            Err(err) => return StatusCheck::TransientError(err.to_string()),
        };
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                return StatusCheck::TransientError(TransportError::from_reqwest(err).to_string())
            }
        };

        // The engine answers 404 until the map exists.
        if !response.status().is_success() {
            return StatusCheck::Pending;
        }

        match response.bytes().await {
            Ok(body) => interpret_status_body(&body),
            Err(err) => StatusCheck::TransientError(TransportError::from_reqwest(err).to_string()),
        }
    }

    async fn healthcheck(&self) -> Result<(), TransportError> {
        let url = self.routes.healthcheck()?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest)?;
        let health: HealthResponse = serde_json::from_slice(&body)?;
        if health.status.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(TransportError::Unhealthy(health.status))
        }
    }
}

/// Classifies a 2xx status body.
///
/// A non-empty JSON string is the artifact. `null`, an empty string, or an
/// object whose `status` is `pending`/`processing` mean "not yet". Anything
/// else is a malformed body.
fn interpret_status_body(body: &[u8]) -> StatusCheck {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => return StatusCheck::TransientError(TransportError::from(err).to_string()),
    };
    match value {
        Value::String(html) if !html.trim().is_empty() => StatusCheck::Ready(Artifact { html }),
        Value::String(_) | Value::Null => StatusCheck::Pending,
        Value::Object(fields) => match fields.get("status").and_then(Value::as_str) {
            Some(state)
                if state.eq_ignore_ascii_case("pending")
                    || state.eq_ignore_ascii_case("processing") =>
            {
                StatusCheck::Pending
            }
            _ => StatusCheck::TransientError("unexpected object in status body".to_string()),
        },
        other => StatusCheck::TransientError(format!("unexpected status body: {other}")),
    }
}
