use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("response carried no job id")]
    MissingId,
    #[error("route {0} is not served by the backend")]
    Unroutable(String),
    #[error("job engine reports status {0:?}")]
    Unhealthy(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else {
            TransportError::Network(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid backend url: {0}")]
    BackendUrl(#[from] url::ParseError),
}
