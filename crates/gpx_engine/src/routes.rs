//! Path indirection between the client and the job engine.
//!
//! Core traffic is addressed as `/backend/...` and rewritten onto the
//! configured backend base URL, so `/backend/map/abc` becomes
//! `<BACKEND_URL>/map/abc`.

use url::Url;

use crate::{JobId, TransportError};

pub const DEFAULT_ROUTE_PREFIX: &str = "/backend";

const INTAKE_PATH: &str = "/gpx";
const STATUS_PATH: &str = "/map";
const HEALTHCHECK_PATH: &str = "/healthcheck";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRoutes {
    prefix: String,
    base: Url,
}

impl BackendRoutes {
    pub fn new(base: Url) -> Self {
        Self {
            prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            base,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let trimmed = prefix.trim().trim_end_matches('/');
        self.prefix = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Maps `<prefix>/<rest>[?query]` onto `<base>/<rest>[?query]`.
    ///
    /// Returns `None` for paths outside the prefix.
    pub fn rewrite(&self, path: &str) -> Option<Url> {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let mut url = self.base.clone();
        let joined = format!("{}{}", self.base.path().trim_end_matches('/'), rest);
        url.set_path(if joined.is_empty() { "/" } else { &joined });
        url.set_query(query);
        Some(url)
    }

    pub fn intake(&self) -> Result<Url, TransportError> {
        self.route(INTAKE_PATH)
    }

    pub fn status(&self, job_id: &JobId) -> Result<Url, TransportError> {
        let mut url = self.route(STATUS_PATH)?;
        if url.cannot_be_a_base() {
            return Err(TransportError::Unroutable(url.to_string()));
        }
        if let Ok(mut segments) = url.path_segments_mut() {
            // Percent-encodes the id as a single segment.
            segments.pop_if_empty().push(job_id.as_str());
        }
        Ok(url)
    }

    pub fn healthcheck(&self) -> Result<Url, TransportError> {
        self.route(HEALTHCHECK_PATH)
    }

    fn route(&self, path: &str) -> Result<Url, TransportError> {
        let routed = format!("{}{}", self.prefix, path);
        self.rewrite(&routed)
            .ok_or(TransportError::Unroutable(routed))
    }
}
