use std::sync::Arc;

use gpx_logging::{gpx_info, gpx_warn};

use crate::{GpxUpload, JobEngineClient, JobId, SubmissionError};

/// One-shot upload: one request per call, never retried here.
#[derive(Clone)]
pub struct UploadSubmitter {
    client: Arc<dyn JobEngineClient>,
}

impl UploadSubmitter {
    pub fn new(client: Arc<dyn JobEngineClient>) -> Self {
        Self { client }
    }

    pub async fn submit(&self, file: Option<&GpxUpload>) -> Result<JobId, SubmissionError> {
        let Some(file) = file else {
            gpx_warn!("Submit requested without a file; nothing was sent");
            return Err(SubmissionError::NoFileSelected);
        };

        gpx_info!(
            "Submitting {} ({} bytes) to the job engine",
            file.file_name,
            file.contents.len()
        );
        match self.client.submit_upload(file).await {
            Ok(job_id) => {
                gpx_info!("Job engine accepted {} as job {}", file.file_name, job_id);
                Ok(job_id)
            }
            Err(err) => {
                gpx_warn!("Upload of {} failed: {}", file.file_name, err);
                Err(SubmissionError::TransportFailure(err))
            }
        }
    }
}
