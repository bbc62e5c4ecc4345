use thiserror::Error;

/// Why a submission did not produce a job id.
///
/// The transport cause is carried as text so messages stay `Clone + Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("transport failure: {cause}")]
    TransportFailure { cause: String },
}
