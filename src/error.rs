use thiserror::Error;

/// Fatal conditions of a reconciliation run. Dropped hits and empty result
/// sets are logged by the search layer and never surface here.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("failed to write report: {0}")]
    OutputWriteFailure(#[from] std::io::Error),
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
