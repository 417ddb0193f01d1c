use reqwest::StatusCode;
use thiserror::Error;

use crate::goals::ProgressError;

/// Failure surfaced by the synchronization layer. By the time a caller sees
/// one, the cache has already been rolled back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("goal not found")]
    NotFound,
    #[error("session is no longer valid")]
    Unauthenticated,
    #[error("request failed: {0}")]
    TransientFailure(String),
}

impl SyncError {
    /// Classifies a non-success API response. `body` is the server's message.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let msg = if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body.trim().to_string()
                };
                SyncError::InvalidInput(msg)
            }
            StatusCode::NOT_FOUND => SyncError::NotFound,
            StatusCode::UNAUTHORIZED => SyncError::Unauthenticated,
            _ => SyncError::TransientFailure(format!("{status}: {}", body.trim())),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::TransientFailure(e.to_string())
    }
}

impl From<ProgressError> for SyncError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::InvalidInput(msg) => SyncError::InvalidInput(msg),
        }
    }
}
