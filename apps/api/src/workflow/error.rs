//! Failure taxonomy for submitting and polling vendor workflow runs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A required file was missing, empty, or not decodable at the boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The vendor file store rejected an upload or answered without a file id.
    #[error("Upload failed (HTTP {http_status}): {message}")]
    UploadFailed { http_status: u16, message: String },

    /// The vendor answered with a non-zero code of its own.
    #[error("Vendor rejected the request (code {code}): {message}")]
    VendorRejected {
        code: i64,
        message: String,
        debug_url: Option<String>,
    },

    /// The vendor could not be reached at all.
    #[error("Network error: {0}")]
    Network(String),

    /// Polling stopped before the run reached a terminal state.
    #[error("Workflow still running after {attempts} poll attempts")]
    Timeout { attempts: u32 },
}

impl WorkflowError {
    pub fn debug_url(&self) -> Option<&str> {
        match self {
            WorkflowError::VendorRejected { debug_url, .. } => debug_url.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        WorkflowError::Network(err.to_string())
    }
}
