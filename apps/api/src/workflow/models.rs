use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::SlotNames;

pub const DEFAULT_RESUME_NAME: &str = "resume.pdf";
pub const DEFAULT_RESUME_MIME: &str = "application/pdf";
pub const DEFAULT_JD_NAME: &str = "jd.jpg";
pub const DEFAULT_JD_MIME: &str = "image/jpeg";

/// One binary handed to the vendor file store. Lives for a single upload call.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub filename: String,
    pub mime_type: String,
}

/// Opaque vendor file id, valid for one workflow submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub id: String,
}

/// A decoded file as received at the caller-facing boundary. Name and MIME
/// type fall back to per-slot defaults when absent.
#[derive(Debug, Clone, Default)]
pub struct FilePayload {
    pub data: Bytes,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
}

impl FilePayload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn into_upload(self, default_name: &str, default_mime: &str) -> UploadRequest {
        UploadRequest {
            data: self.data,
            filename: non_blank(self.filename).unwrap_or_else(|| default_name.to_string()),
            mime_type: non_blank(self.mime_type).unwrap_or_else(|| default_mime.to_string()),
        }
    }
}

/// Input to one `Submitter::submit` call.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFiles {
    pub resume: FilePayload,
    pub jd: FilePayload,
    pub instruction: Option<String>,
}

/// Built immediately before the execution request; never persisted.
#[derive(Debug, Clone)]
pub struct WorkflowSubmission {
    pub workflow_id: String,
    pub resume: FileReference,
    pub jd: FileReference,
    pub instruction_text: String,
}

/// Wire body of the vendor run endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunRequest {
    pub workflow_id: String,
    pub parameters: Map<String, Value>,
}

impl WorkflowSubmission {
    /// File slots carry a JSON-encoded `{"file_id": ...}` string, the
    /// instruction slot carries plain text.
    pub fn to_run_request(&self, slots: &SlotNames) -> RunRequest {
        let mut parameters = Map::new();
        parameters.insert(slots.resume.clone(), Value::String(file_param(&self.resume)));
        parameters.insert(slots.jd.clone(), Value::String(file_param(&self.jd)));
        parameters.insert(
            slots.instruction.clone(),
            Value::String(self.instruction_text.clone()),
        );
        RunRequest {
            workflow_id: self.workflow_id.clone(),
            parameters,
        }
    }
}

fn file_param(file: &FileReference) -> String {
    serde_json::json!({ "file_id": file.id }).to_string()
}

/// Identifies one in-flight vendor job. The caller holds it; nothing is kept
/// server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub execute_id: String,
    pub debug_url: Option<String>,
}

/// A run that finished inside the submission call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRun {
    pub output: String,
    pub execute_id: Option<String>,
    pub debug_url: Option<String>,
}

/// Successful outcome of `Submitter::submit`; failures travel as `WorkflowError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success(CompletedRun),
    Pending(ExecutionHandle),
}

/// Normalized state of a run, derived fresh on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Running,
    Success {
        output: String,
        debug_url: Option<String>,
    },
    Error {
        message: String,
        debug_url: Option<String>,
    },
}

impl ExecutionResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionResult::Running)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_upload_applies_defaults() {
        let upload = FilePayload::new(&b"%PDF"[..]).into_upload(DEFAULT_RESUME_NAME, DEFAULT_RESUME_MIME);
        assert_eq!(upload.filename, "resume.pdf");
        assert_eq!(upload.mime_type, "application/pdf");
    }

    #[test]
    fn test_into_upload_keeps_caller_values_and_ignores_blanks() {
        let payload = FilePayload {
            data: Bytes::from_static(b"img"),
            filename: Some("posting.png".to_string()),
            mime_type: Some("  ".to_string()),
        };
        let upload = payload.into_upload(DEFAULT_JD_NAME, DEFAULT_JD_MIME);
        assert_eq!(upload.filename, "posting.png");
        assert_eq!(upload.mime_type, "image/jpeg");
    }

    #[test]
    fn test_run_request_encodes_file_slots_as_json_strings() {
        let submission = WorkflowSubmission {
            workflow_id: "wf-1".to_string(),
            resume: FileReference { id: "f-r".to_string() },
            jd: FileReference { id: "f-j".to_string() },
            instruction_text: "compare".to_string(),
        };
        let request = submission.to_run_request(&SlotNames::default());
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["workflow_id"], "wf-1");
        assert_eq!(body["parameters"]["file"], r#"{"file_id":"f-r"}"#);
        assert_eq!(body["parameters"]["jd"], r#"{"file_id":"f-j"}"#);
        assert_eq!(body["parameters"]["content"], "compare");
    }

    #[test]
    fn test_only_running_is_non_terminal() {
        assert!(!ExecutionResult::Running.is_terminal());
        assert!(ExecutionResult::Error {
            message: "x".to_string(),
            debug_url: None
        }
        .is_terminal());
    }
}
