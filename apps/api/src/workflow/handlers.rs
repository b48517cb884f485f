//! Axum route handlers for submitting and polling workflow runs.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use crate::workflow::models::{ExecutionResult, FilePayload, SubmissionFiles, SubmissionOutcome};
use crate::workflow::transport::decode_base64_file;

const STARTED_MESSAGE: &str = "Workflow started, still processing";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunWorkflowRequest {
    #[serde(default)]
    pub resume_base64: String,
    pub resume_name: Option<String>,
    pub resume_mime: Option<String>,
    #[serde(default)]
    pub jd_base64: String,
    pub jd_name: Option<String>,
    pub jd_mime: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunWorkflowQuery {
    /// Block until the run is terminal instead of returning `Started`.
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckStatusQuery {
    pub id: Option<String>,
    pub execute_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub enum RunStatus {
    Success,
    Started,
    Running,
    Error,
}

#[derive(Debug, Serialize)]
pub struct RunWorkflowResponse {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_url: Option<String>,
}

impl RunWorkflowResponse {
    fn from_result(result: ExecutionResult, execute_id: Option<String>) -> Self {
        let (status, output, message, debug_url) = match result {
            ExecutionResult::Running => (RunStatus::Running, None, None, None),
            ExecutionResult::Success { output, debug_url } => {
                (RunStatus::Success, Some(output), None, debug_url)
            }
            ExecutionResult::Error { message, debug_url } => {
                (RunStatus::Error, None, Some(message), debug_url)
            }
        };
        Self {
            status,
            output,
            message,
            execute_id,
            debug_url,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/run-workflow
///
/// Accepts base64 or data-URL encoded files.
pub async fn handle_run_workflow(
    State(state): State<AppState>,
    Query(query): Query<RunWorkflowQuery>,
    Json(request): Json<RunWorkflowRequest>,
) -> Result<Json<RunWorkflowResponse>, AppError> {
    let resume = decode_base64_file("resumeBase64", &request.resume_base64)?;
    let jd = decode_base64_file("jdBase64", &request.jd_base64)?;

    let files = SubmissionFiles {
        resume: FilePayload {
            data: resume.data,
            filename: request.resume_name,
            mime_type: request.resume_mime.or(resume.mime_type),
        },
        jd: FilePayload {
            data: jd.data,
            filename: request.jd_name,
            mime_type: request.jd_mime.or(jd.mime_type),
        },
        instruction: request.content,
    };

    run(&state, files, query.wait).await
}

/// POST /api/run-workflow/upload
///
/// Multipart variant: `resume` and `jd` file fields plus an optional `content` text field.
pub async fn handle_run_workflow_upload(
    State(state): State<AppState>,
    Query(query): Query<RunWorkflowQuery>,
    mut multipart: Multipart,
) -> Result<Json<RunWorkflowResponse>, AppError> {
    let mut files = SubmissionFiles::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" | "jd" => {
                let filename = field.file_name().map(String::from);
                let mime_type = field.content_type().map(String::from);
                let data: Bytes = field.bytes().await?;
                let payload = FilePayload {
                    data,
                    filename,
                    mime_type,
                };
                if name == "resume" {
                    files.resume = payload;
                } else {
                    files.jd = payload;
                }
            }
            "content" => files.instruction = Some(field.text().await?),
            other => info!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    run(&state, files, query.wait).await
}

/// GET /api/check-status?id=<execute_id>
///
/// A vendor-reported failure is a normal response with `status: "Error"`.
pub async fn handle_check_status(
    State(state): State<AppState>,
    Query(query): Query<CheckStatusQuery>,
) -> Result<Json<RunWorkflowResponse>, AppError> {
    let non_blank = |id: &String| !id.trim().is_empty();
    let execute_id = query
        .id
        .filter(non_blank)
        .or_else(|| query.execute_id.filter(non_blank))
        .ok_or_else(|| AppError::Validation("execute_id is required".to_string()))?;

    let result = state.poller.poll(&execute_id).await?;
    Ok(Json(RunWorkflowResponse::from_result(result, Some(execute_id))))
}

async fn run(
    state: &AppState,
    files: SubmissionFiles,
    wait: bool,
) -> Result<Json<RunWorkflowResponse>, AppError> {
    let response = match state.submitter.submit(files).await? {
        SubmissionOutcome::Success(run) => RunWorkflowResponse {
            status: RunStatus::Success,
            output: Some(run.output),
            message: None,
            execute_id: run.execute_id,
            debug_url: run.debug_url,
        },
        SubmissionOutcome::Pending(handle) if wait => {
            let result = state.poller.wait_for_completion(&handle.execute_id).await?;
            let mut response = RunWorkflowResponse::from_result(result, Some(handle.execute_id));
            response.debug_url = response.debug_url.or(handle.debug_url);
            response
        }
        SubmissionOutcome::Pending(handle) => RunWorkflowResponse {
            status: RunStatus::Started,
            output: None,
            message: Some(STARTED_MESSAGE.to_string()),
            execute_id: Some(handle.execute_id),
            debug_url: handle.debug_url,
        },
    };
    Ok(Json(response))
}
