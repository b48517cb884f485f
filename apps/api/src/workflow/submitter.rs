//! Submitter: uploads the résumé and JD, then starts one workflow run.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::VendorConfig;
use crate::vendor::{VendorEnvelope, WorkflowApi};
use crate::workflow::decode::unwrap_payload;
use crate::workflow::error::WorkflowError;
use crate::workflow::models::{
    CompletedRun, ExecutionHandle, SubmissionFiles, SubmissionOutcome, WorkflowSubmission,
    DEFAULT_JD_MIME, DEFAULT_JD_NAME, DEFAULT_RESUME_MIME, DEFAULT_RESUME_NAME,
};

#[derive(Clone)]
pub struct Submitter {
    api: Arc<dyn WorkflowApi>,
    config: VendorConfig,
}

impl Submitter {
    pub fn new(api: Arc<dyn WorkflowApi>, config: VendorConfig) -> Self {
        Self { api, config }
    }

    /// Uploads both files in order and submits the run.
    ///
    /// The JD upload is never attempted when the résumé upload fails, and the
    /// run is never started unless both uploads produced a file id.
    pub async fn submit(&self, files: SubmissionFiles) -> Result<SubmissionOutcome, WorkflowError> {
        let span = info_span!("submit", submission_id = %Uuid::new_v4());
        self.submit_inner(files).instrument(span).await
    }

    async fn submit_inner(&self, files: SubmissionFiles) -> Result<SubmissionOutcome, WorkflowError> {
        if files.resume.data.is_empty() {
            return Err(WorkflowError::InvalidInput("resume file is required".to_string()));
        }
        if files.jd.data.is_empty() {
            return Err(WorkflowError::InvalidInput("jd file is required".to_string()));
        }

        let instruction_text = files
            .instruction
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| self.config.default_instruction.clone());

        let resume = self
            .api
            .upload_file(files.resume.into_upload(DEFAULT_RESUME_NAME, DEFAULT_RESUME_MIME))
            .await?;
        let jd = self
            .api
            .upload_file(files.jd.into_upload(DEFAULT_JD_NAME, DEFAULT_JD_MIME))
            .await?;
        info!("Uploaded files: resume={} jd={}", resume.id, jd.id);

        let submission = WorkflowSubmission {
            workflow_id: self.config.workflow_id.clone(),
            resume,
            jd,
            instruction_text,
        };
        let envelope = self
            .api
            .run_workflow(&submission.to_run_request(&self.config.slots))
            .await?;

        interpret_run_response(envelope)
    }
}

/// Turns the run endpoint's envelope into exactly one outcome.
fn interpret_run_response(envelope: VendorEnvelope) -> Result<SubmissionOutcome, WorkflowError> {
    if !envelope.is_ok() {
        warn!("Workflow run rejected: code={:?} msg={:?}", envelope.code, envelope.msg);
        return Err(WorkflowError::VendorRejected {
            code: envelope.code.unwrap_or(-1),
            message: envelope.message_or("Workflow execution failed"),
            debug_url: envelope.debug_url,
        });
    }

    if let Some(output) = envelope.data.as_ref().and_then(unwrap_payload) {
        info!("Workflow completed synchronously");
        return Ok(SubmissionOutcome::Success(CompletedRun {
            output,
            execute_id: envelope.execute_id,
            debug_url: envelope.debug_url,
        }));
    }

    match envelope.execute_id.filter(|id| !id.trim().is_empty()) {
        Some(execute_id) => {
            debug!("Workflow started asynchronously: {execute_id}");
            Ok(SubmissionOutcome::Pending(ExecutionHandle {
                execute_id,
                debug_url: envelope.debug_url,
            }))
        }
        None => Err(WorkflowError::VendorRejected {
            code: 0,
            message: "Workflow accepted without a result or an execute_id".to_string(),
            debug_url: envelope.debug_url,
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::workflow::models::{FilePayload, FileReference, RunRequest, UploadRequest};

    /// Scripted in-memory vendor that records every call in order.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub calls: Mutex<Vec<String>>,
        pub uploads: Mutex<Vec<UploadRequest>>,
        pub runs: Mutex<Vec<RunRequest>>,
        pub upload_results: Mutex<VecDeque<Result<FileReference, WorkflowError>>>,
        pub run_result: Mutex<Option<Result<VendorEnvelope, WorkflowError>>>,
        pub history_results: Mutex<VecDeque<Result<VendorEnvelope, WorkflowError>>>,
    }

    impl FakeApi {
        pub(crate) fn with_uploads(ids: &[&str]) -> Self {
            let fake = Self::default();
            *fake.upload_results.lock().unwrap() = ids
                .iter()
                .map(|id| Ok(FileReference { id: id.to_string() }))
                .collect();
            fake
        }

        pub(crate) fn set_run(&self, result: Result<VendorEnvelope, WorkflowError>) {
            *self.run_result.lock().unwrap() = Some(result);
        }

        pub(crate) fn push_history(&self, result: Result<VendorEnvelope, WorkflowError>) {
            self.history_results.lock().unwrap().push_back(result);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkflowApi for FakeApi {
        async fn upload_file(&self, upload: UploadRequest) -> Result<FileReference, WorkflowError> {
            self.calls.lock().unwrap().push(format!("upload:{}", upload.filename));
            self.uploads.lock().unwrap().push(upload);
            self.upload_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(WorkflowError::Network("no scripted upload".to_string())))
        }

        async fn run_workflow(&self, request: &RunRequest) -> Result<VendorEnvelope, WorkflowError> {
            self.calls.lock().unwrap().push("run".to_string());
            self.runs.lock().unwrap().push(request.clone());
            self.run_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(WorkflowError::Network("no scripted run".to_string())))
        }

        async fn workflow_history(&self, execute_id: &str) -> Result<VendorEnvelope, WorkflowError> {
            self.calls.lock().unwrap().push(format!("history:{execute_id}"));
            let mut results = self.history_results.lock().unwrap();
            // The last scripted answer repeats once the script runs out.
            if results.len() > 1 {
                return results.pop_front().unwrap();
            }
            match results.front() {
                Some(Ok(envelope)) => Ok(envelope.clone()),
                _ => results
                    .pop_front()
                    .unwrap_or_else(|| Err(WorkflowError::Network("no scripted history".to_string()))),
            }
        }
    }

    pub(crate) fn files() -> SubmissionFiles {
        SubmissionFiles {
            resume: FilePayload::new(&b"%PDF-1.4"[..]),
            jd: FilePayload::new(&b"\xFF\xD8\xFF"[..]),
            instruction: None,
        }
    }

    fn submitter(fake: Arc<FakeApi>) -> Submitter {
        Submitter::new(fake, VendorConfig::new("http://vendor.test", "tok", "wf-42"))
    }

    fn envelope(value: serde_json::Value) -> VendorEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_uploads_both_files_before_running() {
        let fake = Arc::new(FakeApi::with_uploads(&["f-r", "f-j"]));
        fake.set_run(Ok(envelope(json!({ "code": 0, "data": "", "execute_id": "exec123" }))));

        let outcome = submitter(fake.clone()).submit(files()).await.unwrap();

        assert_eq!(fake.calls(), vec!["upload:resume.pdf", "upload:jd.jpg", "run"]);
        let uploads = fake.uploads.lock().unwrap();
        assert_eq!(uploads[0].mime_type, "application/pdf");
        assert_eq!(uploads[1].mime_type, "image/jpeg");

        let runs = fake.runs.lock().unwrap();
        assert_eq!(runs[0].workflow_id, "wf-42");
        assert_eq!(runs[0].parameters["file"], r#"{"file_id":"f-r"}"#);
        assert_eq!(runs[0].parameters["jd"], r#"{"file_id":"f-j"}"#);
        assert_eq!(
            runs[0].parameters["content"],
            crate::config::DEFAULT_INSTRUCTION
        );

        assert_eq!(
            outcome,
            SubmissionOutcome::Pending(ExecutionHandle {
                execute_id: "exec123".to_string(),
                debug_url: None,
            })
        );
    }

    #[tokio::test]
    async fn test_failed_resume_upload_skips_jd_and_run() {
        let fake = Arc::new(FakeApi::default());
        fake.upload_results.lock().unwrap().push_back(Err(WorkflowError::UploadFailed {
            http_status: 413,
            message: "too large".to_string(),
        }));

        let err = submitter(fake.clone()).submit(files()).await.unwrap_err();

        assert!(matches!(err, WorkflowError::UploadFailed { http_status: 413, .. }));
        assert_eq!(fake.calls(), vec!["upload:resume.pdf"]);
    }

    #[tokio::test]
    async fn test_empty_files_are_invalid_input() {
        let fake = Arc::new(FakeApi::with_uploads(&["f-r", "f-j"]));
        let mut input = files();
        input.jd = FilePayload::default();

        let err = submitter(fake.clone()).submit(input).await.unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidInput(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_inline_result_is_unwrapped() {
        let fake = Arc::new(FakeApi::with_uploads(&["f-r", "f-j"]));
        fake.set_run(Ok(envelope(json!({
            "code": 0,
            "data": r#"{"data":"match: 82%"}"#,
            "execute_id": "exec1",
            "debug_url": "https://vendor.example/debug/1"
        }))));

        let outcome = submitter(fake).submit(files()).await.unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Success(CompletedRun {
                output: "match: 82%".to_string(),
                execute_id: Some("exec1".to_string()),
                debug_url: Some("https://vendor.example/debug/1".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_custom_instruction_and_names_are_forwarded() {
        let fake = Arc::new(FakeApi::with_uploads(&["f-r", "f-j"]));
        fake.set_run(Ok(envelope(json!({ "code": 0, "data": "plain report" }))));
        let mut input = files();
        input.resume.filename = Some("cv.pdf".to_string());
        input.instruction = Some("score it".to_string());

        let outcome = submitter(fake.clone()).submit(input).await.unwrap();

        assert_eq!(fake.calls()[0], "upload:cv.pdf");
        assert_eq!(fake.runs.lock().unwrap()[0].parameters["content"], "score it");
        assert!(matches!(outcome, SubmissionOutcome::Success(run) if run.output == "plain report"));
    }

    #[test]
    fn test_non_zero_code_is_rejection_with_verbatim_message() {
        let err = interpret_run_response(envelope(json!({
            "code": 4011,
            "msg": "token expired",
            "debug_url": "https://vendor.example/debug/2"
        })))
        .unwrap_err();

        match err {
            WorkflowError::VendorRejected { code, message, debug_url } => {
                assert_eq!(code, 4011);
                assert_eq!(message, "token expired");
                assert_eq!(debug_url.as_deref(), Some("https://vendor.example/debug/2"));
            }
            other => panic!("expected VendorRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_accepted_without_result_or_id_is_rejection() {
        let err = interpret_run_response(envelope(json!({ "code": 0, "data": "  " }))).unwrap_err();
        assert!(matches!(err, WorkflowError::VendorRejected { code: 0, .. }));
    }
}
