//! Poller: reads run status from the vendor until a terminal state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::vendor::WorkflowApi;
use crate::workflow::decode::normalize_history;
use crate::workflow::error::WorkflowError;
use crate::workflow::models::ExecutionResult;

#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn WorkflowApi>,
    policy: PollPolicy,
}

impl Poller {
    pub fn new(api: Arc<dyn WorkflowApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// One idempotent status read.
    ///
    /// Vendor rejections come back as `ExecutionResult::Error`; only transport
    /// failures are returned as `Err`.
    pub async fn poll(&self, execute_id: &str) -> Result<ExecutionResult, WorkflowError> {
        if execute_id.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("execute_id is required".to_string()));
        }

        match self.api.workflow_history(execute_id).await {
            Ok(envelope) => Ok(normalize_history(envelope)),
            Err(WorkflowError::VendorRejected {
                message, debug_url, ..
            }) => Ok(ExecutionResult::Error { message, debug_url }),
            Err(e) => Err(e),
        }
    }

    /// Polls on the configured interval until the run is terminal or the
    /// attempt budget is spent.
    pub async fn wait_for_completion(
        &self,
        execute_id: &str,
    ) -> Result<ExecutionResult, WorkflowError> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let result = self.poll(execute_id).await?;
            if result.is_terminal() {
                info!("Run {execute_id} finished after {attempts} poll(s)");
                return Ok(result);
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    warn!("Run {execute_id} still running after {attempts} polls; giving up");
                    return Err(WorkflowError::Timeout { attempts });
                }
            }

            debug!(
                "Run {execute_id} still running, next poll in {}ms",
                self.policy.interval.as_millis()
            );
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}
