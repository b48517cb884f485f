use std::sync::Arc;

use crate::config::Config;
use crate::vendor::WorkflowApi;
use crate::workflow::poller::Poller;
use crate::workflow::submitter::Submitter;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no job table: execution handles live with the caller.
#[derive(Clone)]
pub struct AppState {
    pub submitter: Submitter,
    pub poller: Poller,
    pub config: Config,
}

impl AppState {
    /// Wires Submitter and Poller to the same vendor backend.
    pub fn new(api: Arc<dyn WorkflowApi>, config: Config) -> Self {
        Self {
            submitter: Submitter::new(api.clone(), config.vendor.clone()),
            poller: Poller::new(api, config.poll),
            config,
        }
    }
}
