//! Shared state for the API layer.

use std::sync::Arc;
use std::time::Duration;

use crate::model_service::ModelProvider;
use crate::pipeline::triage::TriageOrchestrator;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<TriageOrchestrator>,
    /// Outer bound on one `/infer` call, generation included.
    pub request_timeout: Duration,
}

impl ApiContext {
    pub fn new(orchestrator: Arc<TriageOrchestrator>, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            request_timeout,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        self.orchestrator.provider()
    }
}
