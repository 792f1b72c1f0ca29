use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::heuristic::classify;
use super::normalize::normalize;
use super::parser::parse_model_output;
use super::prompt::build_prompt;
use super::sanitize::sanitize_intake;
use super::schema::Source;
use super::types::{InferenceOutput, IntakeRequest, Task};
use super::InferenceError;
use crate::model_service::ModelProvider;

/// Runs one inference request end to end:
/// availability → sanitize → prompt → generate → extract → parse → normalize
///
/// Never fails: any error on the model path ends in the heuristic classifier.
pub struct TriageOrchestrator {
    provider: Arc<dyn ModelProvider>,
}

impl TriageOrchestrator {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Blocking; holds the model for the length of one generation.
    /// Generation is skipped once `deadline` has passed.
    pub fn infer(
        &self,
        request: &IntakeRequest,
        deadline: Option<Instant>,
    ) -> InferenceOutput {
        let task = Task::resolve(request.task.as_deref());
        let request_id = Uuid::new_v4();
        let _span = tracing::info_span!("infer", task = %task, request_id = %request_id).entered();

        if !self.provider.is_loaded() {
            tracing::info!(
                last_error = %self.provider.last_error(),
                "Model unavailable, using heuristic"
            );
            return self.fallback(request);
        }

        match self.try_model_path(task, request, deadline) {
            Ok(output) => {
                tracing::info!("Model inference completed");
                output
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model path failed, using heuristic");
                self.fallback(request)
            }
        }
    }

    fn try_model_path(
        &self,
        task: Task,
        request: &IntakeRequest,
        deadline: Option<Instant>,
    ) -> Result<InferenceOutput, InferenceError> {
        let (clean, changed) = sanitize_intake(request);
        if changed > 0 {
            tracing::info!(fields = changed, "Intake text sanitized");
        }

        let prompt = build_prompt(task, &clean);
        let raw = match deadline {
            Some(deadline) => self
                .provider
                .generate_within(&prompt, task.max_tokens(), deadline)?,
            None => self.provider.generate(&prompt, task.max_tokens())?,
        };
        tracing::debug!(chars = raw.len(), "Model output received");

        let parsed = parse_model_output(&raw)?;
        let model_id = self.provider.model_id();

        Ok(if task.is_triage() {
            InferenceOutput::Triage(normalize(&parsed, model_id))
        } else {
            InferenceOutput::Auxiliary(with_provenance(parsed, model_id))
        })
    }

    /// Heuristic triage over the caller's original symptom text.
    pub fn fallback(&self, request: &IntakeRequest) -> InferenceOutput {
        InferenceOutput::Triage(classify(&request.symptoms, self.provider.model_id()))
    }
}

/// Stamp provenance on an auxiliary mapping. Caller values always win
/// over whatever the model wrote into these keys.
fn with_provenance(mut parsed: Map<String, Value>, model_id: &str) -> Map<String, Value> {
    parsed.insert("model".into(), Value::String(model_id.to_string()));
    parsed.insert("source".into(), Value::String(Source::Model.as_str().to_string()));
    parsed
}
