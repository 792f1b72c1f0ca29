//! Model service: the single owner of the MedGemma model.
//!
//! Ollama serves one model at a time and concurrent generations compete
//! for the same device memory, so every generation goes through
//! `ModelService`, which serializes access behind a mutex and tracks the
//! load lifecycle:
//!
//! `Uninitialized → Loading → Ready | Failed`
//!
//! The orchestrator only sees the `ModelProvider` trait, which keeps the
//! triage pipeline testable without a running daemon.

use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Instant;

use serde::Serialize;

use crate::hardware::{detect_hardware, HardwareProfile};
use crate::pipeline::ollama::LlmClient;
use crate::pipeline::ollama_types::GenerationOptions;
use crate::pipeline::triage::InferenceError;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Load lifecycle of the served model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ModelState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// The narrow interface the inference orchestrator calls.
pub trait ModelProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn state(&self) -> ModelState;

    fn is_loaded(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// Load error message, empty when there is none.
    fn last_error(&self) -> String {
        match self.state() {
            ModelState::Failed(e) => e,
            _ => String::new(),
        }
    }

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, InferenceError>;

    /// Generate only if `deadline` has not passed.
    fn generate_within(
        &self,
        prompt: &str,
        max_tokens: u32,
        deadline: Instant,
    ) -> Result<String, InferenceError> {
        if Instant::now() >= deadline {
            return Err(InferenceError::DeadlineExceeded);
        }
        self.generate(prompt, max_tokens)
    }

    /// Inference hardware as seen by the model runtime.
    fn probe_hardware(&self) -> HardwareProfile {
        HardwareProfile::cpu_fallback()
    }
}

/// Errors from ModelService operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelServiceError {
    #[error("Internal lock error")]
    LockPoisoned,
}

impl From<ModelServiceError> for InferenceError {
    fn from(err: ModelServiceError) -> Self {
        InferenceError::Service(err.to_string())
    }
}

// ═══════════════════════════════════════════════════════════
// ModelService
// ═══════════════════════════════════════════════════════════

/// Ollama-backed `ModelProvider`.
pub struct ModelService {
    client: Box<dyn LlmClient + Send + Sync>,
    model_id: String,
    pull_on_start: bool,
    state: RwLock<ModelState>,
    /// Exclusive access lock. One generation at a time.
    lock: Mutex<()>,
}

/// RAII guard for exclusive model access.
pub struct GenerationGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl ModelService {
    pub fn new(client: Box<dyn LlmClient + Send + Sync>, model_id: &str) -> Self {
        Self {
            client,
            model_id: model_id.to_string(),
            pull_on_start: false,
            state: RwLock::new(ModelState::Uninitialized),
            lock: Mutex::new(()),
        }
    }

    /// Pull the model from the registry when it is not installed.
    pub fn with_pull_on_start(mut self, pull: bool) -> Self {
        self.pull_on_start = pull;
        self
    }

    /// Resolve, optionally pull, and warm the configured model.
    ///
    /// Blocking; run it on a blocking thread. Returns the final state.
    pub fn load(&self) -> ModelState {
        let _span = tracing::info_span!("model_load", model = %self.model_id).entered();
        self.set_state(ModelState::Loading);

        let next = match self.try_load() {
            Ok(()) => {
                tracing::info!("Model loaded");
                ModelState::Ready
            }
            Err(message) => {
                tracing::error!(error = %message, "Model load failed");
                ModelState::Failed(message)
            }
        };
        self.set_state(next.clone());
        next
    }

    fn try_load(&self) -> Result<(), String> {
        let installed = self
            .client
            .is_model_available(&self.model_id)
            .map_err(|e| e.to_string())?;

        if !installed {
            if !self.pull_on_start {
                return Err(format!(
                    "Model {} is not installed in Ollama (enable PULL_MODEL_ON_START or run `ollama pull {}`)",
                    self.model_id, self.model_id
                ));
            }
            tracing::info!("Model not installed, pulling");
            let status = self
                .client
                .pull_model(&self.model_id)
                .map_err(|e| format!("Pull failed: {e}"))?;
            if status.status != "success" {
                return Err(format!("Pull ended with status '{}'", status.status));
            }
        }

        self.client
            .warm_model(&self.model_id)
            .map_err(|e| format!("Warm-up failed: {e}"))
    }

    /// Acquire exclusive access to the model. Blocks until available.
    pub fn acquire(&self) -> Result<GenerationGuard<'_>, ModelServiceError> {
        let guard = self
            .lock
            .lock()
            .map_err(|_| ModelServiceError::LockPoisoned)?;
        Ok(GenerationGuard { _guard: guard })
    }

    fn set_state(&self, next: ModelState) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl ModelService {
    fn generate_locked(&self, prompt: &str, max_tokens: u32) -> Result<String, InferenceError> {
        let options = GenerationOptions::clinical(max_tokens);
        Ok(self.client.generate(&self.model_id, prompt, &options)?)
    }
}

impl ModelProvider for ModelService {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn state(&self) -> ModelState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, InferenceError> {
        if !self.is_loaded() {
            return Err(InferenceError::ModelUnavailable);
        }
        let _guard = self.acquire()?;
        self.generate_locked(prompt, max_tokens)
    }

    /// The deadline is checked again once the lock is held: a request queued
    /// behind a long generation may have been abandoned meanwhile.
    fn generate_within(
        &self,
        prompt: &str,
        max_tokens: u32,
        deadline: Instant,
    ) -> Result<String, InferenceError> {
        if !self.is_loaded() {
            return Err(InferenceError::ModelUnavailable);
        }
        if Instant::now() >= deadline {
            return Err(InferenceError::DeadlineExceeded);
        }
        let _guard = self.acquire()?;
        if Instant::now() >= deadline {
            tracing::debug!("Deadline passed while waiting for the model");
            return Err(InferenceError::DeadlineExceeded);
        }
        self.generate_locked(prompt, max_tokens)
    }

    fn probe_hardware(&self) -> HardwareProfile {
        detect_hardware(self.client.as_ref())
    }
}
