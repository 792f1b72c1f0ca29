use std::sync::Mutex;
use std::time::Duration;

use super::ollama_types::{
    model_matches, GenerateRequest, GenerateResponse, GenerationOptions, LlmError, PullRequest,
    PullStatus, RunningModelInfo, RunningModelsResponse, TagsResponse,
};

/// Connection attempts to the local daemon fail fast.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Pulling multi-gigabyte weights is allowed to take a long time.
const PULL_TIMEOUT_SECS: u64 = 3_600;

/// How long Ollama keeps the warmed model resident.
const WARM_KEEP_ALIVE: &str = "30m";

/// Ollama LLM client abstraction (allows mocking).
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError>;

    fn list_models(&self) -> Result<Vec<String>, LlmError>;

    fn list_running_models(&self) -> Result<Vec<RunningModelInfo>, LlmError>;

    fn pull_model(&self, model: &str) -> Result<PullStatus, LlmError>;

    /// Load weights into memory without generating anything.
    fn warm_model(&self, model: &str) -> Result<(), LlmError>;

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| model_matches(m, model)))
    }
}

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    ///
    /// `timeout_secs` bounds every request except pulls.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::HttpClient(e.to_string())
        }
    }

    fn check_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, LlmError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn post_generate(&self, body: &GenerateRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let parsed: GenerateResponse = Self::check_status(response)?
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.post_generate(&GenerateRequest {
            model,
            prompt,
            stream: false,
            options: Some(*options),
            keep_alive: None,
        })
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let parsed: TagsResponse = Self::check_status(response)?
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn list_running_models(&self) -> Result<Vec<RunningModelInfo>, LlmError> {
        let url = format!("{}/api/ps", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let parsed: RunningModelsResponse = Self::check_status(response)?
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models)
    }

    fn pull_model(&self, model: &str) -> Result<PullStatus, LlmError> {
        let url = format!("{}/api/pull", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(PULL_TIMEOUT_SECS))
            .json(&PullRequest {
                model,
                stream: false,
            })
            .send()
            .map_err(|e| self.map_send_error(e))?;

        Self::check_status(response)?
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))
    }

    fn warm_model(&self, model: &str) -> Result<(), LlmError> {
        // An empty prompt makes Ollama load the weights and return immediately.
        self.post_generate(&GenerateRequest {
            model,
            prompt: "",
            stream: false,
            options: None,
            keep_alive: Some(WARM_KEEP_ALIVE),
        })
        .map(|_| ())
    }
}

/// Mock LLM client for testing. Returns a configurable response.
pub struct MockLlmClient {
    response: Result<String, String>,
    available_models: Vec<String>,
    running_models: Vec<RunningModelInfo>,
    calls: Mutex<Vec<(String, GenerationOptions)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            available_models: vec!["medgemma:4b".to_string()],
            running_models: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every generation fails with an HTTP error.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::new("")
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn with_running(mut self, running: Vec<RunningModelInfo>) -> Self {
        self.running_models = running;
        self
    }

    /// Prompts and options seen by `generate`, in call order.
    pub fn calls(&self) -> Vec<(String, GenerationOptions)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((prompt.to_string(), *options));
        }
        self.response.clone().map_err(LlmError::HttpClient)
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }

    fn list_running_models(&self) -> Result<Vec<RunningModelInfo>, LlmError> {
        Ok(self.running_models.clone())
    }

    fn pull_model(&self, _model: &str) -> Result<PullStatus, LlmError> {
        Ok(PullStatus {
            status: "success".to_string(),
        })
    }

    fn warm_model(&self, _model: &str) -> Result<(), LlmError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        let result = client
            .generate("model", "prompt", &GenerationOptions::clinical(10))
            .unwrap();
        assert_eq!(result, "test response");
    }

    #[test]
    fn mock_client_records_calls() {
        let client = MockLlmClient::new("{}");
        client
            .generate("model", "first", &GenerationOptions::clinical(350))
            .unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "first");
        assert_eq!(calls[0].1.num_predict, 350);
    }

    #[test]
    fn failing_mock_returns_error() {
        let client = MockLlmClient::failing("boom");
        let result = client.generate("model", "prompt", &GenerationOptions::clinical(10));
        assert!(matches!(result, Err(LlmError::HttpClient(msg)) if msg == "boom"));
    }

    #[test]
    fn mock_client_model_availability() {
        let client = MockLlmClient::new("").with_models(vec![
            "medgemma:latest".into(),
            "llama3:8b".into(),
        ]);
        assert!(client.is_model_available("medgemma").unwrap());
        assert!(!client.is_model_available("medgemma:27b").unwrap());
    }

    #[test]
    fn ollama_client_constructor() {
        let client = OllamaClient::new("http://localhost:11434", 120).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", 60).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn unreachable_daemon_maps_to_connection_error() {
        // Port 9 (discard) is closed on test hosts.
        let client = OllamaClient::new("http://127.0.0.1:9", 2).unwrap();
        let result = client.list_models();
        assert!(matches!(
            result,
            Err(LlmError::Connection(_)) | Err(LlmError::HttpClient(_))
        ));
    }
}
