//! Ollama HTTP API contract types and the LLM error taxonomy.
//!
//! These types formalize the subset of the Ollama API the triage
//! service relies on: `/api/tags`, `/api/ps`, `/api/pull` and
//! `/api/generate`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ──────────────────────────────────────────────
// Error taxonomy
// ──────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Ollama is not running at {0}")]
    Connection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

// ──────────────────────────────────────────────
// Generation
// ──────────────────────────────────────────────

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum number of new tokens.
    pub num_predict: i32,
}

impl GenerationOptions {
    /// Low-temperature nucleus sampling used for every clinical task.
    pub fn clinical(max_tokens: u32) -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
            num_predict: i32::try_from(max_tokens).unwrap_or(i32::MAX),
        }
    }
}

/// Request body for Ollama `/api/generate`.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

/// Response body from Ollama `/api/generate` (non-streaming).
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    pub response: String,
}

// ──────────────────────────────────────────────
// Model inventory
// ──────────────────────────────────────────────

/// Response body from Ollama `/api/tags`.
#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagEntry {
    pub name: String,
}

/// Response body from Ollama `/api/ps`.
#[derive(Debug, Deserialize)]
pub(crate) struct RunningModelsResponse {
    #[serde(default)]
    pub models: Vec<RunningModelInfo>,
}

/// A model currently loaded in Ollama's memory (from `/api/ps`).
///
/// Used by hardware detection to determine GPU vs CPU allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningModelInfo {
    /// Model name (e.g., "medgemma:4b").
    pub name: String,
    /// Total model size in memory (bytes).
    #[serde(default)]
    pub size: u64,
    /// Size loaded into VRAM (bytes). 0 = CPU-only.
    #[serde(default)]
    pub size_vram: u64,
}

/// Request body for Ollama `/api/pull` (non-streaming).
#[derive(Debug, Serialize)]
pub(crate) struct PullRequest<'a> {
    pub model: &'a str,
    pub stream: bool,
}

/// Final status from a non-streaming `/api/pull`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullStatus {
    /// "success" when the model is fully downloaded.
    pub status: String,
}

/// True when `installed` is the same model as `requested`.
///
/// Ollama reports untagged pulls as `name:latest`, so a bare request
/// matches the `latest` tag as well as an exact name.
pub fn model_matches(installed: &str, requested: &str) -> bool {
    if installed == requested {
        return true;
    }
    !requested.contains(':') && installed == format!("{requested}:latest")
}
