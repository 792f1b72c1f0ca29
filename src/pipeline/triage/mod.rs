pub mod types;
pub mod schema;
pub mod sanitize;
pub mod prompt;
pub mod parser;
pub mod normalize;
pub mod heuristic;
pub mod orchestrator;

pub use types::*;
pub use schema::*;
pub use prompt::*;
pub use parser::*;
pub use normalize::*;
pub use heuristic::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::pipeline::ollama_types::LlmError;

/// Failures on the model path. Every variant ends in the heuristic fallback.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model is not loaded")]
    ModelUnavailable,

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Model service error: {0}")]
    Service(String),

    #[error("Request deadline passed before generation")]
    DeadlineExceeded,

    #[error("No JSON object in model output")]
    NoJsonObject,

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Model output is JSON but not an object")]
    NotAnObject,
}
