//! Recovery of a JSON object from free-form model output.
//!
//! The extractor is a best-effort heuristic, not a lexer: after removing
//! an optional code fence it takes everything from the first `{` to the
//! last `}`. Output containing several objects, or braces in surrounding
//! prose, yields a candidate that fails to parse; the orchestrator treats
//! that like any other parse failure.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::InferenceError;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?").expect("Invalid fence regex"));

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```$").expect("Invalid fence regex"));

/// Pull the JSON candidate out of `raw`. Returns the fence-stripped text
/// unchanged when it holds no `{ ... }` span.
pub fn extract_json(raw: &str) -> String {
    let text = raw.trim();
    let text = LEADING_FENCE.replace(text, "");
    let text = text.trim();
    let text = TRAILING_FENCE.replace(text, "");
    let text = text.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Parse an extracted candidate, accepting only a JSON object.
pub fn parse_candidate(candidate: &str) -> Result<Map<String, Value>, InferenceError> {
    if !candidate.contains('{') {
        return Err(InferenceError::NoJsonObject);
    }
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| InferenceError::JsonParsing(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(InferenceError::NotAnObject),
    }
}

/// `extract_json` followed by `parse_candidate`.
pub fn parse_model_output(raw: &str) -> Result<Map<String, Value>, InferenceError> {
    parse_candidate(&extract_json(raw))
}
