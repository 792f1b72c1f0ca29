// Boundary between untrusted generated JSON and the triage contract.
// Out-of-domain values are repaired conservatively: an unknown risk tier
// becomes YELLOW, never GREEN. Provenance always comes from the caller.

use serde_json::{Map, Value};

use super::schema::{validate_and_default, Provenance, RepairKind, TriageResponse};

/// Coerce a parsed model object into a schema-valid `TriageResponse`.
pub fn normalize(parsed: &Map<String, Value>, model_id: &str) -> TriageResponse {
    let validated = validate_and_default(parsed, Provenance::model(model_id));

    if !validated.repairs.is_empty() {
        let missing: Vec<&str> = validated
            .repairs
            .iter()
            .filter(|r| r.kind == RepairKind::Missing)
            .map(|r| r.field)
            .collect();
        let invalid: Vec<&str> = validated
            .repairs
            .iter()
            .filter(|r| r.kind == RepairKind::Invalid)
            .map(|r| r.field)
            .collect();
        tracing::debug!(
            missing = ?missing,
            invalid = ?invalid,
            "Model triage output repaired"
        );
    }

    validated.response
}
