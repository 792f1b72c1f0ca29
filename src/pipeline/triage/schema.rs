//! The triage response contract: field set, enum domains, and the
//! per-field default/repair rules applied to untrusted candidates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DISCLAIMER: &str = "This is not a diagnosis. Seek professional medical care.";
pub const DEFAULT_NEXT_STEP: &str = "Seek medical evaluation.";
pub const DEFAULT_WATCH_OUT: &str = "If symptoms worsen, seek care promptly.";
pub const DEFAULT_REASONING: &str = "MedGemma inference completed.";

/// Ordinal clinical urgency, RED > YELLOW > GREEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Red,
    Yellow,
    Green,
}

impl RiskTier {
    /// Case-insensitive parse; `None` for anything outside the domain.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "RED" => Some(RiskTier::Red),
            "YELLOW" => Some(RiskTier::Yellow),
            "GREEN" => Some(RiskTier::Green),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Uncertainty {
    Low,
    Medium,
    High,
}

impl Uncertainty {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "LOW" => Some(Uncertainty::Low),
            "MEDIUM" => Some(Uncertainty::Medium),
            "HIGH" => Some(Uncertainty::High),
            _ => None,
        }
    }
}

/// Provenance tag: which path produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Heuristic,
    Model,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Heuristic => "heuristic",
            Source::Model => "model",
        }
    }
}

/// The canonical triage answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResponse {
    pub risk_tier: RiskTier,
    pub referral_recommended: bool,
    pub recommended_next_steps: Vec<String>,
    pub watch_outs: Vec<String>,
    pub danger_signs: Vec<String>,
    pub uncertainty: Uncertainty,
    pub disclaimer: String,
    pub reasoning: String,
    pub model: String,
    pub source: Source,
}

impl TriageResponse {
    /// Invariants the enums cannot express: required lists and strings are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.recommended_next_steps.is_empty()
            && !self.watch_outs.is_empty()
            && !self.disclaimer.trim().is_empty()
            && !self.reasoning.trim().is_empty()
            && !self.model.trim().is_empty()
    }
}

/// Who answered. Never read from model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub model: String,
    pub source: Source,
}

impl Provenance {
    pub fn model(model_id: &str) -> Self {
        Self {
            model: model_id.to_string(),
            source: Source::Model,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairKind {
    Missing,
    Invalid,
}

/// One field that had to be defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRepair {
    pub field: &'static str,
    pub kind: RepairKind,
}

/// A schema-complete response plus the repairs it took to get there.
#[derive(Debug, Clone)]
pub struct ValidatedTriage {
    pub response: TriageResponse,
    pub repairs: Vec<FieldRepair>,
}

/// Coerce a candidate mapping into a `TriageResponse`, defaulting every
/// missing or out-of-domain field. Never fails.
pub fn validate_and_default(candidate: &Map<String, Value>, provenance: Provenance) -> ValidatedTriage {
    let mut repairs = Vec::new();

    let risk_tier = field(candidate, "riskTier", &mut repairs, |v| {
        scalar_text(v).and_then(|s| RiskTier::parse(&s))
    })
    .unwrap_or(RiskTier::Yellow);

    let uncertainty = field(candidate, "uncertainty", &mut repairs, |v| {
        scalar_text(v).and_then(|s| Uncertainty::parse(&s))
    })
    .unwrap_or(Uncertainty::Medium);

    let referral_recommended = field(candidate, "referralRecommended", &mut repairs, as_bool)
        .unwrap_or(risk_tier != RiskTier::Green);

    let recommended_next_steps = field(candidate, "recommendedNextSteps", &mut repairs, |v| {
        as_string_list(v).filter(|l| !l.is_empty())
    })
    .unwrap_or_else(|| vec![DEFAULT_NEXT_STEP.to_string()]);

    let watch_outs = field(candidate, "watchOuts", &mut repairs, |v| {
        as_string_list(v).filter(|l| !l.is_empty())
    })
    .unwrap_or_else(|| vec![DEFAULT_WATCH_OUT.to_string()]);

    let danger_signs =
        field(candidate, "dangerSigns", &mut repairs, as_string_list).unwrap_or_default();

    let disclaimer = field(candidate, "disclaimer", &mut repairs, as_non_empty_text)
        .unwrap_or_else(|| DISCLAIMER.to_string());

    let reasoning = field(candidate, "reasoning", &mut repairs, as_non_empty_text)
        .unwrap_or_else(|| DEFAULT_REASONING.to_string());

    ValidatedTriage {
        response: TriageResponse {
            risk_tier,
            referral_recommended,
            recommended_next_steps,
            watch_outs,
            danger_signs,
            uncertainty,
            disclaimer,
            reasoning,
            model: provenance.model,
            source: provenance.source,
        },
        repairs,
    }
}

/// Look up `name` and convert it, recording a repair when absent or unusable.
/// JSON `null` counts as absent.
fn field<T>(
    candidate: &Map<String, Value>,
    name: &'static str,
    repairs: &mut Vec<FieldRepair>,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    match candidate.get(name) {
        None | Some(Value::Null) => {
            repairs.push(FieldRepair {
                field: name,
                kind: RepairKind::Missing,
            });
            None
        }
        Some(value) => {
            let converted = convert(value);
            if converted.is_none() {
                repairs.push(FieldRepair {
                    field: name,
                    kind: RepairKind::Invalid,
                });
            }
            converted
        }
    }
}

/// Text form of a scalar; arrays and objects have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Arrays keep their non-blank scalar items; a lone string becomes a one-item list.
fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
        _ => None,
    }
}

fn as_non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(value: Value) -> ValidatedTriage {
        let map = value.as_object().cloned().unwrap();
        validate_and_default(&map, Provenance::model("medgemma:4b"))
    }

    #[test]
    fn enum_parsing_is_case_insensitive() {
        assert_eq!(RiskTier::parse("red"), Some(RiskTier::Red));
        assert_eq!(RiskTier::parse(" Green "), Some(RiskTier::Green));
        assert_eq!(RiskTier::parse("orange"), None);
        assert_eq!(Uncertainty::parse("high"), Some(Uncertainty::High));
        assert_eq!(Uncertainty::parse("very"), None);
    }

    #[test]
    fn serializes_wire_contract() {
        let validated = validate(json!({"riskTier": "red"}));
        let json = serde_json::to_value(&validated.response).unwrap();
        assert_eq!(json["riskTier"], "RED");
        assert_eq!(json["uncertainty"], "MEDIUM");
        assert_eq!(json["source"], "model");
        assert_eq!(json["model"], "medgemma:4b");
        for key in [
            "referralRecommended",
            "recommendedNextSteps",
            "watchOuts",
            "dangerSigns",
            "disclaimer",
            "reasoning",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn well_formed_candidate_passes_through() {
        let validated = validate(json!({
            "riskTier": "GREEN",
            "referralRecommended": false,
            "recommendedNextSteps": ["Rest", "Drink fluids"],
            "watchOuts": ["High fever"],
            "dangerSigns": [],
            "uncertainty": "LOW",
            "disclaimer": "Custom disclaimer.",
            "reasoning": "Mild viral symptoms."
        }));
        let r = validated.response;
        assert!(validated.repairs.is_empty());
        assert_eq!(r.risk_tier, RiskTier::Green);
        assert!(!r.referral_recommended);
        assert_eq!(r.recommended_next_steps, vec!["Rest", "Drink fluids"]);
        assert_eq!(r.uncertainty, Uncertainty::Low);
        assert_eq!(r.disclaimer, "Custom disclaimer.");
    }

    #[test]
    fn empty_candidate_gets_every_default() {
        let validated = validate(json!({}));
        let r = &validated.response;
        assert_eq!(r.risk_tier, RiskTier::Yellow);
        assert!(r.referral_recommended);
        assert_eq!(r.recommended_next_steps, vec![DEFAULT_NEXT_STEP]);
        assert_eq!(r.watch_outs, vec![DEFAULT_WATCH_OUT]);
        assert!(r.danger_signs.is_empty());
        assert_eq!(r.uncertainty, Uncertainty::Medium);
        assert_eq!(r.disclaimer, DISCLAIMER);
        assert_eq!(r.reasoning, DEFAULT_REASONING);
        assert!(r.is_complete());
        assert_eq!(validated.repairs.len(), 8);
        assert!(validated.repairs.iter().all(|f| f.kind == RepairKind::Missing));
    }

    #[test]
    fn referral_defaults_follow_risk_tier() {
        assert!(!validate(json!({"riskTier": "GREEN"})).response.referral_recommended);
        assert!(validate(json!({"riskTier": "RED"})).response.referral_recommended);
    }

    #[test]
    fn referral_accepts_textual_booleans() {
        let r = validate(json!({"riskTier": "RED", "referralRecommended": "false"})).response;
        assert!(!r.referral_recommended);
        let r = validate(json!({"riskTier": "GREEN", "referralRecommended": "maybe"})).response;
        assert!(!r.referral_recommended);
    }

    #[test]
    fn non_string_risk_tier_is_invalid() {
        let validated = validate(json!({"riskTier": 3}));
        assert_eq!(validated.response.risk_tier, RiskTier::Yellow);
        assert!(validated.repairs.contains(&FieldRepair {
            field: "riskTier",
            kind: RepairKind::Invalid,
        }));
    }

    #[test]
    fn lists_are_coerced() {
        let r = validate(json!({
            "recommendedNextSteps": "See a nurse today",
            "watchOuts": [],
            "dangerSigns": ["Stiff neck", null, 7, {"x": 1}, "  "]
        }))
        .response;
        assert_eq!(r.recommended_next_steps, vec!["See a nurse today"]);
        assert_eq!(r.watch_outs, vec![DEFAULT_WATCH_OUT]);
        assert_eq!(r.danger_signs, vec!["Stiff neck", "7"]);
    }

    #[test]
    fn provenance_keys_in_candidate_are_ignored() {
        let r = validate(json!({"model": "gpt-evil", "source": "heuristic"})).response;
        assert_eq!(r.model, "medgemma:4b");
        assert_eq!(r.source, Source::Model);
    }

    #[test]
    fn blank_strings_are_defaulted() {
        let r = validate(json!({"disclaimer": "   ", "reasoning": ""})).response;
        assert_eq!(r.disclaimer, DISCLAIMER);
        assert_eq!(r.reasoning, DEFAULT_REASONING);
    }
}
