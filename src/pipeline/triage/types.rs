use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::TriageResponse;

/// Patient intake submitted to `POST /infer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRequest {
    pub symptoms: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub followup_responses: Vec<String>,
    /// Raw task selector; resolved with `Task::resolve`.
    #[serde(default)]
    pub task: Option<String>,
    /// Risk tier computed upstream, if any.
    #[serde(default)]
    pub risk_tier: Option<String>,
    #[serde(default)]
    pub danger_signs: Vec<String>,
}

impl IntakeRequest {
    pub fn new(symptoms: &str) -> Self {
        Self {
            symptoms: symptoms.to_string(),
            ..Self::default()
        }
    }

    pub fn with_task(mut self, task: &str) -> Self {
        self.task = Some(task.to_string());
        self
    }
}

/// The inference tasks served by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Triage,
    NormalizeIntake,
    GenerateFollowup,
    GenerateReferral,
    /// Any other selector: triage prompt, auxiliary budget, passthrough output.
    Unrecognized,
}

impl Task {
    /// Resolve the request's task selector. Matching is exact; an absent
    /// selector means triage.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw {
            None | Some("triage") => Task::Triage,
            Some("normalize_intake") => Task::NormalizeIntake,
            Some("generate_followup") => Task::GenerateFollowup,
            Some("generate_referral") => Task::GenerateReferral,
            Some(other) => {
                tracing::warn!(task = other, "Unknown task, using triage prompt");
                Task::Unrecognized
            }
        }
    }

    /// Only triage output is held to the strict response schema.
    pub fn is_triage(self) -> bool {
        self == Task::Triage
    }

    /// Token budget for one generation. Triage carries the largest schema.
    pub fn max_tokens(self) -> u32 {
        match self {
            Task::Triage => 350,
            _ => 250,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Task::Triage => "triage",
            Task::NormalizeIntake => "normalize_intake",
            Task::GenerateFollowup => "generate_followup",
            Task::GenerateReferral => "generate_referral",
            Task::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `/infer` returns: the strict triage contract, or a task-defined mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InferenceOutput {
    Triage(TriageResponse),
    Auxiliary(Map<String, Value>),
}

impl InferenceOutput {
    pub fn as_triage(&self) -> Option<&TriageResponse> {
        match self {
            InferenceOutput::Triage(t) => Some(t),
            InferenceOutput::Auxiliary(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_deserializes_camel_case_with_defaults() {
        let req: IntakeRequest = serde_json::from_str(
            r#"{"symptoms":"fever","age":32,"followupResponses":["2 days"],"task":"triage"}"#,
        )
        .unwrap();
        assert_eq!(req.symptoms, "fever");
        assert_eq!(req.age, Some(32));
        assert_eq!(req.followup_responses, vec!["2 days"]);
        assert!(req.sex.is_none());
        assert!(req.danger_signs.is_empty());
    }

    #[test]
    fn intake_requires_symptoms() {
        let result: Result<IntakeRequest, _> = serde_json::from_str(r#"{"age":4}"#);
        assert!(result.is_err());
    }

    #[test]
    fn task_resolution() {
        assert_eq!(Task::resolve(None), Task::Triage);
        assert_eq!(Task::resolve(Some("triage")), Task::Triage);
        assert_eq!(Task::resolve(Some("normalize_intake")), Task::NormalizeIntake);
        assert_eq!(Task::resolve(Some("generate_followup")), Task::GenerateFollowup);
        assert_eq!(Task::resolve(Some("generate_referral")), Task::GenerateReferral);
        assert_eq!(Task::resolve(Some("summarize")), Task::Unrecognized);
    }

    #[test]
    fn task_matching_is_exact() {
        assert_eq!(Task::resolve(Some("TRIAGE")), Task::Unrecognized);
        assert_eq!(Task::resolve(Some(" triage ")), Task::Unrecognized);
        assert_eq!(Task::resolve(Some("")), Task::Unrecognized);
        assert_eq!(Task::resolve(Some("Generate_Followup")), Task::Unrecognized);
    }

    #[test]
    fn unrecognized_task_uses_auxiliary_budget() {
        assert_eq!(Task::Unrecognized.max_tokens(), 250);
        assert!(!Task::Unrecognized.is_triage());
        assert!(Task::Triage.is_triage());
    }

    #[test]
    fn triage_gets_larger_budget() {
        assert_eq!(Task::Triage.max_tokens(), 350);
        assert_eq!(Task::GenerateReferral.max_tokens(), 250);
        assert!(Task::Triage.max_tokens() > Task::NormalizeIntake.max_tokens());
    }

    #[test]
    fn auxiliary_output_serializes_as_plain_mapping() {
        let mut map = Map::new();
        map.insert("questions".into(), serde_json::json!(["Q1?"]));
        let json = serde_json::to_value(InferenceOutput::Auxiliary(map)).unwrap();
        assert_eq!(json, serde_json::json!({"questions": ["Q1?"]}));
    }
}
