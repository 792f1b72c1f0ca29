//! Deterministic keyword triage, used whenever the model cannot answer.
//!
//! Case-insensitive substring matching against two fixed term sets. The
//! RED check runs first, so text matching both sets is RED. No I/O.

use super::schema::{RiskTier, Source, TriageResponse, Uncertainty, DEFAULT_WATCH_OUT, DISCLAIMER};

/// Emergency red-flag terms.
pub const RED_TERMS: &[&str] = &[
    "chest pain",
    "cannot breathe",
    "can't breathe",
    "unconscious",
    "seizure",
    "convulsion",
];

/// Moderate-risk terms.
pub const YELLOW_TERMS: &[&str] = &["fever", "vomit", "vomiting", "pain", "cough", "weakness"];

fn matches_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Classify free-text symptoms. `model_id` is reported unchanged in the
/// `model` field; the `source` tag is always `heuristic`.
pub fn classify(symptoms: &str, model_id: &str) -> TriageResponse {
    let s = symptoms.to_lowercase();

    if matches_any(&s, RED_TERMS) {
        return TriageResponse {
            risk_tier: RiskTier::Red,
            referral_recommended: true,
            recommended_next_steps: vec!["Seek emergency care immediately.".into()],
            watch_outs: vec![
                "Breathing difficulty".into(),
                "Loss of consciousness".into(),
            ],
            danger_signs: vec!["Critical symptom pattern".into()],
            uncertainty: Uncertainty::Low,
            disclaimer: DISCLAIMER.into(),
            reasoning: "Heuristic detected emergency red-flag symptoms.".into(),
            model: model_id.into(),
            source: Source::Heuristic,
        };
    }

    if matches_any(&s, YELLOW_TERMS) {
        return TriageResponse {
            risk_tier: RiskTier::Yellow,
            referral_recommended: true,
            recommended_next_steps: vec![
                "Visit a clinic within 24 hours.".into(),
                "Monitor symptoms closely.".into(),
            ],
            watch_outs: vec![
                "Worsening fever".into(),
                "Persistent vomiting".into(),
                "New danger signs".into(),
            ],
            danger_signs: vec![],
            uncertainty: Uncertainty::Medium,
            disclaimer: DISCLAIMER.into(),
            reasoning: "Heuristic detected moderate-risk symptoms.".into(),
            model: model_id.into(),
            source: Source::Heuristic,
        };
    }

    TriageResponse {
        risk_tier: RiskTier::Green,
        referral_recommended: false,
        recommended_next_steps: vec!["Home care and monitor symptoms.".into()],
        watch_outs: vec![DEFAULT_WATCH_OUT.into()],
        danger_signs: vec![],
        uncertainty: Uncertainty::Medium,
        disclaimer: DISCLAIMER.into(),
        reasoning: "No high-risk symptom terms detected.".into(),
        model: model_id.into(),
        source: Source::Heuristic,
    }
}
