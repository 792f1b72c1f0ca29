use super::types::{IntakeRequest, Task};

/// Rendered in place of an optional field the patient did not provide.
const NOT_PROVIDED: &str = "Not provided";

/// Build the prompt for `task`. Pure function of its inputs.
pub fn build_prompt(task: Task, request: &IntakeRequest) -> String {
    match task {
        Task::Triage | Task::Unrecognized => build_triage_prompt(request),
        Task::NormalizeIntake => build_normalize_prompt(request),
        Task::GenerateFollowup => build_followup_prompt(request),
        Task::GenerateReferral => build_referral_prompt(request),
    }
}

fn age(request: &IntakeRequest) -> String {
    request
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| NOT_PROVIDED.to_string())
}

fn text_or_placeholder(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_PROVIDED,
    }
}

/// "32yo F" style one-liner used by the auxiliary prompts.
fn patient_line(request: &IntakeRequest) -> String {
    let sex = request.sex.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (request.age, sex) {
        (Some(a), Some(s)) => format!("{a}yo {s}"),
        (Some(a), None) => format!("{a}yo, sex not provided"),
        (None, Some(s)) => format!("Age not provided, {s}"),
        (None, None) => "Age not provided, sex not provided".to_string(),
    }
}

fn followups(request: &IntakeRequest) -> String {
    let answers: Vec<&str> = request
        .followup_responses
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if answers.is_empty() {
        "None".to_string()
    } else {
        answers.join("; ")
    }
}

fn build_triage_prompt(request: &IntakeRequest) -> String {
    let age = age(request);
    let sex = text_or_placeholder(request.sex.as_deref());
    let location = text_or_placeholder(request.location.as_deref());
    let symptoms = request.symptoms.trim();
    let followups = followups(request);

    format!(
        r#"You are a clinical triage assistant. Return ONLY valid JSON.

Patient:
- Age: {age}
- Sex: {sex}
- Location: {location}
- Symptoms: {symptoms}
- Follow-up responses: {followups}

Return JSON with this exact schema:
{{
  "riskTier": "RED|YELLOW|GREEN",
  "referralRecommended": true,
  "recommendedNextSteps": ["..."],
  "watchOuts": ["..."],
  "dangerSigns": ["..."],
  "uncertainty": "LOW|MEDIUM|HIGH",
  "disclaimer": "This is not a diagnosis. Seek professional medical care.",
  "reasoning": "Brief clinical reasoning"
}}"#
    )
}

fn build_normalize_prompt(request: &IntakeRequest) -> String {
    let patient = patient_line(request);
    let location = text_or_placeholder(request.location.as_deref());
    let symptoms = request.symptoms.trim();

    format!(
        r#"You are a medical intake assistant. Normalize and structure the following patient symptoms.

Patient: {patient}
Location: {location}
Raw Symptoms: {symptoms}

Return ONLY valid JSON:
{{
  "primaryComplaint": "main medical issue",
  "duration": "how long occurring",
  "severity": "Mild|Moderate|Severe",
  "extractedSymptoms": ["symptom1", "symptom2"]
}}"#
    )
}

fn build_followup_prompt(request: &IntakeRequest) -> String {
    let age = age(request);
    let sex = text_or_placeholder(request.sex.as_deref());
    let location = text_or_placeholder(request.location.as_deref());
    let symptoms = request.symptoms.trim();

    format!(
        r#"You are a medical triage assistant. Generate 3-5 follow-up questions for this patient.

Age: {age}
Sex: {sex}
Location: {location}
Chief Complaint: {symptoms}

Generate questions to assess severity and urgency. Return ONLY a JSON object:
{{
  "questions": ["Question 1?", "Question 2?", "Question 3?"]
}}"#
    )
}

fn build_referral_prompt(request: &IntakeRequest) -> String {
    let patient = patient_line(request);
    let location = text_or_placeholder(request.location.as_deref());
    let symptoms = request.symptoms.trim();

    let mut assessment = String::new();
    if let Some(tier) = request.risk_tier.as_deref().filter(|t| !t.trim().is_empty()) {
        assessment.push_str(&format!("Assessed Risk Tier: {}\n", tier.trim()));
    }
    if !request.danger_signs.is_empty() {
        assessment.push_str(&format!(
            "Danger Signs: {}\n",
            request.danger_signs.join("; ")
        ));
    }

    format!(
        r#"You are a clinical referral assistant. Write a concise professional referral summary for the receiving healthcare provider.

Patient: {patient}
Location: {location}
Presenting Complaint: {symptoms}
{assessment}
Write 2-3 paragraphs covering: clinical presentation, assessment rationale, and recommended actions. Return ONLY a JSON object:
{{
  "summary": "Your referral summary text here..."
}}"#
    )
}
