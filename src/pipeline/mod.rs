pub mod ollama;
pub mod ollama_types;
pub mod triage; // Intake → MedGemma → normalized triage, with heuristic fallback
