//! End-to-end check against a running instance.
//!
//! Calls `/health`, then `/infer` with a red-flag intake, and verifies the
//! triage contract. Prints `SMOKE_TEST_OK` on success.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

pub const SMOKE_OK_MARKER: &str = "SMOKE_TEST_OK";

const TRIAGE_KEYS: &[&str] = &[
    "riskTier",
    "referralRecommended",
    "recommendedNextSteps",
    "watchOuts",
    "dangerSigns",
    "uncertainty",
    "disclaimer",
    "reasoning",
    "model",
    "source",
];

pub async fn run(base_url: &str, timeout: Duration) -> Result<()> {
    let base = base_url.trim_end_matches('/');
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("building HTTP client")?;

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .with_context(|| format!("GET {base}/health"))?
        .error_for_status()?
        .json()
        .await
        .context("decoding /health")?;
    check_health(&health)?;
    println!(
        "health: modelLoaded={} modelId={} gpuAvailable={}",
        health["modelLoaded"], health["modelId"], health["gpuAvailable"]
    );

    let triage: Value = client
        .post(format!("{base}/infer"))
        .json(&json!({
            "symptoms": "chest pain and shortness of breath",
            "age": 54,
            "sex": "M",
            "location": "rural clinic"
        }))
        .send()
        .await
        .with_context(|| format!("POST {base}/infer"))?
        .error_for_status()?
        .json()
        .await
        .context("decoding /infer")?;
    check_triage_contract(&triage)?;
    println!(
        "infer: riskTier={} source={}",
        triage["riskTier"], triage["source"]
    );

    println!("{SMOKE_OK_MARKER}");
    Ok(())
}

pub fn check_health(health: &Value) -> Result<()> {
    if health["status"] != "ok" {
        bail!("unexpected health status: {}", health["status"]);
    }
    if !health["modelLoaded"].is_boolean() {
        bail!("health is missing modelLoaded");
    }
    Ok(())
}

pub fn check_triage_contract(triage: &Value) -> Result<()> {
    for key in TRIAGE_KEYS {
        if triage.get(*key).is_none() {
            bail!("triage response is missing {key}");
        }
    }
    match triage["riskTier"].as_str() {
        Some("RED" | "YELLOW" | "GREEN") => {}
        other => bail!("invalid riskTier: {other:?}"),
    }
    match triage["source"].as_str() {
        Some("model" | "heuristic") => {}
        other => bail!("invalid source: {other:?}"),
    }
    Ok(())
}
