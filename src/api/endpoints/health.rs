//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::hardware::HardwareProfile;
use crate::model_service::ModelState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_id: String,
    pub model_state: &'static str,
    /// Load error, empty when there is none.
    pub error: String,
    pub gpu_available: bool,
    pub device_count: usize,
    /// Unix seconds.
    pub timestamp: f64,
}

/// `GET /health`. Always 200; load problems are reported in the body.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let provider = ctx.provider().clone();
    // One snapshot so the reported fields cannot disagree mid-load.
    let state = provider.state();
    let error = match &state {
        ModelState::Failed(e) => e.clone(),
        _ => String::new(),
    };

    let probe = provider.clone();
    let hardware = tokio::task::spawn_blocking(move || probe.probe_hardware())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Hardware probe task failed");
            HardwareProfile::cpu_fallback()
        });

    Json(HealthResponse {
        status: "ok",
        model_loaded: state == ModelState::Ready,
        model_id: provider.model_id().to_string(),
        model_state: state.as_str(),
        error,
        gpu_available: hardware.gpu_available,
        device_count: hardware.device_count,
        timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
    })
}
