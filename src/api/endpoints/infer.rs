//! Inference endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::time::Instant;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::triage::{InferenceOutput, IntakeRequest};

/// `POST /infer`: triage or an auxiliary task for one intake.
///
/// The blocking orchestration runs on the blocking pool under
/// `request_timeout`. If the guard fires or the task dies, the request is
/// answered by the heuristic classifier. The same deadline travels into the
/// orchestrator, so an abandoned request that is still queued for the model
/// never starts a generation.
pub async fn infer(
    State(ctx): State<ApiContext>,
    payload: Result<Json<IntakeRequest>, JsonRejection>,
) -> Result<Json<InferenceOutput>, ApiError> {
    let Json(request) = payload?;
    if request.symptoms.trim().is_empty() {
        return Err(ApiError::BadRequest("symptoms must not be empty".into()));
    }

    let orchestrator = ctx.orchestrator.clone();
    let intake = request.clone();
    let deadline = Instant::now() + ctx.request_timeout;
    let work =
        tokio::task::spawn_blocking(move || orchestrator.infer(&intake, Some(deadline)));

    let output = match tokio::time::timeout(ctx.request_timeout, work).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Inference task failed, using heuristic");
            ctx.orchestrator.fallback(&request)
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = ctx.request_timeout.as_secs_f64(),
                "Inference timed out, using heuristic"
            );
            ctx.orchestrator.fallback(&request)
        }
    };

    Ok(Json(output))
}
