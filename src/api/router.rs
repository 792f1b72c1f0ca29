//! Triage API router.
//!
//! Layers (outermost → innermost): CORS → request log → handler.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the service router. Mountable on any axum server.
pub fn triage_api_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/infer", post(endpoints::infer::infer))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        // Browser front-ends reach the service through tunnels on arbitrary origins
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::types::testing::context_with;
    use crate::pipeline::ollama::MockLlmClient;

    fn post_infer(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/infer")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok_and_tagged_with_request_id() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), false));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["modelLoaded"], false);
    }

    #[tokio::test]
    async fn infer_returns_full_triage_contract() {
        let reply = "```json\n{\"riskTier\":\"YELLOW\",\"watchOuts\":[\"Dehydration\"]}\n```";
        let app = triage_api_router(context_with(MockLlmClient::new(reply), true));
        let response = app
            .oneshot(post_infer(r#"{"symptoms":"vomiting twice","age":4,"sex":"F"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["riskTier"], "YELLOW");
        assert_eq!(json["watchOuts"], serde_json::json!(["Dehydration"]));
        assert_eq!(json["source"], "model");
        assert_eq!(json["model"], "medgemma:4b");
        for key in [
            "referralRecommended",
            "recommendedNextSteps",
            "dangerSigns",
            "uncertainty",
            "disclaimer",
            "reasoning",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn generation_failure_still_returns_200() {
        let app = triage_api_router(context_with(MockLlmClient::failing("boom"), true));
        let response = app
            .oneshot(post_infer(r#"{"symptoms":"chest pain and fever"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["riskTier"], "RED");
        assert_eq!(json["source"], "heuristic");
    }

    #[tokio::test]
    async fn unloaded_model_uses_heuristic() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), false));
        let response = app
            .oneshot(post_infer(r#"{"symptoms":"mild headache yesterday"}"#))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["riskTier"], "GREEN");
        assert_eq!(json["source"], "heuristic");
    }

    #[tokio::test]
    async fn auxiliary_task_returns_mapping() {
        let reply = r#"{"questions":["When did it start?","Any fever?"]}"#;
        let app = triage_api_router(context_with(MockLlmClient::new(reply), true));
        let response = app
            .oneshot(post_infer(
                r#"{"symptoms":"cough","task":"generate_followup"}"#,
            ))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["questions"][1], "Any fever?");
        assert_eq!(json["source"], "model");
        assert!(json.get("riskTier").is_none());
    }

    #[tokio::test]
    async fn missing_symptoms_is_bad_request() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), true));
        let response = app.oneshot(post_infer(r#"{"age":30}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn blank_symptoms_is_bad_request() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), true));
        let response = app
            .oneshot(post_infer(r#"{"symptoms":"  "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_client_error() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), true));
        let response = app.oneshot(post_infer("{not json")).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), true));
        let response = app
            .oneshot(Request::builder().uri("/predict").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let app = triage_api_router(context_with(MockLlmClient::new("{}"), true));
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/infer")
                    .header("Origin", "https://example.org")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
