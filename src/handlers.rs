use crate::connection::ConnectionStatus;
use crate::errors::AppError;
use crate::lead_service::LeadService;
use crate::models::LeadResponse;
use crate::validation::parse_lead;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Create/update flows over gated storage.
    pub leads: LeadService,
    /// Backend health, shared with the connection monitor.
    pub status: ConnectionStatus,
}

/// Health check endpoint.
///
/// Returns the service status, version and backend connection state. Responds
/// 503 until the service is initialized or while the backend is down.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let snapshot = state.status.snapshot();
    let serving = snapshot.initialized && !snapshot.backend_down;

    let status = if serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if serving { "healthy" } else { "unavailable" },
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "backend": snapshot,
        })),
    )
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// POST /api/lead
///
/// Creates a lead for a new (email, phone) identity. For a known identity the
/// existing record is returned under `existingData` and nothing is written.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LeadResponse>, AppError> {
    let lead = parse_lead(&body(payload)?)?;
    tracing::info!("POST /lead - stage: {}", lead.stage());

    let response = state.leads.create_lead(lead).await?;
    Ok(Json(response))
}

/// PUT /api/lead
///
/// Merges a stage payload into the existing record for its identity.
/// 404 if the identity has never been created.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LeadResponse>, AppError> {
    let lead = parse_lead(&body(payload)?)?;
    tracing::info!("PUT /lead - stage: {}", lead.stage());

    let response = state.leads.update_lead(lead).await?;
    Ok(Json(response))
}

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the working directory; 404 if it is missing.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page, loading the spec from `serve_openapi_spec`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>HeatOS Lead API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
