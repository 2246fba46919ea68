/// End-to-end tests of the lead routes over the in-memory store.
/// Exercises create, merge, the health gates and error mapping without a database.
mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::*;
use heatos_lead_api::connection::ConnectionStatus;
use heatos_lead_api::db_storage::LeadStore;
use heatos_lead_api::errors::AppError;
use heatos_lead_api::memory_store::MemoryLeadStore;
use heatos_lead_api::models::{Identity, LeadStage};
use heatos_lead_api::repository::LeadRepository;
use heatos_lead_api::validation::parse_lead;

fn identity() -> Identity {
    Identity {
        email: EMAIL.to_string(),
        phone: PHONE.to_string(),
    }
}

#[tokio::test]
async fn test_create_minimal_lead_returns_calculator_link() {
    let app = TestApp::new();

    let (status, body) = app.post(&minimal_payload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "minimal");
    assert_eq!(body["dataAcquisitionLink"], app.links.calculator.as_str());
    assert_eq!(body["appointmentBookingLink"], Value::Null);
    assert!(body.get("existingData").is_none());
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_funnel_progression() {
    let app = TestApp::new();

    let (status, _) = app.post(&minimal_payload()).await;
    assert_eq!(status, StatusCode::OK);

    // Re-submitting through create never overwrites the record
    let (status, body) = app.post(&qualification_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "minimal");
    assert_eq!(body["dataAcquisitionLink"], app.links.calculator.as_str());
    assert_eq!(body["existingData"]["leadStage"], "minimal");
    assert_eq!(
        body["existingData"]["contact"]["contactInformation"]["email"],
        EMAIL
    );
    assert!(body["existingData"].get("building").is_none());

    let (status, body) = app.put(&qualification_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "qualification");
    assert_eq!(body["dataAcquisitionLink"], app.links.qualification.as_str());

    let (_, body) = app.put(&discovery_payload()).await;
    assert_eq!(body["leadStage"], "discovery");
    assert_eq!(body["dataAcquisitionLink"], app.links.photo_upload.as_str());

    let (_, body) = app.put(&selling_payload()).await;
    assert_eq!(body["leadStage"], "selling");
    assert_eq!(body["dataAcquisitionLink"], Value::Null);
    assert_eq!(
        body["appointmentBookingLink"],
        app.links.appointment_booking.as_str()
    );

    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_update_unknown_identity_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.put(&qualification_payload()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Lead entry does not exist for upsert");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_validation_reports_every_violation() {
    let app = TestApp::new();

    let mut payload = qualification_payload();
    payload["contact"]["contactInformation"]["phone"] = json!("0170 1234567");
    payload["building"]["buildingInformation"]["immoType"] = json!("Castle");
    payload["heatingSystem"]
        .as_object_mut()
        .unwrap()
        .remove("consumption");

    let (status, body) = app.post(&payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let paths: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"contact.contactInformation.phone"));
    assert!(paths.contains(&"building.buildingInformation.immoType"));
    assert!(paths.contains(&"heatingSystem.consumption"));
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn test_unknown_stage_is_rejected() {
    let app = TestApp::new();

    let mut payload = minimal_payload();
    payload["leadStage"] = json!("closed");

    let (status, body) = app.post(&payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["path"], "leadStage");
}

#[tokio::test]
async fn test_missing_stage_is_treated_as_minimal() {
    let app = TestApp::new();

    let mut payload = minimal_payload();
    payload.as_object_mut().unwrap().remove("leadStage");

    let (status, body) = app.post(&payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "minimal");
}

#[tokio::test]
async fn test_phone_is_normalized_before_lookup() {
    let app = TestApp::new();
    app.post(&minimal_payload()).await;

    let mut spaced = qualification_payload();
    spaced["contact"]["contactInformation"]["phone"] = json!(" +49 170 123 4567 ");

    let (status, body) = app.put(&spaced).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "qualification");
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/lead")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn test_backend_down_fails_fast() {
    let app = TestApp::new();
    app.post(&minimal_payload()).await;
    let calls_before = app.store.calls();

    app.status.set_backend_down(true);

    let (status, body) = app.put(&qualification_payload()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service temporarily unavailable");

    let (status, _) = app.post(&minimal_payload()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(app.store.calls(), calls_before);

    app.status.set_backend_down(false);
    let (status, _) = app.put(&qualification_payload()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_requests_before_initialization_are_rejected() {
    let app = TestApp::uninitialized();

    let (status, body) = app.post(&minimal_payload()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service is not initialized");
    assert_eq!(app.store.calls(), 0);

    app.status.mark_initialized();
    let (status, _) = app.post(&minimal_payload()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_repeated_update_is_idempotent() {
    let app = TestApp::new();
    app.post(&minimal_payload()).await;
    app.put(&discovery_payload()).await;

    let first = app.store.find_by_identity(&identity()).await.unwrap().unwrap();

    let (status, body) = app.put(&discovery_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "discovery");

    let second = app.store.find_by_identity(&identity()).await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.lead, first.lead);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_update_keeps_creation_time() {
    let app = TestApp::new();
    app.post(&minimal_payload()).await;
    let created = app.store.find_by_identity(&identity()).await.unwrap().unwrap();

    app.put(&selling_payload()).await;
    let updated = app.store.find_by_identity(&identity()).await.unwrap().unwrap();

    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.stage(), LeadStage::Selling);
}

#[tokio::test]
async fn test_downgrade_is_stored_as_submitted() {
    let app = TestApp::new();
    app.post(&minimal_payload()).await;
    app.put(&discovery_payload()).await;

    let (status, body) = app.put(&qualification_payload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leadStage"], "qualification");

    let stored = app.store.find_by_identity(&identity()).await.unwrap().unwrap();
    assert_eq!(stored.stage(), LeadStage::Qualification);

    let document = stored.lead.to_document().unwrap();
    assert!(document["heatingSystem"].get("numberOfRadiators").is_none());
}

#[tokio::test]
async fn test_unknown_keys_are_not_stored() {
    let app = TestApp::new();

    let mut payload = minimal_payload();
    payload["utmSource"] = json!("newsletter");
    app.post(&payload).await;

    let stored = app.store.find_by_identity(&identity()).await.unwrap().unwrap();
    let document = stored.lead.to_document().unwrap();
    assert!(document.get("utmSource").is_none());
}

#[tokio::test]
async fn test_duplicate_insert_maps_to_conflict() {
    let store = Arc::new(MemoryLeadStore::new());
    let status = ConnectionStatus::new();
    status.mark_initialized();
    let repository = LeadRepository::new(store, status);

    let lead = parse_lead(&minimal_payload()).unwrap();
    repository.insert(&lead).await.unwrap();

    let err = repository.insert(&lead).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_health_reflects_connection_state() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"]["initialized"], true);
    assert_eq!(body["backend"]["backendDown"], false);

    app.status.set_backend_down(true);
    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
}

#[tokio::test]
async fn test_health_bypasses_initialization_gate() {
    let app = TestApp::uninitialized();

    let (status, body) = app.send(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["backend"]["initialized"], false);
}

#[tokio::test]
async fn test_cors_mirrors_origin() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/lead")
        .header(header::ORIGIN, "https://www.vamo-energy.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://www.vamo-energy.com"
    );
}

#[tokio::test]
async fn test_create_losing_a_race_returns_conflict() {
    let app = TestApp::new();
    let (status, _) = app.post(&minimal_payload()).await;
    assert_eq!(status, StatusCode::OK);

    // Another request committed the identity after this one looked it up
    app.store.set_hide_existing(true);
    let (status, body) = app.post(&minimal_payload()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "Duplicate resource" }));
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = TestApp::new();

    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let invalid = Request::builder()
        .method(Method::POST)
        .uri("/api/lead")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    for request in [health, invalid] {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert_eq!(
            headers["strict-transport-security"],
            "max-age=15552000; includeSubDomains"
        );
        assert_eq!(headers["referrer-policy"], "no-referrer");
        assert_eq!(headers["cross-origin-opener-policy"], "same-origin");
        assert_eq!(headers["cross-origin-resource-policy"], "same-origin");
        assert_eq!(headers["origin-agent-cluster"], "?1");
        assert_eq!(headers["x-dns-prefetch-control"], "off");
        assert_eq!(headers["x-download-options"], "noopen");
        assert_eq!(headers["x-permitted-cross-domain-policies"], "none");
        assert_eq!(headers["x-xss-protection"], "0");
        assert!(headers.get("content-security-policy").is_none());
    }
}
