//! End-to-end tests of the HTTP API
//!
//! WireMock plays the Ollama daemon; requests go through the real router,
//! provisioner and reqwest client.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ollama_backend::availability::AvailabilityCache;
use ollama_backend::ollama_client::{OllamaClient, MODEL};
use ollama_backend::provisioner::ModelProvisioner;
use ollama_backend::BackendService;

/// Router wired to a mock daemon
fn app_for(server: &MockServer) -> Router {
    let client = OllamaClient::new(server.uri()).expect("client builds");
    let provisioner = Arc::new(ModelProvisioner::new(
        Arc::new(client),
        Arc::new(AvailabilityCache::default()),
    ));
    Arc::new(BackendService::new(provisioner)).create_router()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_raw(app: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn mount_tags(server: &MockServer, models: &[&str]) {
    let models: Vec<Value> = models.iter().map(|name| json!({ "name": name })).collect();
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
        .mount(server)
        .await;
}

async fn mount_generate(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": MODEL, "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": MODEL,
            "response": reply,
            "done": true
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_ollama_health_reports_models() {
    let server = MockServer::start().await;
    mount_tags(&server, &["mistral:7b", MODEL]).await;
    let app = app_for(&server);

    let (status, body) = get(&app, "/api/health/ollama").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ollama"], "available");
    assert_eq!(body["model"], MODEL);
    assert_eq!(body["modelAvailable"], true);
    assert_eq!(body["availableModels"], json!(["mistral:7b", MODEL]));
}

#[tokio::test]
async fn test_ollama_health_when_daemon_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = app_for(&server);

    let (status, body) = get(&app, "/api/health/ollama").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({ "status": "unhealthy", "message": "Ollama service is not available" })
    );
}

#[tokio::test]
async fn test_trip_extraction_end_to_end() {
    let server = MockServer::start().await;
    mount_tags(&server, &[MODEL]).await;
    mount_generate(
        &server,
        r#"[{"title":"Eiffel Tower","location":"Paris","category":"attraction"}]"#,
    )
    .await;
    let app = app_for(&server);

    let (status, body) = post_json(
        &app,
        "/api/trip/process",
        json!({ "text": "Visiting Paris next week, saw the Eiffel Tower." }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Paris");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Eiffel Tower");
    assert_eq!(items[0]["category"], "attraction");
    assert_eq!(items[0]["dateRange"], json!({ "start": null, "end": null }));
    assert_eq!(items[0]["highlights"], json!([]));
}

#[tokio::test]
async fn test_model_supplied_city_passes_through() {
    let server = MockServer::start().await;
    mount_tags(&server, &[MODEL]).await;
    mount_generate(
        &server,
        r#"{"city":"Paris","items":[{"title":"Eiffel Tower","location":"Champ de Mars","category":"attraction","dateRange":{"start":"06-14","end":"06-14"},"highlights":["summit at sunset"]}]}"#,
    )
    .await;
    let app = app_for(&server);

    let (status, body) = post_json(
        &app,
        "/api/trip/process",
        json!({ "text": "Visiting Paris next week, saw the Eiffel Tower." }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Paris");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["location"], "Champ de Mars");
    assert_eq!(items[0]["dateRange"], json!({ "start": "06-14", "end": "06-14" }));
    assert_eq!(items[0]["highlights"], json!(["summit at sunset"]));
    assert_eq!(items[0]["description"], "");
}

#[tokio::test]
async fn test_refusal_with_empty_list_is_500() {
    let server = MockServer::start().await;
    mount_tags(&server, &[MODEL]).await;
    let reply = "I could not find any travel locations in that text, so the list is empty: []";
    mount_generate(&server, reply).await;
    let app = app_for(&server);

    let (status, body) = post_json(&app, "/api/trip/process", json!({ "text": "hello" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to parse AI response");
    assert_eq!(body["raw"], reply);
}

#[tokio::test]
async fn test_missing_model_is_pulled_before_first_call() {
    let server = MockServer::start().await;
    mount_tags(&server, &[]).await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(json!({ "name": MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "not json at all\n{\"status\":\"pulling manifest\"}\n{\"status\":\"success\"}\n",
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_generate(&server, "Conversion rose after the banner change.").await;
    let app = app_for(&server);

    let request = json!({ "description": "Banner A/B test" });
    let (status, body) = post_json(&app, "/api/experiment/summarize", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "summary": "Conversion rose after the banner change." }));

    // Cached as available: no second pull
    let (status, _) = post_json(&app, "/api/experiment/summarize", request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_daemon_down_is_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = app_for(&server);

    let (status, body) = post_json(&app, "/api/trip/process", json!({ "text": "Rome in May" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Ollama service is not available"));
    assert_eq!(body["details"], "Check /api/health/ollama to verify Ollama status");
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let (status, body) = post_json(&app, "/api/trip/process", json!({ "text": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text is required");

    let (status, body) = post_json(&app, "/api/trip/process", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text is required");

    let (status, body) = post_json(&app, "/api/experiment/summarize", json!({ "notes": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "At least one section is required");

    let (status, body) = post_raw(&app, "/api/trip/process", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    // Validation never reaches the daemon
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let text = "a".repeat(200 * 1024);
    let (status, _) = post_json(&app, "/api/trip/process", json!({ "text": text })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_model_not_found_forces_recheck() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": MODEL }]
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(format!("{{\"error\":\"model '{}' not found\"}}", MODEL)),
        )
        .mount(&server)
        .await;
    let app = app_for(&server);

    let (status, body) = post_json(&app, "/api/trip/process", json!({ "text": "Lisbon trip" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to process travel text"));

    let (status, _) = post_json(&app, "/api/trip/process", json!({ "text": "Lisbon trip" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unparseable_reply_is_500_with_raw() {
    let server = MockServer::start().await;
    mount_tags(&server, &[MODEL]).await;
    mount_generate(&server, "I could not find any places in that text.").await;
    let app = app_for(&server);

    let (status, body) = post_json(&app, "/api/trip/process", json!({ "text": "hello there" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to parse AI response");
    assert_eq!(body["raw"], "I could not find any places in that text.");
    assert!(body["details"].is_string());
}
