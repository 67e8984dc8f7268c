mod common;

use common::TestApp;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn health_reports_postgres_up() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["postgresql"], "up");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/ready")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/.well-known/openapi.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/api/earnings/{date}"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}
