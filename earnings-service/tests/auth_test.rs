//! Registration, login and profile.
//!
//! Run with: TEST_DATABASE_URL=postgres://... cargo test -p earnings-service -- --ignored

mod common;

use common::{unique_email, TestApp, TEST_PASSWORD};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn register_returns_token_and_profile() {
    let app = TestApp::spawn().await;
    let email = unique_email("Anna");

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "email": email.to_uppercase(),
            "password": TEST_PASSWORD,
            "full_name": "Anna Schmidt",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_i64().unwrap() > 0);
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["full_name"], "Anna Schmidt");
    assert!(body["user"]["active_company_id"].is_null());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::spawn().await;
    let user = app.register("Anna").await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "email": user.email,
            "password": TEST_PASSWORD,
            "full_name": "Someone Else",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn register_rejects_short_password() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "email": unique_email("short"),
            "password": "short",
            "full_name": "Short Password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn login_with_correct_and_wrong_password() {
    let app = TestApp::spawn().await;
    let user = app.register("Login").await;

    let ok = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": user.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body: Value = ok.json().await.unwrap();
    assert!(body["token"].as_str().is_some());

    let wrong = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": user.email, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["error"], "Invalid email or password");

    let unknown = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": unique_email("nobody"), "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn me_lists_memberships_after_company_creation() {
    let app = TestApp::spawn().await;
    let (owner, company_id) = app.register_owner().await;

    let response = app.get("/api/auth/me", &owner.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["active_company_id"], company_id.to_string());
    let memberships = body["memberships"].as_array().unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0]["role_code"], "owner");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn change_password_requires_current_password() {
    let app = TestApp::spawn().await;
    let user = app.register("Password").await;

    let wrong = app
        .post(
            "/api/auth/me/password",
            &user.token,
            &json!({ "current_password": "nope", "new_password": "brand-new-secret" }),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = app
        .post(
            "/api/auth/me/password",
            &user.token,
            &json!({ "current_password": TEST_PASSWORD, "new_password": "brand-new-secret" }),
        )
        .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let login = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": user.email, "password": "brand-new-secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn switch_company_requires_membership() {
    let app = TestApp::spawn().await;
    let (owner, first) = app.register_owner().await;
    let second = app.create_company(&owner, "Second Salon").await;
    let (_stranger, foreign) = app.register_owner().await;

    let response = app
        .post(
            "/api/auth/switch-company",
            &owner.token,
            &json!({ "company_id": first }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let me: Value = app.get("/api/auth/me", &owner.token).await.json().await.unwrap();
    assert_eq!(me["active_company_id"], first.to_string());
    assert_ne!(first, second);

    let response = app
        .post(
            "/api/auth/switch-company",
            &owner.token,
            &json!({ "company_id": foreign }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn tenant_routes_need_an_active_company() {
    let app = TestApp::spawn().await;
    let user = app.register("Loner").await;

    let response = app.get("/api/services", &user.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn profile_update_changes_name_and_email() {
    let app = TestApp::spawn().await;
    let user = app.register("Before").await;
    let other = app.register("Taken").await;
    let new_email = unique_email("After");

    let response = app
        .patch(
            "/api/auth/me",
            &user.token,
            &json!({ "full_name": "  After Rename ", "email": new_email.to_uppercase() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["full_name"], "After Rename");
    assert_eq!(body["email"], new_email);

    // Only the given field changes
    let response = app
        .patch("/api/auth/me", &user.token, &json!({ "full_name": "Final Name" }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["full_name"], "Final Name");
    assert_eq!(body["email"], new_email);

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": new_email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .patch("/api/auth/me", &user.token, &json!({ "email": other.email }))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
