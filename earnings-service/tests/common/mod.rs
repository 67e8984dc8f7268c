//! Common test utilities for earnings-service integration tests.
//!
//! Tests that talk to PostgreSQL are `#[ignore]`d and read `TEST_DATABASE_URL`.
//! Every test signs up its own users with unique e-mails, so tests share one
//! database without cleanup.

#![allow(dead_code)]

use earnings_service::config::{
    DatabaseConfig, EarningsConfig, Environment, InvitationConfig, JwtConfig, RateLimitConfig,
    SecurityConfig,
};
use earnings_service::startup::Application;
use reqwest::{Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,earnings_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(database_url: String) -> EarningsConfig {
    EarningsConfig {
        common: CommonConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "earnings-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url,
            max_connections: 4,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_JWT_SECRET.to_string()),
            expiry_hours: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        invitation: InvitationConfig {
            base_url: "http://localhost:3000/invite/".to_string(),
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

/// A signed-up user and the bearer token issued at sign-up.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let database_url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set to run database tests");

        let app = Application::build(test_config(database_url))
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            address,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str, token: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, path: &str, token: &str, body: &Value) -> Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn register(&self, full_name: &str) -> TestUser {
        let email = unique_email(full_name);
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "email": email,
                "password": TEST_PASSWORD,
                "full_name": full_name,
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = response.json().await.expect("Invalid JSON");
        TestUser {
            user_id: uuid_at(&body["user"]["user_id"]),
            email,
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Sign up a user who owns a freshly created, active company.
    pub async fn register_owner(&self) -> (TestUser, Uuid) {
        let owner = self.register("Owner").await;
        let company_id = self.create_company(&owner, "Salon Test").await;
        (owner, company_id)
    }

    pub async fn create_company(&self, user: &TestUser, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/companies",
                &user.token,
                &json!({ "company_name": name }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid JSON");
        uuid_at(&body["company_id"])
    }

    /// Invite a new user into the owner's active company and accept it.
    pub async fn add_employee(&self, owner: &TestUser) -> TestUser {
        let employee = self.register("Employee").await;
        let response = self
            .post(
                "/api/invitations",
                &owner.token,
                &json!({ "email": employee.email }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid JSON");
        let token = body["invite_token"].as_str().expect("invite_token");

        let response = self
            .post(
                &format!("/api/invitations/token/{}/accept", token),
                &employee.token,
                &json!({}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        employee
    }

    pub async fn create_service(&self, owner: &TestUser, name: &str, price: &str) -> Uuid {
        let response = self
            .post(
                "/api/services",
                &owner.token,
                &json!({ "service_name": name, "price": price }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid JSON");
        uuid_at(&body["service_id"])
    }

    pub async fn create_client(&self, user: &TestUser, name: &str) -> Uuid {
        let response = self
            .post("/api/clients", &user.token, &json!({ "client_name": name }))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid JSON");
        uuid_at(&body["client_id"])
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}@salon.test",
        prefix.to_lowercase().replace(' ', "."),
        Uuid::new_v4().simple()
    )
}

pub fn uuid_at(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("expected a UUID, got {}", value))
}

/// Money fields serialize as decimal strings.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a money value, got {}", other),
    }
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}
