pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::EarningsConfig;
use crate::services::{Database, JwtService};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::update_me,
        handlers::auth::change_password,
        handlers::auth::switch_company,
        handlers::companies::create_company,
        handlers::companies::list_my_companies,
        handlers::companies::get_current_company,
        handlers::companies::update_current_company,
        handlers::companies::delete_current_company,
        handlers::companies::list_members,
        handlers::companies::update_member,
        handlers::companies::remove_member,
        handlers::companies::leave_company,
        handlers::invitations::create_invitation,
        handlers::invitations::list_invitations,
        handlers::invitations::revoke_invitation,
        handlers::invitations::lookup_invitation,
        handlers::invitations::accept_invitation,
        handlers::services::list_services,
        handlers::services::get_service,
        handlers::services::create_service,
        handlers::services::update_service,
        handlers::services::delete_service,
        handlers::services::price_history,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::create_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::earnings::list_earnings,
        handlers::earnings::get_day,
        handlers::earnings::upsert_day,
        handlers::earnings::delete_day,
        handlers::transactions::create_transaction,
        handlers::transactions::update_transaction,
        handlers::transactions::delete_transaction,
        handlers::stats::my_stats,
        handlers::stats::company_stats,
        handlers::stats::daily_series,
        handlers::stats::service_popularity,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::AuthResponse,
            dtos::auth::MeResponse,
            dtos::auth::UpdateProfileRequest,
            dtos::auth::ChangePasswordRequest,
            dtos::auth::SwitchCompanyRequest,
            dtos::companies::CreateCompanyRequest,
            dtos::companies::UpdateCompanyRequest,
            dtos::companies::UpdateMemberRequest,
            dtos::invitations::CreateInvitationRequest,
            dtos::invitations::InvitationCreatedResponse,
            dtos::invitations::InvitationLookupResponse,
            dtos::services::CreateServiceRequest,
            dtos::services::UpdateServiceRequest,
            dtos::clients::CreateClientRequest,
            dtos::clients::UpdateClientRequest,
            dtos::earnings::UpsertDayRequest,
            dtos::transactions::TransactionRequest,
            models::UserProfile,
            models::Company,
            models::Role,
            models::Membership,
            models::CompanyMember,
            models::Invitation,
            models::InvitationState,
            models::CatalogService,
            models::PriceHistoryEntry,
            models::Client,
            models::ClientVisit,
            models::ClientDetail,
            models::EntryMode,
            models::DailyEarnings,
            models::DayDetail,
            models::PaymentMethod,
            models::PaymentLine,
            models::ClientTransaction,
            models::TransactionServiceLine,
            models::TransactionDetail,
            models::StatsPeriod,
            models::EarningsTotals,
            models::MyStats,
            models::EmployeeStats,
            models::CompanyStats,
            models::DailyPoint,
            models::ServicePopularity,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "User", description = "Profile, password and active company"),
        (name = "Companies", description = "Companies and their members"),
        (name = "Invitations", description = "Invite people to join a company"),
        (name = "Services", description = "Service catalog and price history"),
        (name = "Clients", description = "Client directory"),
        (name = "Earnings", description = "Daily earnings records"),
        (name = "Transactions", description = "Per-client transactions of a day"),
        (name = "Statistics", description = "Aggregated earnings"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EarningsConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Credential endpoints get their own, stricter limiter
    let login_limiter = state.login_rate_limiter.clone();
    let credential_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    // Signed in, no company required
    let account_routes = Router::new()
        .route(
            "/api/auth/me",
            get(handlers::auth::get_me).patch(handlers::auth::update_me),
        )
        .route("/api/auth/me/password", post(handlers::auth::change_password))
        .route("/api/auth/switch-company", post(handlers::auth::switch_company))
        .route(
            "/api/companies",
            get(handlers::companies::list_my_companies).post(handlers::companies::create_company),
        )
        .route(
            "/api/invitations/token/:token/accept",
            post(handlers::invitations::accept_invitation),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    // Signed in with an active company
    let tenant_routes = Router::new()
        .route(
            "/api/companies/current",
            get(handlers::companies::get_current_company)
                .patch(handlers::companies::update_current_company)
                .delete(handlers::companies::delete_current_company),
        )
        .route(
            "/api/companies/current/members",
            get(handlers::companies::list_members),
        )
        .route(
            "/api/companies/current/members/:user_id",
            patch(handlers::companies::update_member).delete(handlers::companies::remove_member),
        )
        .route(
            "/api/companies/current/leave",
            post(handlers::companies::leave_company),
        )
        .route(
            "/api/invitations",
            get(handlers::invitations::list_invitations)
                .post(handlers::invitations::create_invitation),
        )
        .route(
            "/api/invitations/:invitation_id",
            delete(handlers::invitations::revoke_invitation),
        )
        .route(
            "/api/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route(
            "/api/services/:service_id",
            get(handlers::services::get_service)
                .patch(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        .route(
            "/api/services/:service_id/price-history",
            get(handlers::services::price_history),
        )
        .route(
            "/api/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/api/clients/:client_id",
            get(handlers::clients::get_client)
                .patch(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route("/api/earnings", get(handlers::earnings::list_earnings))
        .route(
            "/api/earnings/:date",
            get(handlers::earnings::get_day)
                .put(handlers::earnings::upsert_day)
                .delete(handlers::earnings::delete_day),
        )
        .route(
            "/api/earnings/:date/transactions",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/transactions/:transaction_id",
            put(handlers::transactions::update_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .route("/api/stats", get(handlers::stats::my_stats))
        .route("/api/stats/company", get(handlers::stats::company_stats))
        .route("/api/stats/daily", get(handlers::stats::daily_series))
        .route("/api/stats/services", get(handlers::stats::service_popularity))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::tenant_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/api/invitations/token/:token",
            get(handlers::invitations::lookup_invitation),
        );

    if state.config.is_dev() {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let ip_limiter = state.ip_rate_limiter.clone();
    let cors = cors_layer(&state.config.security.allowed_origins);

    app.merge(credential_routes)
        .merge(account_routes)
        .merge(tenant_routes)
        .with_state(state)
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
