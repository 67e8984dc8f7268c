use axum::{extract::State, http::StatusCode, Json};
use secrecy::Secret;
use service_core::error::AppError;
use tracing::{info, instrument, warn};

use crate::{
    dtos::{
        auth::{
            AuthResponse, ChangePasswordRequest, LoginRequest, MeResponse, RegisterRequest,
            SwitchCompanyRequest, UpdateProfileRequest,
        },
        ErrorResponse, MessageResponse,
    },
    middleware::AuthUser,
    models::{normalize_email, Membership, User, UserProfile},
    services::metrics,
    utils::{hash_password, verify_password, ValidatedJson},
    AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    let token = state.jwt.generate_access_token(user.user_id, &user.email)?;
    Ok(AuthResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expiry_seconds(),
        user: user.profile(),
    })
}

async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    state
        .db
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let password_hash = hash_password(&Secret::new(req.password))?;
    let user = User::new(req.email, password_hash, req.full_name);

    state.db.insert_user(&user).await?;
    info!(user_id = %user.user_id, "User registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = state.db.find_user_by_email(&req.email).await?;
    let password = Secret::new(req.password);

    let verified = match &user {
        Some(user) => verify_password(&password, &user.password_hash)?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!("Failed login attempt");
            metrics::record_error("login_failed");
            return Err(AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS)));
        }
    };

    info!(user_id = %user.user_id, "User logged in");
    Ok((StatusCode::OK, Json(auth_response(&state, &user)?)))
}

/// Current user with their company memberships
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(StatusCode, Json<MeResponse>), AppError> {
    let user = current_user(&state, &auth).await?;
    let memberships = state.db.list_memberships(user.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(MeResponse {
            active_company_id: user.active_company_id,
            user: user.into(),
            memberships,
        }),
    ))
}

/// Update name and/or e-mail
#[utoipa::path(
    patch,
    path = "/api/auth/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let full_name = req.full_name.as_deref().map(str::trim);
    let email = req.email.as_deref().map(normalize_email);

    let user = state
        .db
        .update_user_profile(auth.user_id, full_name, email.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(user.into())))
}

/// Change password
#[utoipa::path(
    post,
    path = "/api/auth/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Current password is incorrect", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth.user_id))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let user = current_user(&state, &auth).await?;

    if !verify_password(&Secret::new(req.current_password), &user.password_hash)? {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Current password is incorrect"
        )));
    }

    let new_hash = hash_password(&Secret::new(req.new_password))?;
    state.db.update_password_hash(user.user_id, &new_hash).await?;

    info!("Password changed");
    Ok((StatusCode::OK, Json(MessageResponse::new("Password changed"))))
}

/// Switch the active company
#[utoipa::path(
    post,
    path = "/api/auth/switch-company",
    request_body = SwitchCompanyRequest,
    responses(
        (status = 200, description = "Active company switched", body = Membership),
        (status = 403, description = "Not a member of that company", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth.user_id))]
pub async fn switch_company(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<SwitchCompanyRequest>,
) -> Result<(StatusCode, Json<Membership>), AppError> {
    let membership = state
        .db
        .find_membership(auth.user_id, req.company_id)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden(anyhow::anyhow!("You are not a member of this company"))
        })?;

    state
        .db
        .set_active_company(auth.user_id, Some(req.company_id))
        .await?;

    info!(company_id = %req.company_id, "Active company switched");
    Ok((StatusCode::OK, Json(membership)))
}
