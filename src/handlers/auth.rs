//! # Auth API Handlers
//!
//! Login, registration, token refresh and the caller's own account.

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use crate::auth::{AuthUser, token_rejection};
use crate::error::{ApiError, RepositoryError, unauthorized};
use crate::handlers::employees::{EmployeeResponse, employee_view};
use crate::handlers::types::{ApiJson, FieldErrors, MessageResponse};
use crate::handlers::users::UserResponse;
use crate::models::Role;
use crate::models::user::Model as UserModel;
use crate::password::{MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::repositories::user::NewUser;
use crate::repositories::{EmployeeRepository, UserRepository};
use crate::server::AppState;
use crate::tokens::TokenType;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@hr.com")]
    pub email: String,
    #[schema(example = "password")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer access token
    pub token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
    pub user: UserResponse,
    pub employee: Option<EmployeeResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "new.hire@hr.com")]
    pub email: String,
    #[schema(example = "s3cret!")]
    pub password: String,
    /// Defaults to `employee`
    pub role: Option<Role>,
    pub employee_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "User created successfully")]
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    #[schema(example = 86400)]
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub employee: Option<EmployeeResponse>,
}

fn password_failure(err: crate::password::PasswordError) -> ApiError {
    tracing::error!(error = %err, "Password hashing failed");
    ApiError::from(anyhow::anyhow!(err))
}

async fn linked_employee(
    state: &AppState,
    user: &UserModel,
) -> Result<Option<EmployeeResponse>, RepositoryError> {
    let Some(employee_id) = user.employee_id else {
        return Ok(None);
    };
    match EmployeeRepository::new(&state.db).find_by_id(employee_id).await? {
        Some(employee) => Ok(Some(employee_view(&state.db, employee).await?)),
        None => Ok(None),
    }
}

/// Exchange credentials for an access and refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = ApiError),
        (status = 401, description = "Invalid credentials or inactive account", body = ApiError, example = json!({
            "code": "UNAUTHORIZED",
            "message": "Invalid credentials",
            "trace_id": "corr-12345678"
        }))
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let users = UserRepository::new(&state.db);
    let email = body.email.trim().to_lowercase();

    let Some(user) = users.find_by_email(&email).await? else {
        counter!("hr_login_attempts_total", "outcome" => "unknown_user").increment(1);
        tracing::info!("Login rejected: unknown email");
        return Err(unauthorized(Some(INVALID_CREDENTIALS)));
    };

    if !user.is_active {
        counter!("hr_login_attempts_total", "outcome" => "inactive").increment(1);
        tracing::info!(user_id = user.id, "Login rejected: inactive account");
        return Err(unauthorized(Some("Account is inactive")));
    }

    if !verify_password(&body.password, &user.password_hash).map_err(password_failure)? {
        counter!("hr_login_attempts_total", "outcome" => "bad_password").increment(1);
        tracing::info!(user_id = user.id, "Login rejected: bad password");
        return Err(unauthorized(Some(INVALID_CREDENTIALS)));
    }

    let now = Utc::now();
    let issued = state
        .tokens
        .issue_pair(user.id, user.role, now)
        .map_err(token_rejection)?;
    let user = users.record_login(user, &issued.refresh_token, now).await?;
    let employee = linked_employee(&state, &user).await?;

    counter!("hr_login_attempts_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token: issued.access_token,
        refresh_token: issued.refresh_token,
        expires_in: issued.expires_in,
        user: user.into(),
        employee,
    }))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError, example = json!({
            "code": "CONFLICT",
            "message": "User already exists",
            "trace_id": "corr-12345678"
        }))
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    FieldErrors::new()
        .email("email", &body.email)
        .check(
            "password",
            body.password.chars().count() >= MIN_PASSWORD_LEN,
            "must be at least 6 characters",
        )
        .finish()?;

    if let Some(employee_id) = body.employee_id {
        let linked = EmployeeRepository::new(&state.db)
            .find_by_id(employee_id)
            .await?;
        if linked.is_none() {
            return Err(RepositoryError::validation_error("Employee not found").into());
        }
    }

    let password_hash = hash_password(&body.password).map_err(password_failure)?;
    let user = UserRepository::new(&state.db)
        .create(
            NewUser {
                email: body.email.trim().to_lowercase(),
                password_hash,
                role: body.role.unwrap_or(Role::Employee),
                employee_id: body.employee_id,
            },
            Utc::now(),
        )
        .await?;
    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user: user.into(),
        }),
    ))
}

/// Trade a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let claims = state
        .tokens
        .verify(&body.refresh_token, TokenType::Refresh)
        .map_err(token_rejection)?;
    let user_id = claims.user_id().map_err(token_rejection)?;

    let user = UserRepository::new(&state.db)
        .find_by_id(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized(Some("Invalid refresh token")))?;

    let matches_stored = user.refresh_token.as_deref().is_some_and(|stored| {
        bool::from(stored.as_bytes().ct_eq(body.refresh_token.as_bytes()))
    });
    if !matches_stored {
        tracing::warn!(user_id, "Refresh token does not match the stored token");
        return Err(unauthorized(Some("Invalid refresh token")));
    }

    let token = state
        .tokens
        .issue(user.id, user.role, TokenType::Access, Utc::now())
        .map_err(token_rejection)?;

    Ok(Json(RefreshResponse {
        token,
        expires_in: state.tokens.access_ttl().num_seconds(),
    }))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect or new password too short", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    FieldErrors::new()
        .check(
            "newPassword",
            body.new_password.chars().count() >= MIN_PASSWORD_LEN,
            "must be at least 6 characters",
        )
        .finish()?;

    let users = UserRepository::new(&state.db);
    let user = users.get(caller.user_id).await?;

    if !verify_password(&body.current_password, &user.password_hash).map_err(password_failure)? {
        return Err(RepositoryError::business_rule("Current password is incorrect").into());
    }

    let password_hash = hash_password(&body.new_password).map_err(password_failure)?;
    users
        .update_password(user, password_hash, Utc::now())
        .await?;
    tracing::info!(user_id = caller.user_id, "Password changed");

    Ok(MessageResponse::new("Password changed successfully"))
}

/// The caller's account and linked employee record
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "User no longer exists", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = UserRepository::new(&state.db).get(caller.user_id).await?;
    let employee = linked_employee(&state, &user).await?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        employee,
    }))
}
