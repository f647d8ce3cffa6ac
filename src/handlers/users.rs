//! # User Administration Handlers
//!
//! Admin-only account management.

use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{ADMINS, AuthUser};
use crate::error::{ApiError, RepositoryError};
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery, MessageResponse, PageParams, Pagination};
use crate::models::Role;
use crate::models::user::Model as UserModel;
use crate::repositories::user::UserChanges;
use crate::repositories::{EmployeeRepository, UserRepository};
use crate::server::AppState;

/// Account as exposed over the API (never includes secrets)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "admin@hr.com")]
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub employee_id: Option<i32>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            employee_id: user.employee_id,
            last_login: user.last_login.map(|t| t.to_utc()),
            created_at: user.created_at.to_utc(),
            updated_at: user.updated_at.to_utc(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
    pub pagination: Pagination,
}

/// Partial account update; omitted fields keep their stored values
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub employee_id: Option<i32>,
}

/// List all users (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    security(("bearer_auth" = [])),
    params(PageParams),
    responses(
        (status = 200, description = "Users listed, newest first", body = UsersResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<UsersResponse>, ApiError> {
    user.require_role(ADMINS)?;

    let page = params.to_request();
    let (users, total) = UserRepository::new(&state.db).list(page).await?;

    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        pagination: Pagination::new(page, total),
    }))
}

/// Update a user's role, active flag or employee link (admin)
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid update", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    user.require_role(ADMINS)?;

    if let Some(employee_id) = body.employee_id {
        let linked = EmployeeRepository::new(&state.db)
            .find_by_id(employee_id)
            .await?;
        if linked.is_none() {
            return Err(RepositoryError::validation_error("Employee not found").into());
        }
    }

    let updated = UserRepository::new(&state.db)
        .update(
            id,
            UserChanges {
                role: body.role,
                is_active: body.is_active,
                employee_id: body.employee_id,
            },
            Utc::now(),
        )
        .await?;
    tracing::info!(target_user_id = id, by = user.user_id, "User updated");

    Ok(Json(updated.into()))
}

/// Soft-delete a user (admin). The last admin cannot be deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Last admin cannot be deleted", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_role(ADMINS)?;

    UserRepository::new(&state.db)
        .soft_delete(id, Utc::now())
        .await?;
    tracing::info!(target_user_id = id, by = user.user_id, "User deleted");

    Ok(MessageResponse::new("User deleted successfully"))
}
