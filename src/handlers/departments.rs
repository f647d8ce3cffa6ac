//! # Departments API Handlers

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthUser, DIRECTORY_MANAGERS};
use crate::error::{ApiError, RepositoryError};
use crate::handlers::employees::EmployeeSummary;
use crate::handlers::types::{
    ApiJson, ApiPath, ApiQuery, FieldErrors, MessageResponse, PageParams, Pagination,
};
use crate::models::department::Model as DepartmentModel;
use crate::repositories::department::{DepartmentChanges, DepartmentFilter, NewDepartment};
use crate::repositories::{DepartmentRepository, EmployeeRepository};
use crate::server::AppState;

/// Department with head and head-count resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentResponse {
    #[schema(example = 2)]
    pub id: i32,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Builds and runs the product")]
    pub description: Option<String>,
    pub is_active: bool,
    #[schema(example = 250000.0)]
    pub budget: Option<f64>,
    pub goals: Option<String>,
    pub head_id: Option<i32>,
    pub head: Option<EmployeeSummary>,
    /// Live employees assigned to the department
    #[schema(example = 12)]
    pub employee_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

async fn department_views(
    db: &DatabaseConnection,
    departments: Vec<DepartmentModel>,
) -> Result<Vec<DepartmentResponse>, RepositoryError> {
    let employees = EmployeeRepository::new(db);
    let ids: Vec<i32> = departments.iter().map(|d| d.id).collect();
    let counts = employees.count_by_department(&ids).await?;
    let heads = employees
        .find_by_ids(departments.iter().filter_map(|d| d.head_id))
        .await?;

    Ok(departments
        .into_iter()
        .map(|d| build_view(d, &counts, &heads))
        .collect())
}

fn build_view(
    d: DepartmentModel,
    counts: &HashMap<i32, u64>,
    heads: &HashMap<i32, crate::models::employee::Model>,
) -> DepartmentResponse {
    DepartmentResponse {
        id: d.id,
        employee_count: counts.get(&d.id).copied().unwrap_or(0),
        head: d.head_id.and_then(|id| heads.get(&id)).map(EmployeeSummary::from),
        name: d.name,
        description: d.description,
        is_active: d.is_active,
        budget: d.budget,
        goals: d.goals,
        head_id: d.head_id,
        created_at: d.created_at.to_utc(),
        updated_at: d.updated_at.to_utc(),
    }
}

async fn department_view(
    db: &DatabaseConnection,
    department: DepartmentModel,
) -> Result<DepartmentResponse, RepositoryError> {
    department_views(db, vec![department])
        .await?
        .pop()
        .ok_or_else(|| RepositoryError::not_found("Department not found"))
}

/// Query parameters for listing departments
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDepartmentsQuery {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 10, max: 100)
    pub limit: Option<i64>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    /// Filter by active flag
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentsResponse {
    pub departments: Vec<DepartmentResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    #[schema(example = "Engineering")]
    pub name: String,
    pub description: Option<String>,
    pub head_id: Option<i32>,
    pub budget: Option<f64>,
    pub goals: Option<String>,
}

/// Partial update; omitted fields keep their stored values
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub head_id: Option<i32>,
    pub budget: Option<f64>,
    pub goals: Option<String>,
    pub is_active: Option<bool>,
}

fn provided(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn budget_ok(budget: Option<f64>) -> bool {
    budget.is_none_or(|b| b.is_finite() && b >= 0.0)
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    security(("bearer_auth" = [])),
    params(ListDepartmentsQuery),
    responses(
        (status = 200, description = "Departments listed", body = DepartmentsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "departments"
)]
pub async fn list_departments(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ListDepartmentsQuery>,
) -> Result<Json<DepartmentsResponse>, ApiError> {
    let page = PageParams::resolve(query.page, query.limit);
    let filter = DepartmentFilter {
        search: query.search,
        is_active: query.active,
    };

    let (departments, total) = DepartmentRepository::new(&state.db)
        .list(&filter, page)
        .await?;

    Ok(Json(DepartmentsResponse {
        departments: department_views(&state.db, departments).await?,
        pagination: Pagination::new(page, total),
    }))
}

/// Get a department by id
#[utoipa::path(
    get,
    path = "/api/v1/departments/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department found", body = DepartmentResponse),
        (status = 404, description = "Department not found", body = ApiError)
    ),
    tag = "departments"
)]
pub async fn get_department(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DepartmentResponse>, ApiError> {
    let department = DepartmentRepository::new(&state.db).get(id).await?;
    Ok(Json(department_view(&state.db, department).await?))
}

/// Create a department (admin, hr)
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    security(("bearer_auth" = [])),
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 409, description = "Name already in use", body = ApiError)
    ),
    tag = "departments"
)]
pub async fn create_department(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<DepartmentResponse>), ApiError> {
    user.require_role(DIRECTORY_MANAGERS)?;

    FieldErrors::new()
        .required("name", &body.name)
        .check("budget", budget_ok(body.budget), "must be zero or positive")
        .finish()?;

    let department = DepartmentRepository::new(&state.db)
        .create(
            NewDepartment {
                name: body.name.trim().to_string(),
                description: provided(body.description),
                head_id: body.head_id,
                budget: body.budget,
                goals: provided(body.goals),
            },
            Utc::now(),
        )
        .await?;
    tracing::info!(department_id = department.id, "Department created");

    Ok((
        StatusCode::CREATED,
        Json(department_view(&state.db, department).await?),
    ))
}

/// Update a department (admin, hr)
#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Department id")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = DepartmentResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 404, description = "Department not found", body = ApiError),
        (status = 409, description = "Name already in use", body = ApiError)
    ),
    tag = "departments"
)]
pub async fn update_department(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<UpdateDepartmentRequest>,
) -> Result<Json<DepartmentResponse>, ApiError> {
    user.require_role(DIRECTORY_MANAGERS)?;

    FieldErrors::new()
        .check("budget", budget_ok(body.budget), "must be zero or positive")
        .finish()?;

    let changes = DepartmentChanges {
        name: provided(body.name),
        description: provided(body.description),
        head_id: body.head_id,
        budget: body.budget,
        goals: provided(body.goals),
        is_active: body.is_active,
    };

    let department = DepartmentRepository::new(&state.db)
        .update(id, changes, Utc::now())
        .await?;
    Ok(Json(department_view(&state.db, department).await?))
}

/// Delete a department (admin, hr)
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department deleted", body = MessageResponse),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 404, description = "Department not found", body = ApiError),
        (status = 409, description = "Department still has employees", body = ApiError)
    ),
    tag = "departments"
)]
pub async fn delete_department(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_role(DIRECTORY_MANAGERS)?;

    DepartmentRepository::new(&state.db)
        .soft_delete(id, Utc::now())
        .await?;
    tracing::info!(department_id = id, "Department deleted");

    Ok(MessageResponse::new("Department deleted successfully"))
}
