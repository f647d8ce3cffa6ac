//! # Employees API Handlers
//!
//! Employee directory endpoints plus the employee views reused by the
//! auth, department and leave handlers.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthUser, DIRECTORY_MANAGERS};
use crate::error::{ApiError, RepositoryError};
use crate::handlers::types::{
    ApiJson, ApiPath, ApiQuery, FieldErrors, MessageResponse, PageParams, Pagination,
};
use crate::models::department::Model as DepartmentModel;
use crate::models::employee::Model as EmployeeModel;
use crate::models::{EmployeeStatus, Gender};
use crate::repositories::employee::{EmployeeChanges, EmployeeFilter, NewEmployee};
use crate::repositories::{DepartmentRepository, EmployeeRepository};
use crate::server::AppState;

/// Department reference embedded in employee views
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepartmentRef {
    #[schema(example = 2)]
    pub id: i32,
    #[schema(example = "Engineering")]
    pub name: String,
}

/// Compact employee reference (manager, department head, approver)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "EMP0001")]
    pub employee_code: Option<String>,
    #[schema(example = "Jane")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "jane.doe@hr.com")]
    pub email: String,
    #[schema(example = "Engineering Manager")]
    pub position: String,
}

impl From<&EmployeeModel> for EmployeeSummary {
    fn from(e: &EmployeeModel) -> Self {
        Self {
            id: e.id,
            employee_code: e.employee_code.clone(),
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            email: e.email.clone(),
            position: e.position.clone(),
        }
    }
}

/// Employee with its department and manager resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "EMP0007")]
    pub employee_code: Option<String>,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Smith")]
    pub last_name: String,
    #[schema(example = "john.smith@hr.com")]
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    #[schema(example = "Backend Engineer")]
    pub position: String,
    #[schema(example = 2)]
    pub department_id: i32,
    pub department: Option<DepartmentRef>,
    pub manager_id: Option<i32>,
    pub manager: Option<EmployeeSummary>,
    #[schema(example = "2024-01-15")]
    pub hire_date: NaiveDate,
    #[schema(example = 55000.0)]
    pub salary: f64,
    pub status: EmployeeStatus,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeResponse {
    fn build(
        e: EmployeeModel,
        departments: &HashMap<i32, DepartmentModel>,
        managers: &HashMap<i32, EmployeeModel>,
    ) -> Self {
        let department = departments.get(&e.department_id).map(|d| DepartmentRef {
            id: d.id,
            name: d.name.clone(),
        });
        let manager = e
            .manager_id
            .and_then(|id| managers.get(&id))
            .map(EmployeeSummary::from);

        Self {
            id: e.id,
            employee_code: e.employee_code,
            first_name: e.first_name,
            last_name: e.last_name,
            email: e.email,
            phone: e.phone,
            date_of_birth: e.date_of_birth,
            gender: e.gender,
            address: e.address,
            position: e.position,
            department_id: e.department_id,
            department,
            manager_id: e.manager_id,
            manager,
            hire_date: e.hire_date,
            salary: e.salary,
            status: e.status,
            emergency_contact_name: e.emergency_contact_name,
            emergency_contact_phone: e.emergency_contact_phone,
            created_at: e.created_at.to_utc(),
            updated_at: e.updated_at.to_utc(),
        }
    }
}

/// Resolve departments and managers for a batch of employees in two queries.
pub(crate) async fn employee_views(
    db: &DatabaseConnection,
    employees: Vec<EmployeeModel>,
) -> Result<Vec<EmployeeResponse>, RepositoryError> {
    let departments = DepartmentRepository::new(db)
        .find_by_ids(employees.iter().map(|e| e.department_id))
        .await?;
    let managers = EmployeeRepository::new(db)
        .find_by_ids(employees.iter().filter_map(|e| e.manager_id))
        .await?;

    Ok(employees
        .into_iter()
        .map(|e| EmployeeResponse::build(e, &departments, &managers))
        .collect())
}

pub(crate) async fn employee_view(
    db: &DatabaseConnection,
    employee: EmployeeModel,
) -> Result<EmployeeResponse, RepositoryError> {
    let mut views = employee_views(db, vec![employee]).await?;
    views
        .pop()
        .ok_or_else(|| RepositoryError::not_found("Employee not found"))
}

/// Query parameters for listing employees
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEmployeesQuery {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 10, max: 100)
    pub limit: Option<i64>,
    /// Filter by department id
    pub department: Option<i32>,
    /// Filter by employment status
    pub status: Option<EmployeeStatus>,
    /// Case-insensitive match on name, email or employee code
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeesResponse {
    pub employees: Vec<EmployeeResponse>,
    pub pagination: Pagination,
}

/// Request payload for creating an employee
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Smith")]
    pub last_name: String,
    #[schema(example = "john.smith@hr.com")]
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    #[schema(example = "Backend Engineer")]
    pub position: String,
    #[schema(example = 2)]
    pub department_id: i32,
    pub manager_id: Option<i32>,
    #[schema(example = "2024-01-15")]
    pub hire_date: NaiveDate,
    #[schema(example = 55000.0)]
    pub salary: Option<f64>,
    pub status: Option<EmployeeStatus>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Partial update; omitted fields keep their stored values
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<i32>,
    pub manager_id: Option<i32>,
    pub hire_date: Option<NaiveDate>,
    pub salary: Option<f64>,
    pub status: Option<EmployeeStatus>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Empty strings in a partial update mean "not provided".
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    security(("bearer_auth" = [])),
    params(ListEmployeesQuery),
    responses(
        (status = 200, description = "Employees listed", body = EmployeesResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ListEmployeesQuery>,
) -> Result<Json<EmployeesResponse>, ApiError> {
    let page = PageParams::resolve(query.page, query.limit);
    let filter = EmployeeFilter {
        department_id: query.department,
        status: query.status,
        search: query.search,
    };

    let (employees, total) = EmployeeRepository::new(&state.db)
        .list(&filter, page)
        .await?;

    Ok(Json(EmployeesResponse {
        employees: employee_views(&state.db, employees).await?,
        pagination: Pagination::new(page, total),
    }))
}

/// Get an employee by id
#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee found", body = EmployeeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Employee not found", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<EmployeeResponse>, ApiError> {
    let employee = EmployeeRepository::new(&state.db).get(id).await?;
    Ok(Json(employee_view(&state.db, employee).await?))
}

/// Create an employee (admin, hr)
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    security(("bearer_auth" = [])),
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = EmployeeResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeResponse>), ApiError> {
    user.require_role(DIRECTORY_MANAGERS)?;

    FieldErrors::new()
        .required("firstName", &body.first_name)
        .required("lastName", &body.last_name)
        .required("position", &body.position)
        .email("email", &body.email)
        .check(
            "salary",
            body.salary.is_none_or(|s| s.is_finite() && s >= 0.0),
            "must be zero or positive",
        )
        .finish()?;

    let new = NewEmployee {
        first_name: body.first_name.trim().to_string(),
        last_name: body.last_name.trim().to_string(),
        email: body.email.trim().to_lowercase(),
        phone: provided(body.phone),
        date_of_birth: body.date_of_birth,
        gender: body.gender,
        address: provided(body.address),
        position: body.position.trim().to_string(),
        department_id: body.department_id,
        manager_id: body.manager_id,
        hire_date: body.hire_date,
        salary: body.salary.unwrap_or(0.0),
        status: body.status.unwrap_or(EmployeeStatus::Active),
        emergency_contact_name: provided(body.emergency_contact_name),
        emergency_contact_phone: provided(body.emergency_contact_phone),
    };

    let employee = EmployeeRepository::new(&state.db)
        .create(new, Utc::now())
        .await?;
    tracing::info!(employee_id = employee.id, code = ?employee.employee_code, "Employee created");

    Ok((
        StatusCode::CREATED,
        Json(employee_view(&state.db, employee).await?),
    ))
}

/// Update an employee (admin, hr)
#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee id")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 404, description = "Employee not found", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeResponse>, ApiError> {
    user.require_role(DIRECTORY_MANAGERS)?;

    let email = provided(body.email);
    let mut errors = FieldErrors::new();
    if let Some(email) = &email {
        errors.email("email", email);
    }
    errors
        .check(
            "salary",
            body.salary.is_none_or(|s| s.is_finite() && s >= 0.0),
            "must be zero or positive",
        )
        .finish()?;

    let changes = EmployeeChanges {
        first_name: provided(body.first_name),
        last_name: provided(body.last_name),
        email: email.map(|e| e.trim().to_lowercase()),
        phone: provided(body.phone),
        date_of_birth: body.date_of_birth,
        gender: body.gender,
        address: provided(body.address),
        position: provided(body.position),
        department_id: body.department_id,
        manager_id: body.manager_id,
        hire_date: body.hire_date,
        salary: body.salary,
        status: body.status,
        emergency_contact_name: provided(body.emergency_contact_name),
        emergency_contact_phone: provided(body.emergency_contact_phone),
    };

    let employee = EmployeeRepository::new(&state.db)
        .update(id, changes, Utc::now())
        .await?;
    Ok(Json(employee_view(&state.db, employee).await?))
}

/// Delete an employee (admin, hr)
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee deleted", body = MessageResponse),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 404, description = "Employee not found", body = ApiError)
    ),
    tag = "employees"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_role(DIRECTORY_MANAGERS)?;

    EmployeeRepository::new(&state.db)
        .soft_delete(id, Utc::now())
        .await?;
    tracing::info!(employee_id = id, "Employee deleted");

    Ok(MessageResponse::new("Employee deleted successfully"))
}
