//! # Leave API Handlers
//!
//! Leave requests and the approval workflow. Callers with the `employee`
//! role act only on their own linked employee record.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{DatabaseConnection, Iterable};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthUser, LEAVE_APPROVERS};
use crate::error::{ApiError, RepositoryError, forbidden};
use crate::handlers::employees::{EmployeeResponse, EmployeeSummary, employee_views};
use crate::handlers::types::{
    ApiJson, ApiPath, ApiQuery, FieldErrors, MessageResponse, PageParams, Pagination,
};
use crate::models::employee::Model as EmployeeModel;
use crate::models::leave::Model as LeaveModel;
use crate::models::{LeaveStatus, LeaveType, Role};
use crate::repositories::leave::{
    ApprovalDecision, Approver, LeaveChanges, LeaveFilter, NewLeave,
};
use crate::repositories::{EmployeeRepository, LeaveRepository, UserRepository};
use crate::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    #[schema(example = 11)]
    pub id: i32,
    pub employee_id: i32,
    pub employee: Option<EmployeeResponse>,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-10")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-12")]
    pub end_date: NaiveDate,
    /// Inclusive day count
    #[schema(example = 3)]
    pub days: i32,
    #[schema(example = "Family trip")]
    pub reason: String,
    pub status: LeaveStatus,
    /// Employee record of the approver, when the approving user has one
    pub approver_id: Option<i32>,
    pub approver: Option<EmployeeSummary>,
    pub approved_by_user_id: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveResponse {
    fn build(
        leave: LeaveModel,
        employees: &HashMap<i32, EmployeeResponse>,
        approvers: &HashMap<i32, EmployeeModel>,
    ) -> Self {
        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            employee: employees.get(&leave.employee_id).cloned(),
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            days: leave.days,
            reason: leave.reason,
            status: leave.status,
            approver_id: leave.approver_id,
            approver: leave
                .approver_id
                .and_then(|id| approvers.get(&id))
                .map(EmployeeSummary::from),
            approved_by_user_id: leave.approved_by_user_id,
            approved_at: leave.approved_at.map(|t| t.to_utc()),
            comments: leave.comments,
            attachment_url: leave.attachment_url,
            created_at: leave.created_at.to_utc(),
            updated_at: leave.updated_at.to_utc(),
        }
    }
}

/// Preload requesting employees (with department) and approvers.
async fn leave_views(
    db: &DatabaseConnection,
    leaves: Vec<LeaveModel>,
) -> Result<Vec<LeaveResponse>, RepositoryError> {
    let repo = EmployeeRepository::new(db);
    let requesters = repo
        .find_by_ids(leaves.iter().map(|l| l.employee_id))
        .await?;
    let approvers = repo
        .find_by_ids(leaves.iter().filter_map(|l| l.approver_id))
        .await?;

    let employees: HashMap<i32, EmployeeResponse> =
        employee_views(db, requesters.into_values().collect())
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

    Ok(leaves
        .into_iter()
        .map(|l| LeaveResponse::build(l, &employees, &approvers))
        .collect())
}

async fn leave_view(
    db: &DatabaseConnection,
    leave: LeaveModel,
) -> Result<LeaveResponse, RepositoryError> {
    leave_views(db, vec![leave])
        .await?
        .pop()
        .ok_or_else(|| RepositoryError::not_found("Leave not found"))
}

/// The employee record linked to the caller's account, if any.
async fn caller_employee_id(state: &AppState, user: AuthUser) -> Result<Option<i32>, ApiError> {
    Ok(UserRepository::new(&state.db)
        .get(user.user_id)
        .await?
        .employee_id)
}

/// Employees may only touch leaves of their own employee record.
async fn ensure_may_act_for(
    state: &AppState,
    user: AuthUser,
    employee_id: i32,
) -> Result<(), ApiError> {
    if user.role != Role::Employee {
        return Ok(());
    }
    if caller_employee_id(state, user).await? == Some(employee_id) {
        Ok(())
    } else {
        tracing::info!(
            user_id = user.user_id,
            employee_id,
            "Employee tried to act on another employee's leave"
        );
        Err(forbidden(Some(
            "Employees can only manage their own leave requests",
        )))
    }
}

/// Query parameters for listing leaves
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListLeavesQuery {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 10, max: 100)
    pub limit: Option<i64>,
    /// Employee id
    pub employee: Option<i32>,
    pub status: Option<LeaveStatus>,
    #[serde(rename = "type")]
    pub leave_type: Option<LeaveType>,
    /// Leaves starting on or after this day
    pub start_date: Option<NaiveDate>,
    /// Leaves ending on or before this day
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeavesResponse {
    pub leaves: Vec<LeaveResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    #[schema(example = 3)]
    pub employee_id: i32,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-10")]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-12")]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    pub attachment_url: Option<String>,
}

/// Partial update of a pending leave
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeaveRequest {
    #[serde(rename = "type")]
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveLeaveRequest {
    /// `Approved` or `Rejected`
    pub status: ApprovalDecision,
    #[schema(example = "Enjoy the break")]
    pub comments: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveTypesResponse {
    pub leave_types: Vec<LeaveType>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveStatusesResponse {
    pub leave_statuses: Vec<LeaveStatus>,
}

fn provided(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/v1/leaves",
    security(("bearer_auth" = [])),
    params(ListLeavesQuery),
    responses(
        (status = 200, description = "Leaves listed, newest first", body = LeavesResponse),
        (status = 400, description = "Malformed filter", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "leaves"
)]
pub async fn list_leaves(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ListLeavesQuery>,
) -> Result<Json<LeavesResponse>, ApiError> {
    let page = PageParams::resolve(query.page, query.limit);
    let filter = LeaveFilter {
        employee_id: query.employee,
        status: query.status,
        leave_type: query.leave_type,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let (leaves, total) = LeaveRepository::new(&state.db)
        .list(&filter, page)
        .await?;

    Ok(Json(LeavesResponse {
        leaves: leave_views(&state.db, leaves).await?,
        pagination: Pagination::new(page, total),
    }))
}

/// Get a leave request by id
#[utoipa::path(
    get,
    path = "/api/v1/leaves/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Leave id")),
    responses(
        (status = 200, description = "Leave found", body = LeaveResponse),
        (status = 404, description = "Leave not found", body = ApiError)
    ),
    tag = "leaves"
)]
pub async fn get_leave(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let leave = LeaveRepository::new(&state.db).get(id).await?;
    Ok(Json(leave_view(&state.db, leave).await?))
}

/// Request leave
#[utoipa::path(
    post,
    path = "/api/v1/leaves",
    security(("bearer_auth" = [])),
    request_body = CreateLeaveRequest,
    responses(
        (status = 201, description = "Leave requested", body = LeaveResponse),
        (status = 400, description = "Validation failed or end before start", body = ApiError),
        (status = 403, description = "Not the caller's own employee record", body = ApiError),
        (status = 404, description = "Employee not found", body = ApiError),
        (status = 409, description = "Overlaps a pending or approved leave", body = ApiError, example = json!({
            "code": "CONFLICT",
            "message": "Employee has overlapping leave during this period",
            "trace_id": "corr-12345678"
        }))
    ),
    tag = "leaves"
)]
pub async fn create_leave(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveResponse>), ApiError> {
    FieldErrors::new().required("reason", &body.reason).finish()?;
    ensure_may_act_for(&state, user, body.employee_id).await?;

    let leave = LeaveRepository::new(&state.db)
        .create(
            NewLeave {
                employee_id: body.employee_id,
                leave_type: body.leave_type,
                start_date: body.start_date,
                end_date: body.end_date,
                reason: body.reason.trim().to_string(),
                attachment_url: provided(body.attachment_url),
            },
            Utc::now(),
        )
        .await?;
    tracing::info!(
        leave_id = leave.id,
        employee_id = leave.employee_id,
        days = leave.days,
        "Leave requested"
    );

    Ok((StatusCode::CREATED, Json(leave_view(&state.db, leave).await?)))
}

/// Edit a pending leave request
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Leave id")),
    request_body = UpdateLeaveRequest,
    responses(
        (status = 200, description = "Leave updated", body = LeaveResponse),
        (status = 400, description = "Not pending, or end before start", body = ApiError),
        (status = 403, description = "Not the caller's own leave", body = ApiError),
        (status = 404, description = "Leave not found", body = ApiError),
        (status = 409, description = "New dates overlap another leave", body = ApiError)
    ),
    tag = "leaves"
)]
pub async fn update_leave(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<UpdateLeaveRequest>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let repo = LeaveRepository::new(&state.db);
    let existing = repo.get(id).await?;
    ensure_may_act_for(&state, user, existing.employee_id).await?;

    let leave = repo
        .update(
            id,
            LeaveChanges {
                leave_type: body.leave_type,
                start_date: body.start_date,
                end_date: body.end_date,
                reason: provided(body.reason),
                attachment_url: provided(body.attachment_url),
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(leave_view(&state.db, leave).await?))
}

/// Cancel a pending leave request
#[utoipa::path(
    delete,
    path = "/api/v1/leaves/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Leave id")),
    responses(
        (status = 200, description = "Leave cancelled", body = MessageResponse),
        (status = 400, description = "Leave is not pending", body = ApiError),
        (status = 403, description = "Not the caller's own leave", body = ApiError),
        (status = 404, description = "Leave not found", body = ApiError)
    ),
    tag = "leaves"
)]
pub async fn cancel_leave(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = LeaveRepository::new(&state.db);
    let existing = repo.get(id).await?;
    ensure_may_act_for(&state, user, existing.employee_id).await?;

    repo.cancel(id, Utc::now()).await?;
    tracing::info!(leave_id = id, by = user.user_id, "Leave cancelled");

    Ok(MessageResponse::new("Leave cancelled successfully"))
}

/// Approve or reject a pending leave (admin, hr, manager)
#[utoipa::path(
    post,
    path = "/api/v1/leaves/{id}/approve",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Leave id")),
    request_body = ApproveLeaveRequest,
    responses(
        (status = 200, description = "Decision recorded", body = MessageResponse, example = json!({
            "message": "Leave Approved successfully"
        })),
        (status = 400, description = "Leave is not pending approval, or invalid status", body = ApiError),
        (status = 403, description = "Role not permitted", body = ApiError),
        (status = 404, description = "Leave not found", body = ApiError)
    ),
    tag = "leaves"
)]
pub async fn approve_leave(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(body): ApiJson<ApproveLeaveRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_role(LEAVE_APPROVERS)?;

    let approver = Approver {
        user_id: user.user_id,
        employee_id: caller_employee_id(&state, user).await?,
    };
    let leave = LeaveRepository::new(&state.db)
        .decide(id, body.status, approver, provided(body.comments), Utc::now())
        .await?;

    let label = match body.status {
        ApprovalDecision::Approved => "Approved",
        ApprovalDecision::Rejected => "Rejected",
    };
    counter!("hr_leave_decisions_total", "decision" => label).increment(1);
    tracing::info!(
        leave_id = leave.id,
        decision = label,
        by = user.user_id,
        "Leave decided"
    );

    Ok(MessageResponse::new(format!("Leave {label} successfully")))
}

/// Every leave type
#[utoipa::path(
    get,
    path = "/api/v1/leaves/types",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Leave types", body = LeaveTypesResponse)),
    tag = "leaves"
)]
pub async fn leave_types(_user: AuthUser) -> Json<LeaveTypesResponse> {
    Json(LeaveTypesResponse {
        leave_types: LeaveType::iter().collect(),
    })
}

/// Every leave status
#[utoipa::path(
    get,
    path = "/api/v1/leaves/statuses",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Leave statuses", body = LeaveStatusesResponse)),
    tag = "leaves"
)]
pub async fn leave_statuses(_user: AuthUser) -> Json<LeaveStatusesResponse> {
    Json(LeaveStatusesResponse {
        leave_statuses: LeaveStatus::iter().collect(),
    })
}
