//! # Attendance API Handlers
//!
//! The caller's own check-in/check-out flow plus the admin-wide listing.
//! The caller is always taken from the bearer token, never from the body.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{ADMINS, AuthUser};
use crate::error::{ApiError, RepositoryError};
use crate::handlers::types::{ApiJson, ApiQuery, PageParams, Pagination};
use crate::models::attendance::Model as AttendanceModel;
use crate::models::user::Model as UserModel;
use crate::models::{AttendanceStatus, Role};
use crate::repositories::attendance::AttendanceFilter;
use crate::repositories::{AttendanceRepository, UserRepository};
use crate::rules::AttendanceStats;
use crate::server::AppState;

/// Account the record belongs to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUser {
    pub id: i32,
    #[schema(example = "jane@hr.com")]
    pub email: String,
    pub role: Role,
    pub employee_id: Option<i32>,
}

impl From<&UserModel> for AttendanceUser {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            employee_id: user.employee_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    #[schema(example = 7)]
    pub id: i32,
    pub user_id: i32,
    /// Local calendar date
    #[schema(example = "2024-06-10")]
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    #[schema(example = "Client visit | Checkout: Wrapped up early")]
    pub notes: Option<String>,
    pub user: Option<AttendanceUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceResponse {
    fn build(record: AttendanceModel, user: Option<AttendanceUser>) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            check_in: record.check_in.map(|t| t.to_utc()),
            check_out: record.check_out.map(|t| t.to_utc()),
            status: record.status,
            notes: record.notes,
            user,
            created_at: record.created_at.to_utc(),
            updated_at: record.updated_at.to_utc(),
        }
    }
}

/// Attach account summaries to a batch of records in one query.
async fn attendance_views(
    state: &AppState,
    records: Vec<AttendanceModel>,
) -> Result<Vec<AttendanceResponse>, ApiError> {
    let users: HashMap<i32, UserModel> = UserRepository::new(&state.db)
        .find_by_ids(records.iter().map(|r| r.user_id))
        .await?;

    Ok(records
        .into_iter()
        .map(|r| {
            let user = users.get(&r.user_id).map(AttendanceUser::from);
            AttendanceResponse::build(r, user)
        })
        .collect())
}

async fn attendance_view(
    state: &AppState,
    record: AttendanceModel,
) -> Result<AttendanceResponse, ApiError> {
    let user = UserRepository::new(&state.db)
        .find_by_id(record.user_id)
        .await?
        .as_ref()
        .map(AttendanceUser::from);
    Ok(AttendanceResponse::build(record, user))
}

/// Optional free text recorded with a check-in or check-out
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AttendanceNotesRequest {
    #[schema(example = "Working from the Berlin office")]
    pub notes: Option<String>,
}

/// Today's state when no record exists yet
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotCheckedIn {
    pub date: NaiveDate,
    #[schema(example = "not_checked_in")]
    pub status: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum TodayResponse {
    Recorded(AttendanceResponse),
    NotCheckedIn(NotCheckedIn),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub attendance: Vec<AttendanceResponse>,
    pub pagination: Pagination,
}

/// Date range for statistics; defaults to the current local month
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// First day, `YYYY-MM-DD`
    pub start_date: Option<NaiveDate>,
    /// Last day, inclusive, `YYYY-MM-DD`
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for the admin listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAttendanceQuery {
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 10, max: 100)
    pub limit: Option<i64>,
    pub user_id: Option<i32>,
    /// Records on or after this day
    pub start_date: Option<NaiveDate>,
    /// Records on or before this day
    pub end_date: Option<NaiveDate>,
}

fn status_label(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "present",
        AttendanceStatus::Late => "late",
        AttendanceStatus::HalfDay => "half_day",
        AttendanceStatus::Absent => "absent",
    }
}

/// Record the caller's arrival for today
#[utoipa::path(
    post,
    path = "/api/v1/attendance/checkin",
    security(("bearer_auth" = [])),
    request_body = AttendanceNotesRequest,
    responses(
        (status = 201, description = "Checked in", body = AttendanceResponse),
        (status = 200, description = "Checked in on an existing record for today", body = AttendanceResponse),
        (status = 400, description = "Already checked in today", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "attendance"
)]
pub async fn check_in(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<AttendanceNotesRequest>,
) -> Result<(StatusCode, Json<AttendanceResponse>), ApiError> {
    let repo = AttendanceRepository::new(&state.db);
    let now = Utc::now();
    let existed = repo
        .find_for_day(user.user_id, state.policy.local_date(now))
        .await?
        .is_some();

    let record = repo
        .check_in(user.user_id, body.notes, &state.policy, now)
        .await?;

    counter!("hr_attendance_check_ins_total", "status" => status_label(record.status))
        .increment(1);
    tracing::info!(
        user_id = user.user_id,
        date = %record.date,
        status = status_label(record.status),
        "Checked in"
    );

    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(attendance_view(&state, record).await?)))
}

/// Close the caller's session for today
#[utoipa::path(
    post,
    path = "/api/v1/attendance/checkout",
    security(("bearer_auth" = [])),
    request_body = AttendanceNotesRequest,
    responses(
        (status = 200, description = "Checked out", body = AttendanceResponse),
        (status = 400, description = "Not checked in, or already checked out", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "attendance"
)]
pub async fn check_out(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<AttendanceNotesRequest>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let record = AttendanceRepository::new(&state.db)
        .check_out(user.user_id, body.notes, &state.policy, Utc::now())
        .await?;
    tracing::info!(
        user_id = user.user_id,
        date = %record.date,
        status = status_label(record.status),
        "Checked out"
    );

    Ok(Json(attendance_view(&state, record).await?))
}

/// The caller's record for the current local day
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Today's record, or a not_checked_in placeholder", body = TodayResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "attendance"
)]
pub async fn today(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TodayResponse>, ApiError> {
    let date = state.policy.local_date(Utc::now());
    let record = AttendanceRepository::new(&state.db)
        .find_for_day(user.user_id, date)
        .await?;

    let body = match record {
        Some(record) => TodayResponse::Recorded(attendance_view(&state, record).await?),
        None => TodayResponse::NotCheckedIn(NotCheckedIn {
            date,
            status: "not_checked_in".to_string(),
            check_in: None,
            check_out: None,
        }),
    };
    Ok(Json(body))
}

/// The caller's records, newest first
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history",
    security(("bearer_auth" = [])),
    params(PageParams),
    responses(
        (status = 200, description = "Attendance history", body = AttendanceListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "attendance"
)]
pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<AttendanceListResponse>, ApiError> {
    let page = params.to_request();
    let (records, total) = AttendanceRepository::new(&state.db)
        .history(user.user_id, page)
        .await?;

    Ok(Json(AttendanceListResponse {
        attendance: attendance_views(&state, records).await?,
        pagination: Pagination::new(page, total),
    }))
}

/// Aggregate attendance of the caller over a date range
#[utoipa::path(
    get,
    path = "/api/v1/attendance/stats",
    security(("bearer_auth" = [])),
    params(StatsQuery),
    responses(
        (status = 200, description = "Attendance statistics", body = AttendanceStats),
        (status = 400, description = "Malformed date or end before start", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "attendance"
)]
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<StatsQuery>,
) -> Result<Json<AttendanceStats>, ApiError> {
    let (month_start, month_end) = state.policy.current_month(Utc::now());
    let start = query.start_date.unwrap_or(month_start);
    let end = query.end_date.unwrap_or(month_end);

    if end < start {
        return Err(RepositoryError::business_rule("End date cannot be before start date").into());
    }

    let records = AttendanceRepository::new(&state.db)
        .in_range(user.user_id, start, end)
        .await?;

    Ok(Json(AttendanceStats::summarize(start, end, &records)))
}

/// Every user's attendance (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/attendance",
    security(("bearer_auth" = [])),
    params(ListAttendanceQuery),
    responses(
        (status = 200, description = "Attendance records, newest day first", body = AttendanceListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_all(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<ListAttendanceQuery>,
) -> Result<Json<AttendanceListResponse>, ApiError> {
    user.require_role(ADMINS)?;

    let page = PageParams::resolve(query.page, query.limit);
    let filter = AttendanceFilter {
        user_id: query.user_id,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let (records, total) = AttendanceRepository::new(&state.db)
        .list(&filter, page)
        .await?;

    Ok(Json(AttendanceListResponse {
        attendance: attendance_views(&state, records).await?,
        pagination: Pagination::new(page, total),
    }))
}
