//! # Leave Repository
//!
//! Leave requests and their approval workflow. Overlap detection runs in
//! the same transaction as the write it guards.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PageRequest;
use crate::error::RepositoryError;
use crate::models::employee::{self, Entity as Employee};
use crate::models::leave::{
    self, ActiveModel as LeaveActiveModel, Entity as Leave, Model as LeaveModel,
};
use crate::models::{LeaveStatus, LeaveType};
use crate::rules::leave::{ensure_pending, inclusive_days, ranges_overlap};

const OVERLAP: &str = "Employee has overlapping leave during this period";

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub employee_id: Option<i32>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    /// Leaves starting on or after this day
    pub start_date: Option<NaiveDate>,
    /// Leaves ending on or before this day
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewLeave {
    pub employee_id: i32,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveChanges {
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub attachment_url: Option<String>,
}

/// Outcome an approver may choose for a pending leave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl From<ApprovalDecision> for LeaveStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => LeaveStatus::Approved,
            ApprovalDecision::Rejected => LeaveStatus::Rejected,
        }
    }
}

/// Who decided a leave
#[derive(Debug, Clone, Copy)]
pub struct Approver {
    pub user_id: i32,
    /// The approving user's employee record, if linked
    pub employee_id: Option<i32>,
}

pub struct LeaveRepository<'a> {
    db: &'a DatabaseConnection,
}

fn live() -> Select<Leave> {
    Leave::find().filter(leave::Column::DeletedAt.is_null())
}

impl<'a> LeaveRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<LeaveModel>, RepositoryError> {
        live()
            .filter(leave::Column::Id.eq(id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: i32) -> Result<LeaveModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Leave not found"))
    }

    /// Newest requests first.
    pub async fn list(
        &self,
        filter: &LeaveFilter,
        page: PageRequest,
    ) -> Result<(Vec<LeaveModel>, u64), RepositoryError> {
        let mut query = live();
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(leave::Column::EmployeeId.eq(employee_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(leave::Column::Status.eq(status));
        }
        if let Some(leave_type) = filter.leave_type {
            query = query.filter(leave::Column::LeaveType.eq(leave_type));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(leave::Column::StartDate.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(leave::Column::EndDate.lte(end));
        }

        let total = query
            .clone()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let leaves = query
            .order_by_desc(leave::Column::CreatedAt)
            .order_by_desc(leave::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((leaves, total))
    }

    pub async fn create(
        &self,
        new: NewLeave,
        now: DateTime<Utc>,
    ) -> Result<LeaveModel, RepositoryError> {
        let days = inclusive_days(new.start_date, new.end_date)?;

        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let employee_exists = Employee::find()
            .filter(employee::Column::Id.eq(new.employee_id))
            .filter(employee::Column::DeletedAt.is_null())
            .count(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            > 0;
        if !employee_exists {
            return Err(RepositoryError::not_found("Employee not found"));
        }

        if has_overlap(&txn, new.employee_id, new.start_date, new.end_date, None).await? {
            return Err(RepositoryError::conflict(OVERLAP));
        }

        let created = LeaveActiveModel {
            employee_id: Set(new.employee_id),
            leave_type: Set(new.leave_type),
            start_date: Set(new.start_date),
            end_date: Set(new.end_date),
            days: Set(days),
            reason: Set(new.reason),
            status: Set(LeaveStatus::Pending),
            attachment_url: Set(new.attachment_url),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;
        Ok(created)
    }

    /// Edit a pending leave, recomputing its day count when dates move.
    pub async fn update(
        &self,
        id: i32,
        changes: LeaveChanges,
        now: DateTime<Utc>,
    ) -> Result<LeaveModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = find_live(&txn, id).await?;
        ensure_pending(existing.status, "Cannot update leave that is not pending")?;

        let start = changes.start_date.unwrap_or(existing.start_date);
        let end = changes.end_date.unwrap_or(existing.end_date);
        let dates_changed = start != existing.start_date || end != existing.end_date;
        let days = inclusive_days(start, end)?;

        if dates_changed && has_overlap(&txn, existing.employee_id, start, end, Some(id)).await? {
            return Err(RepositoryError::conflict(OVERLAP));
        }

        let mut active = existing.into_active_model();
        if let Some(v) = changes.leave_type {
            active.leave_type = Set(v);
        }
        if dates_changed {
            active.start_date = Set(start);
            active.end_date = Set(end);
            active.days = Set(days);
        }
        if let Some(v) = changes.reason {
            active.reason = Set(v);
        }
        if let Some(v) = changes.attachment_url {
            active.attachment_url = Set(Some(v));
        }
        active.updated_at = Set(now.into());

        let updated = active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        txn.commit().await.map_err(RepositoryError::database_error)?;

        Ok(updated)
    }

    /// Withdraw a pending leave. The row stays, with status `Cancelled`.
    pub async fn cancel(&self, id: i32, now: DateTime<Utc>) -> Result<LeaveModel, RepositoryError> {
        let existing = self.get(id).await?;
        ensure_pending(existing.status, "Cannot cancel leave that is not pending")?;

        let mut active = existing.into_active_model();
        active.status = Set(LeaveStatus::Cancelled);
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Approve or reject a pending leave.
    pub async fn decide(
        &self,
        id: i32,
        decision: ApprovalDecision,
        approver: Approver,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LeaveModel, RepositoryError> {
        let existing = self.get(id).await?;
        ensure_pending(existing.status, "Leave is not pending approval")?;

        let mut active = existing.into_active_model();
        active.status = Set(decision.into());
        active.approved_by_user_id = Set(Some(approver.user_id));
        active.approver_id = Set(approver.employee_id);
        active.approved_at = Set(Some(now.into()));
        active.comments = Set(comments.filter(|c| !c.trim().is_empty()));
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

async fn find_live<C: ConnectionTrait>(conn: &C, id: i32) -> Result<LeaveModel, RepositoryError> {
    live()
        .filter(leave::Column::Id.eq(id))
        .one(conn)
        .await
        .map_err(RepositoryError::database_error)?
        .ok_or_else(|| RepositoryError::not_found("Leave not found"))
}

/// Whether a pending or approved leave of `employee_id` shares a day with
/// `[start, end]`.
async fn has_overlap<C: ConnectionTrait>(
    conn: &C,
    employee_id: i32,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<i32>,
) -> Result<bool, RepositoryError> {
    let blocking = live()
        .filter(leave::Column::EmployeeId.eq(employee_id))
        .filter(leave::Column::Status.is_in(LeaveStatus::BLOCKING))
        .all(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    Ok(blocking
        .iter()
        .filter(|existing| Some(existing.id) != exclude_id)
        .any(|existing| ranges_overlap((existing.start_date, existing.end_date), (start, end))))
}
