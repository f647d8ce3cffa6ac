//! # Attendance Repository
//!
//! Daily check-in/check-out records. One live record per user and local
//! date; the unique index on `(user_id, date)` backs that up.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use super::PageRequest;
use crate::error::RepositoryError;
use crate::models::attendance::{
    self, ActiveModel as AttendanceActiveModel, Entity as Attendance, Model as AttendanceModel,
};
use crate::rules::attendance::{AttendancePolicy, append_checkout_notes};

const ALREADY_CHECKED_IN: &str = "Already checked in today";

/// Filters for the admin listing
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub user_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub struct AttendanceRepository<'a> {
    db: &'a DatabaseConnection,
}

fn live() -> Select<Attendance> {
    Attendance::find().filter(attendance::Column::DeletedAt.is_null())
}

impl<'a> AttendanceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_for_day(
        &self,
        user_id: i32,
        date: NaiveDate,
    ) -> Result<Option<AttendanceModel>, RepositoryError> {
        live()
            .filter(attendance::Column::UserId.eq(user_id))
            .filter(attendance::Column::Date.eq(date))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Record the caller's arrival for the current local day.
    ///
    /// A pre-existing record without a check-in (e.g. one marked absent) is
    /// filled in rather than duplicated.
    pub async fn check_in(
        &self,
        user_id: i32,
        notes: Option<String>,
        policy: &AttendancePolicy,
        now: DateTime<Utc>,
    ) -> Result<AttendanceModel, RepositoryError> {
        let date = policy.local_date(now);
        let status = policy.classify_check_in(now);
        let notes = notes.filter(|n| !n.trim().is_empty());

        match self.find_for_day(user_id, date).await? {
            Some(existing) if existing.check_in.is_some() => {
                Err(RepositoryError::business_rule(ALREADY_CHECKED_IN))
            }
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.check_in = Set(Some(now.into()));
                active.status = Set(status);
                if notes.is_some() {
                    active.notes = Set(notes);
                }
                active.updated_at = Set(now.into());
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => AttendanceActiveModel {
                user_id: Set(user_id),
                date: Set(date),
                check_in: Set(Some(now.into())),
                check_out: Set(None),
                status: Set(status),
                notes: Set(notes),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            }
            .insert(self.db)
            .await
            .map_err(|err| match RepositoryError::database_error(err) {
                // a concurrent check-in for the same day won the insert
                RepositoryError::Conflict(_) => RepositoryError::business_rule(ALREADY_CHECKED_IN),
                other => other,
            }),
        }
    }

    /// Close the caller's session for the current local day.
    pub async fn check_out(
        &self,
        user_id: i32,
        notes: Option<String>,
        policy: &AttendancePolicy,
        now: DateTime<Utc>,
    ) -> Result<AttendanceModel, RepositoryError> {
        let date = policy.local_date(now);
        let existing = self
            .find_for_day(user_id, date)
            .await?
            .ok_or_else(|| RepositoryError::business_rule("Must check in before checking out"))?;

        let Some(check_in) = existing.check_in else {
            return Err(RepositoryError::business_rule(
                "Must check in before checking out",
            ));
        };
        if existing.check_out.is_some() {
            return Err(RepositoryError::business_rule("Already checked out today"));
        }

        let worked = now.signed_duration_since(check_in);
        let status = policy.status_after_check_out(existing.status, worked);
        let merged_notes = append_checkout_notes(existing.notes.as_deref(), notes.as_deref());

        let mut active = existing.into_active_model();
        active.check_out = Set(Some(now.into()));
        active.status = Set(status);
        active.notes = Set(merged_notes);
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// The caller's records, newest day first.
    pub async fn history(
        &self,
        user_id: i32,
        page: PageRequest,
    ) -> Result<(Vec<AttendanceModel>, u64), RepositoryError> {
        self.list(
            &AttendanceFilter {
                user_id: Some(user_id),
                ..Default::default()
            },
            page,
        )
        .await
    }

    /// Every record of `user_id` within `[start, end]`.
    pub async fn in_range(
        &self,
        user_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceModel>, RepositoryError> {
        live()
            .filter(attendance::Column::UserId.eq(user_id))
            .filter(attendance::Column::Date.between(start, end))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All users' records, newest day first.
    pub async fn list(
        &self,
        filter: &AttendanceFilter,
        page: PageRequest,
    ) -> Result<(Vec<AttendanceModel>, u64), RepositoryError> {
        let mut query = live();
        if let Some(user_id) = filter.user_id {
            query = query.filter(attendance::Column::UserId.eq(user_id));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(attendance::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(attendance::Column::Date.lte(end));
        }

        let total = query
            .clone()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let records = query
            .order_by_desc(attendance::Column::Date)
            .order_by_desc(attendance::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((records, total))
    }
}
