//! # User Repository
//!
//! Login accounts: lookup, registration, session bookkeeping and admin
//! management.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};

use super::PageRequest;
use crate::error::RepositoryError;
use crate::models::Role;
use crate::models::user::{self, ActiveModel as UserActiveModel, Entity as User, Model as UserModel};

/// Data for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<i32>,
}

/// Admin-editable account fields; `None` leaves the stored value alone
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub employee_id: Option<i32>,
}

pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

fn live() -> Select<User> {
    User::find().filter(user::Column::DeletedAt.is_null())
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<UserModel>, RepositoryError> {
        live()
            .filter(user::Column::Id.eq(id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Like [`find_by_id`](Self::find_by_id) but missing users are an error.
    pub async fn get(&self, id: i32) -> Result<UserModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User not found"))
    }

    /// Live users among `ids`, keyed by id. Unknown ids are skipped.
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = i32>,
    ) -> Result<HashMap<i32, UserModel>, RepositoryError> {
        let mut ids: Vec<i32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = live()
            .filter(user::Column::Id.is_in(ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        live()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Insert a new account. A taken email surfaces as a conflict.
    pub async fn create(
        &self,
        new_user: NewUser,
        now: DateTime<Utc>,
    ) -> Result<UserModel, RepositoryError> {
        let user = UserActiveModel {
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            role: Set(new_user.role),
            is_active: Set(true),
            employee_id: Set(new_user.employee_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        user.insert(self.db)
            .await
            .map_err(RepositoryError::unique_or_database("User already exists"))
    }

    /// Stamp a successful login and remember the refresh token just issued.
    pub async fn record_login(
        &self,
        user: UserModel,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserModel, RepositoryError> {
        let mut active = user.into_active_model();
        active.last_login = Set(Some(now.into()));
        active.refresh_token = Set(Some(refresh_token.to_string()));
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_password(
        &self,
        user: UserModel,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<UserModel, RepositoryError> {
        let mut active = user.into_active_model();
        active.password_hash = Set(password_hash);
        // outstanding refresh tokens die with the old password
        active.refresh_token = Set(None);
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Newest accounts first.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<UserModel>, u64), RepositoryError> {
        let total = live()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let users = live()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((users, total))
    }

    pub async fn update(
        &self,
        id: i32,
        changes: UserChanges,
        now: DateTime<Utc>,
    ) -> Result<UserModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = live()
            .filter(user::Column::Id.eq(id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;

        let demotes_admin = existing.role == Role::Admin
            && (changes.role.is_some_and(|role| role != Role::Admin)
                || changes.is_active == Some(false));
        if demotes_admin && count_active_admins(&txn).await? <= 1 {
            return Err(RepositoryError::business_rule(
                "Cannot demote or deactivate the last admin user",
            ));
        }

        let mut active = existing.into_active_model();
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
            if !is_active {
                active.refresh_token = Set(None);
            }
        }
        if let Some(employee_id) = changes.employee_id {
            active.employee_id = Set(Some(employee_id));
        }
        active.updated_at = Set(now.into());

        let updated = active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        txn.commit().await.map_err(RepositoryError::database_error)?;

        Ok(updated)
    }

    /// Soft-delete an account. The last remaining admin cannot be removed.
    pub async fn soft_delete(&self, id: i32, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = live()
            .filter(user::Column::Id.eq(id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;

        if existing.role == Role::Admin && count_admins(&txn).await? <= 1 {
            return Err(RepositoryError::business_rule(
                "Cannot delete the last admin user",
            ));
        }

        let mut active = existing.into_active_model();
        active.deleted_at = Set(Some(now.into()));
        active.refresh_token = Set(None);
        active.updated_at = Set(now.into());
        active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;
        Ok(())
    }

    pub async fn any_admin_exists(&self) -> Result<bool, RepositoryError> {
        Ok(count_admins(self.db).await? > 0)
    }
}

async fn count_admins<C: ConnectionTrait>(conn: &C) -> Result<u64, RepositoryError> {
    live()
        .filter(user::Column::Role.eq(Role::Admin))
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)
}

async fn count_active_admins<C: ConnectionTrait>(conn: &C) -> Result<u64, RepositoryError> {
    live()
        .filter(user::Column::Role.eq(Role::Admin))
        .filter(user::Column::IsActive.eq(true))
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)
}
