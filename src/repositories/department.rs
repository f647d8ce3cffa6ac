//! # Department Repository

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};

use super::{PageRequest, search_condition};
use crate::error::RepositoryError;
use crate::models::department::{
    self, ActiveModel as DepartmentActiveModel, Entity as Department, Model as DepartmentModel,
};
use crate::models::employee::{self, Entity as Employee};

const DUPLICATE_NAME: &str = "Department with this name already exists";

#[derive(Debug, Clone, Default)]
pub struct DepartmentFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
    pub head_id: Option<i32>,
    pub budget: Option<f64>,
    pub goals: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DepartmentChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub head_id: Option<i32>,
    pub budget: Option<f64>,
    pub goals: Option<String>,
    pub is_active: Option<bool>,
}

pub struct DepartmentRepository<'a> {
    db: &'a DatabaseConnection,
}

fn live() -> Select<Department> {
    Department::find().filter(department::Column::DeletedAt.is_null())
}

impl<'a> DepartmentRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<DepartmentModel>, RepositoryError> {
        live()
            .filter(department::Column::Id.eq(id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: i32) -> Result<DepartmentModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Department not found"))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<DepartmentModel>, RepositoryError> {
        live()
            .filter(department::Column::Name.eq(name))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = i32>,
    ) -> Result<HashMap<i32, DepartmentModel>, RepositoryError> {
        let mut ids: Vec<i32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let departments = live()
            .filter(department::Column::Id.is_in(ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(departments.into_iter().map(|d| (d.id, d)).collect())
    }

    /// Alphabetical by name.
    pub async fn list(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> Result<(Vec<DepartmentModel>, u64), RepositoryError> {
        let mut query = live();
        if let Some(is_active) = filter.is_active {
            query = query.filter(department::Column::IsActive.eq(is_active));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(search_condition(
                &[department::Column::Name, department::Column::Description],
                search,
            ));
        }

        let total = query
            .clone()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let departments = query
            .order_by_asc(department::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((departments, total))
    }

    pub async fn create(
        &self,
        new: NewDepartment,
        now: DateTime<Utc>,
    ) -> Result<DepartmentModel, RepositoryError> {
        if let Some(head_id) = new.head_id {
            ensure_head(self.db, head_id).await?;
        }

        DepartmentActiveModel {
            name: Set(new.name),
            description: Set(new.description),
            head_id: Set(new.head_id),
            budget: Set(new.budget),
            goals: Set(new.goals),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::unique_or_database(DUPLICATE_NAME))
    }

    pub async fn update(
        &self,
        id: i32,
        changes: DepartmentChanges,
        now: DateTime<Utc>,
    ) -> Result<DepartmentModel, RepositoryError> {
        let existing = self.get(id).await?;
        if let Some(head_id) = changes.head_id {
            ensure_head(self.db, head_id).await?;
        }

        let mut active = existing.into_active_model();
        if let Some(v) = changes.name {
            active.name = Set(v);
        }
        if let Some(v) = changes.description {
            active.description = Set(Some(v));
        }
        if let Some(v) = changes.head_id {
            active.head_id = Set(Some(v));
        }
        if let Some(v) = changes.budget {
            active.budget = Set(Some(v));
        }
        if let Some(v) = changes.goals {
            active.goals = Set(Some(v));
        }
        if let Some(v) = changes.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(now.into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::unique_or_database(DUPLICATE_NAME))
    }

    /// Soft-delete a department that no live employee references.
    pub async fn soft_delete(&self, id: i32, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = live()
            .filter(department::Column::Id.eq(id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Department not found"))?;

        let members = Employee::find()
            .filter(employee::Column::DepartmentId.eq(id))
            .filter(employee::Column::DeletedAt.is_null())
            .count(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        if members > 0 {
            return Err(RepositoryError::conflict(
                "Cannot delete department with existing employees",
            ));
        }

        let mut active = existing.into_active_model();
        active.deleted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

async fn ensure_head<C: ConnectionTrait>(conn: &C, employee_id: i32) -> Result<(), RepositoryError> {
    let found = Employee::find()
        .filter(employee::Column::Id.eq(employee_id))
        .filter(employee::Column::DeletedAt.is_null())
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    if found == 0 {
        return Err(RepositoryError::validation_error("Department head not found"));
    }
    Ok(())
}
