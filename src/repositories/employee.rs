//! # Employee Repository
//!
//! CRUD for employees, including employee-code assignment and the
//! department/manager reference checks.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};

use super::{PageRequest, search_condition};
use crate::error::RepositoryError;
use crate::models::department::{self, Entity as Department};
use crate::models::employee::{
    self, ActiveModel as EmployeeActiveModel, Entity as Employee, Model as EmployeeModel,
    employee_code_for,
};
use crate::models::{EmployeeStatus, Gender};

const DUPLICATE_EMAIL: &str = "Employee with this email already exists";

/// List filters
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub department_id: Option<i32>,
    pub status: Option<EmployeeStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub position: String,
    pub department_id: i32,
    pub manager_id: Option<i32>,
    pub hire_date: NaiveDate,
    pub salary: f64,
    pub status: EmployeeStatus,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Partial update; only `Some` fields overwrite stored values
#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges {
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

pub struct EmployeeRepository<'a> {
    db: &'a DatabaseConnection,
}

fn live() -> Select<Employee> {
    Employee::find().filter(employee::Column::DeletedAt.is_null())
}

impl<'a> EmployeeRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<EmployeeModel>, RepositoryError> {
        live()
            .filter(employee::Column::Id.eq(id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: i32) -> Result<EmployeeModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Employee not found"))
    }

    /// Batch lookup keyed by id, for preloading relations of a page.
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = i32>,
    ) -> Result<HashMap<i32, EmployeeModel>, RepositoryError> {
        let mut ids: Vec<i32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let employees = live()
            .filter(employee::Column::Id.is_in(ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(employees.into_iter().map(|e| (e.id, e)).collect())
    }

    pub async fn list(
        &self,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> Result<(Vec<EmployeeModel>, u64), RepositoryError> {
        let mut query = live();
        if let Some(department_id) = filter.department_id {
            query = query.filter(employee::Column::DepartmentId.eq(department_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(employee::Column::Status.eq(status));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(search_condition(
                &[
                    employee::Column::FirstName,
                    employee::Column::LastName,
                    employee::Column::Email,
                    employee::Column::EmployeeCode,
                ],
                search,
            ));
        }

        let total = query
            .clone()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let employees = query
            .order_by_desc(employee::Column::CreatedAt)
            .order_by_desc(employee::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((employees, total))
    }

    /// Insert an employee and assign its `EMP%04d` code from the new id.
    pub async fn create(
        &self,
        new: NewEmployee,
        now: DateTime<Utc>,
    ) -> Result<EmployeeModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        ensure_department(&txn, new.department_id).await?;
        if let Some(manager_id) = new.manager_id {
            ensure_manager(&txn, manager_id).await?;
        }

        let inserted = EmployeeActiveModel {
            employee_code: Set(None),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            email: Set(new.email),
            phone: Set(new.phone),
            date_of_birth: Set(new.date_of_birth),
            gender: Set(new.gender),
            address: Set(new.address),
            position: Set(new.position),
            department_id: Set(new.department_id),
            manager_id: Set(new.manager_id),
            hire_date: Set(new.hire_date),
            salary: Set(new.salary),
            status: Set(new.status),
            emergency_contact_name: Set(new.emergency_contact_name),
            emergency_contact_phone: Set(new.emergency_contact_phone),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::unique_or_database(DUPLICATE_EMAIL))?;

        let code = employee_code_for(inserted.id);
        let mut active = inserted.into_active_model();
        active.employee_code = Set(Some(code));
        let employee = active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;
        Ok(employee)
    }

    pub async fn update(
        &self,
        id: i32,
        changes: EmployeeChanges,
        now: DateTime<Utc>,
    ) -> Result<EmployeeModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = live()
            .filter(employee::Column::Id.eq(id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Employee not found"))?;

        if let Some(department_id) = changes.department_id {
            ensure_department(&txn, department_id).await?;
        }
        if let Some(manager_id) = changes.manager_id {
            if manager_id == id {
                return Err(RepositoryError::validation_error(
                    "Employee cannot be their own manager",
                ));
            }
            ensure_manager(&txn, manager_id).await?;
        }

        let mut active = existing.into_active_model();
        if let Some(v) = changes.first_name {
            active.first_name = Set(v);
        }
        if let Some(v) = changes.last_name {
            active.last_name = Set(v);
        }
        if let Some(v) = changes.email {
            active.email = Set(v);
        }
        if let Some(v) = changes.phone {
            active.phone = Set(Some(v));
        }
        if let Some(v) = changes.date_of_birth {
            active.date_of_birth = Set(Some(v));
        }
        if let Some(v) = changes.gender {
            active.gender = Set(Some(v));
        }
        if let Some(v) = changes.address {
            active.address = Set(Some(v));
        }
        if let Some(v) = changes.position {
            active.position = Set(v);
        }
        if let Some(v) = changes.department_id {
            active.department_id = Set(v);
        }
        if let Some(v) = changes.manager_id {
            active.manager_id = Set(Some(v));
        }
        if let Some(v) = changes.hire_date {
            active.hire_date = Set(v);
        }
        if let Some(v) = changes.salary {
            active.salary = Set(v);
        }
        if let Some(v) = changes.status {
            active.status = Set(v);
        }
        if let Some(v) = changes.emergency_contact_name {
            active.emergency_contact_name = Set(Some(v));
        }
        if let Some(v) = changes.emergency_contact_phone {
            active.emergency_contact_phone = Set(Some(v));
        }
        active.updated_at = Set(now.into());

        let updated = active
            .update(&txn)
            .await
            .map_err(RepositoryError::unique_or_database(DUPLICATE_EMAIL))?;
        txn.commit().await.map_err(RepositoryError::database_error)?;

        Ok(updated)
    }

    pub async fn soft_delete(&self, id: i32, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let existing = self.get(id).await?;

        let mut active = existing.into_active_model();
        active.deleted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Live employees per department, for the given departments.
    pub async fn count_by_department(
        &self,
        department_ids: &[i32],
    ) -> Result<HashMap<i32, u64>, RepositoryError> {
        if department_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, i64)> = live()
            .select_only()
            .column(employee::Column::DepartmentId)
            .column_as(employee::Column::Id.count(), "employee_count")
            .filter(employee::Column::DepartmentId.is_in(department_ids.iter().copied()))
            .group_by(employee::Column::DepartmentId)
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows
            .into_iter()
            .map(|(department_id, count)| (department_id, count.max(0) as u64))
            .collect())
    }
}

async fn ensure_department<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), RepositoryError> {
    let found = Department::find()
        .filter(department::Column::Id.eq(id))
        .filter(department::Column::DeletedAt.is_null())
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    if found == 0 {
        return Err(RepositoryError::validation_error("Department not found"));
    }
    Ok(())
}

async fn ensure_manager<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), RepositoryError> {
    let found = live()
        .filter(employee::Column::Id.eq(id))
        .count(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    if found == 0 {
        return Err(RepositoryError::validation_error("Manager not found"));
    }
    Ok(())
}
