//! Employee entity model
//!
//! Employees belong to a department and may report to another employee.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Employment status
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum EmployeeStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Inactive")]
    Inactive,
    #[sea_orm(string_value = "OnLeave")]
    OnLeave,
    #[sea_orm(string_value = "Terminated")]
    Terminated,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Gender {
    #[sea_orm(string_value = "Male")]
    Male,
    #[sea_orm(string_value = "Female")]
    Female,
    #[sea_orm(string_value = "Other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `EMP%04d`, derived from `id` right after insert
    #[sea_orm(unique)]
    pub employee_code: Option<String>,

    pub first_name: String,

    pub last_name: String,

    #[sea_orm(unique)]
    pub email: String,

    pub phone: Option<String>,

    pub date_of_birth: Option<Date>,

    pub gender: Option<Gender>,

    pub address: Option<String>,

    pub position: String,

    pub department_id: i32,

    pub manager_id: Option<i32>,

    pub hire_date: Date,

    pub salary: f64,

    pub status: EmployeeStatus,

    pub emergency_contact_name: Option<String>,

    pub emergency_contact_phone: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ManagerId",
        to = "Column::Id"
    )]
    Manager,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Employee code for a given primary key.
pub fn employee_code_for(id: i32) -> String {
    format!("EMP{:04}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_code_is_zero_padded() {
        assert_eq!(employee_code_for(1), "EMP0001");
        assert_eq!(employee_code_for(42), "EMP0042");
        assert_eq!(employee_code_for(12345), "EMP12345");
    }
}
