//! Leave entity model
//!
//! Leave requests move `Pending -> Approved | Rejected | Cancelled`; only
//! pending requests can change.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum LeaveType {
    #[sea_orm(string_value = "Annual")]
    Annual,
    #[sea_orm(string_value = "Sick")]
    Sick,
    #[sea_orm(string_value = "Maternity")]
    Maternity,
    #[sea_orm(string_value = "Paternity")]
    Paternity,
    #[sea_orm(string_value = "Personal")]
    Personal,
    #[sea_orm(string_value = "Emergency")]
    Emergency,
    #[sea_orm(string_value = "Bereavement")]
    Bereavement,
    #[sea_orm(string_value = "Study")]
    Study,
    #[sea_orm(string_value = "Unpaid")]
    Unpaid,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum LeaveStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl LeaveStatus {
    /// Statuses that block overlapping requests for the same employee.
    pub const BLOCKING: [LeaveStatus; 2] = [LeaveStatus::Pending, LeaveStatus::Approved];
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leaves")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub employee_id: i32,

    pub leave_type: LeaveType,

    pub start_date: Date,

    pub end_date: Date,

    /// Inclusive day count, `end - start + 1`
    pub days: i32,

    pub reason: String,

    pub status: LeaveStatus,

    /// Employee record of the deciding user, when that user has one
    pub approver_id: Option<i32>,

    pub approved_by_user_id: Option<i32>,

    pub approved_at: Option<DateTimeWithTimeZone>,

    pub comments: Option<String>,

    pub attachment_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::ApproverId",
        to = "super::employee::Column::Id"
    )]
    Approver,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
