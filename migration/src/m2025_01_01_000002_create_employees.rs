//! Migration to create the employees table.
//!
//! `employee_code` is nullable because the code is derived from the primary
//! key and written right after the insert.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employees::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Employees::EmployeeCode).string_len(20).null())
                    .col(ColumnDef::new(Employees::FirstName).string_len(100).not_null())
                    .col(ColumnDef::new(Employees::LastName).string_len(100).not_null())
                    .col(ColumnDef::new(Employees::Email).string_len(255).not_null())
                    .col(ColumnDef::new(Employees::Phone).string_len(50).null())
                    .col(ColumnDef::new(Employees::DateOfBirth).date().null())
                    .col(ColumnDef::new(Employees::Gender).string_len(20).null())
                    .col(ColumnDef::new(Employees::Address).text().null())
                    .col(ColumnDef::new(Employees::Position).string_len(100).not_null())
                    .col(ColumnDef::new(Employees::DepartmentId).integer().not_null())
                    .col(ColumnDef::new(Employees::ManagerId).integer().null())
                    .col(ColumnDef::new(Employees::HireDate).date().not_null())
                    .col(
                        ColumnDef::new(Employees::Salary)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Employees::Status)
                            .string_len(20)
                            .not_null()
                            .default("Active"),
                    )
                    .col(
                        ColumnDef::new(Employees::EmergencyContactName)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Employees::EmergencyContactPhone)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Employees::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Employees::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Employees::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_department_id")
                            .from(Employees::Table, Employees::DepartmentId)
                            .to(Departments::Table, Departments::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employees_manager_id")
                            .from(Employees::Table, Employees::ManagerId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_email")
                    .table(Employees::Table)
                    .col(Employees::Email)
                    .unique()
                    .and_where(Expr::col(Employees::DeletedAt).is_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_employee_code")
                    .table(Employees::Table)
                    .col(Employees::EmployeeCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_department_id")
                    .table(Employees::Table)
                    .col(Employees::DepartmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx_employees_email",
            "idx_employees_employee_code",
            "idx_employees_department_id",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Employees::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    EmployeeCode,
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    Gender,
    Address,
    Position,
    DepartmentId,
    ManagerId,
    HireDate,
    Salary,
    Status,
    EmergencyContactName,
    EmergencyContactPhone,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Departments {
    Table,
    Id,
}
