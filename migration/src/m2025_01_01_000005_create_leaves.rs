//! Migration to create the leaves table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leaves::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Leaves::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Leaves::EmployeeId).integer().not_null())
                    .col(ColumnDef::new(Leaves::LeaveType).string_len(20).not_null())
                    .col(ColumnDef::new(Leaves::StartDate).date().not_null())
                    .col(ColumnDef::new(Leaves::EndDate).date().not_null())
                    .col(ColumnDef::new(Leaves::Days).integer().not_null())
                    .col(ColumnDef::new(Leaves::Reason).text().not_null())
                    .col(
                        ColumnDef::new(Leaves::Status)
                            .string_len(20)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Leaves::ApproverId).integer().null())
                    .col(ColumnDef::new(Leaves::ApprovedByUserId).integer().null())
                    .col(
                        ColumnDef::new(Leaves::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Leaves::Comments).text().null())
                    .col(ColumnDef::new(Leaves::AttachmentUrl).text().null())
                    .col(
                        ColumnDef::new(Leaves::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Leaves::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Leaves::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leaves_employee_id")
                            .from(Leaves::Table, Leaves::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leaves_approver_id")
                            .from(Leaves::Table, Leaves::ApproverId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leaves_approved_by_user_id")
                            .from(Leaves::Table, Leaves::ApprovedByUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Overlap checks scan an employee's open leaves
        manager
            .create_index(
                Index::create()
                    .name("idx_leaves_employee_status")
                    .table(Leaves::Table)
                    .col(Leaves::EmployeeId)
                    .col(Leaves::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_leaves_employee_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Leaves::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Leaves {
    Table,
    Id,
    EmployeeId,
    LeaveType,
    StartDate,
    EndDate,
    Days,
    Reason,
    Status,
    ApproverId,
    ApprovedByUserId,
    ApprovedAt,
    Comments,
    AttachmentUrl,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
