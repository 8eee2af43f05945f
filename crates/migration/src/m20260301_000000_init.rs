//! Initial schema migration.
//!
//! - `users`: the user directory expenses are resolved against
//! - `expenses`: expense header, split method and settlement flag
//! - `expense_payers`: who funded an expense and how much
//! - `expense_participants`: computed shares and per-participant settlement
//! - `expense_items`: receipt lines of itemized expenses
//!
//! Amounts are stored as integer cents (`*_minor` columns).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    DisplayName,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    CreatorId,
    Description,
    Category,
    TotalMinor,
    OccurredAt,
    Notes,
    GroupId,
    SplitMethod,
    TaxRate,
    TipRate,
    IsPersonal,
    IsSettled,
    SplitSource,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ExpensePayers {
    Table,
    ExpenseId,
    UserId,
    Position,
    DisplayName,
    PaidMinor,
}

#[derive(Iden)]
enum ExpenseParticipants {
    Table,
    ExpenseId,
    UserId,
    Position,
    DisplayName,
    ShareMinor,
    PaidMinor,
    NetMinor,
    SettledMinor,
    FullySettled,
    Percent,
    ExactMinor,
    Shares,
}

#[derive(Iden)]
enum ExpenseItems {
    Table,
    Id,
    ExpenseId,
    Position,
    Name,
    AmountMinor,
    UserShares,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::DisplayName).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::CreatorId).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(
                        ColumnDef::new(Expenses::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::Notes).string())
                    .col(ColumnDef::new(Expenses::GroupId).string())
                    .col(ColumnDef::new(Expenses::SplitMethod).string().not_null())
                    .col(ColumnDef::new(Expenses::TaxRate).double())
                    .col(ColumnDef::new(Expenses::TipRate).double())
                    .col(
                        ColumnDef::new(Expenses::IsPersonal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Expenses::IsSettled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Expenses::SplitSource).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-creator_id")
                            .from(Expenses::Table, Expenses::CreatorId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-creator_id-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::CreatorId)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Payers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpensePayers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ExpensePayers::ExpenseId).string().not_null())
                    .col(ColumnDef::new(ExpensePayers::UserId).string().not_null())
                    .col(ColumnDef::new(ExpensePayers::Position).integer().not_null())
                    .col(ColumnDef::new(ExpensePayers::DisplayName).string())
                    .col(
                        ColumnDef::new(ExpensePayers::PaidMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ExpensePayers::ExpenseId)
                            .col(ExpensePayers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_payers-expense_id")
                            .from(ExpensePayers::Table, ExpensePayers::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_payers-user_id")
                    .table(ExpensePayers::Table)
                    .col(ExpensePayers::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseParticipants::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseParticipants::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseParticipants::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseParticipants::DisplayName).string())
                    .col(
                        ColumnDef::new(ExpenseParticipants::ShareMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseParticipants::PaidMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseParticipants::NetMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseParticipants::SettledMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ExpenseParticipants::FullySettled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ExpenseParticipants::Percent).double())
                    .col(ColumnDef::new(ExpenseParticipants::ExactMinor).big_integer())
                    .col(ColumnDef::new(ExpenseParticipants::Shares).integer())
                    .primary_key(
                        Index::create()
                            .col(ExpenseParticipants::ExpenseId)
                            .col(ExpenseParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_participants-expense_id")
                            .from(ExpenseParticipants::Table, ExpenseParticipants::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_participants-user_id")
                    .table(ExpenseParticipants::Table)
                    .col(ExpenseParticipants::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseItems::ExpenseId).string().not_null())
                    .col(ColumnDef::new(ExpenseItems::Position).integer().not_null())
                    .col(ColumnDef::new(ExpenseItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseItems::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseItems::UserShares).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_items-expense_id")
                            .from(ExpenseItems::Table, ExpenseItems::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_items-expense_id")
                    .table(ExpenseItems::Table)
                    .col(ExpenseItems::ExpenseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(ExpenseItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpensePayers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
