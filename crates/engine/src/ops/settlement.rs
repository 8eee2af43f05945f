use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, Expense, ResultEngine, SettleCmd, expenses, participants};

use super::{Engine, with_tx};

impl Engine {
    /// Records a partial settlement and persists it.
    ///
    /// Any user involved in the expense may record a settlement. The write
    /// is versioned: if another writer got there first the call fails with
    /// [`EngineError::Conflict`] and nothing is stored.
    pub async fn settle_partial(&self, cmd: SettleCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let mut expense = self
                .require_expense(&db_tx, cmd.expense_id, &cmd.user_id)
                .await?;
            check_version(&expense, cmd.expected_version)?;
            let loaded_version = expense.version;

            let outcome = expense.settle_partial(&cmd.participant_id, cmd.amount)?;
            self.store_settlement(&db_tx, &mut expense, loaded_version)
                .await?;
            tracing::info!(
                expense_id = %expense.id,
                participant = %outcome.user_id,
                applied = %outcome.applied,
                remaining = %outcome.remaining,
                settled = expense.is_settled,
                "settlement recorded"
            );
            Ok(expense)
        })
    }

    /// Marks every participant as fully settled. Creator only.
    pub async fn settle_full(
        &self,
        expense_id: Uuid,
        user_id: &str,
        expected_version: Option<i64>,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let mut expense = self
                .require_expense_owner(&db_tx, expense_id, user_id)
                .await?;
            check_version(&expense, expected_version)?;
            let loaded_version = expense.version;

            expense.settle_full();
            self.store_settlement(&db_tx, &mut expense, loaded_version)
                .await?;
            tracing::info!(%expense_id, user_id, "expense fully settled");
            Ok(expense)
        })
    }

    /// Writes settlement state guarded by the version the expense was loaded
    /// with, bumping it on success.
    async fn store_settlement<C: ConnectionTrait>(
        &self,
        db: &C,
        expense: &mut Expense,
        loaded_version: i64,
    ) -> ResultEngine<()> {
        let now = Utc::now();
        let next_version = loaded_version + 1;
        let result = expenses::Entity::update_many()
            .col_expr(expenses::Column::Version, Expr::value(next_version))
            .col_expr(expenses::Column::IsSettled, Expr::value(expense.is_settled))
            .col_expr(expenses::Column::UpdatedAt, Expr::value(now))
            .filter(expenses::Column::Id.eq(expense.id.to_string()))
            .filter(expenses::Column::Version.eq(loaded_version))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            tracing::warn!(expense_id = %expense.id, loaded_version, "settlement lost a race");
            return Err(EngineError::Conflict(format!(
                "expense {} was modified concurrently",
                expense.id
            )));
        }

        for participant in &expense.participants {
            participants::ActiveModel::settlement_of(expense.id, participant)
                .update(db)
                .await?;
        }
        expense.version = next_version;
        expense.updated_at = now;
        Ok(())
    }
}

fn check_version(expense: &Expense, expected: Option<i64>) -> ResultEngine<()> {
    match expected {
        Some(version) if version != expense.version => Err(EngineError::Conflict(format!(
            "expense {} is at version {}, expected {version}",
            expense.id, expense.version
        ))),
        _ => Ok(()),
    }
}
