use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Condition,
};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseFilter, NewExpenseCmd, ResultEngine, expenses, items,
    participants, payers, util::normalize_required,
};

use super::{Engine, with_tx};

pub(super) fn validate_filter(filter: &ExpenseFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Creates an expense: split, reconcile against the client split and
    /// persist it with an all-zero settlement state.
    ///
    /// Creator, payers and participants must all be known users.
    pub async fn create_expense(&self, mut cmd: NewExpenseCmd) -> ResultEngine<Expense> {
        cmd.creator_id = normalize_required(&cmd.creator_id, "creator")?;
        with_tx!(self, |db_tx| {
            let mut known: BTreeSet<&str> = cmd.rule.participant_ids().into_iter().collect();
            known.insert(cmd.creator_id.as_str());
            known.extend(cmd.payers.iter().map(|p| p.user_id.as_str()));
            let names = self.require_users(&db_tx, &known).await?;

            let mut expense = Expense::create(cmd, Utc::now())?;
            for payer in &mut expense.payers {
                if payer.display_name.is_none() {
                    payer.display_name = names.get(&payer.user_id).cloned().flatten();
                }
            }
            for participant in &mut expense.participants {
                if participant.display_name.is_none() {
                    participant.display_name = names.get(&participant.user_id).cloned().flatten();
                }
            }

            self.insert_expense(&db_tx, &expense).await?;
            tracing::info!(
                expense_id = %expense.id,
                creator = %expense.creator_id,
                total = %expense.total_amount,
                method = expense.split_method.as_str(),
                source = expense.split_source.as_str(),
                "expense created"
            );
            Ok(expense)
        })
    }

    /// Returns an expense the user is involved in.
    pub async fn expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<Expense> {
        self.require_expense(&self.database, expense_id, user_id)
            .await
    }

    /// Deletes an expense with its payers, participants and items. Creator only.
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_expense_owner(&db_tx, expense_id, user_id)
                .await?;
            let id = expense_id.to_string();
            payers::Entity::delete_many()
                .filter(payers::Column::ExpenseId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            participants::Entity::delete_many()
                .filter(participants::Column::ExpenseId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            items::Entity::delete_many()
                .filter(items::Column::ExpenseId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(id).exec(&db_tx).await?;
            tracing::info!(%expense_id, user_id, "expense deleted");
            Ok(())
        })
    }

    /// Expenses the user created, paid for or participates in, most recent
    /// first.
    pub async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> ResultEngine<Vec<Expense>> {
        validate_filter(filter)?;
        self.load_involving(&self.database, user_id, filter).await
    }

    pub(super) async fn load_involving<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        filter: &ExpenseFilter,
    ) -> ResultEngine<Vec<Expense>> {
        let paid_in: Vec<String> = payers::Entity::find()
            .select_only()
            .column(payers::Column::ExpenseId)
            .filter(payers::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await?;
        let part_of: Vec<String> = participants::Entity::find()
            .select_only()
            .column(participants::Column::ExpenseId)
            .filter(participants::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await?;

        let mut query = expenses::Entity::find().filter(
            Condition::any()
                .add(expenses::Column::CreatorId.eq(user_id))
                .add(expenses::Column::Id.is_in(paid_in))
                .add(expenses::Column::Id.is_in(part_of)),
        );
        if let Some(from) = filter.from {
            query = query.filter(expenses::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expenses::Column::OccurredAt.lt(to));
        }
        if let Some(group_id) = &filter.group_id {
            query = query.filter(expenses::Column::GroupId.eq(group_id.as_str()));
        }
        let models = query
            .order_by_desc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::Id)
            .all(db)
            .await?;

        let mut loaded = self.attach_children(db, models).await?;
        if let Some(counterparty) = &filter.counterparty {
            loaded.retain(|e| e.involves(counterparty));
        }
        Ok(loaded)
    }

    async fn insert_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        expense: &Expense,
    ) -> ResultEngine<()> {
        expenses::ActiveModel::from(expense).insert(db).await?;
        for (position, payer) in expense.payers.iter().enumerate() {
            payers::ActiveModel::from_payer(expense.id, position, payer)?
                .insert(db)
                .await?;
        }
        for (position, participant) in expense.participants.iter().enumerate() {
            participants::ActiveModel::from_participant(expense.id, position, participant)?
                .insert(db)
                .await?;
        }
        for (position, item) in expense.items.iter().enumerate() {
            items::ActiveModel::from_item(expense.id, position, item)?
                .insert(db)
                .await?;
        }
        Ok(())
    }
}
