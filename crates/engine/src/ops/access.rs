use std::collections::{BTreeSet, HashMap};

use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseItem, ExpenseParticipant, Payer, ResultEngine, expenses, items,
    participants, payers, users,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {username} not exists")))
    }

    /// Display names of the given users; fails on the first unknown one.
    pub(super) async fn require_users<C: ConnectionTrait>(
        &self,
        db: &C,
        usernames: &BTreeSet<&str>,
    ) -> ResultEngine<HashMap<String, Option<String>>> {
        let rows = users::Entity::find()
            .filter(users::Column::Username.is_in(usernames.iter().map(ToString::to_string)))
            .all(db)
            .await?;
        let found: HashMap<String, Option<String>> = rows
            .into_iter()
            .map(|u| (u.username, u.display_name))
            .collect();
        if let Some(missing) = usernames.iter().find(|u| !found.contains_key(**u)) {
            return Err(EngineError::KeyNotFound(format!(
                "user {missing} not exists"
            )));
        }
        Ok(found)
    }

    /// Loads an expense with payers, participants and items, regardless of
    /// who asks.
    pub(super) async fn find_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
    ) -> ResultEngine<Option<Expense>> {
        let Some(model) = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let mut loaded = self.attach_children(db, vec![model]).await?;
        Ok(loaded.pop())
    }

    /// Loads an expense visible to `user_id`.
    ///
    /// Expenses the user is not involved in are reported as missing.
    pub(super) async fn require_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        match self.find_expense(db, expense_id).await? {
            Some(expense) if expense.involves(user_id) => Ok(expense),
            _ => Err(EngineError::KeyNotFound("expense not exists".to_string())),
        }
    }

    /// Like [`require_expense`](Self::require_expense), but only the creator
    /// passes.
    pub(super) async fn require_expense_owner<C: ConnectionTrait>(
        &self,
        db: &C,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        let expense = self.require_expense(db, expense_id, user_id).await?;
        if expense.creator_id != user_id {
            return Err(EngineError::Forbidden(
                "only the creator can modify the expense".to_string(),
            ));
        }
        Ok(expense)
    }

    /// Batch-loads the child rows of `models`, preserving their order.
    pub(super) async fn attach_children<C: ConnectionTrait>(
        &self,
        db: &C,
        models: Vec<expenses::Model>,
    ) -> ResultEngine<Vec<Expense>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();

        let mut payers_by: HashMap<String, Vec<Payer>> = HashMap::new();
        for row in payers::Entity::find()
            .filter(payers::Column::ExpenseId.is_in(ids.clone()))
            .order_by_asc(payers::Column::Position)
            .all(db)
            .await?
        {
            payers_by
                .entry(row.expense_id.clone())
                .or_default()
                .push(Payer::from(row));
        }

        let mut participants_by: HashMap<String, Vec<ExpenseParticipant>> = HashMap::new();
        for row in participants::Entity::find()
            .filter(participants::Column::ExpenseId.is_in(ids.clone()))
            .order_by_asc(participants::Column::Position)
            .all(db)
            .await?
        {
            participants_by
                .entry(row.expense_id.clone())
                .or_default()
                .push(ExpenseParticipant::from(row));
        }

        let mut items_by: HashMap<String, Vec<ExpenseItem>> = HashMap::new();
        for row in items::Entity::find()
            .filter(items::Column::ExpenseId.is_in(ids))
            .order_by_asc(items::Column::Position)
            .all(db)
            .await?
        {
            items_by
                .entry(row.expense_id.clone())
                .or_default()
                .push(ExpenseItem::try_from(row)?);
        }

        models
            .into_iter()
            .map(|model| {
                let key = model.id.clone();
                let mut expense = Expense::try_from(model)?;
                expense.payers = payers_by.remove(&key).unwrap_or_default();
                expense.participants = participants_by.remove(&key).unwrap_or_default();
                expense.items = items_by.remove(&key).unwrap_or_default();
                Ok(expense)
            })
            .collect()
    }
}
