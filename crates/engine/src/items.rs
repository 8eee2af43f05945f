//! Line items of an itemized expense.

use std::collections::BTreeMap;

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::to_i32};

/// One receipt line. `user_shares` maps a user id to a fraction of the item;
/// fractions are normalized per item and need not sum to 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub name: String,
    pub amount: Money,
    pub user_shares: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub position: i32,
    pub name: String,
    pub amount_minor: i64,
    /// JSON object `{ user_id: fraction }`.
    pub user_shares: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_item(
        expense_id: Uuid,
        position: usize,
        item: &ExpenseItem,
    ) -> Result<Self, EngineError> {
        let user_shares = serde_json::to_string(&item.user_shares)
            .map_err(|err| EngineError::InvalidAmount(format!("invalid item shares: {err}")))?;
        Ok(Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            expense_id: ActiveValue::Set(expense_id.to_string()),
            position: ActiveValue::Set(to_i32(position, "item position")?),
            name: ActiveValue::Set(item.name.clone()),
            amount_minor: ActiveValue::Set(item.amount.cents()),
            user_shares: ActiveValue::Set(user_shares),
        })
    }
}

impl TryFrom<Model> for ExpenseItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let user_shares = serde_json::from_str(&model.user_shares)
            .map_err(|err| EngineError::InvalidAmount(format!("invalid item shares: {err}")))?;
        Ok(Self {
            name: model.name,
            amount: Money::new(model.amount_minor),
            user_shares,
        })
    }
}
