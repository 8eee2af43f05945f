//! Expense payers.
//!
//! A [`Payer`] is a user who funded (part of) an expense. Several payers may
//! co-fund one expense; their contributions are expected to add up to the
//! expense total.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, ResultEngine, util::to_i32};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub user_id: String,
    pub display_name: Option<String>,
    pub paid: Money,
}

impl Payer {
    pub fn new(user_id: impl Into<String>, paid: Money) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            paid,
        }
    }
}

/// Collapses repeated payer entries for the same user into one, summing
/// their contributions and keeping first-seen order.
pub(crate) fn merge_payers(payers: Vec<Payer>) -> ResultEngine<Vec<Payer>> {
    let mut merged: Vec<Payer> = Vec::with_capacity(payers.len());
    for payer in payers {
        match merged.iter_mut().find(|p| p.user_id == payer.user_id) {
            Some(existing) => {
                existing.paid = Money::try_sum([existing.paid, payer.paid])?;
                if existing.display_name.is_none() {
                    existing.display_name = payer.display_name;
                }
            }
            None => merged.push(payer),
        }
    }
    Ok(merged)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_payers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub position: i32,
    pub display_name: Option<String>,
    pub paid_minor: i64,
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
    pub(crate) fn from_payer(
        expense_id: Uuid,
        position: usize,
        payer: &Payer,
    ) -> ResultEngine<Self> {
        Ok(Self {
            expense_id: ActiveValue::Set(expense_id.to_string()),
            user_id: ActiveValue::Set(payer.user_id.clone()),
            position: ActiveValue::Set(to_i32(position, "payer position")?),
            display_name: ActiveValue::Set(payer.display_name.clone()),
            paid_minor: ActiveValue::Set(payer.paid.cents()),
        })
    }
}

impl From<Model> for Payer {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            display_name: model.display_name,
            paid: Money::new(model.paid_minor),
        }
    }
}
