//! Expense participants.
//!
//! An [`ExpenseParticipant`] owes a `share` of the expense and carries its own
//! settlement state. `net = paid - share`: positive means the participant is
//! owed money, negative means they owe money.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, ResultEngine, SplitRule, SplitShare, util::to_i32};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseParticipant {
    pub user_id: String,
    pub display_name: Option<String>,
    pub share: Money,
    pub paid: Money,
    pub net: Money,
    pub settled_amount: Money,
    pub fully_settled: bool,
    /// Raw PERCENTAGE input.
    pub percent: Option<f64>,
    /// Raw EXACT_AMOUNTS input.
    pub exact: Option<Money>,
    /// Raw SHARES weight.
    pub shares: Option<u32>,
}

impl ExpenseParticipant {
    /// Builds an unsettled participant from an authoritative split, keeping
    /// the raw method input the user submitted.
    pub(crate) fn from_split(split: SplitShare, rule: &SplitRule) -> Self {
        let (percent, exact, shares) = raw_inputs(rule, &split.user_id);
        Self {
            user_id: split.user_id,
            display_name: None,
            share: split.share,
            paid: split.paid,
            net: split.net,
            settled_amount: Money::ZERO,
            fully_settled: false,
            percent,
            exact,
            shares,
        }
    }

    /// Amount this participant has to settle: `|net|`.
    pub fn owed(&self) -> Money {
        self.net.abs()
    }

    /// Part of [`owed`](Self::owed) not settled yet.
    pub fn remaining(&self) -> Money {
        let remaining = self.owed() - self.settled_amount;
        if remaining.is_negative() {
            Money::ZERO
        } else {
            remaining
        }
    }

    /// `true` when nothing is left to settle for this participant.
    pub fn is_clear(&self) -> bool {
        self.fully_settled || self.owed() < Money::TOLERANCE
    }
}

fn raw_inputs(rule: &SplitRule, user_id: &str) -> (Option<f64>, Option<Money>, Option<u32>) {
    match rule {
        SplitRule::Percentage { participants } => (
            participants
                .iter()
                .find(|p| p.user_id == user_id)
                .map(|p| p.percent),
            None,
            None,
        ),
        SplitRule::ExactAmounts { participants } => (
            None,
            participants
                .iter()
                .find(|p| p.user_id == user_id)
                .map(|p| p.amount),
            None,
        ),
        SplitRule::Shares { participants } => (
            None,
            None,
            participants
                .iter()
                .find(|p| p.user_id == user_id)
                .map(|p| p.shares),
        ),
        _ => (None, None, None),
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub position: i32,
    pub display_name: Option<String>,
    pub share_minor: i64,
    pub paid_minor: i64,
    pub net_minor: i64,
    pub settled_minor: i64,
    pub fully_settled: bool,
    pub percent: Option<f64>,
    pub exact_minor: Option<i64>,
    pub shares: Option<i32>,
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
    pub(crate) fn from_participant(
        expense_id: Uuid,
        position: usize,
        participant: &ExpenseParticipant,
    ) -> ResultEngine<Self> {
        let shares = participant
            .shares
            .map(|s| to_i32(s, "shares weight"))
            .transpose()?;
        Ok(Self {
            expense_id: ActiveValue::Set(expense_id.to_string()),
            user_id: ActiveValue::Set(participant.user_id.clone()),
            position: ActiveValue::Set(to_i32(position, "participant position")?),
            display_name: ActiveValue::Set(participant.display_name.clone()),
            share_minor: ActiveValue::Set(participant.share.cents()),
            paid_minor: ActiveValue::Set(participant.paid.cents()),
            net_minor: ActiveValue::Set(participant.net.cents()),
            settled_minor: ActiveValue::Set(participant.settled_amount.cents()),
            fully_settled: ActiveValue::Set(participant.fully_settled),
            percent: ActiveValue::Set(participant.percent),
            exact_minor: ActiveValue::Set(participant.exact.map(Money::cents)),
            shares: ActiveValue::Set(shares),
        })
    }

    /// Only the settlement columns, for settlement writes.
    pub(crate) fn settlement_of(expense_id: Uuid, participant: &ExpenseParticipant) -> Self {
        Self {
            expense_id: ActiveValue::Unchanged(expense_id.to_string()),
            user_id: ActiveValue::Unchanged(participant.user_id.clone()),
            settled_minor: ActiveValue::Set(participant.settled_amount.cents()),
            fully_settled: ActiveValue::Set(participant.fully_settled),
            ..Default::default()
        }
    }
}

impl From<Model> for ExpenseParticipant {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            display_name: model.display_name,
            share: Money::new(model.share_minor),
            paid: Money::new(model.paid_minor),
            net: Money::new(model.net_minor),
            settled_amount: Money::new(model.settled_minor),
            fully_settled: model.fully_settled,
            percent: model.percent,
            exact: model.exact_minor.map(Money::new),
            shares: model.shares.and_then(|s| u32::try_from(s).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineError, SharesInput};

    fn weighted(shares: u32) -> ExpenseParticipant {
        let rule = SplitRule::Shares {
            participants: vec![SharesInput {
                user_id: "alice".to_string(),
                shares,
            }],
        };
        let split = SplitShare {
            user_id: "alice".to_string(),
            share: Money::new(1000),
            paid: Money::new(1000),
            net: Money::ZERO,
        };
        ExpenseParticipant::from_split(split, &rule)
    }

    #[test]
    fn shares_weight_is_stored_as_is() {
        let model = ActiveModel::from_participant(Uuid::nil(), 0, &weighted(3)).unwrap();
        assert_eq!(model.shares.unwrap(), Some(3));
    }

    #[test]
    fn oversized_shares_weight_is_rejected() {
        assert!(matches!(
            ActiveModel::from_participant(Uuid::nil(), 0, &weighted(u32::MAX)),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}
