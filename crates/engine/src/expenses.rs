//! Expenses: the unit of accounting.
//!
//! An [`Expense`] is created once from a [`NewExpenseCmd`] (split, then
//! reconciled against the client split, then given an all-zero settlement
//! state) and afterwards only changes through settlement or deletion.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseItem, ExpenseParticipant, Money, NewExpenseCmd, Payer, ResultEngine,
    SplitMethod, SplitRule, SplitSource, payers::merge_payers, reconcile::reconcile,
    split::compute_split, util::parse_uuid,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub creator_id: String,
    pub description: String,
    pub category: Option<String>,
    pub total_amount: Money,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub group_id: Option<String>,
    pub split_method: SplitMethod,
    /// Percentages, ITEMIZED only.
    pub tax_rate: Option<f64>,
    pub tip_rate: Option<f64>,
    pub is_personal: bool,
    /// Derived: every participant is fully settled or has nothing to settle.
    pub is_settled: bool,
    pub split_source: SplitSource,
    /// Optimistic-concurrency counter, bumped by every settlement write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payers: Vec<Payer>,
    pub participants: Vec<ExpenseParticipant>,
    pub items: Vec<ExpenseItem>,
}

impl Expense {
    /// Runs the split calculator and reconciliation for `cmd` and returns a
    /// new, unsettled expense.
    pub fn create(cmd: NewExpenseCmd, now: DateTime<Utc>) -> ResultEngine<Self> {
        if cmd.meta.description.trim().is_empty() {
            return Err(EngineError::InvalidAmount(
                "description must not be empty".to_string(),
            ));
        }
        if let Some(payer) = cmd.payers.iter().find(|p| p.paid.is_negative()) {
            return Err(EngineError::InvalidAmount(format!(
                "payer {} has a negative amount",
                payer.user_id
            )));
        }

        let payers = merge_payers(cmd.payers)?;
        let computed = compute_split(cmd.total_amount, &payers, &cmd.rule)?;
        let reconciliation = reconcile(&cmd.client_shares, computed);

        let participants = reconciliation
            .participants
            .into_iter()
            .map(|split| ExpenseParticipant::from_split(split, &cmd.rule))
            .collect();

        let split_method = cmd.rule.method();
        let (items, tax_rate, tip_rate) = match cmd.rule {
            SplitRule::Itemized {
                items,
                tax_rate,
                tip_rate,
                ..
            } => (items, Some(tax_rate), Some(tip_rate)),
            _ => (Vec::new(), None, None),
        };

        let mut expense = Self {
            id: Uuid::new_v4(),
            creator_id: cmd.creator_id,
            description: cmd.meta.description.trim().to_string(),
            category: cmd.meta.category,
            total_amount: cmd.total_amount,
            occurred_at: cmd.meta.occurred_at,
            notes: cmd.meta.notes,
            group_id: cmd.meta.group_id,
            split_method,
            tax_rate,
            tip_rate,
            is_personal: cmd.meta.is_personal,
            is_settled: false,
            split_source: reconciliation.source,
            version: 0,
            created_at: now,
            updated_at: now,
            payers,
            participants,
            items,
        };
        expense.refresh_settled();
        Ok(expense)
    }

    /// `true` if the user created, paid for or participates in the expense.
    pub fn involves(&self, user_id: &str) -> bool {
        self.creator_id == user_id
            || self.payers.iter().any(|p| p.user_id == user_id)
            || self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Everyone among payers and participants except `user_id`.
    pub fn counterparties(&self, user_id: &str) -> BTreeSet<&str> {
        self.payers
            .iter()
            .map(|p| p.user_id.as_str())
            .chain(self.participants.iter().map(|p| p.user_id.as_str()))
            .filter(|id| *id != user_id)
            .collect()
    }

    pub fn participant(&self, user_id: &str) -> Option<&ExpenseParticipant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Amount paid by `user_id`. Payers are merged per user on creation.
    pub fn paid_by(&self, user_id: &str) -> Money {
        self.payers
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.paid)
            .unwrap_or(Money::ZERO)
    }

    /// Share owed by `user_id` (zero if not a participant).
    pub fn owed_by(&self, user_id: &str) -> Money {
        self.participant(user_id)
            .map(|p| p.share)
            .unwrap_or(Money::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub creator_id: String,
    pub description: String,
    pub category: Option<String>,
    pub total_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub notes: Option<String>,
    pub group_id: Option<String>,
    pub split_method: String,
    pub tax_rate: Option<f64>,
    pub tip_rate: Option<f64>,
    pub is_personal: bool,
    pub is_settled: bool,
    pub split_source: String,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payers::Entity")]
    Payers,
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
    #[sea_orm(has_many = "super::items::Entity")]
    Items,
}

impl Related<super::payers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payers.def()
    }
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            creator_id: ActiveValue::Set(expense.creator_id.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            category: ActiveValue::Set(expense.category.clone()),
            total_minor: ActiveValue::Set(expense.total_amount.cents()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            notes: ActiveValue::Set(expense.notes.clone()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            split_method: ActiveValue::Set(expense.split_method.as_str().to_string()),
            tax_rate: ActiveValue::Set(expense.tax_rate),
            tip_rate: ActiveValue::Set(expense.tip_rate),
            is_personal: ActiveValue::Set(expense.is_personal),
            is_settled: ActiveValue::Set(expense.is_settled),
            split_source: ActiveValue::Set(expense.split_source.as_str().to_string()),
            version: ActiveValue::Set(expense.version),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    /// Builds the expense header; payers, participants and items are
    /// attached by the caller.
    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            creator_id: model.creator_id,
            description: model.description,
            category: model.category,
            total_amount: Money::new(model.total_minor),
            occurred_at: model.occurred_at,
            notes: model.notes,
            group_id: model.group_id,
            split_method: SplitMethod::try_from(model.split_method.as_str())?,
            tax_rate: model.tax_rate,
            tip_rate: model.tip_rate,
            is_personal: model.is_personal,
            is_settled: model.is_settled,
            split_source: SplitSource::try_from(model.split_source.as_str())?,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            payers: Vec::new(),
            participants: Vec::new(),
            items: Vec::new(),
        })
    }
}
