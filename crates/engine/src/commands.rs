//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense creation and
//! settlement) and list queries, keeping call sites readable and avoiding
//! long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{ClientShare, Money, Payer, SettleAmount, SplitRule};

/// Descriptive metadata of a new expense.
#[derive(Clone, Debug)]
pub struct ExpenseMeta {
    pub description: String,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub group_id: Option<String>,
    pub is_personal: bool,
}

impl ExpenseMeta {
    #[must_use]
    pub fn new(description: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            category: None,
            notes: None,
            occurred_at,
            group_id: None,
            is_personal: false,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub fn personal(mut self, is_personal: bool) -> Self {
        self.is_personal = is_personal;
        self
    }
}

/// Create an expense.
///
/// `client_shares` is the split the client computed on its side; it is only
/// kept when it agrees with the server split.
#[derive(Clone, Debug)]
pub struct NewExpenseCmd {
    pub creator_id: String,
    pub total_amount: Money,
    pub meta: ExpenseMeta,
    pub payers: Vec<Payer>,
    pub rule: SplitRule,
    pub client_shares: Vec<ClientShare>,
}

impl NewExpenseCmd {
    #[must_use]
    pub fn new(
        creator_id: impl Into<String>,
        total_amount: Money,
        meta: ExpenseMeta,
        rule: SplitRule,
    ) -> Self {
        Self {
            creator_id: creator_id.into(),
            total_amount,
            meta,
            payers: Vec::new(),
            rule,
            client_shares: Vec::new(),
        }
    }

    #[must_use]
    pub fn payer(mut self, payer: Payer) -> Self {
        self.payers.push(payer);
        self
    }

    #[must_use]
    pub fn payers(mut self, payers: impl IntoIterator<Item = Payer>) -> Self {
        self.payers.extend(payers);
        self
    }

    #[must_use]
    pub fn client_shares(mut self, shares: Vec<ClientShare>) -> Self {
        self.client_shares = shares;
        self
    }
}

/// Record a partial settlement for one participant of an expense.
#[derive(Clone, Debug)]
pub struct SettleCmd {
    pub expense_id: Uuid,
    /// User performing the operation.
    pub user_id: String,
    /// Participant whose debt is being settled.
    pub participant_id: String,
    pub amount: SettleAmount,
    /// When set, the write fails with `Conflict` if the stored expense has a
    /// different version.
    pub expected_version: Option<i64>,
}

impl SettleCmd {
    #[must_use]
    pub fn new(
        expense_id: Uuid,
        user_id: impl Into<String>,
        participant_id: impl Into<String>,
        amount: SettleAmount,
    ) -> Self {
        Self {
            expense_id,
            user_id: user_id.into(),
            participant_id: participant_id.into(),
            amount,
            expected_version: None,
        }
    }

    #[must_use]
    pub fn expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Filters for listing a user's expenses. All filters are conjunctive.
#[derive(Clone, Debug, Default)]
pub struct ExpenseFilter {
    /// Inclusive lower bound on `occurred_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `occurred_at`.
    pub to: Option<DateTime<Utc>>,
    /// Only expenses that also involve this user.
    pub counterparty: Option<String>,
    pub group_id: Option<String>,
}
