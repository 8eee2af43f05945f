use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub username: String,
        pub display_name: Option<String>,
    }
}

pub mod expense {
    use super::*;

    /// Expense creation request, as sent by clients.
    ///
    /// The split is loosely typed: `split_method` is a tag
    /// (`EQUALLY`, `PERCENTAGE`, `EXACT_AMOUNTS`, `SHARES`, `ITEMIZED`,
    /// `TWO_PERSON`) and every participant may carry any of the
    /// method-specific fields. Unknown tags fall back to `EQUALLY`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub creator_id: String,
        pub description: String,
        pub category: Option<String>,
        pub notes: Option<String>,
        pub group_id: Option<String>,
        #[serde(default)]
        pub is_personal: bool,
        /// Must be >= 0.
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
        pub split_method: String,
        pub payers: Vec<PayerNew>,
        pub participants: Vec<ParticipantNew>,
        #[serde(default)]
        pub items: Vec<ItemNew>,
        /// Percent, ITEMIZED only.
        pub tax_rate: Option<f64>,
        /// Percent, ITEMIZED only.
        pub tip_rate: Option<f64>,
        /// `you` or `other`, TWO_PERSON only.
        pub full_owe_side: Option<String>,
        /// Split the client computed locally. Kept only if it matches the
        /// server split.
        #[serde(default)]
        pub client_split: Vec<ClientShareNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayerNew {
        pub user_id: String,
        pub display_name: Option<String>,
        pub paid_minor: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ParticipantNew {
        pub user_id: String,
        pub percent: Option<f64>,
        pub exact_minor: Option<i64>,
        pub shares: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItemNew {
        pub name: String,
        pub amount_minor: i64,
        /// `user_id -> fraction of the item`.
        pub user_shares: BTreeMap<String, f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ClientShareNew {
        pub user_id: Option<String>,
        pub share_minor: i64,
        pub paid_minor: i64,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub creator_id: String,
        pub description: String,
        pub category: Option<String>,
        pub notes: Option<String>,
        pub group_id: Option<String>,
        pub amount_minor: i64,
        pub occurred_at: DateTime<Utc>,
        pub split_method: String,
        /// `client` or `server`: whose split was stored.
        pub split_source: String,
        pub tax_rate: Option<f64>,
        pub tip_rate: Option<f64>,
        pub is_personal: bool,
        pub is_settled: bool,
        pub status: SettlementStatus,
        pub version: i64,
        pub payers: Vec<PayerView>,
        pub participants: Vec<ParticipantView>,
        pub items: Vec<ItemView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayerView {
        pub user_id: String,
        pub display_name: Option<String>,
        pub paid_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub user_id: String,
        pub display_name: Option<String>,
        pub share_minor: i64,
        pub paid_minor: i64,
        /// `paid - share`; positive means the participant is owed money.
        pub net_minor: i64,
        pub settled_minor: i64,
        pub remaining_minor: i64,
        pub fully_settled: bool,
        pub status: SettlementStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItemView {
        pub name: String,
        pub amount_minor: i64,
        pub user_shares: BTreeMap<String, f64>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementStatus {
        Unsettled,
        PartiallySettled,
        FullySettled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleRequest {
        pub expense_id: Uuid,
        pub participant_id: String,
        /// Must be > 0. If absent, the whole remainder is settled.
        pub amount_minor: Option<i64>,
        /// Optimistic-concurrency guard, from `ExpenseView::version`.
        pub expected_version: Option<i64>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum BalanceDirection {
        OwedToYou,
        YouOwe,
        Settled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FriendBalanceView {
        pub counterparty_id: String,
        pub balance_minor: i64,
        pub direction: BalanceDirection,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalanceView {
        pub group_id: String,
        pub balance_minor: i64,
        pub direction: BalanceDirection,
        pub total_group_spending_minor: i64,
        pub your_contribution_minor: i64,
        pub your_share_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceSummaryView {
        pub total_owed_to_you_minor: i64,
        pub total_you_owe_minor: i64,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub friends: Vec<FriendBalanceView>,
        pub summary: BalanceSummaryView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalancesResponse {
        pub groups: Vec<GroupBalanceView>,
    }
}
