//! Balance netting.
//!
//! Aggregates per-expense nets into running balances per counterparty and per
//! group. For an expense with more than two parties the user's net is spread
//! evenly over every other party; this approximates pairwise debts and is
//! what dashboards are built against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Expense, Money, money::round_half_up};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceDirection {
    OwedToYou,
    YouOwe,
    Settled,
}

impl BalanceDirection {
    pub fn from_balance(balance: Money) -> Self {
        if balance > Money::TOLERANCE {
            Self::OwedToYou
        } else if balance < -Money::TOLERANCE {
            Self::YouOwe
        } else {
            Self::Settled
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendBalance {
    pub counterparty_id: String,
    pub balance: Money,
    pub direction: BalanceDirection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalance {
    pub group_id: String,
    pub balance: Money,
    pub direction: BalanceDirection,
    pub total_group_spending: Money,
    pub your_contribution: Money,
    pub your_share: Money,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_owed_to_you: Money,
    pub total_you_owe: Money,
    pub net: Money,
}

/// `paid - owed` for `user_id` on a single expense.
pub fn user_net(user_id: &str, expense: &Expense) -> Money {
    expense.paid_by(user_id) - expense.owed_by(user_id)
}

/// Raw running balance per counterparty, including entries that net to zero.
pub fn net_balances<'a>(
    user_id: &str,
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> BTreeMap<String, Money> {
    let mut balances: BTreeMap<String, Money> = BTreeMap::new();
    for expense in expenses {
        let net = user_net(user_id, expense);
        if net.is_zero() {
            continue;
        }
        let others = expense.counterparties(user_id);
        if others.is_empty() {
            continue;
        }
        let per_other = round_half_up(net.cents() as f64 / others.len() as f64);
        for other in others {
            *balances.entry(other.to_string()).or_default() += per_other;
        }
    }
    balances
}

/// Per-counterparty balances, dropping the ones within tolerance of zero.
pub fn friend_balances<'a>(
    user_id: &str,
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Vec<FriendBalance> {
    net_balances(user_id, expenses)
        .into_iter()
        .filter_map(|(counterparty_id, balance)| {
            let direction = BalanceDirection::from_balance(balance);
            (direction != BalanceDirection::Settled).then_some(FriendBalance {
                counterparty_id,
                balance,
                direction,
            })
        })
        .collect()
}

/// Per-group balances and spending totals. Expenses without a group are
/// ignored; every group the user appears in is reported.
pub fn group_balances<'a>(
    user_id: &str,
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Vec<GroupBalance> {
    let mut groups: BTreeMap<&str, GroupBalance> = BTreeMap::new();
    for expense in expenses {
        let Some(group_id) = expense.group_id.as_deref() else {
            continue;
        };
        let paid = expense.paid_by(user_id);
        let owed = expense.owed_by(user_id);
        let entry = groups.entry(group_id).or_insert_with(|| GroupBalance {
            group_id: group_id.to_string(),
            balance: Money::ZERO,
            direction: BalanceDirection::Settled,
            total_group_spending: Money::ZERO,
            your_contribution: Money::ZERO,
            your_share: Money::ZERO,
        });
        entry.balance += paid - owed;
        entry.total_group_spending += expense.total_amount;
        entry.your_contribution += paid;
        entry.your_share += owed;
    }
    groups
        .into_values()
        .map(|mut group| {
            group.direction = BalanceDirection::from_balance(group.balance);
            group
        })
        .collect()
}

/// Dashboard totals over a set of friend balances.
pub fn balance_summary(balances: &[FriendBalance]) -> BalanceSummary {
    let mut summary = BalanceSummary::default();
    for b in balances {
        match b.direction {
            BalanceDirection::OwedToYou => summary.total_owed_to_you += b.balance,
            BalanceDirection::YouOwe => summary.total_you_owe += b.balance.abs(),
            BalanceDirection::Settled => {}
        }
    }
    summary.net = summary.total_owed_to_you - summary.total_you_owe;
    summary
}
