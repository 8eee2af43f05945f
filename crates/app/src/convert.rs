//! Translation between wire DTOs (`api_types`) and engine types.

use api_types::{
    balance::{
        BalanceDirection as DirectionView, BalanceSummaryView, FriendBalanceView,
        GroupBalanceView,
    },
    expense::{
        ExpenseNew, ExpenseView, ItemView, ParticipantView, PayerView,
        SettlementStatus as StatusView,
    },
    settlement::SettleRequest,
};
use engine::{
    BalanceDirection, BalanceSummary, ClientShare, EngineError, Expense, ExpenseItem,
    ExpenseMeta, FriendBalance, GroupBalance, LooseParticipant, LooseSplitExtras, Money,
    NewExpenseCmd, Payer, SettleAmount, SettleCmd, SettlementStatus, SplitMethod, SplitRule,
};

/// Builds the engine command for a client expense request.
pub fn expense_cmd(req: ExpenseNew) -> Result<NewExpenseCmd, EngineError> {
    let method = SplitMethod::parse_lenient(&req.split_method);
    let participants: Vec<LooseParticipant> = req
        .participants
        .into_iter()
        .map(|p| LooseParticipant {
            user_id: p.user_id,
            percent: p.percent,
            exact: p.exact_minor.map(Money::new),
            shares: p.shares,
        })
        .collect();
    let extras = LooseSplitExtras {
        items: req
            .items
            .into_iter()
            .map(|item| ExpenseItem {
                name: item.name,
                amount: Money::new(item.amount_minor),
                user_shares: item.user_shares,
            })
            .collect(),
        tax_rate: req.tax_rate,
        tip_rate: req.tip_rate,
        creator_id: req.creator_id.clone(),
        full_owe_side: req.full_owe_side,
    };
    let rule = SplitRule::from_loose(method, &participants, extras)?;

    let mut meta = ExpenseMeta::new(req.description, req.occurred_at.to_utc())
        .personal(req.is_personal);
    if let Some(category) = req.category {
        meta = meta.category(category);
    }
    if let Some(notes) = req.notes {
        meta = meta.notes(notes);
    }
    if let Some(group_id) = req.group_id {
        meta = meta.group_id(group_id);
    }

    let payers = req.payers.into_iter().map(|p| Payer {
        user_id: p.user_id,
        display_name: p.display_name,
        paid: Money::new(p.paid_minor),
    });
    let client = req
        .client_split
        .into_iter()
        .map(|c| ClientShare {
            user_id: c.user_id,
            share: Money::new(c.share_minor),
            paid: Money::new(c.paid_minor),
            net: Money::new(c.net_minor),
        })
        .collect();

    Ok(
        NewExpenseCmd::new(req.creator_id, Money::new(req.amount_minor), meta, rule)
            .payers(payers)
            .client_shares(client),
    )
}

pub fn settle_cmd(req: SettleRequest, user_id: &str) -> SettleCmd {
    let amount = match req.amount_minor {
        Some(minor) => SettleAmount::Amount(Money::new(minor)),
        None => SettleAmount::Remainder,
    };
    let cmd = SettleCmd::new(req.expense_id, user_id, req.participant_id, amount);
    match req.expected_version {
        Some(version) => cmd.expected_version(version),
        None => cmd,
    }
}

fn status_view(status: SettlementStatus) -> StatusView {
    match status {
        SettlementStatus::Unsettled => StatusView::Unsettled,
        SettlementStatus::PartiallySettled => StatusView::PartiallySettled,
        SettlementStatus::FullySettled => StatusView::FullySettled,
    }
}

fn direction_view(direction: BalanceDirection) -> DirectionView {
    match direction {
        BalanceDirection::OwedToYou => DirectionView::OwedToYou,
        BalanceDirection::YouOwe => DirectionView::YouOwe,
        BalanceDirection::Settled => DirectionView::Settled,
    }
}

pub fn expense_view(expense: &Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        creator_id: expense.creator_id.clone(),
        description: expense.description.clone(),
        category: expense.category.clone(),
        notes: expense.notes.clone(),
        group_id: expense.group_id.clone(),
        amount_minor: expense.total_amount.cents(),
        occurred_at: expense.occurred_at,
        split_method: expense.split_method.as_str().to_string(),
        split_source: expense.split_source.as_str().to_string(),
        tax_rate: expense.tax_rate,
        tip_rate: expense.tip_rate,
        is_personal: expense.is_personal,
        is_settled: expense.is_settled,
        status: status_view(expense.settlement_status()),
        version: expense.version,
        payers: expense
            .payers
            .iter()
            .map(|p| PayerView {
                user_id: p.user_id.clone(),
                display_name: p.display_name.clone(),
                paid_minor: p.paid.cents(),
            })
            .collect(),
        participants: expense
            .participants
            .iter()
            .map(|p| ParticipantView {
                user_id: p.user_id.clone(),
                display_name: p.display_name.clone(),
                share_minor: p.share.cents(),
                paid_minor: p.paid.cents(),
                net_minor: p.net.cents(),
                settled_minor: p.settled_amount.cents(),
                remaining_minor: p.remaining().cents(),
                fully_settled: p.fully_settled,
                status: status_view(p.settlement_status()),
            })
            .collect(),
        items: expense
            .items
            .iter()
            .map(|i| ItemView {
                name: i.name.clone(),
                amount_minor: i.amount.cents(),
                user_shares: i.user_shares.clone(),
            })
            .collect(),
    }
}

pub fn friend_view(balance: &FriendBalance) -> FriendBalanceView {
    FriendBalanceView {
        counterparty_id: balance.counterparty_id.clone(),
        balance_minor: balance.balance.cents(),
        direction: direction_view(balance.direction),
    }
}

pub fn group_view(balance: &GroupBalance) -> GroupBalanceView {
    GroupBalanceView {
        group_id: balance.group_id.clone(),
        balance_minor: balance.balance.cents(),
        direction: direction_view(balance.direction),
        total_group_spending_minor: balance.total_group_spending.cents(),
        your_contribution_minor: balance.your_contribution.cents(),
        your_share_minor: balance.your_share.cents(),
    }
}

pub fn summary_view(summary: &BalanceSummary) -> BalanceSummaryView {
    BalanceSummaryView {
        total_owed_to_you_minor: summary.total_owed_to_you.cents(),
        total_you_owe_minor: summary.total_you_owe.cents(),
        net_minor: summary.net.cents(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> ExpenseNew {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn loose_percentage_request_becomes_typed_rule() {
        let cmd = expense_cmd(request(
            r#"{
                "creator_id": "alice",
                "description": "Hotel",
                "amount_minor": 20000,
                "occurred_at": "2026-05-10T19:00:00+02:00",
                "split_method": "PERCENTAGE",
                "payers": [{"user_id": "alice", "paid_minor": 20000}],
                "participants": [
                    {"user_id": "alice", "percent": 40.0},
                    {"user_id": "bob"}
                ]
            }"#,
        ))
        .unwrap();

        assert_eq!(cmd.total_amount, Money::new(20000));
        assert_eq!(cmd.payers.len(), 1);
        match cmd.rule {
            SplitRule::Percentage { participants } => {
                assert_eq!(participants[0].percent, 40.0);
                // Missing percent counts as zero.
                assert_eq!(participants[1].percent, 0.0);
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn unknown_method_falls_back_to_equally() {
        let cmd = expense_cmd(request(
            r#"{
                "creator_id": "alice",
                "description": "Snacks",
                "amount_minor": 900,
                "occurred_at": "2026-05-10T19:00:00Z",
                "split_method": "BY_MOOD",
                "payers": [],
                "participants": [{"user_id": "alice"}, {"user_id": "bob"}]
            }"#,
        ))
        .unwrap();
        assert_eq!(cmd.rule.method(), SplitMethod::Equally);
    }

    #[test]
    fn two_person_requires_valid_owe_side() {
        let err = expense_cmd(request(
            r#"{
                "creator_id": "alice",
                "description": "Tickets",
                "amount_minor": 5000,
                "occurred_at": "2026-05-10T19:00:00Z",
                "split_method": "TWO_PERSON",
                "full_owe_side": "both",
                "payers": [],
                "participants": [{"user_id": "alice"}, {"user_id": "bob"}]
            }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOweSide(_)));
    }

    #[test]
    fn settle_request_without_amount_settles_remainder() {
        let req = SettleRequest {
            expense_id: uuid::Uuid::new_v4(),
            participant_id: "bob".to_string(),
            amount_minor: None,
            expected_version: Some(3),
        };
        let cmd = settle_cmd(req, "alice");
        assert_eq!(cmd.amount, SettleAmount::Remainder);
        assert_eq!(cmd.expected_version, Some(3));
        assert_eq!(cmd.user_id, "alice");
    }
}
