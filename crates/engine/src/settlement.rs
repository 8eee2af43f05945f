//! Settlement tracking.
//!
//! Each participant moves monotonically through
//! `Unsettled -> PartiallySettled -> FullySettled`; `settled_amount` never
//! decreases. Partial settlements are clamped to what is still owed, a full
//! settlement overrides every participant unconditionally.
//!
//! These methods are plain read-modify-write on an in-memory [`Expense`].
//! Callers that persist the result must serialize writes per expense; the
//! [`Engine`](crate::Engine) does so with the expense `version` column.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Expense, ExpenseParticipant, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Unsettled,
    PartiallySettled,
    FullySettled,
}

/// How much a partial settlement should cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleAmount {
    Amount(Money),
    /// Whatever is still owed.
    Remainder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettleOutcome {
    pub user_id: String,
    /// Amount actually recorded after clamping.
    pub applied: Money,
    pub settled_amount: Money,
    pub remaining: Money,
    pub fully_settled: bool,
}

impl ExpenseParticipant {
    pub fn settlement_status(&self) -> SettlementStatus {
        if self.fully_settled {
            SettlementStatus::FullySettled
        } else if self.settled_amount.is_positive() {
            SettlementStatus::PartiallySettled
        } else {
            SettlementStatus::Unsettled
        }
    }
}

impl Expense {
    /// Records a payment towards `user_id`'s debt.
    ///
    /// The amount is clamped so that `settled_amount` never exceeds `|net|`.
    pub fn settle_partial(
        &mut self,
        user_id: &str,
        amount: SettleAmount,
    ) -> ResultEngine<SettleOutcome> {
        if let SettleAmount::Amount(requested) = amount
            && !requested.is_positive()
        {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }

        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("participant {user_id} not in expense"))
            })?;

        let owed = participant.owed();
        let available = participant.remaining();
        let applied = match amount {
            SettleAmount::Amount(requested) => requested.min(available),
            SettleAmount::Remainder => available,
        };

        participant.settled_amount += applied;
        if (participant.settled_amount - owed).abs() < Money::TOLERANCE {
            participant.fully_settled = true;
        }
        tracing::debug!(
            expense_id = %self.id,
            user_id,
            applied = %applied,
            settled = %participant.settled_amount,
            status = ?participant.settlement_status(),
            "partial settlement"
        );

        let outcome = SettleOutcome {
            user_id: participant.user_id.clone(),
            applied,
            settled_amount: participant.settled_amount,
            remaining: participant.remaining(),
            fully_settled: participant.fully_settled,
        };
        self.refresh_settled();
        Ok(outcome)
    }

    /// Marks every participant as fully settled, bypassing the clamp.
    pub fn settle_full(&mut self) {
        for participant in &mut self.participants {
            participant.settled_amount = participant.owed();
            participant.fully_settled = true;
        }
        tracing::debug!(expense_id = %self.id, "full settlement");
        self.refresh_settled();
    }

    /// Recomputes `is_settled` from the participants and returns it.
    pub fn refresh_settled(&mut self) -> bool {
        self.is_settled = self.participants.iter().all(ExpenseParticipant::is_clear);
        self.is_settled
    }

    /// Aggregate status of the expense.
    pub fn settlement_status(&self) -> SettlementStatus {
        if self.is_settled {
            SettlementStatus::FullySettled
        } else if self
            .participants
            .iter()
            .any(|p| p.settled_amount.is_positive() || p.fully_settled)
        {
            SettlementStatus::PartiallySettled
        } else {
            SettlementStatus::Unsettled
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{ExpenseMeta, NewExpenseCmd, Payer, SplitRule};

    /// alice paid 100 for alice and bob, bob owes 50.
    fn lunch() -> Expense {
        let cmd = NewExpenseCmd::new(
            "alice",
            Money::new(10000),
            ExpenseMeta::new("Lunch", Utc::now()),
            SplitRule::Equally {
                participants: vec!["alice".to_string(), "bob".to_string()],
            },
        )
        .payer(Payer::new("alice", Money::new(10000)));
        Expense::create(cmd, Utc::now()).unwrap()
    }

    #[test]
    fn partial_settlement_is_clamped_to_what_is_owed() {
        let mut expense = lunch();

        let first = expense
            .settle_partial("bob", SettleAmount::Amount(Money::new(3000)))
            .unwrap();
        assert_eq!(first.applied, Money::new(3000));
        assert!(!first.fully_settled);
        assert_eq!(
            expense.participant("bob").unwrap().settlement_status(),
            SettlementStatus::PartiallySettled
        );

        let second = expense
            .settle_partial("bob", SettleAmount::Amount(Money::new(4000)))
            .unwrap();
        assert_eq!(second.applied, Money::new(2000));
        assert_eq!(second.settled_amount, Money::new(5000));
        assert_eq!(second.remaining, Money::ZERO);
        assert!(second.fully_settled);
    }

    #[test]
    fn settling_a_fully_settled_participant_applies_nothing() {
        let mut expense = lunch();
        expense
            .settle_partial("bob", SettleAmount::Remainder)
            .unwrap();
        let again = expense
            .settle_partial("bob", SettleAmount::Amount(Money::new(100)))
            .unwrap();
        assert_eq!(again.applied, Money::ZERO);
        assert_eq!(again.settled_amount, Money::new(5000));
    }

    #[test]
    fn expense_settles_when_every_participant_is_clear() {
        let mut expense = lunch();
        expense
            .settle_partial("bob", SettleAmount::Remainder)
            .unwrap();
        // alice is still owed her 50 and has not confirmed it.
        assert!(!expense.is_settled);
        assert_eq!(
            expense.settlement_status(),
            SettlementStatus::PartiallySettled
        );

        expense
            .settle_partial("alice", SettleAmount::Remainder)
            .unwrap();
        assert!(expense.is_settled);
        assert_eq!(expense.settlement_status(), SettlementStatus::FullySettled);
    }

    #[test]
    fn full_settlement_overrides_prior_state() {
        let mut expense = lunch();
        expense
            .settle_partial("bob", SettleAmount::Amount(Money::new(1000)))
            .unwrap();
        // Simulate an over-claimed record coming from storage.
        expense.participants[0].settled_amount = Money::new(99999);

        expense.settle_full();
        assert!(expense.is_settled);
        for p in &expense.participants {
            assert_eq!(p.settled_amount, p.net.abs());
            assert!(p.fully_settled);
        }
    }

    #[test]
    fn unknown_participant_is_not_found() {
        let mut expense = lunch();
        let err = expense
            .settle_partial("mallory", SettleAmount::Remainder)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut expense = lunch();
        let err = expense
            .settle_partial("bob", SettleAmount::Amount(Money::ZERO))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(expense.settlement_status(), SettlementStatus::Unsettled);
    }
}
