//! Itemized split: per-item fractional shares plus proportional tax and tip.
//!
//! Each item is divided among the users listed in its `user_shares`
//! proportionally to `fraction / sum(fractions)`. Tax is applied to the item
//! subtotal; tip is applied to the tax-inclusive subtotal. Each participant
//! then carries tax and tip in proportion to their part of the item subtotal.

use std::collections::BTreeMap;

use crate::{EngineError, ExpenseItem, Money, ResultEngine, money::round_half_up};

/// Result of an itemized allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemizedAllocation {
    pub item_subtotal: Money,
    pub tax: Money,
    pub tip: Money,
    /// Final amount owed per participant (items + tax + tip).
    pub owed: BTreeMap<String, Money>,
}

impl ItemizedAllocation {
    pub fn owed_by(&self, user_id: &str) -> Money {
        self.owed.get(user_id).copied().unwrap_or(Money::ZERO)
    }
}

fn validate_rate(rate: f64, label: &str) -> ResultEngine<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(EngineError::InvalidAmount(format!(
            "{label} rate must be a finite percentage >= 0"
        )));
    }
    Ok(())
}

/// Allocates `items` (plus tax and tip, as percentages) to `participant_ids`.
///
/// Item shares for users that are not participants are dropped. Items whose
/// fractions sum to zero still count towards the subtotal but are not
/// allocated to anyone.
pub fn allocate(
    items: &[ExpenseItem],
    tax_rate: f64,
    tip_rate: f64,
    participant_ids: &[String],
) -> ResultEngine<ItemizedAllocation> {
    validate_rate(tax_rate, "tax")?;
    validate_rate(tip_rate, "tip")?;

    // Fractional cents, rounded once per participant at the end.
    let mut user_subtotals: BTreeMap<&str, f64> = BTreeMap::new();
    let mut item_subtotal = Money::ZERO;

    for item in items {
        if item.amount.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "item \"{}\" has a negative amount",
                item.name
            )));
        }
        item_subtotal = Money::try_sum([item_subtotal, item.amount])?;

        let fraction_sum: f64 = item
            .user_shares
            .values()
            .filter(|f| f.is_finite() && **f > 0.0)
            .sum();
        if fraction_sum <= 0.0 {
            continue;
        }
        for (user_id, fraction) in &item.user_shares {
            if !fraction.is_finite() || *fraction <= 0.0 {
                continue;
            }
            *user_subtotals.entry(user_id.as_str()).or_default() +=
                item.amount.cents() as f64 * fraction / fraction_sum;
        }
    }

    let subtotal = item_subtotal.cents() as f64;
    let tax = subtotal * tax_rate / 100.0;
    let tip = (subtotal + tax) * tip_rate / 100.0;

    let owed = participant_ids
        .iter()
        .map(|id| {
            let user_subtotal = user_subtotals.get(id.as_str()).copied().unwrap_or(0.0);
            let fraction = if item_subtotal.is_zero() {
                0.0
            } else {
                user_subtotal / subtotal
            };
            let total = user_subtotal + fraction * tax + fraction * tip;
            (id.clone(), round_half_up(total))
        })
        .collect();

    Ok(ItemizedAllocation {
        item_subtotal,
        tax: round_half_up(tax),
        tip: round_half_up(tip),
        owed,
    })
}
