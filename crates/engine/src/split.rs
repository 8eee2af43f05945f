//! Split calculator.
//!
//! Turns an expense total, its payers and a [`SplitRule`] into the
//! authoritative per-participant `share`/`paid`/`net` triple
//! ([`SplitShare`]).
//!
//! Each rule variant carries only the inputs its method needs. The loosely
//! typed client shape (a method tag plus participants with optional
//! `percent`/`exact`/`shares`) is converted with [`SplitRule::from_loose`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{EngineError, ExpenseItem, Money, Payer, ResultEngine, itemized, money::round_half_up};

/// Allowed drift on the sum of percentages (in percent points).
const PERCENT_TOLERANCE: f64 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitMethod {
    Equally,
    Percentage,
    ExactAmounts,
    Shares,
    Itemized,
    TwoPerson,
}

impl SplitMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equally => "EQUALLY",
            Self::Percentage => "PERCENTAGE",
            Self::ExactAmounts => "EXACT_AMOUNTS",
            Self::Shares => "SHARES",
            Self::Itemized => "ITEMIZED",
            Self::TwoPerson => "TWO_PERSON",
        }
    }

    /// Parses a method tag coming from a client.
    ///
    /// Unknown tags fall back to [`SplitMethod::Equally`] instead of failing.
    pub fn parse_lenient(value: &str) -> Self {
        match Self::try_from(value) {
            Ok(method) => method,
            Err(_) => {
                tracing::warn!(method = value, "unknown split method, falling back to EQUALLY");
                Self::Equally
            }
        }
    }
}

impl TryFrom<&str> for SplitMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EQUALLY" => Ok(Self::Equally),
            "PERCENTAGE" => Ok(Self::Percentage),
            "EXACT_AMOUNTS" => Ok(Self::ExactAmounts),
            "SHARES" => Ok(Self::Shares),
            "ITEMIZED" => Ok(Self::Itemized),
            "TWO_PERSON" => Ok(Self::TwoPerson),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid split method: {other}"
            ))),
        }
    }
}

/// Which side of a two-person expense owes the whole amount, relative to the
/// creator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OweSide {
    You,
    Other,
}

impl OweSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::You => "you",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for OweSide {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "you" => Ok(Self::You),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidOweSide(format!(
                "expected \"you\" or \"other\", got \"{other}\""
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentInput {
    pub user_id: String,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactInput {
    pub user_id: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesInput {
    pub user_id: String,
    pub shares: u32,
}

/// How an expense total is divided between its participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitRule {
    Equally {
        participants: Vec<String>,
    },
    Percentage {
        participants: Vec<PercentInput>,
    },
    ExactAmounts {
        participants: Vec<ExactInput>,
    },
    Shares {
        participants: Vec<SharesInput>,
    },
    Itemized {
        participants: Vec<String>,
        items: Vec<ExpenseItem>,
        tax_rate: f64,
        tip_rate: f64,
    },
    TwoPerson {
        participants: Vec<String>,
        creator_id: String,
        full_owe_side: OweSide,
    },
}

/// A participant as submitted by a client, before the method is known to
/// match its fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LooseParticipant {
    pub user_id: String,
    pub percent: Option<f64>,
    pub exact: Option<Money>,
    pub shares: Option<u32>,
}

/// Method-specific inputs that live on the expense rather than on the
/// participants.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LooseSplitExtras {
    pub items: Vec<ExpenseItem>,
    pub tax_rate: Option<f64>,
    pub tip_rate: Option<f64>,
    pub creator_id: String,
    pub full_owe_side: Option<String>,
}

impl SplitRule {
    /// Builds a typed rule from the loosely typed client shape.
    ///
    /// Missing method-specific fields count as zero; an unknown owe side is
    /// rejected.
    pub fn from_loose(
        method: SplitMethod,
        participants: &[LooseParticipant],
        extras: LooseSplitExtras,
    ) -> ResultEngine<Self> {
        let ids = || participants.iter().map(|p| p.user_id.clone()).collect();
        let rule = match method {
            SplitMethod::Equally => Self::Equally {
                participants: ids(),
            },
            SplitMethod::Percentage => Self::Percentage {
                participants: participants
                    .iter()
                    .map(|p| PercentInput {
                        user_id: p.user_id.clone(),
                        percent: p.percent.unwrap_or(0.0),
                    })
                    .collect(),
            },
            SplitMethod::ExactAmounts => Self::ExactAmounts {
                participants: participants
                    .iter()
                    .map(|p| ExactInput {
                        user_id: p.user_id.clone(),
                        amount: p.exact.unwrap_or(Money::ZERO),
                    })
                    .collect(),
            },
            SplitMethod::Shares => Self::Shares {
                participants: participants
                    .iter()
                    .map(|p| SharesInput {
                        user_id: p.user_id.clone(),
                        shares: p.shares.unwrap_or(0),
                    })
                    .collect(),
            },
            SplitMethod::Itemized => Self::Itemized {
                participants: ids(),
                items: extras.items,
                tax_rate: extras.tax_rate.unwrap_or(0.0),
                tip_rate: extras.tip_rate.unwrap_or(0.0),
            },
            SplitMethod::TwoPerson => {
                let side = extras.full_owe_side.ok_or_else(|| {
                    EngineError::InvalidOweSide("full owe side is required".to_string())
                })?;
                Self::TwoPerson {
                    participants: ids(),
                    creator_id: extras.creator_id,
                    full_owe_side: OweSide::try_from(side.as_str())?,
                }
            }
        };
        Ok(rule)
    }

    pub fn method(&self) -> SplitMethod {
        match self {
            Self::Equally { .. } => SplitMethod::Equally,
            Self::Percentage { .. } => SplitMethod::Percentage,
            Self::ExactAmounts { .. } => SplitMethod::ExactAmounts,
            Self::Shares { .. } => SplitMethod::Shares,
            Self::Itemized { .. } => SplitMethod::Itemized,
            Self::TwoPerson { .. } => SplitMethod::TwoPerson,
        }
    }

    /// Participant ids in input order.
    pub fn participant_ids(&self) -> Vec<&str> {
        match self {
            Self::Equally { participants }
            | Self::Itemized { participants, .. }
            | Self::TwoPerson { participants, .. } => {
                participants.iter().map(String::as_str).collect()
            }
            Self::Percentage { participants } => {
                participants.iter().map(|p| p.user_id.as_str()).collect()
            }
            Self::ExactAmounts { participants } => {
                participants.iter().map(|p| p.user_id.as_str()).collect()
            }
            Self::Shares { participants } => {
                participants.iter().map(|p| p.user_id.as_str()).collect()
            }
        }
    }
}

/// Authoritative split of one participant.
///
/// `net == paid - share` always holds for values produced by
/// [`compute_split`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    pub user_id: String,
    pub share: Money,
    pub paid: Money,
    pub net: Money,
}

impl SplitShare {
    fn new(user_id: &str, share: Money, paid: Money) -> Self {
        Self {
            user_id: user_id.to_string(),
            share,
            paid,
            net: paid - share,
        }
    }
}

/// Sum of all payer contributions recorded for `user_id`.
pub fn paid_by(payers: &[Payer], user_id: &str) -> ResultEngine<Money> {
    Money::try_sum(
        payers
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.paid),
    )
}

/// Computes the split of `total` according to `rule`.
///
/// Fails fast on inconsistent input; nothing is returned partially.
pub fn compute_split(
    total: Money,
    payers: &[Payer],
    rule: &SplitRule,
) -> ResultEngine<Vec<SplitShare>> {
    if total.is_negative() {
        return Err(EngineError::InvalidAmount(
            "total amount must be >= 0".to_string(),
        ));
    }
    let ids = rule.participant_ids();
    if ids.is_empty() {
        return Err(EngineError::ParticipantCount(
            "at least one participant is required".to_string(),
        ));
    }
    ensure_unique(&ids)?;

    let shares = match rule {
        SplitRule::Equally { participants } => split_equally(total, participants),
        SplitRule::Percentage { participants } => split_percentage(total, participants)?,
        SplitRule::ExactAmounts { participants } => split_exact(total, participants)?,
        SplitRule::Shares { participants } => split_shares(total, participants)?,
        SplitRule::Itemized {
            participants,
            items,
            tax_rate,
            tip_rate,
        } => {
            let allocation = itemized::allocate(items, *tax_rate, *tip_rate, participants)?;
            participants
                .iter()
                .map(|id| (id.as_str(), allocation.owed_by(id)))
                .collect()
        }
        SplitRule::TwoPerson {
            participants,
            creator_id,
            full_owe_side,
        } => split_two_person(total, participants, creator_id, *full_owe_side)?,
    };

    shares
        .into_iter()
        .map(|(user_id, share)| {
            Ok(SplitShare::new(user_id, share, paid_by(payers, user_id)?))
        })
        .collect()
}

fn ensure_unique(ids: &[&str]) -> ResultEngine<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(EngineError::ExistingKey(format!("participant {id}")));
        }
    }
    Ok(())
}

// Plain division: the shares may miss the total by a cent on odd amounts.
fn split_equally(total: Money, participants: &[String]) -> Vec<(&str, Money)> {
    let share = round_half_up(total.cents() as f64 / participants.len() as f64);
    participants.iter().map(|id| (id.as_str(), share)).collect()
}

fn split_percentage(total: Money, participants: &[PercentInput]) -> ResultEngine<Vec<(&str, Money)>> {
    if participants.iter().any(|p| !p.percent.is_finite() || p.percent < 0.0) {
        return Err(EngineError::PercentageMismatch(
            "percentages must be finite and >= 0".to_string(),
        ));
    }
    let sum: f64 = participants.iter().map(|p| p.percent).sum();
    if (sum - 100.0).abs() > PERCENT_TOLERANCE {
        return Err(EngineError::PercentageMismatch(format!("got {sum}")));
    }
    Ok(participants
        .iter()
        .map(|p| (p.user_id.as_str(), total.mul_ratio(p.percent / 100.0)))
        .collect())
}

fn split_exact(total: Money, participants: &[ExactInput]) -> ResultEngine<Vec<(&str, Money)>> {
    if participants.iter().any(|p| p.amount.is_negative()) {
        return Err(EngineError::ExactAmountMismatch(
            "exact amounts must be >= 0".to_string(),
        ));
    }
    let sum = Money::try_sum(participants.iter().map(|p| p.amount))?;
    if sum != total {
        return Err(EngineError::ExactAmountMismatch(format!(
            "got {sum}, expected {total}"
        )));
    }
    Ok(participants
        .iter()
        .map(|p| (p.user_id.as_str(), p.amount))
        .collect())
}

fn split_shares(total: Money, participants: &[SharesInput]) -> ResultEngine<Vec<(&str, Money)>> {
    let sum: u64 = participants.iter().map(|p| u64::from(p.shares)).sum();
    if sum == 0 {
        return Err(EngineError::ZeroShares(format!(
            "{} participants with no shares",
            participants.len()
        )));
    }
    Ok(participants
        .iter()
        .map(|p| {
            let ratio = f64::from(p.shares) / sum as f64;
            (p.user_id.as_str(), total.mul_ratio(ratio))
        })
        .collect())
}

fn split_two_person<'a>(
    total: Money,
    participants: &'a [String],
    creator_id: &str,
    full_owe_side: OweSide,
) -> ResultEngine<Vec<(&'a str, Money)>> {
    if participants.len() != 2 {
        return Err(EngineError::ParticipantCount(format!(
            "two-person split needs exactly 2 participants, got {}",
            participants.len()
        )));
    }
    if !participants.iter().any(|id| id == creator_id) {
        return Err(EngineError::ParticipantCount(format!(
            "creator {creator_id} is not one of the two participants"
        )));
    }
    Ok(participants
        .iter()
        .map(|id| {
            let is_creator = id == creator_id;
            let owes_all = match full_owe_side {
                OweSide::You => is_creator,
                OweSide::Other => !is_creator,
            };
            let share = if owes_all { total } else { Money::ZERO };
            (id.as_str(), share)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn payer(user_id: &str, cents: i64) -> Payer {
        Payer::new(user_id, Money::new(cents))
    }

    fn ids(users: &[&str]) -> Vec<String> {
        users.iter().map(ToString::to_string).collect()
    }

    fn share_of(shares: &[SplitShare], user_id: &str) -> SplitShare {
        shares
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
            .unwrap()
    }

    fn assert_net_identity(shares: &[SplitShare]) {
        for s in shares {
            assert_eq!(s.net, s.paid - s.share, "net identity for {}", s.user_id);
        }
    }

    fn percentages(values: &[(&str, f64)]) -> SplitRule {
        SplitRule::Percentage {
            participants: values
                .iter()
                .map(|(id, percent)| PercentInput {
                    user_id: id.to_string(),
                    percent: *percent,
                })
                .collect(),
        }
    }

    #[test]
    fn equally_divides_and_looks_up_paid() {
        let rule = SplitRule::Equally {
            participants: ids(&["alice", "bob", "carol"]),
        };
        let shares = compute_split(Money::new(9000), &[payer("alice", 9000)], &rule).unwrap();

        assert_eq!(share_of(&shares, "alice").net, Money::new(6000));
        assert_eq!(share_of(&shares, "bob").net, Money::new(-3000));
        assert_eq!(share_of(&shares, "carol").paid, Money::ZERO);
        assert_net_identity(&shares);
    }

    #[test]
    fn equally_keeps_plain_division_on_odd_totals() {
        let rule = SplitRule::Equally {
            participants: ids(&["alice", "bob", "carol"]),
        };
        let shares = compute_split(Money::new(10000), &[payer("alice", 10000)], &rule).unwrap();
        assert!(shares.iter().all(|s| s.share == Money::new(3333)));

        let sum: Money = shares.iter().map(|s| s.share).sum();
        assert!((sum - Money::new(10000)).abs() <= Money::new(2));
    }

    #[test]
    fn percentage_must_sum_to_one_hundred() {
        let payers = [payer("alice", 10000)];
        for bad in [99.9, 100.2] {
            let rule = percentages(&[("alice", bad - 50.0), ("bob", 50.0)]);
            let err = compute_split(Money::new(10000), &payers, &rule).unwrap_err();
            assert!(matches!(err, EngineError::PercentageMismatch(_)), "{bad}");
        }

        let rule = percentages(&[("alice", 33.3335), ("bob", 66.6665)]);
        assert!(compute_split(Money::new(10000), &payers, &rule).is_ok());

        let rule = percentages(&[("alice", 70.0), ("bob", 30.0)]);
        let shares = compute_split(Money::new(10000), &payers, &rule).unwrap();
        assert_eq!(share_of(&shares, "alice").share, Money::new(7000));
        assert_eq!(share_of(&shares, "bob").share, Money::new(3000));
        assert_net_identity(&shares);
    }

    #[test]
    fn exact_amounts_must_match_total() {
        let rule = SplitRule::ExactAmounts {
            participants: vec![
                ExactInput {
                    user_id: "alice".to_string(),
                    amount: Money::new(2500),
                },
                ExactInput {
                    user_id: "bob".to_string(),
                    amount: Money::new(7499),
                },
            ],
        };
        let err = compute_split(Money::new(10000), &[], &rule).unwrap_err();
        assert!(matches!(err, EngineError::ExactAmountMismatch(_)));

        let rule = SplitRule::ExactAmounts {
            participants: vec![
                ExactInput {
                    user_id: "alice".to_string(),
                    amount: Money::new(2500),
                },
                ExactInput {
                    user_id: "bob".to_string(),
                    amount: Money::new(7500),
                },
            ],
        };
        let shares = compute_split(Money::new(10000), &[payer("bob", 10000)], &rule).unwrap();
        assert_eq!(share_of(&shares, "bob").net, Money::new(2500));
        assert_eq!(share_of(&shares, "alice").net, Money::new(-2500));
    }

    #[test]
    fn shares_are_weighted_and_reject_zero_total() {
        let weights = |a: u32, b: u32| SplitRule::Shares {
            participants: vec![
                SharesInput {
                    user_id: "alice".to_string(),
                    shares: a,
                },
                SharesInput {
                    user_id: "bob".to_string(),
                    shares: b,
                },
            ],
        };
        let err = compute_split(Money::new(1000), &[], &weights(0, 0)).unwrap_err();
        assert!(matches!(err, EngineError::ZeroShares(_)));

        let shares = compute_split(Money::new(1000), &[], &weights(1, 3)).unwrap();
        assert_eq!(share_of(&shares, "alice").share, Money::new(250));
        assert_eq!(share_of(&shares, "bob").share, Money::new(750));
        assert_net_identity(&shares);
    }

    #[test]
    fn itemized_uses_allocator_totals() {
        let rule = SplitRule::Itemized {
            participants: ids(&["alice", "bob"]),
            items: vec![ExpenseItem {
                name: "pizza".to_string(),
                amount: Money::new(10000),
                user_shares: BTreeMap::from([("alice".to_string(), 1.0)]),
            }],
            tax_rate: 10.0,
            tip_rate: 10.0,
        };
        let shares = compute_split(Money::new(12100), &[payer("bob", 12100)], &rule).unwrap();
        assert_eq!(share_of(&shares, "alice").share, Money::new(12100));
        assert_eq!(share_of(&shares, "bob").share, Money::ZERO);
        assert_eq!(share_of(&shares, "bob").net, Money::new(12100));
    }

    #[test]
    fn two_person_other_owes_everything() {
        let rule = SplitRule::TwoPerson {
            participants: ids(&["alice", "bob"]),
            creator_id: "alice".to_string(),
            full_owe_side: OweSide::Other,
        };
        let payers = [payer("alice", 5000), payer("alice", 3000)];
        let shares = compute_split(Money::new(8000), &payers, &rule).unwrap();

        assert_eq!(share_of(&shares, "alice").net, Money::new(8000));
        assert_eq!(share_of(&shares, "bob").net, Money::new(-8000));
        assert_net_identity(&shares);
    }

    #[test]
    fn two_person_creator_owes_everything() {
        let rule = SplitRule::TwoPerson {
            participants: ids(&["alice", "bob"]),
            creator_id: "alice".to_string(),
            full_owe_side: OweSide::You,
        };
        let shares = compute_split(Money::new(8000), &[payer("bob", 8000)], &rule).unwrap();

        assert_eq!(share_of(&shares, "alice").share, Money::new(8000));
        assert_eq!(share_of(&shares, "alice").net, Money::new(-8000));
        assert_eq!(share_of(&shares, "bob").share, Money::ZERO);
        assert_eq!(share_of(&shares, "bob").net, Money::new(8000));
        assert_net_identity(&shares);
    }

    #[test]
    fn thirds_stay_within_a_cent_per_participant_of_total() {
        let total = Money::new(10000);
        let payers = [payer("alice", 10000)];

        let rule = percentages(&[("alice", 33.3333), ("bob", 33.3333), ("carol", 33.3334)]);
        let by_percent = compute_split(total, &payers, &rule).unwrap();

        let rule = SplitRule::Shares {
            participants: ["alice", "bob", "carol"]
                .iter()
                .map(|id| SharesInput {
                    user_id: id.to_string(),
                    shares: 1,
                })
                .collect(),
        };
        let by_weight = compute_split(total, &payers, &rule).unwrap();

        for shares in [&by_percent, &by_weight] {
            assert!(shares.iter().all(|s| s.share == Money::new(3333)));
            let sum: Money = shares.iter().map(|s| s.share).sum();
            assert!((sum - total).abs() <= Money::new(shares.len() as i64));
            assert_net_identity(shares);
        }
    }

    #[test]
    fn overflowing_payer_sum_is_rejected() {
        let rule = SplitRule::Equally {
            participants: ids(&["alice", "bob"]),
        };
        let payers = [payer("alice", i64::MAX), payer("alice", i64::MAX)];
        let err = compute_split(Money::new(100), &payers, &rule).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn two_person_requires_exactly_two() {
        let rule = SplitRule::TwoPerson {
            participants: ids(&["alice", "bob", "carol"]),
            creator_id: "alice".to_string(),
            full_owe_side: OweSide::You,
        };
        let err = compute_split(Money::new(8000), &[], &rule).unwrap_err();
        assert!(matches!(err, EngineError::ParticipantCount(_)));
    }

    #[test]
    fn loose_two_person_rejects_unknown_side() {
        let participants = [
            LooseParticipant {
                user_id: "alice".to_string(),
                ..Default::default()
            },
            LooseParticipant {
                user_id: "bob".to_string(),
                ..Default::default()
            },
        ];
        let extras = LooseSplitExtras {
            creator_id: "alice".to_string(),
            full_owe_side: Some("both".to_string()),
            ..Default::default()
        };
        let err = SplitRule::from_loose(SplitMethod::TwoPerson, &participants, extras).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOweSide(_)));
    }

    #[test]
    fn loose_participants_ignore_fields_of_other_methods() {
        let participants = [LooseParticipant {
            user_id: "alice".to_string(),
            percent: Some(40.0),
            shares: Some(2),
            ..Default::default()
        }];
        let rule = SplitRule::from_loose(
            SplitMethod::Shares,
            &participants,
            LooseSplitExtras::default(),
        )
        .unwrap();
        assert_eq!(
            rule,
            SplitRule::Shares {
                participants: vec![SharesInput {
                    user_id: "alice".to_string(),
                    shares: 2,
                }]
            }
        );
    }

    #[test]
    fn unknown_method_falls_back_to_equally() {
        assert_eq!(SplitMethod::parse_lenient("BY_VIBES"), SplitMethod::Equally);
        assert_eq!(
            SplitMethod::parse_lenient("exact_amounts"),
            SplitMethod::ExactAmounts
        );
    }

    #[test]
    fn rejects_empty_and_duplicate_participants() {
        let empty = SplitRule::Equally {
            participants: Vec::new(),
        };
        assert!(matches!(
            compute_split(Money::new(100), &[], &empty).unwrap_err(),
            EngineError::ParticipantCount(_)
        ));

        let dup = SplitRule::Equally {
            participants: ids(&["alice", "alice"]),
        };
        assert!(matches!(
            compute_split(Money::new(100), &[], &dup).unwrap_err(),
            EngineError::ExistingKey(_)
        ));
    }
}
