//! Client/server split reconciliation.
//!
//! Clients compute the split themselves and submit it with the expense. The
//! engine recomputes it and keeps the client version only when every
//! participant matches within one cent on both `share` and `net`, reports
//! exactly the `paid` amount the payer ledger holds, and satisfies
//! `net == paid - share` on its own. Any disagreement replaces the whole list
//! with the server computation; fields are never merged.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{Money, SplitShare};

/// A participant split as computed and submitted by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientShare {
    pub user_id: Option<String>,
    pub share: Money,
    pub paid: Money,
    pub net: Money,
}

/// Which computation became authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSource {
    Client,
    #[default]
    Server,
}

impl SplitSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl TryFrom<&str> for SplitSource {
    type Error = crate::EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            other => Err(crate::EngineError::InvalidAmount(format!(
                "invalid split source: {other}"
            ))),
        }
    }
}

/// First reason the client split was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    Length { client: usize, server: usize },
    MissingUserId { index: usize },
    UnknownUser { user_id: String },
    DuplicateUser { user_id: String },
    Share { user_id: String, client: Money, server: Money },
    Paid { user_id: String, client: Money, server: Money },
    Net { user_id: String, client: Money, server: Money },
    /// The client `net` is not `paid - share`.
    NetIdentity { user_id: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length { client, server } => {
                write!(f, "client sent {client} participants, server computed {server}")
            }
            Self::MissingUserId { index } => write!(f, "participant #{index} has no user id"),
            Self::UnknownUser { user_id } => write!(f, "unexpected participant {user_id}"),
            Self::DuplicateUser { user_id } => write!(f, "participant {user_id} listed twice"),
            Self::Share {
                user_id,
                client,
                server,
            } => write!(f, "share of {user_id}: client {client}, server {server}"),
            Self::Paid {
                user_id,
                client,
                server,
            } => write!(f, "paid by {user_id}: client {client}, server {server}"),
            Self::Net {
                user_id,
                client,
                server,
            } => write!(f, "net of {user_id}: client {client}, server {server}"),
            Self::NetIdentity { user_id } => {
                write!(f, "net of {user_id} is not paid minus share")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub participants: Vec<SplitShare>,
    pub source: SplitSource,
    pub mismatch: Option<Mismatch>,
}

/// Picks the authoritative participant list.
///
/// An empty client list means the client did not submit a split; the server
/// computation is used without reporting a mismatch.
pub fn reconcile(client: &[ClientShare], server: Vec<SplitShare>) -> Reconciliation {
    if client.is_empty() {
        return Reconciliation {
            participants: server,
            source: SplitSource::Server,
            mismatch: None,
        };
    }

    match find_mismatch(client, &server) {
        Some(mismatch) => {
            tracing::warn!(%mismatch, "client split rejected, using server computation");
            Reconciliation {
                participants: server,
                source: SplitSource::Server,
                mismatch: Some(mismatch),
            }
        }
        None => Reconciliation {
            participants: client
                .iter()
                .filter_map(|c| {
                    c.user_id.as_ref().map(|user_id| SplitShare {
                        user_id: user_id.clone(),
                        share: c.share,
                        paid: c.paid,
                        net: c.net,
                    })
                })
                .collect(),
            source: SplitSource::Client,
            mismatch: None,
        },
    }
}

fn find_mismatch(client: &[ClientShare], server: &[SplitShare]) -> Option<Mismatch> {
    if client.len() != server.len() {
        return Some(Mismatch::Length {
            client: client.len(),
            server: server.len(),
        });
    }

    let by_user: HashMap<&str, &SplitShare> =
        server.iter().map(|s| (s.user_id.as_str(), s)).collect();
    let mut seen = HashSet::with_capacity(client.len());

    for (index, c) in client.iter().enumerate() {
        let Some(user_id) = c.user_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            return Some(Mismatch::MissingUserId { index });
        };
        if !seen.insert(user_id) {
            return Some(Mismatch::DuplicateUser {
                user_id: user_id.to_string(),
            });
        }
        let Some(s) = by_user.get(user_id) else {
            return Some(Mismatch::UnknownUser {
                user_id: user_id.to_string(),
            });
        };
        if c.share.differs_from(s.share) {
            return Some(Mismatch::Share {
                user_id: user_id.to_string(),
                client: c.share,
                server: s.share,
            });
        }
        if c.paid != s.paid {
            return Some(Mismatch::Paid {
                user_id: user_id.to_string(),
                client: c.paid,
                server: s.paid,
            });
        }
        if c.paid.checked_sub(c.share) != Some(c.net) {
            return Some(Mismatch::NetIdentity {
                user_id: user_id.to_string(),
            });
        }
        if c.net.differs_from(s.net) {
            return Some(Mismatch::Net {
                user_id: user_id.to_string(),
                client: c.net,
                server: s.net,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(values: &[(&str, i64, i64)]) -> Vec<SplitShare> {
        values
            .iter()
            .map(|(id, share, paid)| SplitShare {
                user_id: id.to_string(),
                share: Money::new(*share),
                paid: Money::new(*paid),
                net: Money::new(paid - share),
            })
            .collect()
    }

    fn client(values: &[(Option<&str>, i64, i64)]) -> Vec<ClientShare> {
        values
            .iter()
            .map(|(id, share, paid)| ClientShare {
                user_id: id.map(ToString::to_string),
                share: Money::new(*share),
                paid: Money::new(*paid),
                net: Money::new(paid - share),
            })
            .collect()
    }

    #[test]
    fn server_wins_on_share_disagreement() {
        let computed = server(&[("alice", 5000, 10000), ("bob", 5000, 0)]);
        let submitted = client(&[(Some("alice"), 6000, 10000), (Some("bob"), 4000, 0)]);

        let result = reconcile(&submitted, computed.clone());
        assert_eq!(result.source, SplitSource::Server);
        assert_eq!(result.participants, computed);
        assert!(matches!(result.mismatch, Some(Mismatch::Share { .. })));
    }

    #[test]
    fn client_is_trusted_within_one_cent() {
        let computed = server(&[("alice", 3333, 10000), ("bob", 3333, 0), ("carol", 3333, 0)]);
        let submitted = client(&[
            (Some("carol"), 3334, 0),
            (Some("alice"), 3333, 10000),
            (Some("bob"), 3333, 0),
        ]);

        let result = reconcile(&submitted, computed);
        assert_eq!(result.source, SplitSource::Client);
        assert_eq!(result.participants[0].user_id, "carol");
        assert_eq!(result.participants[0].share, Money::new(3334));
    }

    #[test]
    fn size_or_identity_problems_override() {
        let computed = server(&[("alice", 5000, 10000), ("bob", 5000, 0)]);

        let fewer = client(&[(Some("alice"), 5000, 10000)]);
        assert!(matches!(
            reconcile(&fewer, computed.clone()).mismatch,
            Some(Mismatch::Length { client: 1, server: 2 })
        ));

        let anonymous = client(&[(Some("alice"), 5000, 10000), (None, 5000, 0)]);
        assert!(matches!(
            reconcile(&anonymous, computed.clone()).mismatch,
            Some(Mismatch::MissingUserId { index: 1 })
        ));

        let stranger = client(&[(Some("alice"), 5000, 10000), (Some("mallory"), 5000, 0)]);
        assert!(matches!(
            reconcile(&stranger, computed).mismatch,
            Some(Mismatch::UnknownUser { .. })
        ));
    }

    #[test]
    fn net_disagreement_overrides() {
        let computed = server(&[("alice", 5000, 10000), ("bob", 5000, 0)]);
        let mut submitted = client(&[(Some("alice"), 5000, 10000), (Some("bob"), 5000, 0)]);
        submitted[1].net = Money::new(-4000);

        let result = reconcile(&submitted, computed);
        assert_eq!(result.source, SplitSource::Server);
        assert!(matches!(result.mismatch, Some(Mismatch::Net { .. })));
    }

    #[test]
    fn paid_must_match_the_payer_ledger() {
        let computed = server(&[("alice", 5000, 10000), ("bob", 5000, 0)]);
        let mut submitted = client(&[(Some("alice"), 5000, 10000), (Some("bob"), 5000, 0)]);
        submitted[0].paid = Money::new(999_999);

        let result = reconcile(&submitted, computed.clone());
        assert_eq!(result.source, SplitSource::Server);
        assert_eq!(result.participants, computed);
        assert!(matches!(result.mismatch, Some(Mismatch::Paid { .. })));
    }

    #[test]
    fn client_net_must_equal_paid_minus_share() {
        // Share and net are each within a cent of the server, but the client
        // triple does not add up.
        let computed = server(&[("alice", 5000, 10000), ("bob", 5000, 0)]);
        let mut submitted = client(&[(Some("alice"), 5000, 10000), (Some("bob"), 5001, 0)]);
        submitted[1].net = Money::new(-5000);

        let result = reconcile(&submitted, computed.clone());
        assert_eq!(result.source, SplitSource::Server);
        assert_eq!(result.participants, computed);
        assert!(matches!(
            result.mismatch,
            Some(Mismatch::NetIdentity { ref user_id }) if user_id == "bob"
        ));
    }

    #[test]
    fn trusted_client_split_keeps_net_identity() {
        let computed = server(&[("alice", 3333, 10000), ("bob", 3333, 0), ("carol", 3333, 0)]);
        let submitted = client(&[
            (Some("alice"), 3334, 10000),
            (Some("bob"), 3333, 0),
            (Some("carol"), 3333, 0),
        ]);

        let result = reconcile(&submitted, computed);
        assert_eq!(result.source, SplitSource::Client);
        assert!(
            result
                .participants
                .iter()
                .all(|p| p.net == p.paid - p.share)
        );
    }

    #[test]
    fn missing_client_split_uses_server_silently() {
        let computed = server(&[("alice", 5000, 10000), ("bob", 5000, 0)]);
        let result = reconcile(&[], computed);
        assert_eq!(result.source, SplitSource::Server);
        assert_eq!(result.mismatch, None);
    }
}
