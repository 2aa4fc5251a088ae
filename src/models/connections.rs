use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const CONNECTIONS_COLLECTION: &str = "connections";

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    /// Pending and accepted requests block a new request between the same pair.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Order-independent key of the pair `a`, `b`.
#[must_use]
pub fn pair_key(a: ObjectId, b: ObjectId) -> String {
    let (a, b) = (a.to_hex(), b.to_hex());
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

/// A connection request from `requester` to `recipient`.
///
/// Accepted requests are the confirmed connections; there is no separate
/// collection for those.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub requester: ObjectId,
    pub recipient: ObjectId,
    pub status: ConnectionStatus,
    /// Same for both directions of a pair, set only while the request is pending or accepted.
    ///
    /// A unique sparse index on it keeps a pair down to one active request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pair: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl ConnectionRequest {
    #[must_use]
    pub fn new_pending(requester: ObjectId, recipient: ObjectId) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            requester,
            recipient,
            status: ConnectionStatus::Pending,
            active_pair: Some(pair_key(requester, recipient)),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the other side of the request, if `player` takes part in it at all.
    #[must_use]
    pub fn counterpart_of(&self, player: ObjectId) -> Option<ObjectId> {
        if self.requester == player {
            Some(self.recipient)
        } else if self.recipient == player {
            Some(self.requester)
        } else {
            None
        }
    }

    #[must_use]
    pub fn involves_pair(&self, a: ObjectId, b: ObjectId) -> bool {
        (self.requester == a && self.recipient == b) || (self.requester == b && self.recipient == a)
    }
}
