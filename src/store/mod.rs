//! Persistence seams. Routes and the seeder only talk to these traits, the
//! MongoDB implementation lives in [`mongo`].

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{
    connections::{ConnectionRequest, ConnectionStatus},
    players::{NewPlayer, Player},
    teams::{NewTeam, Team},
};

#[cfg(test)]
pub mod memory;
pub mod mongo;

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn find_player(&self, id: ObjectId) -> anyhow::Result<Option<Player>>;

    async fn find_player_by_username(&self, username: &str) -> anyhow::Result<Option<Player>>;

    /// Loads the given players. Unknown IDs are skipped, order is unspecified.
    async fn players_by_ids(&self, ids: &[ObjectId]) -> anyhow::Result<Vec<Player>>;

    async fn all_players(&self) -> anyhow::Result<Vec<Player>>;

    /// Releases the underlying connection. Callers close a store exactly once.
    async fn close(&self);
}

#[async_trait]
pub trait ConnectionStore: PlayerStore {
    /// All pending and accepted requests `player` takes part in, in either direction.
    async fn active_requests_of(&self, player: ObjectId) -> anyhow::Result<Vec<ConnectionRequest>>;

    /// Stores a new pending request.
    ///
    /// Returns `false` without writing anything if the pair already has a
    /// pending or accepted request, in either direction. The check and the
    /// write happen as one step.
    async fn insert_request(&self, request: &ConnectionRequest) -> anyhow::Result<bool>;

    /// Moves the pending request `requester -> recipient` to `status`.
    /// Rejecting frees the pair for a new request.
    ///
    /// Returns the updated request, or `None` if no such request was pending.
    async fn resolve_pending(
        &self,
        requester: ObjectId,
        recipient: ObjectId,
        status: ConnectionStatus,
    ) -> anyhow::Result<Option<ConnectionRequest>>;
}

/// How many documents a batch write created vs. found already present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub existing: u64,
}

#[async_trait]
pub trait SeedStore: PlayerStore {
    /// Writes players keyed by username, leaving existing documents untouched.
    async fn upsert_players(&self, players: &[NewPlayer]) -> anyhow::Result<UpsertCounts>;

    /// Writes teams keyed by tag, leaving existing documents untouched.
    async fn upsert_teams(&self, teams: &[NewTeam]) -> anyhow::Result<UpsertCounts>;

    async fn all_teams(&self) -> anyhow::Result<Vec<Team>>;
}
