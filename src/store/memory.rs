use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use anyhow::anyhow;
use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use super::{ConnectionStore, PlayerStore, SeedStore, UpsertCounts};
use crate::models::{
    connections::{ConnectionRequest, ConnectionStatus},
    players::{NewPlayer, Player},
    teams::{NewTeam, Team},
};

/// In-memory stand-in for MongoDB, with knobs to make writes fail.
#[derive(Default)]
pub struct MemoryStore {
    players: Mutex<Vec<Player>>,
    teams: Mutex<Vec<Team>>,
    requests: Mutex<Vec<ConnectionRequest>>,
    fail_player_writes: AtomicBool,
    fail_team_writes: AtomicBool,
    closed: AtomicUsize,
}

impl MemoryStore {
    pub fn add_player(&self, username: &str, display_name: Option<&str>) -> Player {
        let player = NewPlayer {
            username: username.to_owned(),
            display_name: display_name.map(str::to_owned),
            avatar: Some(format!("https://cdn.example.com/avatars/{username}.png")),
            game: "Valorant".to_owned(),
            rating: 2000,
            role: "Flex".to_owned(),
            region: "NA".to_owned(),
            bio: None,
            joined_at: DateTime::now(),
        }
        .into_player(ObjectId::new());

        self.players.lock().unwrap().push(player.clone());
        player
    }

    pub fn add_request(&self, request: ConnectionRequest) {
        self.requests.lock().unwrap().push(request);
    }

    pub fn requests(&self) -> Vec<ConnectionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail_player_writes(&self) {
        self.fail_player_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_team_writes(&self) {
        self.fail_team_writes.store(true, Ordering::SeqCst);
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn find_player(&self, id: ObjectId) -> anyhow::Result<Option<Player>> {
        Ok(self
            .players
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_player_by_username(&self, username: &str) -> anyhow::Result<Option<Player>> {
        Ok(self
            .players
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn players_by_ids(&self, ids: &[ObjectId]) -> anyhow::Result<Vec<Player>> {
        // reversed on purpose so callers can't rely on the store's order
        Ok(self
            .players
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn all_players(&self) -> anyhow::Result<Vec<Player>> {
        Ok(self.players.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn active_requests_of(&self, player: ObjectId) -> anyhow::Result<Vec<ConnectionRequest>> {
        let mut requests: Vec<ConnectionRequest> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status.is_active() && r.counterpart_of(player).is_some())
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.updated_at);
        Ok(requests)
    }

    async fn insert_request(&self, request: &ConnectionRequest) -> anyhow::Result<bool> {
        let mut requests = self.requests.lock().unwrap();
        // same rule as the unique sparse index on `activePair`
        if request.active_pair.is_some()
            && requests.iter().any(|r| r.active_pair == request.active_pair)
        {
            return Ok(false);
        }

        requests.push(request.clone());
        Ok(true)
    }

    async fn resolve_pending(
        &self,
        requester: ObjectId,
        recipient: ObjectId,
        status: ConnectionStatus,
    ) -> anyhow::Result<Option<ConnectionRequest>> {
        let mut requests = self.requests.lock().unwrap();
        let Some(request) = requests.iter_mut().find(|r| {
            r.requester == requester
                && r.recipient == recipient
                && r.status == ConnectionStatus::Pending
        }) else {
            return Ok(None);
        };

        request.status = status;
        request.updated_at = DateTime::now();
        if !status.is_active() {
            request.active_pair = None;
        }
        Ok(Some(request.clone()))
    }
}

#[async_trait]
impl SeedStore for MemoryStore {
    async fn upsert_players(&self, players: &[NewPlayer]) -> anyhow::Result<UpsertCounts> {
        if self.fail_player_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("player write failed"));
        }

        let mut stored = self.players.lock().unwrap();
        let mut counts = UpsertCounts::default();
        for player in players {
            if stored.iter().any(|p| p.username == player.username) {
                counts.existing += 1;
            } else {
                stored.push(player.clone().into_player(ObjectId::new()));
                counts.inserted += 1;
            }
        }
        Ok(counts)
    }

    async fn upsert_teams(&self, teams: &[NewTeam]) -> anyhow::Result<UpsertCounts> {
        if self.fail_team_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("team write failed"));
        }

        let mut stored = self.teams.lock().unwrap();
        let mut counts = UpsertCounts::default();
        for team in teams {
            if stored.iter().any(|t| t.tag == team.tag) {
                counts.existing += 1;
            } else {
                stored.push(team.clone().into_team(ObjectId::new()));
                counts.inserted += 1;
            }
        }
        Ok(counts)
    }

    async fn all_teams(&self) -> anyhow::Result<Vec<Team>> {
        Ok(self.teams.lock().unwrap().clone())
    }
}
