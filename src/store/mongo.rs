use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_document, DateTime, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use tracing::{debug, info, instrument};

use super::{ConnectionStore, PlayerStore, SeedStore, UpsertCounts};
use crate::models::{
    connections::{ConnectionRequest, ConnectionStatus, CONNECTIONS_COLLECTION},
    players::{NewPlayer, Player, PLAYERS_COLLECTION},
    teams::{NewTeam, Team, TEAMS_COLLECTION},
};

/// Used when the connection string doesn't name a database.
pub const DEFAULT_DATABASE: &str = "aegis-esports";

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Parses the connection string, sets up the client and makes sure the indexes exist.
    ///
    /// # Errors
    /// This fails if the connection string is invalid or the server can't be reached.
    #[instrument(skip_all)]
    pub async fn connect(uri: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Failed to create MongoDB client")?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        info!(database = db.name(), "Connected to MongoDB");

        let store = Self { client, db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Unique keys the stores rely on: player usernames, team tags, and one
    /// active request per pair of players.
    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };

        self.players()
            .create_index(unique(doc! { "username": 1 }))
            .await
            .context("Failed to create players index")?;
        self.teams()
            .create_index(unique(doc! { "tag": 1 }))
            .await
            .context("Failed to create teams index")?;
        // sparse, so resolved requests without the key don't collide
        self.connections()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "activePair": 1 })
                    .options(IndexOptions::builder().unique(true).sparse(true).build())
                    .build(),
            )
            .await
            .context("Failed to create connections index")?;
        Ok(())
    }

    fn players(&self) -> Collection<Player> {
        self.db.collection(PLAYERS_COLLECTION)
    }

    fn teams(&self) -> Collection<Team> {
        self.db.collection(TEAMS_COLLECTION)
    }

    fn connections(&self) -> Collection<ConnectionRequest> {
        self.db.collection(CONNECTIONS_COLLECTION)
    }
}

#[async_trait]
impl PlayerStore for MongoStore {
    async fn find_player(&self, id: ObjectId) -> anyhow::Result<Option<Player>> {
        Ok(self.players().find_one(doc! { "_id": id }).await?)
    }

    async fn find_player_by_username(&self, username: &str) -> anyhow::Result<Option<Player>> {
        Ok(self
            .players()
            .find_one(doc! { "username": username })
            .await?)
    }

    async fn players_by_ids(&self, ids: &[ObjectId]) -> anyhow::Result<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self.players().find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn all_players(&self) -> anyhow::Result<Vec<Player>> {
        let cursor = self
            .players()
            .find(doc! {})
            .sort(doc! { "username": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("Closed MongoDB connection");
    }
}

#[async_trait]
impl ConnectionStore for MongoStore {
    async fn active_requests_of(&self, player: ObjectId) -> anyhow::Result<Vec<ConnectionRequest>> {
        let cursor = self
            .connections()
            .find(doc! {
                "$or": [{ "requester": player }, { "recipient": player }],
                "status": {
                    "$in": [ConnectionStatus::Pending.as_str(), ConnectionStatus::Accepted.as_str()]
                },
            })
            .sort(doc! { "updatedAt": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_request(&self, request: &ConnectionRequest) -> anyhow::Result<bool> {
        match self.connections().insert_one(request).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => {
                debug!(pair = ?request.active_pair, "Pair already has an active request");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_pending(
        &self,
        requester: ObjectId,
        recipient: ObjectId,
        status: ConnectionStatus,
    ) -> anyhow::Result<Option<ConnectionRequest>> {
        let mut update = doc! {
            "$set": { "status": status.as_str(), "updatedAt": DateTime::now() }
        };
        if !status.is_active() {
            update.insert("$unset", doc! { "activePair": "" });
        }

        // Filtering on the pending status makes two concurrent responses race
        // on the server; only one of them finds the request.
        Ok(self
            .connections()
            .find_one_and_update(
                doc! {
                    "requester": requester,
                    "recipient": recipient,
                    "status": ConnectionStatus::Pending.as_str(),
                },
                update,
            )
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[async_trait]
impl SeedStore for MongoStore {
    #[instrument(skip_all, fields(count = players.len()))]
    async fn upsert_players(&self, players: &[NewPlayer]) -> anyhow::Result<UpsertCounts> {
        let collection = self.players();
        let mut counts = UpsertCounts::default();

        for player in players {
            let result = collection
                .update_one(
                    doc! { "username": &player.username },
                    doc! { "$setOnInsert": to_document(player)? },
                )
                .upsert(true)
                .await
                .with_context(|| format!("Failed to write player {}", player.username))?;

            if result.upserted_id.is_some() {
                counts.inserted += 1;
            } else {
                debug!(username = %player.username, "Player already present");
                counts.existing += 1;
            }
        }

        Ok(counts)
    }

    #[instrument(skip_all, fields(count = teams.len()))]
    async fn upsert_teams(&self, teams: &[NewTeam]) -> anyhow::Result<UpsertCounts> {
        let collection = self.teams();
        let mut counts = UpsertCounts::default();

        for team in teams {
            let result = collection
                .update_one(
                    doc! { "tag": &team.tag },
                    doc! { "$setOnInsert": to_document(team)? },
                )
                .upsert(true)
                .await
                .with_context(|| format!("Failed to write team {}", team.tag))?;

            if result.upserted_id.is_some() {
                counts.inserted += 1;
            } else {
                debug!(tag = %team.tag, "Team already present");
                counts.existing += 1;
            }
        }

        Ok(counts)
    }

    async fn all_teams(&self) -> anyhow::Result<Vec<Team>> {
        let cursor = self.teams().find(doc! {}).sort(doc! { "tag": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }
}
