use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PLAYERS_COLLECTION: &str = "players";

/// A player document as stored in the `players` collection.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub game: String,
    pub rating: i32,
    pub role: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub joined_at: DateTime,
}

impl Player {
    /// Name to show for this player, falling back to the username.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// A player that doesn't exist in the database yet.
///
/// `username` is the unique key, so writing the same `NewPlayer` twice
/// never produces a second document.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub game: String,
    pub rating: i32,
    pub role: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub joined_at: DateTime,
}

#[cfg(test)]
impl NewPlayer {
    /// Turns this into a stored `Player` with the given ID.
    #[must_use]
    pub fn into_player(self, id: ObjectId) -> Player {
        Player {
            id,
            username: self.username,
            display_name: self.display_name,
            avatar: self.avatar,
            game: self.game,
            rating: self.rating,
            role: self.role,
            region: self.region,
            bio: self.bio,
            joined_at: self.joined_at,
        }
    }
}

/// The public view of a player, as sent to clients.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    /// Hex-encoded player ID
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub game: String,
    pub rating: i32,
    pub role: String,
    pub region: String,
}

impl From<Player> for PlayerPublic {
    fn from(player: Player) -> Self {
        Self {
            id: player.id.to_hex(),
            username: player.username,
            display_name: player.display_name,
            avatar: player.avatar,
            game: player.game,
            rating: player.rating,
            role: player.role,
            region: player.region,
        }
    }
}
