use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const TEAMS_COLLECTION: &str = "teams";

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
pub struct Socials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// A team document as stored in the `teams` collection.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub tag: String,
    pub captain: ObjectId,
    pub members: Vec<ObjectId>,
    pub region: String,
    /// Total prize money in USD
    pub earnings: i64,
    pub rating: i32,
    #[serde(default)]
    pub socials: Socials,
    pub created_at: DateTime,
}

/// A team that doesn't exist in the database yet, keyed by `tag`.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    pub tag: String,
    pub captain: ObjectId,
    pub members: Vec<ObjectId>,
    pub region: String,
    pub earnings: i64,
    pub rating: i32,
    pub socials: Socials,
    pub created_at: DateTime,
}

#[cfg(test)]
impl NewTeam {
    #[must_use]
    pub fn into_team(self, id: ObjectId) -> Team {
        Team {
            id,
            name: self.name,
            tag: self.tag,
            captain: self.captain,
            members: self.members,
            region: self.region,
            earnings: self.earnings,
            rating: self.rating,
            socials: self.socials,
            created_at: self.created_at,
        }
    }
}
