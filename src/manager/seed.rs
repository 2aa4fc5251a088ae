//! Fills an empty or test database with two demo players and two teams built around them.

use std::fmt::{Display, Formatter, Result as FmtResult};

use anyhow::Context;
use mongodb::bson::{oid::ObjectId, DateTime};
use tracing::{error, info, instrument};

use crate::{
    models::{
        players::{NewPlayer, Player},
        teams::{NewTeam, Socials, Team},
    },
    store::{SeedStore, UpsertCounts},
};

pub fn seed_players() -> Vec<NewPlayer> {
    let now = DateTime::now();
    vec![
        NewPlayer {
            username: "shadowstrike".to_owned(),
            display_name: Some("ShadowStrike".to_owned()),
            avatar: Some("https://cdn.aegis.gg/avatars/shadowstrike.png".to_owned()),
            game: "Valorant".to_owned(),
            rating: 2450,
            role: "Duelist".to_owned(),
            region: "NA".to_owned(),
            bio: Some("Entry fragger. Jett main since beta.".to_owned()),
            joined_at: now,
        },
        NewPlayer {
            username: "novaqueen".to_owned(),
            display_name: Some("NovaQueen".to_owned()),
            avatar: Some("https://cdn.aegis.gg/avatars/novaqueen.png".to_owned()),
            game: "Valorant".to_owned(),
            rating: 2380,
            role: "Controller".to_owned(),
            region: "NA".to_owned(),
            bio: Some("IGL, smokes and calls.".to_owned()),
            joined_at: now,
        },
    ]
}

pub fn seed_teams(first: &Player, second: &Player) -> Vec<NewTeam> {
    let now = DateTime::now();
    vec![
        NewTeam {
            name: "Aegis Vanguard".to_owned(),
            tag: "AGV".to_owned(),
            captain: first.id,
            members: vec![first.id, second.id],
            region: "NA".to_owned(),
            earnings: 125_000,
            rating: 2410,
            socials: Socials {
                twitter: Some("https://twitter.com/aegisvanguard".to_owned()),
                twitch: Some("https://twitch.tv/aegisvanguard".to_owned()),
                website: None,
            },
            created_at: now,
        },
        NewTeam {
            name: "Nova Syndicate".to_owned(),
            tag: "NVS".to_owned(),
            captain: second.id,
            members: vec![second.id],
            region: "NA".to_owned(),
            earnings: 48_500,
            rating: 2295,
            socials: Socials {
                twitter: Some("https://twitter.com/novasyndicate".to_owned()),
                twitch: None,
                website: Some("https://novasyndicate.gg".to_owned()),
            },
            created_at: now,
        },
    ]
}

#[derive(Debug)]
pub struct SeedReport {
    pub players: UpsertCounts,
    pub teams: UpsertCounts,
    pub all_players: Vec<Player>,
    pub all_teams: Vec<Team>,
}

impl SeedReport {
    fn player_label(&self, id: &ObjectId) -> String {
        self.all_players
            .iter()
            .find(|p| &p.id == id)
            .map_or_else(|| format!("<unknown {id}>"), |p| p.display_label().to_owned())
    }
}

impl Display for SeedReport {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(
            f,
            "Players: {} inserted, {} already present",
            self.players.inserted, self.players.existing
        )?;
        writeln!(
            f,
            "Teams: {} inserted, {} already present",
            self.teams.inserted, self.teams.existing
        )?;

        writeln!(f, "\nTeams in database ({}):", self.all_teams.len())?;
        for team in &self.all_teams {
            let members: Vec<String> = team.members.iter().map(|m| self.player_label(m)).collect();
            writeln!(
                f,
                "  [{}] {} ({}) captain: {}, members: {}, earnings: ${}",
                team.tag,
                team.name,
                team.region,
                self.player_label(&team.captain),
                members.join(", "),
                team.earnings
            )?;
        }

        writeln!(f, "\nPlayers in database ({}):", self.all_players.len())?;
        for player in &self.all_players {
            writeln!(
                f,
                "  {} (@{}) {} {}, rating {}",
                player.display_label(),
                player.username,
                player.game,
                player.role,
                player.rating
            )?;
        }
        Ok(())
    }
}

/// Writes the seed players and teams, then reads everything back.
///
/// # Errors
/// This fails on the first database error. Documents written before it stay written.
#[instrument(skip_all)]
pub async fn seed_database<S: SeedStore + ?Sized>(store: &S) -> anyhow::Result<SeedReport> {
    let new_players = seed_players();
    let players = store.upsert_players(&new_players).await?;
    info!(?players, "Seeded players");

    let mut stored = Vec::with_capacity(new_players.len());
    for new_player in &new_players {
        let player = store
            .find_player_by_username(&new_player.username)
            .await?
            .with_context(|| format!("Seeded player {} not found", new_player.username))?;
        stored.push(player);
    }

    let teams = store
        .upsert_teams(&seed_teams(&stored[0], &stored[1]))
        .await?;
    info!(?teams, "Seeded teams");

    Ok(SeedReport {
        players,
        teams,
        all_players: store.all_players().await?,
        all_teams: store.all_teams().await?,
    })
}

/// Seeds the database and closes the store afterwards, whether seeding worked or not.
///
/// # Errors
/// Returns the seeding error after the store has been closed.
pub async fn run_seed<S: SeedStore + ?Sized>(store: &S) -> anyhow::Result<SeedReport> {
    let result = seed_database(store).await;
    if let Err(e) = &result {
        error!("Seeding failed: {e:?}");
    }

    store.close().await;
    result
}
