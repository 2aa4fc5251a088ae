use anyhow::Context;
use clap::{Parser, Subcommand};
use time::Duration;
use tracing::{error, info, instrument};

use crate::{
    client::{connections::ConnectionsPage, ApiClient, RequestAction, Session},
    config::Config,
    store::{mongo::MongoStore, PlayerStore},
    util::jwt::{Claims, Keys},
};

pub mod seed;

/// How long tokens from `issue-token` stay valid
const ISSUED_TOKEN_VALIDITY: Duration = Duration::days(30);

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Insert the demo players and teams, leaving existing ones alone
    Seed,
    /// Print a token for an existing player
    IssueToken { username: String },
    /// Show the connections page of the token's player
    Connections {
        /// Base URL of the API, defaults to `client.api_url`
        #[clap(long)]
        api_url: Option<String>,
        /// Token to authenticate with, defaults to `client.token`
        #[clap(long)]
        token: Option<String>,
        #[clap(subcommand)]
        action: Option<ConnectionsAction>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConnectionsAction {
    /// Only show the page (default)
    List,
    /// Accept the pending request from a player
    Accept { player_id: String },
    /// Reject the pending request from a player
    Reject { player_id: String },
    /// Send a connection request to a player
    Request { player_id: String },
}

//skip config because it may hold secrets
#[instrument(name = "cli_command", skip(config))]
pub async fn parse_command(command: &Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Seed => {
            // seeding reports its own failures and never fails the process
            let store = match MongoStore::connect(&config.main.database).await {
                Ok(store) => store,
                Err(e) => {
                    error!("Connecting to MongoDB failed: {e:?}");
                    return Ok(());
                }
            };
            if let Ok(report) = seed::run_seed(&store).await {
                println!("{report}");
            }
            Ok(())
        }
        Command::IssueToken { username } => {
            let keys = Keys::new(config.jwt_secret()?.as_bytes());
            let store = MongoStore::connect(&config.main.database).await?;

            let token = issue_token(&store, &keys, username).await?;
            println!("{token}");
            Ok(())
        }
        Command::Connections {
            api_url,
            token,
            action,
        } => {
            let session = Session::new(
                api_url.as_deref().unwrap_or(&config.client.api_url),
                token.clone().or_else(|| config.client.token.clone()),
            )?;
            let mut page = ConnectionsPage::new(ApiClient::new(session)?);

            if let Err(e) = page.load().await {
                eprintln!("Couldn't load connections: {e}");
            }

            let result = match action.clone().unwrap_or(ConnectionsAction::List) {
                ConnectionsAction::List => Ok(()),
                ConnectionsAction::Accept { player_id } => {
                    page.respond_to_request(&player_id, RequestAction::Accept)
                        .await
                }
                ConnectionsAction::Reject { player_id } => {
                    page.respond_to_request(&player_id, RequestAction::Reject)
                        .await
                }
                ConnectionsAction::Request { player_id } => {
                    page.request_connection(&player_id).await
                }
            };
            if let Err(e) = result {
                eprintln!("Action failed: {e}");
            }

            print!("{}", page.view());
            Ok(())
        }
    }
}

/// Signs a token for the player called `username`, closing the store afterwards either way.
///
/// # Errors
/// This fails if the lookup fails, no such player exists or signing fails.
pub async fn issue_token<S: PlayerStore + ?Sized>(
    store: &S,
    keys: &Keys,
    username: &str,
) -> anyhow::Result<String> {
    let result = async {
        let player = store
            .find_player_by_username(username)
            .await?
            .with_context(|| format!("No player named {username}"))?;
        let token = Claims::for_player(&player, ISSUED_TOKEN_VALIDITY).encode(keys)?;
        info!(player = %player.id, "Issued token");
        Ok::<_, anyhow::Error>(token)
    }
    .await;

    store.close().await;
    result
}
