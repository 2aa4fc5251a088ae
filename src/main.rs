#![warn(
    clippy::correctness,
    clippy::style,
    clippy::perf,
    clippy::complexity,
    clippy::cognitive_complexity,
    clippy::double_parens,
    clippy::len_zero,
    clippy::question_mark,
    clippy::suspicious,
    clippy::todo
)]

mod api;
mod client;
mod config;
mod manager;
pub mod models;
mod store;
mod util;

use std::{io::stdout, sync::Arc};

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::writer::MakeWriterExt, layer::SubscriberExt, util::SubscriberInitExt,
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    config::Config,
    store::{mongo::MongoStore, ConnectionStore},
    util::jwt::Keys,
};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ConnectionStore>,
    jwt_keys: Keys,
}

/// Connects to MongoDB and prepares the token keys
///
/// # Errors
/// This function can fail if no JWT secret is configured or the MongoDB connection string is invalid
async fn init_state(config: &Config) -> anyhow::Result<AppState> {
    let jwt_keys = Keys::new(config.jwt_secret()?.as_bytes());
    let store = MongoStore::connect(&config.main.database)
        .await
        .context("Failed to set up MongoDB!")?;

    Ok(AppState {
        store: Arc::new(store),
        jwt_keys,
    })
}

fn make_router(state: AppState) -> Router {
    let (api_router, openapi) = api::routes();

    Router::new()
        .nest("/api", api_router)
        .merge(Scalar::with_url("/api/docs", openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn main() -> anyhow::Result<()> {
    let aegis_config: Config = Config::figment()
        .extract()
        .context("Config should be valid!")?;

    let file_appender = RollingFileAppender::builder()
        .filename_suffix("aegis.log")
        .rotation(Rotation::DAILY)
        .build("./logs")
        .context("Initializing logging failed")?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                "aegis=info,tower_http=error,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(stdout.and(non_blocking)))
        .init();

    debug!("Start init");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            // Parse CLI arguments
            // and if we have a management command, don't spin up a server
            let args = manager::Args::parse();
            if let Some(command) = &args.command {
                return manager::parse_command(command, &aegis_config).await;
            }

            let state = init_state(&aegis_config).await?;

            info!("Aegis starting...");

            let listener = tokio::net::TcpListener::bind(&aegis_config.main.address)
                .await
                .context("Listener should always be able to listen!")?;
            info!("Listening on {}", &aegis_config.main.address);

            let app = make_router(state);

            axum::serve(listener, app.into_make_service())
                .await
                .context("Server should be able to... well, serve!")
        })
}
