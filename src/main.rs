#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod clients;
mod config;
mod db;
mod sync;
mod throttle;
mod utils;
mod web;
mod webhook;

use cli::Cli;
use clients::{CodeforcesClient, GitHubClient};
use config::Config;
use web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = Config::load_from_file(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    utils::logging::init_tracing(&config.logging);

    let config = Arc::new(config);
    info!("hive backend starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;

    let github = Arc::new(GitHubClient::new(&config.github)?);
    let codeforces = Arc::new(CodeforcesClient::new(&config.codeforces)?);

    let web_server = WebServer::new(config.clone(), db_manager, github, codeforces).await?;
    web_server.start().await?;

    info!("hive backend shutting down");
    Ok(())
}
