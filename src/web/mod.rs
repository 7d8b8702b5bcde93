use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use once_cell::sync::OnceCell;
use salvo::prelude::*;
use secrecy::SecretString;
use tracing::info;

use crate::clients::{CodeforcesClient, GitHubClient};
use crate::config::Config;
use crate::db::DatabaseManager;
use crate::webhook::WebhookProcessor;

pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod views;

use self::middleware::auth::create_router;

pub struct WebState {
    pub db_manager: Arc<DatabaseManager>,
    pub github: Arc<GitHubClient>,
    pub codeforces: Arc<CodeforcesClient>,
    pub webhook_processor: Arc<WebhookProcessor>,
    pub webhook_secret: SecretString,
    pub started_at: Instant,
}

static WEB_STATE: OnceCell<WebState> = OnceCell::new();

pub fn web_state() -> &'static WebState {
    WEB_STATE
        .get()
        .expect("web state is not initialized before handler execution")
}

#[derive(Clone)]
pub struct WebServer {
    config: Arc<Config>,
}

impl WebServer {
    pub async fn new(
        config: Arc<Config>,
        db_manager: Arc<DatabaseManager>,
        github: Arc<GitHubClient>,
        codeforces: Arc<CodeforcesClient>,
    ) -> Result<Self> {
        let webhook_processor = Arc::new(WebhookProcessor::new(
            db_manager.user_store(),
            db_manager.profile_store(),
            db_manager.feed_store(),
            db_manager.repository_store(),
        ));

        let _ = WEB_STATE.set(WebState {
            db_manager,
            github,
            codeforces,
            webhook_processor,
            webhook_secret: SecretString::from(config.github.webhook_secret.clone()),
            started_at: Instant::now(),
        });

        Ok(Self { config })
    }

    pub async fn start(&self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        info!("Starting web server on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor).serve(create_router()).await;

        Ok(())
    }
}
