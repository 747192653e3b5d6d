use anyhow::{Context, Result};
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod models;
mod routes;
mod services;

use services::{
    credential_store::CredentialStore, dashboard::DashboardController, session::SessionRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.addr;

    // Build our application state
    let state = Arc::new(AppState::new(config)?);

    let app = routes::routes(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    pub config: config::Config,
    pub credentials: Arc<CredentialStore>,
    pub sessions: SessionRegistry,
    pub dashboard: DashboardController,
}

impl AppState {
    fn new(config: config::Config) -> Result<Self> {
        let credentials = CredentialStore::open(&config.database_path)
            .with_context(|| format!("Failed to open {}", config.database_path))?;
        let sessions = SessionRegistry::new(config.session_idle);

        Ok(Self {
            config,
            credentials: Arc::new(credentials),
            sessions,
            dashboard: DashboardController::default(),
        })
    }
}
