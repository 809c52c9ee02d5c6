use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};

use studygroup_server::config::Config;
use studygroup_server::repository::SqliteRepository;
use studygroup_server::{app, get_server_version, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting study group server v{}", get_server_version());

    let config = Config::from_env()?;

    let db_path = config.database_path();
    info!("Using state database: {}", db_path.display());
    let repository = SqliteRepository::new(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let app_state = Arc::new(AppState::new(repository, &config));
    let app = app(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
