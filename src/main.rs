use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use notes_dashboard::config::{Config, StoreBackend};
use notes_dashboard::logging::init_logging;
use notes_dashboard::repositories::{InMemoryNoteRepository, MongoNoteRepository, NoteRepository};
use notes_dashboard::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_logging(&config.logging.level);

    tracing::info!(env = ?config.server.env, "Starting notes dashboard...");

    let note_repo: Arc<dyn NoteRepository> = match config.database.backend {
        StoreBackend::Mongodb => {
            let mongo = config
                .database
                .mongodb
                .as_ref()
                .context("database.mongodb is not configured")?;
            let repo = MongoNoteRepository::connect(mongo).await?;
            // インデックスが作れなくても起動は続ける
            if let Err(e) = repo.ensure_indexes().await {
                tracing::warn!(error = %e, "failed to create note indexes");
            }
            Arc::new(repo)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory note store; notes are lost on restart");
            Arc::new(InMemoryNoteRepository::new())
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Failed to parse SocketAddr: {}", e))?;

    let state = AppState::new(config, note_repo)?;
    server::start_server(addr, state).await
}
