//! Backend entry-point: wires adapters, services, and the HTTP server.

use std::sync::Arc;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::domain::{CollaborationService, RelationshipService};
use backend::inbound::http::HttpState;
use backend::outbound::persistence::{
    DbPool, DieselDeadlineRepository, DieselRelationshipRepository, DieselUserDirectory,
    PoolConfig,
};
use backend::outbound::queue::TracingNotificationQueue;
use backend::server::{self, AppSettings};

/// Migrations embedded at build time and applied on startup.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn run_migrations(database_url: &str) -> std::io::Result<()> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|error| std::io::Error::other(format!("database connection failed: {error}")))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| std::io::Error::other(format!("migrations failed: {error}")))?;
    info!(count = applied.len(), "migrations applied");
    Ok(())
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|error| std::io::Error::other(format!("failed to load settings: {error}")))?;

    let database_url = settings
        .database_url
        .clone()
        .ok_or_else(|| std::io::Error::other("APP_DATABASE_URL must be set"))?;

    {
        let url = database_url.clone();
        tokio::task::spawn_blocking(move || run_migrations(&url))
            .await
            .map_err(|error| std::io::Error::other(format!("migration task failed: {error}")))??;
    }

    let pool = DbPool::new(
        PoolConfig::new(database_url).with_max_size(settings.pool_max_size()),
    )
    .await
    .map_err(|error| std::io::Error::other(format!("failed to build pool: {error}")))?;

    let relationship_repo = Arc::new(DieselRelationshipRepository::new(pool.clone()));
    let deadline_repo = Arc::new(DieselDeadlineRepository::new(pool.clone()));
    let directory = Arc::new(DieselUserDirectory::new(pool));
    let notifications = Arc::new(TracingNotificationQueue::new());
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let relationships = Arc::new(RelationshipService::new(
        relationship_repo,
        directory,
        notifications.clone(),
        clock.clone(),
    ));
    let collaboration = Arc::new(CollaborationService::new(
        deadline_repo,
        relationships.clone(),
        notifications,
        clock,
        settings.collaboration_fanout(),
    ));

    let state = HttpState::new(relationships.clone(), relationships, collaboration);
    server::run(&settings, state).await
}
