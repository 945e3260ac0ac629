//! ClinicLane - A multi-tenant article CMS

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cliniclane::{api, config::Config, db};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cliniclane=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ClinicLane...");

    // Load configuration
    let config_path = std::env::var("CLINICLANE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yml"));
    let config = Config::load_with_env(&config_path)?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    if db::migrations::is_up_to_date(&pool).await? {
        tracing::info!("Database schema up to date");
    } else {
        let pending = db::migrations::pending_count(&pool).await?;
        db::migrations::run_migrations(&pool).await?;
        tracing::info!("Applied {} database migrations", pending);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = api::build_state(pool, config)?;

    // Seed configured locales
    state
        .language_service
        .seed_defaults(&state.config.site.locales)
        .await?;

    if state.user_service.is_first_user().await? {
        tracing::warn!("No users yet: register the super-admin via POST /api/v1/auth/register");
    }

    // Purge expired sessions hourly
    {
        let users = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!("Removed {} expired sessions", count),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
