use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

mod config;
mod error;
mod functions;
mod schema;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let badges = services::badge_store_from_config(&config.badges)?;
    tracing::info!(storage = ?config.badges, default_badge = %config.default_badge, "badge storage initialized");

    let events: Arc<dyn services::EventRepository> =
        Arc::new(services::PgEventRepository::new(pool.clone()));
    let sessions: Arc<dyn services::SessionVerifier> =
        Arc::new(services::PgSessionStore::new(pool));
    let verification = Arc::new(services::VerificationService::new(
        events.clone(),
        badges,
        config.default_badge.clone(),
    ));

    let state = functions::AppState {
        events,
        sessions,
        verification,
        max_badge_bytes: config.max_badge_bytes,
        expose_error_details: config.expose_error_details,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "event admin listening");

    axum::serve(listener, functions::router(state)).await?;
    Ok(())
}
