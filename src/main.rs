mod app;
mod auth;
mod calendar;
mod config;
mod db;
mod error;
mod extract;
mod response;
mod state;
mod subtasks;
mod todos;
mod wire;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "chronos=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    match config.database.url_source {
        Some(source) => tracing::info!(source, "database url resolved"),
        None => tracing::warn!("no database url configured; data routes will fail"),
    }
    if config.jwt.secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; login and authenticated routes will fail");
    }

    let state = AppState::new(config);

    // Warm the pool and schema; a failure here is retried on the first request.
    if let Err(e) = state.db.pool().await {
        tracing::warn!(error = %e, "database not ready at startup; continuing");
    }

    let app = app::build_app(state.clone());
    app::serve(app, &state.config).await?;

    state.db.close().await;
    Ok(())
}
