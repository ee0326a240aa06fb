use clap::Parser;
use config::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use validate::SystemClock;
use web::{app, AppState};

mod chart;
mod compute;
mod config;
mod data;
mod read;
mod store;
mod validate;
mod web;
mod write;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("expenses=info")),
        )
        .init();

    let config = Config::parse();
    let state = AppState::new(&config, Arc::new(SystemClock))?;
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, store = %config.store.display(), "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
