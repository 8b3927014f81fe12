// src/main.rs
use std::net::SocketAddr;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rental_backend::config::Config;
use rental_backend::database::Repositories;
use rental_backend::state::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let repos = Repositories::connect(&config).await?;

    // Create application state
    let state = AppState::new(config, repos);
    state.uploads.init().await?;
    if let Some(admin) = &state.config.admin {
        state.identity.ensure_admin(admin).await?;
    }

    let host = state.config.host;
    let base_port = state.config.port;
    let app = rental_backend::app(state);

    // Try base_port..base_port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => {
                    bound = Some((l, addr));
                    break;
                }
                Err(e) => {
                    if offset == 0 {
                        tracing::warn!(%addr, error = %e, "Port in use, trying next");
                    }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                return Err(format!("Failed to bind to any port starting at {base_port} on {host}").into());
            }
        }
    };

    axum::serve(listener, app).await?;
    Ok(())
}
