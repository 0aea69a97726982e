//! FluxoÁgil queue server.
//!
//! Serves the REST/WS boundary over a Sled-backed store. Configuration comes
//! from the environment (a local `.env` is honored):
//! - `FLUXO_ADDR`       bind address, default `0.0.0.0:8080`
//! - `FLUXO_DATA_DIR`   Sled directory, default `fluxo_data`
//! - `FLUXO_PUBLIC_URL` base URL for join links/QR payloads
//! - `FLUXO_JWT_SECRET` admin session token secret

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fluxoagil::rest::{create_router, AppState};
use fluxoagil::storage::Storage;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = env_or("FLUXO_ADDR", "0.0.0.0:8080").parse()?;
    let data_dir = env_or("FLUXO_DATA_DIR", "fluxo_data");
    let public_url = env_or("FLUXO_PUBLIC_URL", &format!("http://{}", addr));

    let storage = Storage::open(&data_dir)?;
    let app = create_router(AppState::new(storage, public_url));

    info!(%addr, %data_dir, "fluxoagil queue service listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
