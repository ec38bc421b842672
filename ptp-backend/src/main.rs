//! ptp-backend
//!
//! HTTP service holding pumps and their participants.

use anyhow::Context;
use ptp_backend::{serve, BackendConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ptp_backend=info,tower_http=info")),
        )
        .init();

    let config = BackendConfig::from_env().context("invalid backend configuration")?;
    serve(config).await
}
