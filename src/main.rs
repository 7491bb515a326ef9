//! Bujji server
//!
//! Entry point for the assistant widget and its chat handler.

use std::sync::Arc;

use bujji::config::{AppConfig, LogFormat};
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap and config read the environment
    let _ = dotenv();

    let config = Arc::new(AppConfig::load()?);
    init_tracing(config.logging.format);

    bujji::server::start_server(config).await
}

/// Initialize tracing (M-LOG-STRUCTURED).
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).init(),
    }
}
