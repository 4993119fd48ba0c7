//! stub-debugger entry point.
//!
//! Serves a simulated debugger endpoint that `emu-monitor` can connect
//! to without a running emulator.

use tracing_subscriber::EnvFilter;

use emu_monitor::config::StubConfig;
use emu_monitor::stub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = StubConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting stub debugger");

    let handle = stub::start(&config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!(stats = ?handle.stats(), "shutting down");
    handle.shutdown().await;

    Ok(())
}
