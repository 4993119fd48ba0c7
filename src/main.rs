//! emu-monitor terminal front-end.
//!
//! Connects to the debugger endpoint, prints connection changes and
//! snapshots, and reads commands from stdin.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use emu_monitor::config::MonitorConfig;
use emu_monitor::console::{Action, HELP, Printer};
use emu_monitor::domain::MonitorEvent;
use emu_monitor::monitor::Monitor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = MonitorConfig::from_env()?;
    tracing::info!(endpoint = %config.endpoint, "starting emu-monitor");

    let monitor = Monitor::start(config)?;
    let mut view_rx = monitor.subscribe_view();
    let mut events = monitor.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = Printer::default();

    println!("{HELP}");

    loop {
        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                if let Some(text) = printer.update(&view) {
                    println!("{text}");
                }
            }
            event = events.recv() => match event {
                Ok(MonitorEvent::TransportError { message, .. }) => {
                    println!("transport error: {message}");
                }
                Ok(event) if event.is_terminal() => {
                    tracing::debug!(session_id = %event.session_id(), "session ended");
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Action::parse(&line) {
                    Some(Action::Quit) => break,
                    Some(action) => action.dispatch(&monitor)?,
                    None if line.trim().is_empty() => {}
                    None => println!("{HELP}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown().await;
    tracing::info!("emu-monitor stopped");

    Ok(())
}
