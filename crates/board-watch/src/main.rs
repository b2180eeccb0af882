//! Board watcher
//!
//! Reads host-page snapshots and panel commands as JSON lines on stdin,
//! writes panel/overlay events as JSON lines on stdout. Logs go to stderr.

use board_watch::config::WatchConfig;
use board_watch::engine::ProcessSpawner;
use board_watch::host::{self, JsonLinesUi};
use board_watch::profile::HostProfile;
use board_watch::session::SessionController;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stdout is reserved for the bridge)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let config = WatchConfig::load()?;
    info!(stockfish_path = %config.stockfish_path, "Watcher config loaded");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        if let Err(e) = host::read_events(BufReader::new(tokio::io::stdin()), events_tx).await {
            error!(error = %e, "Failed to read host events");
        }
    });

    let controller = SessionController::new(
        config.clone(),
        HostProfile::default(),
        ProcessSpawner::new(&config.stockfish_path),
        JsonLinesUi::new(std::io::stdout()),
    );
    controller.run(events_rx).await;

    info!("Watcher stopped");
    Ok(())
}
