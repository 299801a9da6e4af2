//! status-line-server: a single-connection test peer for the
//! `cs3700fall2015` status protocol.
//!
//! Behavior:
//! - Listens on 127.0.0.1:5000 with a backlog of one
//! - Accepts exactly one client and never accepts another
//! - Replies `cs3700fall2015 STATUS 5 + 6` after every read, and
//!   `cs3700fall2015 BYE 24601` once, on iteration 1000
//! - Ctrl-C closes the connection and exits cleanly
//! - Any other I/O error is fatal

mod config;
mod protocols;
mod server;

use config::Config;
use server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        address = %config.listen,
        backlog = config.backlog,
        read_size = config.read_size,
        bye_at = config.bye_at,
        "Starting status-line-server"
    );

    let server = Server::bind(config)?;
    server.run_until(interrupt()).await?;
    Ok(())
}

/// Completes on Ctrl-C. If the handler cannot be installed the default
/// signal disposition still terminates the process, so wait forever.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
