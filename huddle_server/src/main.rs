//! Native entry point for the huddle signaling relay.

use clap::Parser;
use huddle_server::{ServerState, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Room-based signaling relay for WebRTC peer-to-peer sessions.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("huddle_server=debug,tower_http=info")),
        )
        .init();

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!("signaling relay listening on {}", listener.local_addr()?);

    axum::serve(listener, router(ServerState::new()))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
