//! framelink Server Binary
//!
//! Starts a framelink server with the built-in handlers and runs it until
//! Ctrl+C.

use clap::Parser;
use framelink::{Server, ServerConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// framelink Server
#[derive(Parser, Debug)]
#[command(name = "framelink-server")]
#[command(about = "Typed binary frame server")]
#[command(version)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Listen port
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Maximum concurrent client connections
    #[arg(short, long, default_value = "4")]
    max_clients: usize,

    /// Per-frame read timeout in milliseconds (0 disables it)
    #[arg(short, long, default_value = "30000")]
    read_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,framelink=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("framelink Server v{}", framelink::VERSION);

    let config = ServerConfig::builder()
        .bind_addr(&args.bind)
        .port(args.port)
        .max_clients(args.max_clients)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    // Set up Ctrl+C handler
    let (stop_tx, stop_rx) = crossbeam::channel::bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    }) {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    let mut server = Server::new(config);
    if let Err(e) = server.open() {
        tracing::error!("Failed to start server: {}", e);
        std::process::exit(1);
    }

    let _ = stop_rx.recv();
    tracing::info!("Received Ctrl+C, initiating shutdown...");

    if let Err(e) = server.close() {
        tracing::error!("Error closing server: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
