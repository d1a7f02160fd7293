//! scd-server - REST API server binary.

use std::net::SocketAddr;

use scd_core::StoreConfig;
use scd_domain::{seed::seed_demo_data, DomainStores};
use scd_server::{create_server, AppState};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("scd_server=debug".parse()?),
        )
        .init();

    // Get configuration from environment
    let host = std::env::var("SCD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("SCD_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;
    let seed = std::env::var("SCD_SEED").is_ok();

    let config = StoreConfig::from_env();
    let stores = DomainStores::from_config(&config)?;
    match &config.db_path {
        Some(path) => info!("Using database at {}", path.display()),
        None => info!("Using in-memory database"),
    }

    if seed {
        match seed_demo_data(&stores)? {
            Some(summary) => info!(
                jobs = summary.jobs,
                timelogs = summary.timelogs,
                payments = summary.payments,
                "Seeded demo data"
            ),
            None => info!("Demo data already present"),
        }
    }

    let state = AppState::new(stores, &config);
    let app = create_server(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting scd-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped cleanly");
    Ok(())
}
