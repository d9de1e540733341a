//! Storefront Daemon - catalog, cart and checkout service
//!
//! The storefront daemon provides:
//! - REST API for browsing categories and products
//! - Accounts with bearer-token sessions
//! - Shopping cart with live totals and checkout into orders
//! - Staff endpoints for catalog and order management

use clap::Parser;
use storefront_daemon::error::{DaemonError, DaemonResult};
use storefront_daemon::{Server, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Storefront Daemon CLI
#[derive(Parser)]
#[command(name = "storefrontd")]
#[command(about = "Storefront Daemon - catalog, cart and checkout service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "STOREFRONT_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "STOREFRONT_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level, overrides the configuration file
    #[arg(long, env = "STOREFRONT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "STOREFRONT_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = StorefrontConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        staff = config.accounts.staff_usernames.len(),
        "Starting storefront daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
