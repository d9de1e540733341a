//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::{StorageConfig, StorefrontConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::services::AccountService;
use crate::storage::{InMemoryStorage, PostgresStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Storefront daemon server
pub struct Server {
    config: StorefrontConfig,
    state: AppState,
}

impl Server {
    /// Create a new server, connecting the configured storage backend
    pub async fn new(config: StorefrontConfig) -> DaemonResult<Self> {
        let storage = connect_storage(&config.storage).await?;
        tracing::info!(backend = storage.backend_name(), "Storage ready");

        let state = AppState::new(storage, &config);
        Ok(Self { config, state })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.state.clone(), &self.config.server);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Storefront daemon listening on {}", addr);

        let sweeper = tokio::spawn(purge_sessions(
            self.state.services.accounts.clone(),
            Duration::from_secs(self.config.server.session_sweep_interval_secs.max(1)),
        ));

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Storefront daemon shutting down");
        sweeper.abort();

        Ok(())
    }
}

/// Build the storage backend named by the configuration
pub async fn connect_storage(config: &StorageConfig) -> DaemonResult<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config {
        StorageConfig::Memory => Arc::new(InMemoryStorage::default()),
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => Arc::new(PostgresStorage::new(url, *max_connections, *connect_timeout_secs).await?),
    };
    Ok(storage)
}

/// Periodically drop expired sessions
async fn purge_sessions(accounts: Arc<AccountService>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(e) = accounts.purge_expired_sessions().await {
            tracing::warn!(error = %e, "Session purge failed");
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_from_default_config() {
        let storage = connect_storage(&StorageConfig::Memory).await.unwrap();
        assert_eq!(storage.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_server_builds_with_testing_config() {
        let server = Server::new(StorefrontConfig::testing()).await.unwrap();
        assert_eq!(server.state.storage.backend_name(), "memory");
    }
}
