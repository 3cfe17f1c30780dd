use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use verso_gate::AccessGate;
use verso_history::SiteHistoryService;
use verso_ledger::{SiteCatalog, SiteJournal};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// verso site server.
pub struct VersoServer {
    config: ServerConfig,
}

impl VersoServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the blob store and site catalog described by the config.
    pub async fn build_state(&self) -> ServerResult<AppState> {
        let store = self.config.store.build().await?;
        let catalog = match &self.config.state_dir {
            Some(dir) => {
                let journal = SiteJournal::open(dir).await?;
                SiteCatalog::with_journal(journal).await?
            }
            None => SiteCatalog::new(),
        };
        info!(sites = catalog.len(), "site catalog loaded");

        let service = SiteHistoryService::new(
            store,
            Arc::new(catalog),
            AccessGate::new(self.config.gate.clone()),
            self.config.history.clone(),
        );
        Ok(AppState::new(Arc::new(service))
            .with_max_content_bytes(self.config.max_content_bytes))
    }

    /// Build the router (useful for testing).
    pub async fn router(&self) -> ServerResult<axum::Router> {
        Ok(build_router(self.build_state().await?))
    }

    /// Start serving requests until Ctrl+C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        let state = self.build_state().await?;
        if self.config.orphan_sweep_secs > 0 {
            spawn_orphan_sweeper(
                state.clone(),
                Duration::from_secs(self.config.orphan_sweep_secs),
            );
        }

        let app = build_router(state);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("verso server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

fn spawn_orphan_sweeper(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.history.sweep_orphans().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
