use anyhow::Result;
use colored::Colorize;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState};
use crate::notify::HttpNotifier;
use crate::runner::{Orchestrator, ProcessRunner};
use crate::store::FileStore;
use crate::utils::Config;

/// Main relay server
pub struct RelayServer {
    config: Config,
}

impl RelayServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wire the file store, process runner and HTTP notifier together
    pub fn build_state(&self) -> Result<Arc<AppState>> {
        let store = Arc::new(FileStore::new(&self.config));
        let runner = Arc::new(ProcessRunner::new(
            &self.config.runner_command,
            &self.config.workdir,
        )?);
        let orchestrator = Orchestrator::new(
            store.clone(),
            store,
            runner,
            Arc::new(HttpNotifier::new()),
        )
        .with_screenshot_limit(self.config.screenshot_limit);

        Ok(Arc::new(AppState::new(orchestrator)))
    }

    /// Start the server and serve until Ctrl+C
    pub async fn start(&self) -> Result<()> {
        let state = self.build_state()?;
        let app = api::api_router()
            .layer(CorsLayer::permissive())
            .with_state(state);

        let port = self.config.port;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        println!("\n{} Relay server running on port {}", "🚀".green(), port);
        println!("   Workdir:          {}", self.config.workdir.display().to_string().cyan());
        println!("   Runner:           {}", self.config.runner_command.cyan());
        println!("   Health check:     http://localhost:{}/health", port);
        println!("   Trigger tests:    http://localhost:{}/trigger-tests", port);
        println!("   Latest results:   http://localhost:{}/results", port);
        println!("   List results:     http://localhost:{}/results-list", port);
        println!("   Specific result:  http://localhost:{}/results/{{filename}}", port);
        println!("\n   Press Ctrl+C to stop.\n");

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Relay server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    println!("\n{} Shutting down...", "⏹️ ".yellow());
}
