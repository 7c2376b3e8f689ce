//! Server Implementation
//!
//! HTTP 服务器启动和管理

use tokio::net::TcpListener;

use crate::core::{Config, EngineState, Result};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<EngineState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config, state: None }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: EngineState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// Load the replica, start workers, serve until Ctrl-C, then shut down
    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => EngineState::initialize(&self.config).await?,
        };

        let tasks = state.start_background_tasks().await?;

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("📦 Stock Edge starting on {}", addr);

        let shutdown = state.shutdown_token();
        let signal = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
                _ = shutdown.cancelled() => {}
            }
        };

        let app = crate::api::build_app(state.clone());
        let served = axum::serve(listener, app).with_graceful_shutdown(signal).await;

        tasks.shutdown(self.config.shutdown_timeout()).await;
        served?;
        Ok(())
    }
}
