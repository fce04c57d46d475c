//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::core::{Config, Result, ServerError, ServerState, tasks};
use crate::db::seed;

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Bind `HTTP_PORT` on all interfaces and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;

        if self.config.seed_demo_data {
            seed::seed_demo_data(self.state.catalog()).await?;
        }

        let sweeper = tasks::spawn_cache_sweeper(
            self.state.cache.clone(),
            Duration::from_secs(self.config.cache_sweep_interval_secs.max(1)),
        );

        self.print_banner(local_addr);
        let app = crate::api::build_app(&self.state).with_state(self.state.clone());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        });

        let mut graceful_rx = shutdown_rx.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = graceful_rx.wait_for(|stop| *stop).await;
            })
            .into_future();

        // In-flight requests get SHUTDOWN_TIMEOUT_MS to finish
        let shutdown_timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        let mut forced_rx = shutdown_rx;
        let forced = async move {
            let _ = forced_rx.wait_for(|stop| *stop).await;
            tokio::time::sleep(shutdown_timeout).await;
        };

        tracing::info!("🚀 Seckill server listening on http://{}", local_addr);

        let result = tokio::select! {
            result = serve => result.map_err(|e| {
                ServerError::Internal(anyhow::anyhow!("Server error: {}", e))
            }),
            _ = forced => {
                tracing::warn!(
                    timeout_ms = self.config.shutdown_timeout_ms,
                    "Graceful shutdown timed out, dropping open connections"
                );
                Ok(())
            }
        };

        sweeper.abort();
        tracing::info!("✅ Server shutdown complete");
        result
    }

    fn print_banner(&self, addr: SocketAddr) {
        let database = self
            .config
            .database_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string());

        println!("\n");
        println!("╔════════════════════════════════════════════════════════════════════════════╗");
        println!("║                        ⚡ Seckill Server - Ready ⚡                        ║");
        println!("╠════════════════════════════════════════════════════════════════════════════╣");
        println!("║ 🌐 HTTP Listener   : http://{:<46} ║", addr);
        println!("║ 💾 Database        : {:<53} ║", database);
        println!("║ 🏷  Environment     : {:<53} ║", self.config.environment);
        println!("╚════════════════════════════════════════════════════════════════════════════╝");
        println!("\n");
    }
}

/// Graceful shutdown handler
///
/// Listens for SIGTERM and Ctrl+C signals
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
