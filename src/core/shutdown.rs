use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Graceful shutdown coordinator.
///
/// Uses `CancellationToken` to broadcast shutdown to the HTTP server and
/// background tasks. Sequence:
/// 1. Cancel the token (server stops accepting connections)
/// 2. Drain in-flight requests
/// 3. Close the storage handle
///
/// The whole sequence is bounded by `SHUTDOWN_TIMEOUT_SECS`.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a clone of the cancellation token for use by tasks.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Triggers shutdown for all tasks listening on this token.
    pub fn trigger_shutdown(&self) {
        info!("shutdown signal received, broadcasting to all tasks");
        self.token.cancel();
    }

    /// Wait for SIGTERM or SIGINT and trigger coordinated shutdown.
    pub async fn wait_for_signal_and_shutdown(&self) {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C)"),
                        _ = sigterm.recv() => info!("received SIGTERM"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, waiting for SIGINT only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C)");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received SIGINT (Ctrl+C)");
        }

        self.trigger_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Total shutdown timeout in seconds.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Time allowed for in-flight HTTP responses to finish.
pub const HTTP_DRAIN_TIMEOUT_SECS: u64 = 20;
