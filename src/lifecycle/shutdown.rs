//! Graceful Shutdown Handler
//!
//! Waits for OS signals and stops the lifecycle manager.

use super::{LifecycleManager, Result};
use crate::context::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Stops a shared [`LifecycleManager`] when the process is asked to exit
///
/// # Example
///
/// ```rust,ignore
/// use hookwire::lifecycle::ShutdownHandler;
///
/// let handler = ShutdownHandler::new(Arc::clone(app.lifecycle()), Duration::from_secs(15));
/// tokio::spawn(async move {
///     if let Err(e) = handler.wait_for_shutdown().await {
///         tracing::error!("Shutdown finished with errors: {}", e);
///     }
/// });
/// ```
pub struct ShutdownHandler {
    lifecycle_manager: Arc<LifecycleManager>,
    stop_timeout: Duration,
}

impl ShutdownHandler {
    /// Create a new ShutdownHandler
    pub fn new(lifecycle_manager: Arc<LifecycleManager>, stop_timeout: Duration) -> Self {
        Self {
            lifecycle_manager,
            stop_timeout,
        }
    }

    /// Wait for SIGINT or SIGTERM, then stop every started hook
    pub async fn wait_for_shutdown(&self) -> Result<()> {
        shutdown_signal().await;
        self.shutdown().await
    }

    /// Stop every started hook under a context bounded by the stop timeout
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Starting graceful shutdown...");

        let ctx = Context::new().with_timeout(self.stop_timeout);
        let result = self.lifecycle_manager.stop(&ctx).await;
        match &result {
            Ok(()) => tracing::info!("Graceful shutdown complete"),
            Err(e) => tracing::error!("Error during shutdown: {}", e),
        }
        result
    }
}

/// Create a future that completes when a shutdown signal is received
///
/// If a signal handler cannot be installed the error is logged and that
/// signal is never reported.
///
/// # Example
///
/// ```rust,ignore
/// use hookwire::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => tracing::info!("Shutdown signal received"),
///     _ = worker.run() => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
