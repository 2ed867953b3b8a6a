//! Lifecycle hook traits
//!
//! Components that own resources can implement these traits and register
//! themselves with [`Hook::from_component`](super::Hook::from_component)
//! instead of writing closures by hand.

use crate::context::Context;
use async_trait::async_trait;

/// Called when the application starts
///
/// Use this hook to:
/// - Open database connections
/// - Bind listeners and spawn accept loops
/// - Subscribe to message queues
///
/// Anything spawned here must be joined or cancelled by the matching
/// [`OnStop`] so that nothing outlives the application.
///
/// # Example
///
/// ```rust,ignore
/// use hookwire::lifecycle::OnStart;
/// use hookwire::Context;
///
/// #[async_trait]
/// impl OnStart for HttpServer {
///     async fn on_start(&self, ctx: Context) -> anyhow::Result<()> {
///         let listener = TcpListener::bind(&self.addr).await?;
///         *self.task.lock().await = Some(tokio::spawn(serve(listener, self.shutdown.clone())));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait OnStart: Send + Sync {
    /// Start the component
    async fn on_start(&self, ctx: Context) -> anyhow::Result<()>;
}

/// Called when the application stops
///
/// Stop hooks run in **reverse order** of registration, and only for
/// components whose start hook succeeded.
#[async_trait]
pub trait OnStop: Send + Sync {
    /// Release the component's resources
    async fn on_stop(&self, ctx: Context) -> anyhow::Result<()>;
}
