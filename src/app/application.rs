//! Application Bootstrap
//!
//! A built application owns its container and lifecycle manager and drives
//! both phases of the lifecycle.

use super::AppBuilder;
use crate::config::AppConfig;
use crate::context::Context;
use crate::di::{Container, Group};
use crate::error::{BuildError, Result};
use crate::lifecycle::{self, LifecycleManager, LifecycleState, ShutdownHandler};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// A built application
///
/// # Example
///
/// ```rust,ignore
/// use hookwire::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> hookwire::Result<()> {
///     let app = App::builder()
///         .config(AppConfig::from_env()?)
///         .module(storage_module())
///         .module(http_module())
///         .build()?;
///
///     // Starts every hook, waits for SIGINT/SIGTERM, then stops them
///     app.run().await
/// }
/// ```
pub struct App {
    id: Uuid,
    container: Arc<Container>,
    lifecycle: Arc<LifecycleManager>,
    config: AppConfig,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("state", &self.lifecycle.state())
            .field("services", &self.container.len())
            .field("hooks", &self.lifecycle.len())
            .finish()
    }
}

impl App {
    pub(super) fn new(
        container: Container,
        lifecycle: Arc<LifecycleManager>,
        config: AppConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            container: Arc::new(container),
            lifecycle,
            config,
        }
    }

    /// Create a new application builder
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Identifier attached to this application's log spans
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the container
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Get a reference to the lifecycle manager
    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    /// A singleton provided during the build
    pub fn resolve<T: Send + Sync + 'static>(&self) -> std::result::Result<Arc<T>, BuildError> {
        self.container.resolve::<T>()
    }

    /// A sealed (decorated) value group; empty if nothing produced it
    pub fn group<T>(&self, name: &str) -> std::result::Result<Group<T>, BuildError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.group::<T>(name)
    }

    /// Run every `on_start` action, see [`LifecycleManager::start`]
    pub async fn start(&self, ctx: &Context) -> lifecycle::Result<()> {
        self.lifecycle
            .start(ctx)
            .instrument(tracing::info_span!("app", id = %self.id))
            .await
    }

    /// Run `on_stop` for every started hook, see [`LifecycleManager::stop`]
    pub async fn stop(&self, ctx: &Context) -> lifecycle::Result<()> {
        self.lifecycle
            .stop(ctx)
            .instrument(tracing::info_span!("app", id = %self.id))
            .await
    }

    /// Create a shutdown handler bounded by the configured stop timeout
    pub fn shutdown_handler(&self) -> ShutdownHandler {
        ShutdownHandler::new(Arc::clone(&self.lifecycle), self.config.stop_timeout)
    }

    /// Start, wait for SIGINT or SIGTERM, then stop
    pub async fn run(&self) -> Result<()> {
        self.run_until(lifecycle::shutdown_signal()).await
    }

    /// Start, wait for `shutdown` to complete, then stop
    ///
    /// Both phases are bounded by the configured timeouts. If start fails,
    /// the hooks that did start are stopped before the start error is
    /// returned; rollback failures are logged.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let start_ctx = Context::new().with_timeout(self.config.start_timeout);
        if let Err(e) = self.start(&start_ctx).await {
            tracing::error!("Application failed to start: {}", e);
            if self.lifecycle.state() == LifecycleState::Failed {
                let stop_ctx = Context::new().with_timeout(self.config.stop_timeout);
                if let Err(rollback) = self.stop(&stop_ctx).await {
                    tracing::error!("Rollback after failed start: {}", rollback);
                }
            }
            return Err(e.into());
        }

        tracing::info!("Application {} running", self.id);
        shutdown.await;
        tracing::info!("Shutdown requested for application {}", self.id);

        let stop_ctx = Context::new().with_timeout(self.config.stop_timeout);
        self.stop(&stop_ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HookwireError;
    use crate::lifecycle::{Hook, LifecycleError};
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    fn recording_hook(journal: &Journal, name: &'static str, fail_start: bool) -> Hook {
        let (on_start, on_stop) = (Arc::clone(journal), Arc::clone(journal));
        Hook::new()
            .named(name)
            .on_start(move |_| {
                let journal = Arc::clone(&on_start);
                async move {
                    journal.lock().unwrap().push(format!("start {name}"));
                    anyhow::ensure!(!fail_start, "{name} refused to start");
                    Ok(())
                }
            })
            .on_stop(move |_| {
                let journal = Arc::clone(&on_stop);
                async move {
                    journal.lock().unwrap().push(format!("stop {name}"));
                    Ok(())
                }
            })
    }

    #[tokio::test]
    async fn test_run_until_starts_and_stops() {
        let journal = Journal::default();
        let (first, second) = (
            recording_hook(&journal, "db", false),
            recording_hook(&journal, "http", false),
        );
        let app = App::builder()
            .invoke(move |scope| {
                scope.append(first)?;
                scope.append(second)?;
                Ok(())
            })
            .build()
            .unwrap();

        app.run_until(async {}).await.unwrap();

        assert_eq!(app.lifecycle().state(), LifecycleState::Stopped);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["start db", "start http", "stop http", "stop db"]
        );
    }

    #[tokio::test]
    async fn test_run_until_rolls_back_failed_start() {
        let journal = Journal::default();
        let hooks = vec![
            recording_hook(&journal, "db", false),
            recording_hook(&journal, "cache", true),
            recording_hook(&journal, "http", false),
        ];
        let app = App::builder()
            .invoke(move |scope| {
                for hook in hooks {
                    scope.append(hook)?;
                }
                Ok(())
            })
            .build()
            .unwrap();

        let err = app
            .run_until(async {
                if true {
                    panic!("shutdown must not be awaited");
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HookwireError::Lifecycle(LifecycleError::StartFailed { index: 1, .. })
        ));
        assert_eq!(app.lifecycle().state(), LifecycleState::Stopped);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["start db", "start cache", "stop db"]
        );
    }

    #[tokio::test]
    async fn test_run_until_twice_is_invalid() {
        let app = App::builder().build().unwrap();
        app.run_until(async {}).await.unwrap();
        let err = app.run_until(async {}).await.unwrap_err();
        assert!(matches!(
            err,
            HookwireError::Lifecycle(LifecycleError::InvalidState { .. })
        ));
        // The rollback only runs after a failed start
        assert_eq!(app.lifecycle().state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_resolve_and_group() {
        let app = App::builder()
            .provide(|_| Ok(String::from("postgres://localhost")))
            .supply::<u16, _>("ports", "http", |_| Ok(Arc::new(8080)))
            .build()
            .unwrap();
        assert_eq!(*app.resolve::<String>().unwrap(), "postgres://localhost");
        assert_eq!(**app.group::<u16>("ports").unwrap().get("http").unwrap(), 8080);
        assert!(app.group::<u16>("unknown").unwrap().is_empty());
        assert_ne!(app.id(), App::builder().build().unwrap().id());
    }

    #[test]
    fn test_debug_shows_id_and_state() {
        let app = App::builder().build().unwrap();
        let rendered = format!("{app:?}");
        assert!(rendered.contains(&app.id().to_string()));
        assert!(rendered.contains("state: Idle"));
    }
}
