//! # Hookwire
//!
//! Application runtime core for Rust: ordered start/stop lifecycle hooks,
//! decorated value groups, and an application-wide panic boundary.
//!
//! ## Features
//!
//! - **Lifecycle Hooks**: `on_start` in registration order, halting at the first failure;
//!   `on_stop` in reverse order for exactly the hooks that started, never halting
//! - **Value Groups**: keyed collections of `Arc<dyn Trait>` members, decorated once,
//!   readable both as a map and in registration order
//! - **Panic Boundary**: optional recovery of panics in constructors, decorators and hooks,
//!   enabled for the whole application only
//! - **Event Sinks**: structured build and lifecycle events for tracing or JSON logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hookwire::prelude::*;
//!
//! trait Handler: Send + Sync {
//!     fn route(&self) -> &'static str;
//! }
//!
//! struct Health;
//!
//! impl Handler for Health {
//!     fn route(&self) -> &'static str {
//!         "/health"
//!     }
//! }
//!
//! struct Server {
//!     handlers: Group<dyn Handler>,
//! }
//!
//! #[async_trait]
//! impl OnStart for Server {
//!     async fn on_start(&self, _ctx: Context) -> anyhow::Result<()> {
//!         for handler in self.handlers.values() {
//!             tracing::info!("Mounting {}", handler.route());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl OnStop for Server {
//!     async fn on_stop(&self, _ctx: Context) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> hookwire::Result<()> {
//!     let app = App::builder()
//!         .recover_from_panics()
//!         .supply::<dyn Handler, _>("handlers", "health", |_| {
//!             Ok(Arc::new(Health) as Arc<dyn Handler>)
//!         })
//!         .invoke(|scope| {
//!             let handlers = scope.group::<dyn Handler>("handlers")?;
//!             scope.append(Hook::from_component(Arc::new(Server { handlers })))?;
//!             Ok(())
//!         })
//!         .build()?;
//!
//!     app.run().await
//! }
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod panic;

// Re-export core types
pub use app::{App, AppBuilder, Module, Scope};
pub use config::{AppConfig, ConfigError, ConfigService};
pub use context::Context;
pub use di::{Container, Decorator, Group};
pub use error::{BuildError, HookwireError, Result};
pub use event::{Event, EventKind, EventSink, JsonLinesSink, NopSink, RecordingSink, TracingSink};
pub use lifecycle::{
    Hook, LateAppendPolicy, LifecycleError, LifecycleManager, LifecycleState, OnStart, OnStop,
};
pub use panic::{PanicBoundary, PanicError};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// ```
/// use hookwire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{App, AppBuilder, Module, Scope};
    pub use crate::config::AppConfig;
    pub use crate::context::Context;
    pub use crate::di::Group;
    pub use crate::error::{BuildError, HookwireError, Result};
    pub use crate::lifecycle::{
        Hook, LifecycleError, LifecycleManager, OnStart, OnStop, ShutdownHandler, shutdown_signal,
    };
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
