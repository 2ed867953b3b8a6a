//! Lifecycle Hooks Module
//!
//! Ordered startup and shutdown of constructed components.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Application build (constructors append hooks)
//!    ↓
//! 2. start: on_start of hook 0, 1, ..., n-1   ← halts at the first failure
//!    ↓
//! [Running...]
//!    ↓
//! 3. Shutdown signal (SIGTERM/SIGINT)
//!    ↓
//! 4. stop: on_stop of started hooks, k-1, ..., 0   ← never halts
//! ```
//!
//! A component that depends on another's resources registers after it, and is
//! therefore stopped before it.
//!
//! # Example
//!
//! ```rust,ignore
//! use hookwire::lifecycle::{Hook, OnStart, OnStop};
//! use hookwire::Context;
//! use async_trait::async_trait;
//!
//! pub struct DatabaseService {
//!     pool: Pool,
//! }
//!
//! #[async_trait]
//! impl OnStart for DatabaseService {
//!     async fn on_start(&self, _ctx: Context) -> anyhow::Result<()> {
//!         tracing::info!("Initializing database connection");
//!         self.pool.connect().await
//!     }
//! }
//!
//! #[async_trait]
//! impl OnStop for DatabaseService {
//!     async fn on_stop(&self, _ctx: Context) -> anyhow::Result<()> {
//!         tracing::info!("Closing database connections");
//!         self.pool.close().await
//!     }
//! }
//!
//! lifecycle.append(Hook::from_component(db))?;
//! ```

mod error;
mod hook;
mod manager;
mod shutdown;
mod state;
mod traits;

pub use error::{HookFailure, LifecycleError, Result};
pub use hook::{Hook, HookFuture};
pub use manager::{LateAppendPolicy, LifecycleManager};
pub use shutdown::{ShutdownHandler, shutdown_signal};
pub use state::LifecycleState;
pub use traits::{OnStart, OnStop};
