//! Lifecycle Manager
//!
//! Owns the ordered hook list and drives the start/stop state machine.

use super::{Hook, HookFailure, LifecycleError, LifecycleState, Result};
use crate::context::Context;
use crate::event::{Event, EventSink, NopSink, error_text};
use crate::lifecycle::hook::HookAction;
use crate::panic::PanicBoundary;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use strum_macros::{AsRefStr, Display, EnumString};

/// What `append` does once the manager has left `Idle`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LateAppendPolicy {
    /// Return [`LifecycleError::InvalidState`]
    #[default]
    Reject,
    /// Log a warning and drop the hook
    Ignore,
}

struct Inner {
    state: LifecycleState,
    hooks: Vec<Hook>,
    /// Length of the hook prefix whose start succeeded
    started: usize,
}

/// Starts hooks in registration order and stops them in reverse
///
/// The LifecycleManager is responsible for:
/// - Collecting hooks while the application is being built
/// - Running `on_start` actions in order, halting at the first failure
/// - Running `on_stop` actions in reverse for every hook that started,
///   continuing past failures and reporting all of them
///
/// # Example
///
/// ```rust,ignore
/// use hookwire::lifecycle::{Hook, LifecycleManager};
/// use hookwire::Context;
///
/// let manager = LifecycleManager::new();
/// manager.append(Hook::new().named("db").on_start(open_db).on_stop(close_db))?;
/// manager.append(Hook::new().named("http").on_start(serve).on_stop(drain))?;
///
/// manager.start(&Context::new()).await?;  // db, then http
/// // ... application runs ...
/// manager.stop(&Context::new()).await?;   // http, then db
/// ```
pub struct LifecycleManager {
    inner: Mutex<Inner>,
    sink: Arc<dyn EventSink>,
    boundary: PanicBoundary,
    late_append: LateAppendPolicy,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    /// Create a new LifecycleManager
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Idle,
                hooks: Vec::new(),
                started: 0,
            }),
            sink: Arc::new(NopSink),
            boundary: PanicBoundary::disabled(),
            late_append: LateAppendPolicy::default(),
        }
    }

    /// Send events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Guard every hook action with `boundary`
    pub fn with_panic_boundary(mut self, boundary: PanicBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Choose how hooks appended after `start` are treated
    pub fn with_late_append(mut self, policy: LateAppendPolicy) -> Self {
        self.late_append = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of the state machine
    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.lock().hooks.len()
    }

    /// Returns true if no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.lock().hooks.is_empty()
    }

    /// Number of hooks that started during the last start attempt
    pub fn started_count(&self) -> usize {
        self.lock().started
    }

    /// Register a hook
    ///
    /// Only valid while the manager is `Idle`. Afterwards the hook list is
    /// left untouched and the call is rejected or ignored according to the
    /// [`LateAppendPolicy`].
    pub fn append(&self, hook: Hook) -> Result<()> {
        let mut inner = self.lock();
        if !inner.state.accepts_hooks() {
            return match self.late_append {
                LateAppendPolicy::Reject => {
                    tracing::error!(
                        "Rejected hook {} appended while {}",
                        hook.name(),
                        inner.state
                    );
                    Err(LifecycleError::invalid_state("append", inner.state))
                }
                LateAppendPolicy::Ignore => {
                    tracing::warn!("Ignored hook {} appended while {}", hook.name(), inner.state);
                    Ok(())
                }
            };
        }

        tracing::debug!("Registered hook #{}: {}", inner.hooks.len(), hook.name());
        inner.hooks.push(hook);
        Ok(())
    }

    /// Run every `on_start` action in registration order
    ///
    /// Halts at the first failing action, or before the next hook once `ctx`
    /// is done; the first hook is always attempted. On failure the manager
    /// moves to `Failed`, from which [`stop`](Self::stop) still cleans up the
    /// hooks that did start.
    pub async fn start(&self, ctx: &Context) -> Result<()> {
        let hooks = {
            let mut inner = self.lock();
            if inner.state != LifecycleState::Idle {
                return Err(LifecycleError::invalid_state("start", inner.state));
            }
            inner.state = LifecycleState::Starting;
            inner.started = 0;
            inner.hooks.clone()
        };

        tracing::info!("Starting {} lifecycle hooks...", hooks.len());

        for (index, hook) in hooks.iter().enumerate() {
            if index > 0 && ctx.is_cancelled() {
                return Err(self.fail_start(LifecycleError::StartCancelled {
                    index,
                    hook: hook.name(),
                }));
            }

            if let Some(action) = hook.start_action() {
                let name = hook.name();
                tracing::debug!("Starting #{}: {}", index, name);
                self.sink.notify(&Event::HookStartExecuting {
                    index,
                    hook: name.clone(),
                    origin: action.origin().to_string(),
                    caller: hook.caller().to_string(),
                });

                let began = Instant::now();
                let result = self.invoke(action, ctx).await;
                self.sink.notify(&Event::HookStartExecuted {
                    index,
                    hook: name.clone(),
                    runtime: began.elapsed(),
                    error: result.as_ref().err().map(error_text),
                });

                if let Err(source) = result {
                    tracing::error!("OnStart failed for #{} {}: {:#}", index, name, source);
                    return Err(self.fail_start(LifecycleError::StartFailed {
                        index,
                        hook: name,
                        source,
                    }));
                }
                tracing::debug!("Started #{}: {}", index, name);
            }

            self.lock().started = index + 1;
        }

        self.lock().state = LifecycleState::Running;
        self.sink.notify(&Event::Started { error: None });
        tracing::info!("Start complete ({} hooks started)", hooks.len());
        Ok(())
    }

    fn fail_start(&self, err: LifecycleError) -> LifecycleError {
        self.lock().state = LifecycleState::Failed;
        self.sink.notify(&Event::Started {
            error: Some(err.to_string()),
        });
        err
    }

    /// Run `on_stop` for every started hook, in **reverse order**
    ///
    /// Valid from `Running` and `Failed`. Every started hook is attempted even
    /// when earlier ones fail; all failures are returned together. Calling
    /// `stop` again once `Stopped` is an [`LifecycleError::InvalidState`].
    pub async fn stop(&self, ctx: &Context) -> Result<()> {
        let (hooks, started) = {
            let mut inner = self.lock();
            if !inner.state.can_stop() {
                return Err(LifecycleError::invalid_state("stop", inner.state));
            }
            inner.state = LifecycleState::Stopping;
            (inner.hooks.clone(), inner.started)
        };

        tracing::info!("Stopping {} lifecycle hooks...", started);

        let mut failures = Vec::new();
        for (index, hook) in hooks[..started].iter().enumerate().rev() {
            let Some(action) = hook.stop_action() else {
                continue;
            };
            let name = hook.name();
            tracing::debug!("Stopping #{}: {}", index, name);
            self.sink.notify(&Event::HookStopExecuting {
                index,
                hook: name.clone(),
                origin: action.origin().to_string(),
                caller: hook.caller().to_string(),
            });

            let began = Instant::now();
            let result = self.invoke(action, ctx).await;
            self.sink.notify(&Event::HookStopExecuted {
                index,
                hook: name.clone(),
                runtime: began.elapsed(),
                error: result.as_ref().err().map(error_text),
            });

            match result {
                Ok(()) => tracing::debug!("Stopped #{}: {}", index, name),
                Err(source) => {
                    // Stop never halts on a failure
                    tracing::error!("OnStop failed for #{} {}: {:#}", index, name, source);
                    failures.push(HookFailure {
                        index,
                        hook: name,
                        source,
                    });
                }
            }
        }

        self.lock().state = LifecycleState::Stopped;

        if failures.is_empty() {
            self.sink.notify(&Event::Stopped { error: None });
            tracing::info!("Stop complete ({} hooks stopped)", started);
            Ok(())
        } else {
            let err = LifecycleError::StopFailed { failures };
            self.sink.notify(&Event::Stopped {
                error: Some(err.to_string()),
            });
            Err(err)
        }
    }

    async fn invoke(&self, action: &HookAction, ctx: &Context) -> anyhow::Result<()> {
        let origin = action.origin();
        let outcome = match self.boundary.call(origin, || action.invoke(ctx.clone())) {
            Ok(future) => self.boundary.call_async(origin, future).await,
            Err(panic) => Err(panic),
        };
        match outcome {
            Ok(result) => result,
            Err(panic) => {
                self.sink.notify(&Event::PanicRecovered {
                    origin: panic.origin.clone(),
                    payload: panic.payload.clone(),
                });
                Err(panic.into())
            }
        }
    }
}
