use super::{OnStart, OnStop};
use crate::context::Context;
use futures::future::BoxFuture;
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

/// Future returned by a hook action
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

type HookFn = Arc<dyn Fn(Context) -> HookFuture + Send + Sync>;

/// One side of a hook: the callable and the name it was registered under
#[derive(Clone)]
pub(crate) struct HookAction {
    func: HookFn,
    origin: String,
}

impl HookAction {
    fn new<F, Fut>(origin: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx| Box::pin(f(ctx)) as HookFuture),
            origin: origin.into(),
        }
    }

    /// Fully-qualified name of the callable
    pub(crate) fn origin(&self) -> &str {
        &self.origin
    }

    pub(crate) fn invoke(&self, ctx: Context) -> HookFuture {
        (self.func)(ctx)
    }
}

/// A pair of optional start and stop actions for one component
///
/// # Example
///
/// ```rust,ignore
/// lifecycle.append(
///     Hook::new()
///         .named("metrics-server")
///         .on_start(move |_ctx| async move { Ok(()) })
///         .on_stop(move |_ctx| async move { Ok(()) }),
/// )?;
/// ```
#[derive(Clone)]
pub struct Hook {
    on_start: Option<HookAction>,
    on_stop: Option<HookAction>,
    name: Option<String>,
    caller: &'static Location<'static>,
}

impl Hook {
    /// Create an empty hook, remembering where it was created
    #[track_caller]
    pub fn new() -> Self {
        Self {
            on_start: None,
            on_stop: None,
            name: None,
            caller: Location::caller(),
        }
    }

    /// Create a hook that starts and stops a shared component
    #[track_caller]
    pub fn from_component<T>(component: Arc<T>) -> Self
    where
        T: OnStart + OnStop + 'static,
    {
        Self::new()
            .start_component(Arc::clone(&component))
            .stop_component(component)
    }

    /// Give the hook a display name used in errors and events
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the start action
    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_start = Some(HookAction::new(type_name::<F>(), f));
        self
    }

    /// Set the stop action
    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_stop = Some(HookAction::new(type_name::<F>(), f));
        self
    }

    /// Use a component's [`OnStart`] implementation as the start action
    pub fn start_component<T: OnStart + 'static>(mut self, component: Arc<T>) -> Self {
        let origin = format!("{}::on_start", type_name::<T>());
        self.on_start = Some(HookAction::new(origin, move |ctx| {
            let component = Arc::clone(&component);
            async move { component.on_start(ctx).await }
        }));
        self
    }

    /// Use a component's [`OnStop`] implementation as the stop action
    pub fn stop_component<T: OnStop + 'static>(mut self, component: Arc<T>) -> Self {
        let origin = format!("{}::on_stop", type_name::<T>());
        self.on_stop = Some(HookAction::new(origin, move |ctx| {
            let component = Arc::clone(&component);
            async move { component.on_stop(ctx).await }
        }));
        self
    }

    /// The explicit name, or the source location that created the hook
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.caller.to_string(),
        }
    }

    /// Where the hook was created
    pub fn caller(&self) -> &'static Location<'static> {
        self.caller
    }

    /// Whether the hook has a start action
    pub fn has_start(&self) -> bool {
        self.on_start.is_some()
    }

    /// Whether the hook has a stop action
    pub fn has_stop(&self) -> bool {
        self.on_stop.is_some()
    }

    pub(crate) fn start_action(&self) -> Option<&HookAction> {
        self.on_start.as_ref()
    }

    pub(crate) fn stop_action(&self) -> Option<&HookAction> {
        self.on_stop.as_ref()
    }
}

impl Default for Hook {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name())
            .field("on_start", &self.on_start.as_ref().map(HookAction::origin))
            .field("on_stop", &self.on_stop.as_ref().map(HookAction::origin))
            .finish()
    }
}
