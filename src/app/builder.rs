//! Phase-ordered application builder
//!
//! The builder does not solve a dependency graph. It runs registrations in
//! three phases, each in registration order:
//!
//! ```text
//! 1. Producers: provide / supply       (singletons, group members, hooks)
//!    ↓
//! 2. Sealing: every value group is assembled and decorated exactly once
//!    ↓
//! 3. Consumers: invoke                 (read groups, append hooks)
//! ```

use super::module::{Item, Module};
use super::{App, Scope};
use crate::config::AppConfig;
use crate::di::{Container, Decorator, Group, GroupKey, verify_key_set};
use crate::error::BuildError;
use crate::event::{Event, EventSink, TracingSink};
use crate::lifecycle::LifecycleManager;
use crate::panic::{PanicBoundary, PanicError};
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub(super) type StepFn = Box<dyn FnOnce(&mut BuildState) -> Result<(), BuildError> + Send>;

type Sealer = fn(&mut BuildState, &GroupKey) -> Result<(), BuildError>;

/// A registration that runs user code
pub(super) struct Step {
    pub(super) kind: StepKind,
    pub(super) origin: &'static str,
    pub(super) run: StepFn,
}

pub(super) enum StepKind {
    Provide { name: String },
    Supply { group: String, key: String },
    Invoke { name: String },
}

impl StepKind {
    fn event(&self, origin: &str, error: Option<&BuildError>) -> Event {
        let origin = origin.to_string();
        let error = error.map(ToString::to_string);
        match self {
            StepKind::Provide { name } => Event::Provided {
                name: name.clone(),
                origin,
                error,
            },
            StepKind::Supply { group, key } => Event::Supplied {
                group: group.clone(),
                key: key.clone(),
                origin,
                error,
            },
            StepKind::Invoke { name } => Event::Invoked {
                name: name.clone(),
                origin,
                error,
            },
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Provide { name } => write!(f, "provide {name}"),
            StepKind::Supply { group, key } => write!(f, "supply {group}[{key}]"),
            StepKind::Invoke { name } => write!(f, "invoke {name}"),
        }
    }
}

/// A value group still collecting members and decorators
pub(super) struct PendingGroup<T: ?Sized> {
    pub(super) group: Group<T>,
    pub(super) decorators: Vec<Decorator<T>>,
}

/// Mutable state threaded through every registration during `build`
pub(super) struct BuildState {
    container: Container,
    lifecycle: Arc<LifecycleManager>,
    boundary: PanicBoundary,
    sink: Arc<dyn EventSink>,
    pending: HashMap<GroupKey, Box<dyn Any + Send>>,
    sealers: Vec<(GroupKey, Sealer)>,
    groups_sealed: bool,
}

impl BuildState {
    pub(super) fn scope(&self) -> Scope<'_> {
        Scope::new(&self.container, &self.lifecycle, self.groups_sealed)
    }

    pub(super) fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// The pending group for `(T, name)`, created on first use
    pub(super) fn pending_group<T>(&mut self, name: &str) -> Result<&mut PendingGroup<T>, BuildError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = GroupKey::of::<T>(name);
        if !self.pending.contains_key(&key) {
            let sealer: Sealer = seal::<T>;
            self.sealers.push((key.clone(), sealer));
            self.pending.insert(
                key.clone(),
                Box::new(PendingGroup::<T> {
                    group: Group::new(),
                    decorators: Vec::new(),
                }),
            );
        }
        self.pending
            .get_mut(&key)
            .and_then(|pending| pending.downcast_mut::<PendingGroup<T>>())
            .ok_or_else(|| BuildError::DowncastFailed {
                type_name: type_name::<PendingGroup<T>>().to_string(),
            })
    }

    fn run_step(&mut self, step: Step) -> Result<(), BuildError> {
        let Step { kind, origin, run } = step;
        let boundary = self.boundary;
        let result = match boundary.call(origin, || run(self)) {
            Ok(result) => result,
            Err(panic) => Err(self.recovered(panic)),
        };

        self.sink.notify(&kind.event(origin, result.as_ref().err()));
        match &result {
            Ok(()) => tracing::debug!("Completed {}", kind),
            Err(e) => tracing::error!("Failed to {}: {}", kind, e),
        }
        result
    }

    fn seal_groups(&mut self) -> Result<(), BuildError> {
        for (key, seal) in std::mem::take(&mut self.sealers) {
            seal(self, &key)?;
        }
        self.groups_sealed = true;
        Ok(())
    }

    fn recovered(&self, panic: PanicError) -> BuildError {
        self.sink.notify(&Event::PanicRecovered {
            origin: panic.origin.clone(),
            payload: panic.payload.clone(),
        });
        BuildError::Panicked(panic)
    }
}

/// Assemble one group and run its decorators, in order, exactly once
fn seal<T>(state: &mut BuildState, key: &GroupKey) -> Result<(), BuildError>
where
    T: ?Sized + Send + Sync + 'static,
{
    let pending = state
        .pending
        .remove(key)
        .and_then(|pending| pending.downcast::<PendingGroup<T>>().ok())
        .ok_or_else(|| BuildError::DowncastFailed {
            type_name: type_name::<PendingGroup<T>>().to_string(),
        })?;
    let PendingGroup {
        mut group,
        decorators,
    } = *pending;
    let name = key.name();

    for decorator in decorators {
        let origin = decorator.origin();
        let before = group.key_set();
        let outcome = match state.boundary.call(origin, || decorator.apply(group)) {
            Ok(Ok(decorated)) => verify_key_set(name, origin, &before, &decorated).map(|()| decorated),
            Ok(Err(source)) => Err(BuildError::DecoratorFailed {
                group: name.to_string(),
                origin: origin.to_string(),
                source,
            }),
            Err(panic) => Err(state.recovered(panic)),
        };

        state.sink.notify(&Event::Decorated {
            group: name.to_string(),
            origin: origin.to_string(),
            error: outcome.as_ref().err().map(ToString::to_string),
        });
        group = outcome.inspect_err(|e| tracing::error!("Failed to decorate {}: {}", name, e))?;
    }

    tracing::debug!(
        "Sealed value group {} of {} ({} members)",
        name,
        key.capability_name(),
        group.len()
    );
    state.container_mut().insert_group(name, group);
    Ok(())
}

/// Registrations split by phase, in registration order
#[derive(Default)]
struct Plan {
    producers: Vec<Step>,
    decorators: Vec<StepFn>,
    consumers: Vec<Step>,
}

/// Route every item into its phase, rejecting panic recovery below the top level
fn flatten(items: Vec<Item>, scope: Option<&str>, plan: &mut Plan) -> Result<(), BuildError> {
    for item in items {
        match item {
            Item::Produce(step) => plan.producers.push(step),
            Item::Decorate(register) => plan.decorators.push(register),
            Item::Invoke(step) => plan.consumers.push(step),
            Item::Module(module) => {
                let path = match scope {
                    Some(parent) => format!("{parent}.{}", module.name),
                    None => module.name.clone(),
                };
                if module.recover_from_panics {
                    return Err(BuildError::PanicBoundaryNotTopLevel { scope: path });
                }
                flatten(module.items, Some(&path), plan)?;
            }
        }
    }
    Ok(())
}

/// Builder for [`App`]
///
/// # Example
///
/// ```rust,ignore
/// let app = App::builder()
///     .recover_from_panics()
///     .supply::<dyn Handler, _>("handlers", "health", |_| Ok(Arc::new(Health) as Arc<dyn Handler>))
///     .supply::<dyn Handler, _>("handlers", "users", |scope| {
///         Ok(Arc::new(Users::new(scope.resolve::<Db>()?)) as Arc<dyn Handler>)
///     })
///     .decorate::<dyn Handler, _>("handlers", |group| {
///         Ok(group.map_values(|_, h| Arc::new(Logged(h)) as Arc<dyn Handler>))
///     })
///     .invoke(|scope| {
///         let server = Arc::new(Server::new(scope.group::<dyn Handler>("handlers")?));
///         scope.append(Hook::from_component(server))?;
///         Ok(())
///     })
///     .build()?;
///
/// app.run().await?;
/// ```
pub struct AppBuilder {
    root: Module,
    config: AppConfig,
    sink: Arc<dyn EventSink>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            root: Module::new("root"),
            config: AppConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the configuration
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Recover panics in every constructor, decorator and hook of this application
    pub fn recover_from_panics(mut self) -> Self {
        self.config.recover_from_panics = true;
        self
    }

    /// Send build and lifecycle events to `sink` instead of [`TracingSink`]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// See [`Module::provide`]
    pub fn provide<T, F>(mut self, ctor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Scope<'_>) -> anyhow::Result<T> + Send + 'static,
    {
        self.root = self.root.provide(ctor);
        self
    }

    /// See [`Module::supply`]
    pub fn supply<T, F>(mut self, group: impl Into<String>, key: impl Into<String>, ctor: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&Scope<'_>) -> anyhow::Result<Arc<T>> + Send + 'static,
    {
        self.root = self.root.supply(group, key, ctor);
        self
    }

    /// See [`Module::decorate`]
    pub fn decorate<T, F>(mut self, group: impl Into<String>, f: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(Group<T>) -> anyhow::Result<Group<T>> + Send + 'static,
    {
        self.root = self.root.decorate(group, f);
        self
    }

    /// See [`Module::invoke`]
    pub fn invoke<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Scope<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.root = self.root.invoke(f);
        self
    }

    /// Add a module
    pub fn module(mut self, module: Module) -> Self {
        self.root = self.root.module(module);
        self
    }

    /// Run every registration and return the built application
    ///
    /// # Errors
    ///
    /// Returns the first build error: an invalid panic recovery request, a
    /// failing or panicking constructor, a duplicate group key, or a
    /// decorator that fails or changes its group's keys.
    pub fn build(self) -> Result<App, BuildError> {
        let AppBuilder { root, config, sink } = self;

        let mut plan = Plan::default();
        flatten(root.items, None, &mut plan)?;

        let boundary = if config.recover_from_panics {
            PanicBoundary::enabled()
        } else {
            PanicBoundary::disabled()
        };
        let lifecycle = Arc::new(
            LifecycleManager::new()
                .with_sink(Arc::clone(&sink))
                .with_panic_boundary(boundary)
                .with_late_append(config.late_append),
        );

        tracing::info!(
            "Building application ({} producers, {} decorators, {} consumers)...",
            plan.producers.len(),
            plan.decorators.len(),
            plan.consumers.len()
        );

        let mut state = BuildState {
            container: Container::new(),
            lifecycle,
            boundary,
            sink,
            pending: HashMap::new(),
            sealers: Vec::new(),
            groups_sealed: false,
        };

        for register in plan.decorators {
            register(&mut state)?;
        }
        for step in plan.producers {
            state.run_step(step)?;
        }
        state.seal_groups()?;
        for step in plan.consumers {
            state.run_step(step)?;
        }

        tracing::info!(
            "Application built ({} services, {} hooks)",
            state.container.len(),
            state.lifecycle.len()
        );
        Ok(App::new(state.container, state.lifecycle, config))
    }
}
