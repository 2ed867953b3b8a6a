use super::Scope;
use super::builder::{BuildState, Step, StepFn, StepKind};
use crate::di::{Decorator, Group};
use crate::error::BuildError;
use std::any::type_name;
use std::sync::Arc;

pub(super) enum Item {
    Produce(Step),
    Decorate(StepFn),
    Invoke(Step),
    Module(Module),
}

/// A named group of registrations
///
/// Modules only organize registrations; they are flattened in registration
/// order when the application is built.
///
/// # Example
///
/// ```rust,ignore
/// let storage = Module::new("storage")
///     .provide(|_scope| Ok(DatabaseConfig::from_env()?))
///     .invoke(|scope| {
///         let db = Arc::new(Database::new(scope.resolve::<DatabaseConfig>()?));
///         scope.append(Hook::from_component(db))?;
///         Ok(())
///     });
///
/// let app = App::builder().module(storage).build()?;
/// ```
pub struct Module {
    pub(super) name: String,
    pub(super) recover_from_panics: bool,
    pub(super) items: Vec<Item>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recover_from_panics: false,
            items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask for panic recovery inside this module.
    ///
    /// Always rejected when the application is built: recovering inside one
    /// module would leave the rest of the graph half-built. Use
    /// [`AppBuilder::recover_from_panics`](super::AppBuilder::recover_from_panics).
    pub fn recover_from_panics(mut self) -> Self {
        self.recover_from_panics = true;
        self
    }

    /// Register a singleton constructor
    ///
    /// A type may only be provided once per application; a second provider
    /// fails the build with [`BuildError::DuplicateProvider`].
    pub fn provide<T, F>(mut self, ctor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Scope<'_>) -> anyhow::Result<T> + Send + 'static,
    {
        let name = type_name::<T>().to_string();
        let ctor_name = name.clone();
        self.items.push(Item::Produce(Step {
            kind: StepKind::Provide { name },
            origin: type_name::<F>(),
            run: Box::new(move |state: &mut BuildState| {
                if state.scope().contains::<T>() {
                    return Err(BuildError::DuplicateProvider {
                        type_name: ctor_name,
                    });
                }
                let value = ctor(&state.scope()).map_err(|source| {
                    BuildError::ConstructorFailed {
                        name: ctor_name,
                        source,
                    }
                })?;
                state.container_mut().register(value);
                Ok(())
            }),
        }));
        self
    }

    /// Register a constructor for one member of a value group
    pub fn supply<T, F>(mut self, group: impl Into<String>, key: impl Into<String>, ctor: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&Scope<'_>) -> anyhow::Result<Arc<T>> + Send + 'static,
    {
        let (group, key) = (group.into(), key.into());
        let (group_name, member_key) = (group.clone(), key.clone());
        self.items.push(Item::Produce(Step {
            kind: StepKind::Supply { group, key },
            origin: type_name::<F>(),
            run: Box::new(move |state: &mut BuildState| {
                if state.pending_group::<T>(&group_name)?.group.contains_key(&member_key) {
                    return Err(BuildError::DuplicateGroupKey {
                        group: group_name,
                        key: member_key,
                    });
                }
                let value = ctor(&state.scope()).map_err(|source| {
                    BuildError::ConstructorFailed {
                        name: format!("{group_name}[{member_key}]"),
                        source,
                    }
                })?;
                state
                    .pending_group::<T>(&group_name)?
                    .group
                    .insert(member_key, value);
                Ok(())
            }),
        }));
        self
    }

    /// Register a decorator for a value group
    ///
    /// Decorators of one group run in registration order, once, after every
    /// producer and before any consumer.
    pub fn decorate<T, F>(mut self, group: impl Into<String>, f: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(Group<T>) -> anyhow::Result<Group<T>> + Send + 'static,
    {
        let group = group.into();
        self.items.push(Item::Decorate(Box::new(move |state: &mut BuildState| {
            state
                .pending_group::<T>(&group)?
                .decorators
                .push(Decorator::new(f));
            Ok(())
        })));
        self
    }

    /// Register a consumer, run after every group has been sealed
    pub fn invoke<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Scope<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        let name = type_name::<F>().to_string();
        let invoke_name = name.clone();
        self.items.push(Item::Invoke(Step {
            kind: StepKind::Invoke { name },
            origin: type_name::<F>(),
            run: Box::new(move |state: &mut BuildState| {
                f(&state.scope()).map_err(|source| BuildError::ConstructorFailed {
                    name: invoke_name,
                    source,
                })
            }),
        }));
        self
    }

    /// Nest another module
    pub fn module(mut self, module: Module) -> Self {
        self.items.push(Item::Module(module));
        self
    }
}
