use crate::di::{Container, Group};
use crate::error::BuildError;
use crate::lifecycle::{Hook, LifecycleManager};
use std::sync::Arc;

/// What a constructor can see while the application is being built
///
/// Producers (`provide`, `supply`) can resolve singletons that were provided
/// before them and append hooks. Value groups only become readable once
/// every producer has run and every group has been decorated, so only
/// consumers (`invoke`) may call [`Scope::group`].
pub struct Scope<'a> {
    container: &'a Container,
    lifecycle: &'a LifecycleManager,
    groups_sealed: bool,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        container: &'a Container,
        lifecycle: &'a LifecycleManager,
        groups_sealed: bool,
    ) -> Self {
        Self {
            container,
            lifecycle,
            groups_sealed,
        }
    }

    /// A singleton provided earlier in the build
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, BuildError> {
        self.container.resolve::<T>()
    }

    /// Whether a singleton of type `T` has been provided
    pub fn contains<T: 'static>(&self) -> bool {
        self.container.contains::<T>()
    }

    /// A sealed value group; empty if nothing produced it
    pub fn group<T>(&self, name: &str) -> Result<Group<T>, BuildError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if !self.groups_sealed {
            return Err(BuildError::GroupNotReady {
                group: name.to_string(),
            });
        }
        self.container.group::<T>(name)
    }

    /// The application's lifecycle manager
    pub fn lifecycle(&self) -> &LifecycleManager {
        self.lifecycle
    }

    /// Shorthand for appending a hook to the lifecycle manager
    pub fn append(&self, hook: Hook) -> Result<(), BuildError> {
        self.lifecycle.append(hook)?;
        Ok(())
    }
}
