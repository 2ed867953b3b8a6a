use crate::config::ConfigError;
use crate::lifecycle::LifecycleError;
use crate::panic::PanicError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HookwireError>;

/// Any error surfaced by an application: building, configuring or running it
#[derive(Debug, Error)]
pub enum HookwireError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration errors reported while the application is being built
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Constructor for {name} failed: {source:#}")]
    ConstructorFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{type_name} is provided more than once")]
    DuplicateProvider { type_name: String },

    #[error("Duplicate key {key:?} in value group {group:?}")]
    DuplicateGroupKey { group: String, key: String },

    #[error("Value group {group:?} cannot be consumed before every producer has run")]
    GroupNotReady { group: String },

    #[error(
        "Decorator {origin} changed the keys of value group {group:?} (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    DecoratorKeyMismatch {
        group: String,
        origin: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Decorator {origin} for value group {group:?} failed: {source:#}")]
    DecoratorFailed {
        group: String,
        origin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Panic recovery can only be enabled for the whole application, not in module {scope:?}")]
    PanicBoundaryNotTopLevel { scope: String },

    #[error(transparent)]
    Panicked(#[from] PanicError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
