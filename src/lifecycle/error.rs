//! Lifecycle-specific error types

use super::LifecycleState;
use thiserror::Error;

/// Errors that can occur during lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// An operation was attempted in a state that does not allow it
    #[error("cannot {operation} while the lifecycle is {state}")]
    InvalidState {
        /// The rejected operation (`append`, `start` or `stop`)
        operation: &'static str,
        /// The state at the time of the call
        state: LifecycleState,
    },

    /// An `on_start` action returned an error; later hooks were not started
    #[error("hook #{index} ({hook}) failed to start: {source:#}")]
    StartFailed {
        /// Position of the hook in registration order
        index: usize,
        /// Display name of the hook
        hook: String,
        /// The hook's error
        #[source]
        source: anyhow::Error,
    },

    /// The context was done before the hook at `index` could be started
    #[error("start cancelled before hook #{index} ({hook})")]
    StartCancelled {
        /// Position of the first hook that was not invoked
        index: usize,
        /// Display name of that hook
        hook: String,
    },

    /// One or more `on_stop` actions failed; every started hook was still stopped
    #[error("{} hook(s) failed to stop: {}", .failures.len(), join_failures(.failures))]
    StopFailed {
        /// Every failure, in the order the hooks were stopped
        failures: Vec<HookFailure>,
    },
}

impl LifecycleError {
    /// Create an invalid state error
    pub fn invalid_state(operation: &'static str, state: LifecycleState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Position of the hook this error is about, for start errors
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::StartFailed { index, .. } | Self::StartCancelled { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Individual stop failures; empty for every other variant
    pub fn failures(&self) -> &[HookFailure] {
        match self {
            Self::StopFailed { failures } => failures,
            _ => &[],
        }
    }
}

/// One failed `on_stop` action
#[derive(Debug, Error)]
#[error("hook #{index} ({hook}): {source:#}")]
pub struct HookFailure {
    /// Position of the hook in registration order
    pub index: usize,
    /// Display name of the hook
    pub hook: String,
    /// The hook's error
    #[source]
    pub source: anyhow::Error,
}

fn join_failures(failures: &[HookFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
