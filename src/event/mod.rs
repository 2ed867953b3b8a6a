//! Event Sink
//!
//! Structured notifications emitted while an application is built, started
//! and stopped. Sinks are fire-and-forget: the core never waits on or reacts
//! to what a sink does with an event, so [`NopSink`] is always a valid choice.

mod sinks;

pub use sinks::{JsonLinesSink, RecordingSink, TracingSink};

use serde::Serialize;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumDiscriminants};

/// A single notification
#[derive(Debug, Clone, PartialEq, Serialize, EnumDiscriminants)]
#[serde(tag = "event", rename_all = "snake_case")]
#[strum_discriminants(name(EventKind), derive(Display, AsRefStr, Hash), vis(pub))]
pub enum Event {
    /// A singleton constructor ran
    Provided {
        name: String,
        origin: String,
        error: Option<String>,
    },
    /// A value-group member was produced
    Supplied {
        group: String,
        key: String,
        origin: String,
        error: Option<String>,
    },
    /// A decorator was applied to a value group
    Decorated {
        group: String,
        origin: String,
        error: Option<String>,
    },
    /// A consumer ran
    Invoked {
        name: String,
        origin: String,
        error: Option<String>,
    },
    /// A hook's `on_start` is about to run
    HookStartExecuting {
        index: usize,
        hook: String,
        origin: String,
        caller: String,
    },
    /// A hook's `on_start` returned
    HookStartExecuted {
        index: usize,
        hook: String,
        runtime: Duration,
        error: Option<String>,
    },
    /// A hook's `on_stop` is about to run
    HookStopExecuting {
        index: usize,
        hook: String,
        origin: String,
        caller: String,
    },
    /// A hook's `on_stop` returned
    HookStopExecuted {
        index: usize,
        hook: String,
        runtime: Duration,
        error: Option<String>,
    },
    /// The start phase finished
    Started { error: Option<String> },
    /// The stop phase finished
    Stopped { error: Option<String> },
    /// The panic boundary turned a panic into an error
    PanicRecovered { origin: String, payload: String },
}

impl Event {
    /// The discriminant of this event
    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }

    /// The error carried by this event, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Event::Provided { error, .. }
            | Event::Supplied { error, .. }
            | Event::Decorated { error, .. }
            | Event::Invoked { error, .. }
            | Event::HookStartExecuted { error, .. }
            | Event::HookStopExecuted { error, .. }
            | Event::Started { error }
            | Event::Stopped { error } => error.as_deref(),
            Event::PanicRecovered { payload, .. } => Some(payload),
            Event::HookStartExecuting { .. } | Event::HookStopExecuting { .. } => None,
        }
    }
}

/// Receives events from the builder and the lifecycle manager
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn notify(&self, event: &Event);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NopSink;

impl EventSink for NopSink {
    fn notify(&self, _event: &Event) {}
}

/// Renders an error chain on one line for event payloads
pub(crate) fn error_text(error: &anyhow::Error) -> String {
    format!("{error:#}")
}
