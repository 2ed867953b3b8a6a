use super::{Event, EventKind, EventSink};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Forwards every event to `tracing`
///
/// Failures are logged at `error`, "about to run" events at `debug`, and
/// everything else at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, event: &Event) {
        let kind = event.kind();
        match event {
            Event::HookStartExecuting { index, hook, caller, .. }
            | Event::HookStopExecuting { index, hook, caller, .. } => {
                tracing::debug!(%kind, index, hook = %hook, caller = %caller, "hook executing");
            }
            Event::HookStartExecuted { index, hook, runtime, .. }
            | Event::HookStopExecuted { index, hook, runtime, .. } => match event.error() {
                Some(error) => {
                    tracing::error!(%kind, index, hook = %hook, ?runtime, error = %error, "hook failed")
                }
                None => tracing::info!(%kind, index, hook = %hook, ?runtime, "hook executed"),
            },
            _ => match event.error() {
                Some(error) => tracing::error!(%kind, error = %error, ?event, "lifecycle event"),
                None => tracing::info!(%kind, ?event, "lifecycle event"),
            },
        }
    }
}

#[derive(Serialize)]
struct Line<'a> {
    at: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a Event,
}

/// Writes one JSON object per event, stamped with the current UTC time
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn notify(&self, event: &Event) {
        let line = Line {
            at: Utc::now(),
            event,
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let written = serde_json::to_writer(&mut *writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!("Failed to write {} event: {}", event.kind(), e);
        }
    }
}

/// Keeps every event in memory, mostly for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The kinds of everything recorded so far, in order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Event::kind)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.notify(&Event::Started { error: None });
        sink.notify(&Event::Stopped { error: None });
        assert_eq!(sink.kinds(), vec![EventKind::Started, EventKind::Stopped]);
    }

    #[test]
    fn test_json_lines_sink() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.notify(&Event::Started { error: None });
        sink.notify(&Event::Stopped {
            error: Some("cache flush failed".into()),
        });

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "started");
        assert!(lines[0]["at"].is_string());
        assert_eq!(lines[1]["error"], "cache flush failed");
    }

    #[test]
    fn test_tracing_sink_accepts_every_kind() {
        let sink = TracingSink;
        sink.notify(&Event::HookStopExecuted {
            index: 2,
            hook: "db".into(),
            runtime: std::time::Duration::from_millis(3),
            error: Some("timeout".into()),
        });
        sink.notify(&Event::PanicRecovered {
            origin: "app::boom".into(),
            payload: "boom".into(),
        });
    }
}
