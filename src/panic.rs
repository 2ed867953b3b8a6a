//! Panic boundary
//!
//! Converts a panic raised by a constructor, decorator or hook action into a
//! [`PanicError`] that travels the ordinary error path. The boundary can only
//! be switched on for a whole application (see
//! [`AppBuilder::recover_from_panics`](crate::app::AppBuilder::recover_from_panics));
//! while it is off, panics unwind as usual.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// A panic recovered at an invocation point
#[derive(Debug, Clone, Error)]
#[error("panic in {origin}: {payload}")]
pub struct PanicError {
    /// Fully-qualified name of the function that panicked
    pub origin: String,
    /// The panic message, or a placeholder for non-string payloads
    pub payload: String,
}

impl PanicError {
    /// Build a record from a raw unwind payload
    pub fn new(origin: impl Into<String>, payload: Box<dyn Any + Send>) -> Self {
        Self {
            origin: origin.into(),
            payload: payload_message(payload.as_ref()),
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Whether panics at invocation points are recovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanicBoundary {
    enabled: bool,
}

impl PanicBoundary {
    /// A boundary that recovers panics
    pub const fn enabled() -> Self {
        Self { enabled: true }
    }

    /// A boundary that lets panics unwind
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Returns true if panics are being recovered
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Invoke `f`, recovering a panic when the boundary is enabled
    pub fn call<T>(&self, origin: &str, f: impl FnOnce() -> T) -> Result<T, PanicError> {
        if !self.enabled {
            return Ok(f());
        }
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| recovered(origin, payload))
    }

    /// Drive `future` to completion, recovering a panic when the boundary is enabled
    pub async fn call_async<F: Future>(
        &self,
        origin: &str,
        future: F,
    ) -> Result<F::Output, PanicError> {
        if !self.enabled {
            return Ok(future.await);
        }
        AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .map_err(|payload| recovered(origin, payload))
    }
}

fn recovered(origin: &str, payload: Box<dyn Any + Send>) -> PanicError {
    let error = PanicError::new(origin, payload);
    tracing::error!(origin = %error.origin, payload = %error.payload, "Recovered from panic");
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explode() -> u32 {
        panic!("boom")
    }

    #[test]
    fn test_enabled_boundary_recovers_str_payload() {
        let err = PanicBoundary::enabled().call("explode", explode).unwrap_err();
        assert_eq!(err.origin, "explode");
        assert_eq!(err.payload, "boom");
        assert_eq!(err.to_string(), "panic in explode: boom");
    }

    #[test]
    fn test_formatted_payload() {
        let err = PanicBoundary::enabled()
            .call("fmt", || -> u32 { panic!("bad value {}", 7) })
            .unwrap_err();
        assert_eq!(err.payload, "bad value 7");
    }

    #[test]
    fn test_non_string_payload() {
        let err = PanicBoundary::enabled()
            .call("any", || -> u32 { std::panic::panic_any(42_u8) })
            .unwrap_err();
        assert_eq!(err.payload, "Box<dyn Any>");
    }

    #[test]
    fn test_passes_values_through() {
        assert_eq!(PanicBoundary::enabled().call("ok", || 5).unwrap(), 5);
        assert_eq!(PanicBoundary::disabled().call("ok", || 5).unwrap(), 5);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_disabled_boundary_unwinds() {
        let _ = PanicBoundary::disabled().call("explode", explode);
    }

    #[tokio::test]
    async fn test_async_recovery() {
        let err = PanicBoundary::enabled()
            .call_async("task", async {
                tokio::task::yield_now().await;
                if true {
                    panic!("async boom");
                }
                7_u32
            })
            .await
            .unwrap_err();
        assert_eq!(err.payload, "async boom");
        assert_eq!(err.origin, "task");
    }
}
