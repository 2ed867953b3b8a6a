use crate::lifecycle::LateAppendPolicy;
use dashmap::DashMap;
use std::env;
use std::ffi::OsString;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const START_TIMEOUT_KEY: &str = "HOOKWIRE_START_TIMEOUT_MS";
pub const STOP_TIMEOUT_KEY: &str = "HOOKWIRE_STOP_TIMEOUT_MS";
pub const LATE_APPEND_KEY: &str = "HOOKWIRE_LATE_APPEND";
pub const RECOVER_FROM_PANICS_KEY: &str = "HOOKWIRE_RECOVER_FROM_PANICS";

/// Default budget for `start` and for `stop` when driven by [`App::run`](crate::App::run)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
#[error("Invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// A service seeded with the process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars_os())
    }

    fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let service = Self::default();
        for (key, value) in vars {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => service.set(&key, &value),
                (key, _) => tracing::warn!("Skipping non UTF-8 environment variable {:?}", key),
            }
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse a value, or `None` if the key is unset
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| ConfigError {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// A duration given in whole milliseconds
    pub fn duration_ms(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        Ok(self.parse::<u64>(key)?.map(Duration::from_millis))
    }
}

/// Application-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Budget for the start phase in [`App::run`](crate::App::run)
    pub start_timeout: Duration,
    /// Budget for the stop phase in [`App::run`](crate::App::run) and shutdown handlers
    pub stop_timeout: Duration,
    /// What happens to hooks appended after start
    pub late_append: LateAppendPolicy,
    /// Recover panics at every invocation point
    pub recover_from_panics: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_TIMEOUT,
            stop_timeout: DEFAULT_TIMEOUT,
            late_append: LateAppendPolicy::Reject,
            recover_from_panics: false,
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_service(&ConfigService::from_env())
    }

    /// Read settings from `service`, falling back to defaults for unset keys
    pub fn from_service(service: &ConfigService) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            start_timeout: service
                .duration_ms(START_TIMEOUT_KEY)?
                .unwrap_or(defaults.start_timeout),
            stop_timeout: service
                .duration_ms(STOP_TIMEOUT_KEY)?
                .unwrap_or(defaults.stop_timeout),
            late_append: service
                .parse(LATE_APPEND_KEY)?
                .unwrap_or(defaults.late_append),
            recover_from_panics: service
                .parse(RECOVER_FROM_PANICS_KEY)?
                .unwrap_or(defaults.recover_from_panics),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_service(&ConfigService::default()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.start_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_reads_every_key() {
        let service = ConfigService::default();
        service.set(START_TIMEOUT_KEY, "2500");
        service.set(STOP_TIMEOUT_KEY, " 100 ");
        service.set(LATE_APPEND_KEY, "ignore");
        service.set(RECOVER_FROM_PANICS_KEY, "true");

        let config = AppConfig::from_service(&service).unwrap();
        assert_eq!(config.start_timeout, Duration::from_millis(2500));
        assert_eq!(config.stop_timeout, Duration::from_millis(100));
        assert_eq!(config.late_append, LateAppendPolicy::Ignore);
        assert!(config.recover_from_panics);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let service = ConfigService::from_vars(vec![
            (OsString::from(STOP_TIMEOUT_KEY), OsString::from("250")),
            (OsString::from("BROKEN"), OsString::from_vec(vec![0x66, 0xff, 0x6f])),
            (OsString::from_vec(vec![0xfe]), OsString::from("x")),
        ]);
        assert_eq!(service.get("BROKEN"), None);
        let config = AppConfig::from_service(&service).unwrap();
        assert_eq!(config.stop_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        let service = ConfigService::from_env();
        assert_eq!(service.get("PATH"), env::var("PATH").ok());
    }

    #[test]
    fn test_invalid_value_names_the_key() {
        let service = ConfigService::default();
        service.set(STOP_TIMEOUT_KEY, "soon");
        let err = AppConfig::from_service(&service).unwrap_err();
        assert_eq!(err.key, STOP_TIMEOUT_KEY);
        assert_eq!(err.value, "soon");
    }
}
