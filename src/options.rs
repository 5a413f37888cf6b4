use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{RequestError, Result};

const TIMEOUT_ENV: &str = "REPLAY_HTTP_TIMEOUT_MS";
const RETRIES_ENV: &str = "REPLAY_HTTP_RETRIES";

/// Configures per-attempt timeout and retry count.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Number of retries after the initial attempt.
    pub retries: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 0,
        }
    }
}

impl RequestOptions {
    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total attempts allowed: the initial call plus every retry.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Reads options from the environment.
    ///
    /// Reads:
    /// - `REPLAY_HTTP_TIMEOUT_MS` — per-attempt timeout in milliseconds
    /// - `REPLAY_HTTP_RETRIES` — retries after the first attempt
    ///
    /// Unset or empty variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(value) = non_empty(lookup(TIMEOUT_ENV)) {
            options.timeout_ms = value.parse().map_err(|err| {
                RequestError::Config(format!("{TIMEOUT_ENV}={value:?}: {err}"))
            })?;
        }
        if let Some(value) = non_empty(lookup(RETRIES_ENV)) {
            options.retries = value.parse().map_err(|err| {
                RequestError::Config(format!("{RETRIES_ENV}={value:?}: {err}"))
            })?;
        }
        Ok(options)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::RequestOptions;
    use crate::RequestError;

    #[test]
    fn zero_retries_means_one_attempt() {
        let options = RequestOptions::default();
        assert_eq!(options.retries, 0);
        assert_eq!(options.attempts(), 1);
    }

    #[test]
    fn attempts_saturate_at_max() {
        let options = RequestOptions {
            timeout_ms: 1,
            retries: u32::MAX,
        };
        assert_eq!(options.attempts(), u32::MAX);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let options = RequestOptions::from_lookup(|key| match key {
            "REPLAY_HTTP_TIMEOUT_MS" => Some("2500".to_owned()),
            "REPLAY_HTTP_RETRIES" => Some(" 3 ".to_owned()),
            _ => None,
        })
        .expect("valid values must parse");

        assert_eq!(options.timeout_ms, 2_500);
        assert_eq!(options.retries, 3);
    }

    #[test]
    fn empty_lookup_keeps_defaults() {
        let options = RequestOptions::from_lookup(|_| Some(String::new()))
            .expect("empty values must be ignored");
        assert_eq!(options, RequestOptions::default());
    }

    #[test]
    fn unparsable_retries_is_config_error() {
        let err = RequestOptions::from_lookup(|key| {
            (key == "REPLAY_HTTP_RETRIES").then(|| "many".to_owned())
        })
        .expect_err("non-numeric retries must fail");
        assert!(matches!(err, RequestError::Config(message) if message.contains("REPLAY_HTTP_RETRIES")));
    }

    #[test]
    fn deserializes_partial_config() {
        let options: RequestOptions =
            serde_json::from_str(r#"{"retries": 2}"#).expect("partial config must parse");
        assert_eq!(options.retries, 2);
        assert_eq!(options.timeout_ms, 30_000);
    }
}
