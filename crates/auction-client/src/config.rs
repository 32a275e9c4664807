//! Engine configuration: backend location, polling cadence, reveal policy.

use std::{env, fs, io::ErrorKind, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Default backend base URL (all endpoint paths are appended to it).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081/api";
/// How often the leading bid is polled while the auction is live.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// How long the reveal (spin) plays before the winner is fetched.
pub const DEFAULT_REVEAL_DURATION: Duration = Duration::from_millis(4_500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "AUCTION_CLIENT_CONFIG";

/// Runtime configuration for one auction engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub reveal_duration: Duration,
    pub request_timeout: Duration,
    /// Periodic remaining-time refresh while live. `None` disables it.
    pub resync_interval: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reveal_duration: DEFAULT_REVEAL_DURATION,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resync_interval: None,
        }
    }
}

impl ClientConfig {
    /// Load the configuration from disk, falling back to built-in defaults
    /// when the file is missing or unusable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match Self::load_from(&path) {
            Ok(config) => {
                info!(path = %path.display(), base_url = %config.base_url, "loaded client config");
                config
            }
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found; using built-in defaults");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Load and validate a JSON config file. Absent fields keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let raw: RawConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from(raw);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "poll_interval",
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "request_timeout",
            });
        }
        if self.resync_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroInterval {
                field: "resync_interval",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    base_url: Option<String>,
    poll_interval_ms: Option<u64>,
    reveal_duration_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    resync_interval_ms: Option<u64>,
}

impl From<RawConfig> for ClientConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            base_url: raw
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            poll_interval: raw
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            reveal_duration: raw
                .reveal_duration_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reveal_duration),
            request_timeout: raw
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            resync_interval: raw.resync_interval_ms.map(Duration::from_millis),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("auction-client-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.reveal_duration, Duration::from_millis(4_500));
        assert_eq!(config.resync_interval, None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let path = write_temp(
            "partial.json",
            r#"{"base_url":"http://auction.test/api/","poll_interval_ms":1500}"#,
        );
        let config = ClientConfig::load_from(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.base_url, "http://auction.test/api");
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.reveal_duration, DEFAULT_REVEAL_DURATION);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let path = write_temp("zero.json", r#"{"poll_interval_ms":0}"#);
        let err = ClientConfig::load_from(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(
            err,
            ConfigError::ZeroInterval {
                field: "poll_interval"
            }
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let path = write_temp("bad.json", "{ not json");
        let err = ClientConfig::load_from(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn base_url_scheme_is_checked() {
        let config = ClientConfig {
            base_url: "localhost:8081".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }
}
