//! Process settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::feed::MvgConfig;
use crate::scheduler::SchedulerSettings;

use super::error::ConfigError;

/// Routes file used when `ROUTES_CONFIG` is unset.
pub const DEFAULT_ROUTES_CONFIG: &str = "config/routes.example.json";

/// Settings of the server process.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Path of the routes JSON file.
    pub routes_config: PathBuf,

    /// Global refresh interval: fetch cycle period and default poll period.
    pub refresh_interval: Duration,

    /// Pause between two upstream calls within a fetch cycle.
    pub sleep_between_calls: Duration,

    /// Feed base URL; the client default applies if unset.
    pub feed_base_url: Option<String>,
    pub feed_timeout_secs: u64,
    pub feed_fetch_limit: u16,

    /// Directory of mock boards; when set, no network feed is used.
    pub mock_feed_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            routes_config: PathBuf::from(DEFAULT_ROUTES_CONFIG),
            refresh_interval: Duration::from_secs(30),
            sleep_between_calls: Duration::ZERO,
            feed_base_url: None,
            feed_timeout_secs: 10,
            feed_fetch_limit: 50,
            mock_feed_dir: None,
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset
    /// or empty variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let refresh_secs: u64 = parse_var(&get, "REFRESH_INTERVAL_SECONDS", 30)?;
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidVar {
                name: "REFRESH_INTERVAL_SECONDS",
                value: "0".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_var(&get, "PORT", defaults.port)?,
            routes_config: get("ROUTES_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.routes_config),
            refresh_interval: Duration::from_secs(refresh_secs),
            sleep_between_calls: Duration::from_millis(parse_var(
                &get,
                "SLEEP_MS_BETWEEN_CALLS",
                0,
            )?),
            feed_base_url: get("FEED_BASE_URL"),
            feed_timeout_secs: parse_var(&get, "FEED_TIMEOUT_SECS", defaults.feed_timeout_secs)?,
            feed_fetch_limit: parse_var(&get, "FEED_FETCH_LIMIT", defaults.feed_fetch_limit)?,
            mock_feed_dir: get("MOCK_FEED_DIR").map(PathBuf::from),
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings::new(self.refresh_interval, self.sleep_between_calls)
    }

    pub fn mvg_config(&self) -> MvgConfig {
        let config = MvgConfig::new()
            .with_timeout(self.feed_timeout_secs)
            .with_fetch_limit(self.feed_fetch_limit);
        match &self.feed_base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        }
    }
}

fn parse_var<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::InvalidVar {
                name,
                message: e.to_string(),
                value,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert!(config.mock_feed_dir.is_none());
    }

    #[test]
    fn reads_variables() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("ROUTES_CONFIG", "/etc/departures/routes.json"),
            ("REFRESH_INTERVAL_SECONDS", "15"),
            ("SLEEP_MS_BETWEEN_CALLS", "250"),
            ("FEED_BASE_URL", "http://localhost:8080"),
            ("FEED_FETCH_LIMIT", "30"),
            ("MOCK_FEED_DIR", "data/mock_boards"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.routes_config, PathBuf::from("/etc/departures/routes.json"));
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert_eq!(config.sleep_between_calls, Duration::from_millis(250));
        assert_eq!(config.mock_feed_dir, Some(PathBuf::from("data/mock_boards")));

        let settings = config.scheduler_settings();
        assert_eq!(settings.call_gap, Duration::from_millis(250));

        let mvg = config.mvg_config();
        assert_eq!(mvg.base_url, "http://localhost:8080");
        assert_eq!(mvg.fetch_limit, 30);
        assert_eq!(mvg.timeout_secs, 10);
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", ""), ("MOCK_FEED_DIR", "  ")]).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.mock_feed_dir.is_none());
    }

    #[test]
    fn invalid_number_is_an_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "PORT", .. }));

        let err = config_from(&[("FEED_FETCH_LIMIT", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                name: "FEED_FETCH_LIMIT",
                ..
            }
        ));
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let err = config_from(&[("REFRESH_INTERVAL_SECONDS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                name: "REFRESH_INTERVAL_SECONDS",
                ..
            }
        ));
    }
}
