//! Client configuration.
//!
//! Values come from environment variables, falling back to defaults. The
//! world size can also be taken from the page's globals blob
//! (`{"WorldSize": 512}`), which the server renders alongside the viewer;
//! when both are given the globals win.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_SERVER_URL: &str = "CONWAYMORE_SERVER_URL";
pub const ENV_WORLD_SIZE: &str = "CONWAYMORE_WORLD_SIZE";
pub const ENV_FRAME_INTERVAL_MS: &str = "CONWAYMORE_FRAME_INTERVAL_MS";
pub const ENV_READ_LIMIT: &str = "CONWAYMORE_READ_LIMIT";
/// Globals JSON blob, applied with [`ClientConfig::with_globals`].
pub const ENV_GLOBALS: &str = "CONWAYMORE_GLOBALS";

/// Runtime settings for the worker and its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint streaming snapshots.
    pub server_url: String,
    /// Cells per world axis. Sizes the cell buffer.
    pub world_size: u16,
    /// Interval between display frames; redraws are coalesced to it.
    pub frame_interval: Duration,
    /// Largest inbound frame accepted, in bytes.
    pub read_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080/play".to_owned(),
            world_size: 512,
            frame_interval: Duration::from_millis(16),
            read_limit: 1 << 25,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Globals {
    #[serde(rename = "WorldSize")]
    world_size: u16,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SERVER_URL) {
            config.server_url = url;
        }
        if let Some(size) = parse_var(&lookup, ENV_WORLD_SIZE)? {
            config.world_size = size;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_FRAME_INTERVAL_MS)? {
            config.frame_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(limit) = parse_var(&lookup, ENV_READ_LIMIT)? {
            config.read_limit = limit;
        }
        if let Some(globals) = lookup(ENV_GLOBALS) {
            config = config.with_globals(&globals)?;
        }

        if config.world_size == 0 {
            return Err(ConfigError::InvalidVar {
                name: ENV_WORLD_SIZE,
                value: "0".to_owned(),
            });
        }
        Ok(config)
    }

    /// Override the world size from a globals JSON blob.
    pub fn with_globals(mut self, json: &str) -> Result<Self, ConfigError> {
        let globals: Globals = serde_json::from_str(json)?;
        self.world_size = globals.world_size;
        Ok(self)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, (*v).to_owned())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_SERVER_URL, "ws://example.test/play"),
            (ENV_WORLD_SIZE, "64"),
            (ENV_FRAME_INTERVAL_MS, "33"),
        ]))
        .unwrap();

        assert_eq!(config.server_url, "ws://example.test/play");
        assert_eq!(config.world_size, 64);
        assert_eq!(config.frame_interval, Duration::from_millis(33));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_WORLD_SIZE, "huge")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar { name: ENV_WORLD_SIZE, ref value } if value == "huge"
        ));
        assert!(ClientConfig::from_lookup(lookup(&[(ENV_WORLD_SIZE, "0")])).is_err());
    }

    #[test]
    fn globals_variable_wins_over_world_size() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_WORLD_SIZE, "64"),
            (ENV_GLOBALS, r#"{"WorldSize": 256}"#),
        ]))
        .unwrap();
        assert_eq!(config.world_size, 256);
    }

    #[test]
    fn globals_set_the_world_size() {
        let config = ClientConfig::default()
            .with_globals(r#"{"WorldSize": 128}"#)
            .unwrap();
        assert_eq!(config.world_size, 128);

        assert!(matches!(
            ClientConfig::default().with_globals("{}"),
            Err(ConfigError::Globals(_))
        ));
    }
}
