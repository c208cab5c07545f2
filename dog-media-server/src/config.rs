//! Server configuration.
//!
//! A plain string key/value store, filled from environment variables:
//!
//! ```bash
//! export DOGMEDIA__HTTP__PORT=8080          # http.port
//! export DOGMEDIA__STORE__ROOT=/srv/videos  # store.root
//! export DOGMEDIA__MEDIA__REQUIRE_RANGE=true
//! ```
//!
//! [`Settings`] reads the keys it knows from a snapshot and fills in
//! defaults for the rest.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use dog_media::{MediaConfig, DEFAULT_CHUNK_SIZE};
use dog_media_axum::DEFAULT_UPLOAD_FIELD;

pub const ENV_PREFIX: &str = "DOGMEDIA__";

#[derive(Debug, Default)]
pub struct ServerConfig {
    values: HashMap<String, String>,
}

impl ServerConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Config populated from the process environment
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(ENV_PREFIX, std::env::vars());
        config
    }

    /// Copy every `prefix`ed variable in, `PREFIX__HTTP__PORT` → `http.port`
    pub fn load_env<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            map: self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> anyhow::Result<Option<u64>> {
        self.parse(key)
    }

    pub fn get_bool(&self, key: &str) -> anyhow::Result<Option<bool>> {
        self.parse(key)
    }

    /// Typed lookup. A present value that does not parse is an error, never
    /// a silent fallback to the default.
    pub fn parse<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(key)
            .map(|raw| raw.trim().parse::<T>().with_context(|| format!("invalid value {raw:?} for {key}")))
            .transpose()
    }
}

/// Typed view of the keys the server understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub store_root: PathBuf,
    pub chunk_size: u64,
    pub require_range: bool,
    pub max_upload_bytes: u64,
    pub stream_idle_timeout: Option<Duration>,
    pub upload_field: String,
}

impl Default for Settings {
    fn default() -> Self {
        let media = MediaConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            store_root: PathBuf::from("./media-store"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            require_range: false,
            max_upload_bytes: media.max_object_bytes,
            stream_idle_timeout: None,
            upload_field: DEFAULT_UPLOAD_FIELD.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_snapshot(&ServerConfig::from_env().snapshot())
    }

    pub fn from_snapshot(config: &ConfigSnapshot) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let chunk_size = config.get_u64("store.chunk_size")?.unwrap_or(defaults.chunk_size);
        if chunk_size == 0 {
            anyhow::bail!("store.chunk_size must be greater than zero");
        }

        Ok(Self {
            host: config.get_string("http.host").unwrap_or(defaults.host),
            port: config.parse("http.port")?.unwrap_or(defaults.port),
            store_root: config.get("store.root").map(PathBuf::from).unwrap_or(defaults.store_root),
            chunk_size,
            require_range: config.get_bool("media.require_range")?.unwrap_or(defaults.require_range),
            max_upload_bytes: config
                .get_u64("media.max_upload_bytes")?
                .unwrap_or(defaults.max_upload_bytes),
            stream_idle_timeout: config
                .get_u64("media.stream_idle_timeout_secs")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            upload_field: config.get_string("media.upload_field").unwrap_or(defaults.upload_field),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn media_config(&self) -> MediaConfig {
        let mut config = MediaConfig::new()
            .with_chunk_size(self.chunk_size)
            .with_max_object_bytes(self.max_upload_bytes);
        if self.require_range {
            config = config.require_range();
        }
        if let Some(timeout) = self.stream_idle_timeout {
            config = config.with_stream_idle_timeout(timeout);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dog_media::MissingRangePolicy;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn env_keys_are_normalized() {
        let mut config = ServerConfig::new();
        config.load_env(
            ENV_PREFIX,
            vars(&[("DOGMEDIA__HTTP__PORT", "8080"), ("DOGMEDIA__STORE__CHUNK_SIZE", "1024"), ("HOME", "/root")]),
        );

        assert_eq!(config.get("http.port"), Some("8080"));
        assert_eq!(config.get("store.chunk_size"), Some("1024"));
        assert!(!config.has("home"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = Settings::from_snapshot(&ServerConfig::new().snapshot()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.addr(), "127.0.0.1:3000");
        assert_eq!(settings.chunk_size, 261120);
        assert_eq!(settings.upload_field, "file");
    }

    #[test]
    fn overrides_flow_into_media_config() {
        let mut config = ServerConfig::new();
        config.set("media.require_range", "true");
        config.set("media.max_upload_bytes", "1000");
        config.set("media.stream_idle_timeout_secs", "30");
        config.set("store.chunk_size", "4096");

        let media = Settings::from_snapshot(&config.snapshot()).unwrap().media_config();
        assert_eq!(media.missing_range, MissingRangePolicy::Require);
        assert_eq!(media.max_object_bytes, 1000);
        assert_eq!(media.chunk_size, 4096);
        assert_eq!(media.stream_idle_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn unparsable_values_are_errors() {
        let mut config = ServerConfig::new();
        config.set("http.port", "eighty");
        assert!(Settings::from_snapshot(&config.snapshot()).is_err());

        let mut config = ServerConfig::new();
        config.set("store.chunk_size", "0");
        assert!(Settings::from_snapshot(&config.snapshot()).is_err());

        let mut config = ServerConfig::new();
        config.set("media.require_range", "yes");
        assert!(Settings::from_snapshot(&config.snapshot()).is_err());
    }

    #[test]
    fn typed_getters_trim_and_reject() {
        let mut config = ServerConfig::new();
        config.set("a", " 42 ");
        config.set("b", "true");
        config.set("c", "-1");
        let snapshot = config.snapshot();

        assert_eq!(snapshot.get_u64("a").unwrap(), Some(42));
        assert_eq!(snapshot.get_bool("b").unwrap(), Some(true));
        assert_eq!(snapshot.get_u64("missing").unwrap(), None);
        assert!(snapshot.get_u64("c").is_err());
    }
}
