use std::path::PathBuf;

use serde::Deserialize;

/// Daemon configuration loaded from JSON, with CLI overrides on top.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network id bound into signature bases.
    pub network_id: String,
    /// Path of the digest store database file.
    pub store_path: PathBuf,
    /// Cache backend URI: `memory://`, `memcached://host:port`, `dummy://`.
    pub cache_uri: String,
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            network_id: "vista".into(),
            store_path: PathBuf::from("vista-digest.db"),
            cache_uri: "memory://".into(),
            host: "127.0.0.1".into(),
            port: 54320,
            enable_cors: false,
        }
    }
}

impl Config {
    /// Load config from a JSON file, or fall back to defaults.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, String> {
        let config = match path {
            Some(path) => {
                let data = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read config '{}': {e}", path.display()))?;
                serde_json::from_str(&data).map_err(|e| format!("invalid config JSON: {e}"))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.network_id.is_empty() {
            return Err("network_id must not be empty".into());
        }
        if self.host.is_empty() {
            return Err("host must not be empty".into());
        }
        Ok(())
    }
}
