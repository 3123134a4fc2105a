use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "joint-cli";
pub const CONF_FILE: &str = "conf.json";
pub const DEFAULT_HUB: &str = "obyte.org/bb";

/// Overrides the data directory before any file is read
pub const DATA_DIR_ENV: &str = "JOINT_APP_DATA_DIR";

/// Root application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Peer endpoint, `ws://` is assumed when no scheme is given
    pub hub: String,
    pub app_data_dir: PathBuf,
    /// SQLite file, relative to the data directory
    pub database_file: String,
    /// Log file, relative to the data directory
    pub log_file: String,
    /// Environment variable consulted for the passphrase
    pub passphrase_env: String,
    /// Delay between broadcasting a joint and exiting
    pub broadcast_linger_ms: u64,
    /// How long pushed joints are drained before reporting
    pub sync_window_ms: u64,
    pub request_timeout_ms: u64,
    /// Fixed witness list; fetched from the hub when empty
    #[serde(default)]
    pub witnesses: Vec<String>,
    #[serde(default)]
    pub device_name: Option<String>,
}

impl AppConfig {
    /// Load configuration: defaults, then `<data dir>/conf.json`, then `JOINT_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        let app_data_dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_app_data_dir());
        Self::load_from(&app_data_dir)
    }

    pub fn load_from(app_data_dir: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("hub", DEFAULT_HUB)?
            .set_default("app_data_dir", app_data_dir.to_string_lossy().to_string())?
            .set_default("database_file", "joint.sqlite")?
            .set_default("log_file", "log.txt")?
            .set_default("passphrase_env", crate::storage::PASSPHRASE_ENV)?
            .set_default("broadcast_linger_ms", 500)?
            .set_default("sync_window_ms", 100)?
            .set_default("request_timeout_ms", 30_000)?
            .add_source(
                File::from(app_data_dir.join(CONF_FILE))
                    .format(FileFormat::Json)
                    .required(false),
            )
            // e.g. JOINT_HUB, JOINT_BROADCAST_LINGER_MS
            .add_source(
                Environment::with_prefix("JOINT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// WebSocket URL of the hub
    pub fn hub_url(&self) -> String {
        if self.hub.starts_with("ws://") || self.hub.starts_with("wss://") {
            self.hub.clone()
        } else {
            format!("ws://{}", self.hub)
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.app_data_dir.join(&self.database_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.app_data_dir.join(&self.log_file)
    }

    pub fn conf_path(&self) -> PathBuf {
        self.app_data_dir.join(CONF_FILE)
    }

    pub fn broadcast_linger(&self) -> Duration {
        Duration::from_millis(self.broadcast_linger_ms)
    }

    pub fn sync_window(&self) -> Duration {
        Duration::from_millis(self.sync_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Record the device name in conf.json, keeping any other settings
    pub fn save_device_name(&mut self, name: &str) -> anyhow::Result<()> {
        let path = self.conf_path();
        let mut conf = if path.exists() {
            match serde_json::from_str::<Value>(&std::fs::read_to_string(&path)?)? {
                Value::Object(map) => map,
                _ => anyhow::bail!("{} is not a JSON object", path.display()),
            }
        } else {
            Map::new()
        };
        conf.insert("device_name".to_string(), Value::String(name.to_string()));

        std::fs::create_dir_all(&self.app_data_dir)?;
        let mut json = serde_json::to_string_pretty(&Value::Object(conf))?;
        json.push('\n');
        std::fs::write(&path, json)?;

        self.device_name = Some(name.to_string());
        Ok(())
    }
}

/// Per-user data directory of the application
pub fn default_app_data_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.app_data_dir, dir.path());
        assert_eq!(config.passphrase_env, "ENV_PASSPHRASE");
        assert_eq!(config.broadcast_linger(), Duration::from_millis(500));
        assert_eq!(config.sync_window(), Duration::from_millis(100));
        assert_eq!(config.database_path(), dir.path().join("joint.sqlite"));
        assert_eq!(config.log_path(), dir.path().join("log.txt"));
        assert!(config.device_name.is_none());
    }

    #[test]
    fn test_conf_json_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONF_FILE),
            r#"{"hub": "localhost:6611", "sync_window_ms": 2000, "witnesses": ["W1", "W2"]}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.hub_url(), "ws://localhost:6611");
        assert_eq!(config.sync_window_ms, 2000);
        assert_eq!(config.witnesses, vec!["W1", "W2"]);
    }

    #[test]
    fn test_hub_url_keeps_scheme() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::load_from(dir.path()).unwrap();
        config.hub = "wss://obyte.org/bb".to_string();
        assert_eq!(config.hub_url(), "wss://obyte.org/bb");
    }

    #[test]
    fn test_save_device_name_merges() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONF_FILE), r#"{"hub": "localhost:6611"}"#).unwrap();

        let mut config = AppConfig::load_from(dir.path()).unwrap();
        config.save_device_name("node-1").unwrap();

        let reloaded = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.device_name.as_deref(), Some("node-1"));
        assert_eq!(reloaded.hub, "localhost:6611");
    }
}
