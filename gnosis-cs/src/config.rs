//! Service configuration for gnosis-cs
//!
//! Settings come from the TOML file (`[server]`, `[engine]`, `[file_store]`)
//! and are then overridden by environment variables. The CLI `--port` flag is
//! applied last by `main`.

use gnosis_common::config::load_toml_config;
use gnosis_common::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::file_store::DEFAULT_REMOTE_ROOT;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub engine: EngineSettings,
    pub file_store: FileStoreSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// External analytics engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
}

impl EngineSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENGINE_URL.to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileStoreSettings {
    /// Remote path prefix for images and datasets
    pub root: String,
    /// Local directory backing the store; `<root folder>/store` when unset
    pub local_dir: Option<PathBuf>,
    /// Use an SFTP server instead of a local directory
    pub sftp: Option<SftpSettings>,
}

impl Default for FileStoreSettings {
    fn default() -> Self {
        Self {
            root: DEFAULT_REMOTE_ROOT.to_string(),
            local_dir: None,
            sftp: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SftpSettings {
    pub host: String,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
}

fn default_sftp_port() -> u16 {
    22
}

impl ServiceConfig {
    /// Load from TOML (missing file means defaults), then apply environment overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config: ServiceConfig = load_toml_config(config_file)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// `GNOSIS_PORT`, `GNOSIS_ENGINE_URL` (or `FACE_ANALYTICS_SERVER` +
    /// `FACE_ANALYTICS_PORT`), `GNOSIS_STORE_ROOT`, `GNOSIS_STORE_DIR`
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_var("GNOSIS_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid GNOSIS_PORT"),
            }
        }

        if let Some(url) = env_var("GNOSIS_ENGINE_URL") {
            self.engine.base_url = url;
        } else if let Some(server) = env_var("FACE_ANALYTICS_SERVER") {
            self.engine.base_url = match env_var("FACE_ANALYTICS_PORT") {
                Some(port) => format!("http://{}:{}", server, port),
                None => format!("http://{}", server),
            };
        }

        if let Some(root) = env_var("GNOSIS_STORE_ROOT") {
            self.file_store.root = root;
        }
        if let Some(dir) = env_var("GNOSIS_STORE_DIR") {
            self.file_store.local_dir = Some(PathBuf::from(dir));
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
