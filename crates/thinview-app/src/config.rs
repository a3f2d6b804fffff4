//! Settings parser for .thinview/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thinview_core::prelude::*;
use url::Url;

const CONFIG_FILENAME: &str = "config.toml";
const THINVIEW_DIR: &str = ".thinview";

const DEFAULT_CONFIG: &str = r#"# thinview configuration

[server]
base_url = "http://localhost:8080/services/api/"
request_timeout_ms = 10000
application_name = "demo"

[layout]
# max_auto_size_iterations = 100

[session]
persist_client_id = true
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub layout: LayoutSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub application_name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/services/api/".to_string(),
            request_timeout_ms: 10_000,
            application_name: "demo".to_string(),
        }
    }
}

impl ServerSettings {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::config_invalid(format!("base_url {:?}: {}", self.base_url, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Bound on FormLayout auto-size iterations, unbounded when unset.
    pub max_auto_size_iterations: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    #[serde(default = "default_true")]
    pub persist_client_id: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persist_client_id: true,
        }
    }
}

fn default_true() -> bool {
    true
}

pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(THINVIEW_DIR).join(CONFIG_FILENAME)
}

/// Load settings from `.thinview/config.toml`.
///
/// A missing, unreadable or invalid file yields the defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = config_path(project_path);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.thinview/config.toml` with commented defaults unless it exists.
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let thinview_dir = project_path.join(THINVIEW_DIR);
    std::fs::create_dir_all(&thinview_dir)
        .map_err(|e| Error::config(format!("Failed to create .thinview dir: {}", e)))?;

    let config_path = thinview_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        debug!("Created default config at {:?}", config_path);
    }
    Ok(())
}
