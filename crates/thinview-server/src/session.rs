//! Persisted session identifier
//!
//! The client id handed out by `applicationMetaData` survives restarts in a
//! small TOML file so the next startup resumes the same server session.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use thinview_core::prelude::*;

const SESSION_FILENAME: &str = "session.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `session.toml` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILENAME))
    }

    /// Per-user default under the platform data directory.
    pub fn default_location() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(&base.join("thinview"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored client id. A missing file is no session; a corrupt one is
    /// ignored with a warning.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        match toml::from_str::<SessionData>(&content) {
            Ok(data) => Ok(data.client_id.filter(|id| !id.is_empty())),
            Err(e) => {
                warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, client_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = SessionData {
            client_id: Some(client_id.to_string()),
        };
        let content = toml::to_string(&data)
            .map_err(|e| Error::config(format!("cannot encode session: {}", e)))?;
        std::fs::write(&self.path, content)?;
        debug!("Saved client id to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
