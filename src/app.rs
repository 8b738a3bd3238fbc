use directories::BaseDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::normalize_url;

pub const DEFAULT_MEETING_BASE_URL: &str = "https://meet.jit.si";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub base_url: String,
    pub token: Option<String>,
    pub user_id: String,
    pub user_name: String,
    /// Live event socket. Live updates are off when unset.
    pub ws_url: Option<String>,
    pub meeting_base_url: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            user_id: String::new(),
            user_name: String::new(),
            ws_url: None,
            meeting_base_url: DEFAULT_MEETING_BASE_URL.to_string(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // TOML is the current format; a JSON file written by older builds is migrated on first load.
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("pitchlink.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = directories::ProjectDirs::from("io", "pitchlink", "Pitchlink")?;
        Some(proj.config_dir().join("state.json"))
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.user_id.is_empty()
    }

    pub fn load() -> Self {
        if let Some(path) = Self::toml_path() {
            match Self::load_from(&path) {
                Ok(state) => return state,
                Err(e) => debug!("No usable config at {}: {}", path.display(), e),
            }
        }

        if let Some(legacy) = Self::legacy_json_path() {
            if let Ok(bytes) = fs::read(&legacy) {
                match serde_json::from_slice::<AppState>(&bytes) {
                    Ok(state) => {
                        let state = state.normalized();
                        if let Err(e) = state.save() {
                            warn!("Could not migrate legacy config: {}", e);
                        }
                        return state;
                    }
                    Err(e) => warn!("Ignoring unreadable legacy config {}: {}", legacy.display(), e),
                }
            }
        }

        Self::new()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let state = toml::from_str::<AppState>(&text).map_err(|e| Error::Config(e.to_string()))?;
        Ok(state.normalized())
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::toml_path().ok_or_else(|| Error::Config("No config dir".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, toml)?;
        Ok(())
    }

    fn normalized(mut self) -> Self {
        if !self.base_url.is_empty() {
            self.base_url = normalize_url(&self.base_url);
        }
        if self.meeting_base_url.trim().is_empty() {
            self.meeting_base_url = DEFAULT_MEETING_BASE_URL.to_string();
        }
        self
    }
}
