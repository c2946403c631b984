use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{APP_DIR_NAME, PREFERENCES_FILE_NAME};
use crate::shared::region::Region;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed preferences in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What survives a restart: `{"roi": [x1, y1, x2, y2] | null, "fullscreen": bool}`.
///
/// Read once at startup and written once at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub roi: Option<Region>,
    #[serde(default)]
    pub fullscreen: bool,
}

impl Preferences {
    /// `<config dir>/roiwatch/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(PREFERENCES_FILE_NAME))
    }

    /// Loads preferences, falling back to defaults when the file is missing
    /// or unreadable. Never fails.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(prefs) => prefs,
            Err(PreferencesError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::debug!("No preferences at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, PreferencesError> {
        let json = fs::read_to_string(path).map_err(|source| PreferencesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| PreferencesError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(PreferencesError::Serialize)?;
        fs::write(path, json).map_err(|source| PreferencesError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
