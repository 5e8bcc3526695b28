//! Panel settings persistence
//!
//! Settings the panel surface can read and write (backend host, model
//! selection). Persistence goes through the [`SettingsStore`] trait so the
//! panel host never depends on a concrete store; the provided
//! [`FileSettingsStore`] keeps a single JSON document in the user's config
//! directory.

use crate::error::{RaglineError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings exposed to the panel surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSettings {
    /// Backend base URL
    #[serde(default = "default_rag_host")]
    pub rag_host: String,

    /// Generation model selected by the user, when the backend offers a choice
    #[serde(default)]
    pub selected_model: Option<String>,

    /// Models the settings form offers for selection
    #[serde(default)]
    pub available_models: Vec<String>,
}

fn default_rag_host() -> String {
    "http://localhost:8000".to_string()
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            rag_host: default_rag_host(),
            selected_model: None,
            available_models: Vec::new(),
        }
    }
}

/// Key-value persistence for panel settings
///
/// The store itself is an external collaborator; only this interface is
/// part of the panel host.
pub trait SettingsStore: Send + Sync {
    /// Load the current settings, falling back to defaults when none exist
    fn load(&self) -> Result<PanelSettings>;

    /// Persist the given settings
    fn save(&self, settings: &PanelSettings) -> Result<()>;
}

/// File-backed settings store
///
/// # Examples
///
/// ```
/// use ragline::settings::{FileSettingsStore, PanelSettings, SettingsStore};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = FileSettingsStore::new(dir.path().join("settings.json"));
/// let mut settings = store.load().unwrap();
/// settings.rag_host = "http://localhost:9000".to_string();
/// store.save(&settings).unwrap();
/// assert_eq!(store.load().unwrap().rag_host, "http://localhost:9000");
/// ```
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Create a store backed by the given file path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the default per-user location
    ///
    /// Honors the `RAGLINE_SETTINGS_PATH` environment variable as an
    /// override, which keeps tests and alternate profiles away from the
    /// user's real settings file.
    pub fn default_location() -> Result<Self> {
        if let Ok(override_path) = std::env::var("RAGLINE_SETTINGS_PATH") {
            return Ok(Self::new(override_path));
        }

        let proj_dirs = ProjectDirs::from("com", "xbcsmith", "ragline").ok_or_else(|| {
            RaglineError::Settings("could not determine config directory".into())
        })?;
        Ok(Self::new(proj_dirs.config_dir().join("settings.json")))
    }

    /// Path of the backing file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<PanelSettings> {
        if !self.path.exists() {
            return Ok(PanelSettings::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| RaglineError::Settings(format!("failed to read settings: {}", e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| RaglineError::Settings(format!("failed to parse settings: {}", e)).into())
    }

    fn save(&self, settings: &PanelSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RaglineError::Settings(format!("failed to create settings directory: {}", e))
            })?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, contents)
            .map_err(|e| RaglineError::Settings(format!("failed to write settings: {}", e)).into())
    }
}
