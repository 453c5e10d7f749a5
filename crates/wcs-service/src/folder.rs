//! Per-folder configuration loading.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;
use url::Url;

use wcs_config::{parse_settings, ConfigurationModel, SchemaRegistry, SettingsTarget};
use wcs_workspace::paths::url_to_path;
use wcs_workspace::SETTINGS_FILE_NAME;

use crate::fs::{FileChangeEvent, FileSystem};

/// Loads and caches the configuration of a single workspace folder.
///
/// One loader exists per folder resource; the service caches them and
/// disposes a loader when its folder leaves the workspace.
pub struct FolderConfigurationLoader {
    folder: Url,
    /// Path of `<folder>/<config dir>/settings.json`; absent for non-file
    /// folder resources, whose contribution is always empty.
    settings_path: Option<PathBuf>,
    target: SettingsTarget,
    fs: Arc<dyn FileSystem>,
    registry: Arc<dyn SchemaRegistry>,
    cached_content: Mutex<Option<String>>,
    model: Mutex<ConfigurationModel>,
}

impl FolderConfigurationLoader {
    #[must_use]
    pub fn new(
        folder: Url,
        config_dir_name: &str,
        target: SettingsTarget,
        fs: Arc<dyn FileSystem>,
        registry: Arc<dyn SchemaRegistry>,
    ) -> Self {
        let settings_path = url_to_path(&folder)
            .map(|root| root.join(config_dir_name).join(SETTINGS_FILE_NAME));
        FolderConfigurationLoader {
            folder,
            settings_path,
            target,
            fs,
            registry,
            cached_content: Mutex::new(None),
            model: Mutex::new(ConfigurationModel::default()),
        }
    }

    #[must_use]
    pub fn folder(&self) -> &Url {
        &self.folder
    }

    /// Read and parse the folder's settings file.
    ///
    /// A missing or malformed file contributes an empty model; loading never
    /// fails for content reasons.
    pub async fn load(&self) -> ConfigurationModel {
        let content = match &self.settings_path {
            Some(path) if self.fs.is_file(path).await => self.fs.read_to_string(path).await.ok(),
            _ => None,
        };
        let model = content
            .as_deref()
            .map(|c| parse_settings(c, self.target, self.registry.as_ref()))
            .unwrap_or_default();
        *self.cached_content.lock().expect("loader lock poisoned") = content;
        *self.model.lock().expect("loader lock poisoned") = model.clone();
        debug!(folder = %self.folder, keys = model.keys().len(), "loaded folder configuration");
        model
    }

    /// React to file change notifications.
    ///
    /// Returns a recomputed model only when an event touches this folder's
    /// settings scope; `None` tells the caller to skip the reload entirely.
    pub async fn handle_file_change_event(
        &self,
        events: &[FileChangeEvent],
    ) -> Option<ConfigurationModel> {
        let config_dir = self.settings_path.as_ref()?.parent()?;
        if events.iter().any(|event| event.path.starts_with(config_dir)) {
            Some(self.load().await)
        } else {
            None
        }
    }

    /// Recompute the model from cached raw content against the current
    /// schema set. Used when the registry changes, not the files.
    pub fn reprocess(&self) -> ConfigurationModel {
        let content = self
            .cached_content
            .lock()
            .expect("loader lock poisoned")
            .clone();
        let model = content
            .as_deref()
            .map(|c| parse_settings(c, self.target, self.registry.as_ref()))
            .unwrap_or_default();
        *self.model.lock().expect("loader lock poisoned") = model.clone();
        model
    }

    /// The most recently computed model.
    #[must_use]
    pub fn model(&self) -> ConfigurationModel {
        self.model.lock().expect("loader lock poisoned").clone()
    }

    #[must_use]
    pub fn unsupported_keys(&self) -> Vec<String> {
        self.model().unsupported_keys().to_vec()
    }
}
