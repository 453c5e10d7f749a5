//! The multi-folder workspace definition file.
//!
//! A definition file holds an ordered `folders` array (path or uri entries,
//! optional display name) and a `settings` object with workspace-scoped
//! configuration. Folder entries round-trip edits verbatim: entries this
//! service does not understand are carried along, never rewritten.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;
use url::Url;

use wcs_config::{settings_model_from_map, ConfigurationModel, SchemaRegistry, SettingsTarget};
use wcs_workspace::paths::url_to_path;
use wcs_workspace::StoredWorkspaceFolder;

use crate::editing::{ConfigurationEditor, EditError};
use crate::fs::FileSystem;

/// Loads and saves the workspace definition file.
pub struct WorkspaceConfigurationLoader {
    resource: Url,
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    registry: Arc<dyn SchemaRegistry>,
    cached_settings: Mutex<Option<serde_json::Map<String, Value>>>,
    entries: Mutex<Vec<Value>>,
    settings: Mutex<ConfigurationModel>,
}

impl WorkspaceConfigurationLoader {
    /// `resource` must be a file resource; the definition file lives on disk.
    #[must_use]
    pub fn new(
        resource: Url,
        fs: Arc<dyn FileSystem>,
        registry: Arc<dyn SchemaRegistry>,
    ) -> Option<Self> {
        let path = url_to_path(&resource)?;
        Some(WorkspaceConfigurationLoader {
            resource,
            path,
            fs,
            registry,
            cached_settings: Mutex::new(None),
            entries: Mutex::new(Vec::new()),
            settings: Mutex::new(ConfigurationModel::default()),
        })
    }

    #[must_use]
    pub fn resource(&self) -> &Url {
        &self.resource
    }

    /// Directory the definition file lives in; base for relative folder paths.
    #[must_use]
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.path.parent().map(std::path::Path::to_path_buf)
    }

    /// Parse the definition file into the folder list and settings model.
    ///
    /// Malformed content degrades to an empty workspace definition.
    pub async fn load(&self) {
        let content = if self.fs.is_file(&self.path).await {
            self.fs.read_to_string(&self.path).await.ok()
        } else {
            None
        };

        let document: Option<serde_json::Map<String, Value>> = content
            .as_deref()
            .and_then(|text| match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Some(map),
                Ok(_) => {
                    warn!(path = %self.path.display(), "workspace file is not a JSON object");
                    None
                }
                Err(error) => {
                    warn!(path = %self.path.display(), %error, "malformed workspace file");
                    None
                }
            });

        let entries = document
            .as_ref()
            .and_then(|doc| doc.get("folders"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let settings_map = document
            .as_ref()
            .and_then(|doc| doc.get("settings"))
            .and_then(Value::as_object)
            .cloned();
        let settings = settings_map
            .as_ref()
            .map(|map| {
                settings_model_from_map(map, SettingsTarget::Workspace, self.registry.as_ref())
            })
            .unwrap_or_default();

        *self.entries.lock().expect("loader lock poisoned") = entries;
        *self.cached_settings.lock().expect("loader lock poisoned") = settings_map;
        *self.settings.lock().expect("loader lock poisoned") = settings;
    }

    /// Raw folder entries in file order, including entries that failed to
    /// parse as folders.
    #[must_use]
    pub fn raw_entries(&self) -> Vec<Value> {
        self.entries.lock().expect("loader lock poisoned").clone()
    }

    /// The stored folder entries that parse as folders, in file order.
    #[must_use]
    pub fn folders(&self) -> Vec<StoredWorkspaceFolder> {
        self.raw_entries()
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect()
    }

    /// The workspace-scoped configuration model.
    #[must_use]
    pub fn configuration(&self) -> ConfigurationModel {
        self.settings.lock().expect("loader lock poisoned").clone()
    }

    /// Atomically rewrite the folder list through the editing collaborator,
    /// then reload from disk. The in-memory state is untouched if the write
    /// fails.
    pub async fn set_folders(
        &self,
        entries: Vec<Value>,
        editor: &dyn ConfigurationEditor,
    ) -> Result<(), EditError> {
        editor.write_folders(&self.resource, &entries).await?;
        self.load().await;
        Ok(())
    }

    /// Recompute the settings model from cached content against the current
    /// schema set.
    pub fn reprocess_workspace_settings(&self) -> ConfigurationModel {
        let cached = self
            .cached_settings
            .lock()
            .expect("loader lock poisoned")
            .clone();
        let settings = cached
            .as_ref()
            .map(|map| {
                settings_model_from_map(map, SettingsTarget::Workspace, self.registry.as_ref())
            })
            .unwrap_or_default();
        *self.settings.lock().expect("loader lock poisoned") = settings.clone();
        settings
    }
}
