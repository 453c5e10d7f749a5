//! Configuration editing collaborators.
//!
//! Persisted writes never happen inline in the orchestrator: they go through
//! a [`ConfigurationEditor`], and the orchestrator re-reads the affected
//! layer after a successful write. No collaborator is trusted to report its
//! own write's effect.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use wcs_workspace::paths::url_to_path;

use crate::fs::FileSystem;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("failed to access settings file")]
    Io(#[from] std::io::Error),
    #[error("cannot edit settings: {0}")]
    Content(String),
}

/// Where a single-setting write lands.
#[derive(Clone, Debug)]
pub struct SettingsLocation {
    pub resource: Url,
    /// Workspace definition files keep their settings under a `settings`
    /// object next to the folder list; plain settings files are the object.
    pub workspace_settings: bool,
}

/// The key being written, with its optional override identifier.
#[derive(Clone, Debug)]
pub struct SettingKey {
    pub key: String,
    pub override_identifier: Option<String>,
}

impl SettingKey {
    #[must_use]
    pub fn new(key: &str, override_identifier: Option<&str>) -> Self {
        SettingKey {
            key: key.to_string(),
            override_identifier: override_identifier.map(str::to_string),
        }
    }
}

/// External editing service performing on-disk writes.
///
/// Both operations are atomic from the service's point of view: they either
/// persist the whole edit or fail leaving the file as it was. Unrelated file
/// content must be preserved.
#[async_trait::async_trait]
pub trait ConfigurationEditor: Send + Sync {
    /// Set or remove (`value: None`) one setting in the given file.
    async fn write_setting(
        &self,
        location: &SettingsLocation,
        key: &SettingKey,
        value: Option<Value>,
    ) -> Result<(), EditError>;

    /// Replace the folder list of a workspace definition file, preserving
    /// everything else in it. Entries are raw JSON values so that malformed
    /// entries the service merely carried along survive the rewrite.
    async fn write_folders(&self, resource: &Url, folders: &[Value]) -> Result<(), EditError>;
}

/// Default editor: JSON read-modify-write through the [`FileSystem`].
pub struct JsonFileEditor {
    fs: Arc<dyn FileSystem>,
}

impl JsonFileEditor {
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        JsonFileEditor { fs }
    }

    async fn read_document(&self, resource: &Url) -> Result<(std::path::PathBuf, Map<String, Value>), EditError> {
        let path = url_to_path(resource)
            .ok_or_else(|| EditError::Content(format!("not a file resource: {resource}")))?;
        let text = if self.fs.is_file(&path).await {
            self.fs.read_to_string(&path).await?
        } else {
            "{}".to_string()
        };
        let document: Value = serde_json::from_str(&text)
            .map_err(|e| EditError::Content(format!("malformed JSON in {}: {e}", path.display())))?;
        match document {
            Value::Object(map) => Ok((path, map)),
            _ => Err(EditError::Content(format!(
                "{} is not a JSON object",
                path.display()
            ))),
        }
    }

    async fn write_document(
        &self,
        path: &std::path::Path,
        document: &Map<String, Value>,
    ) -> Result<(), EditError> {
        let text = serde_json::to_string_pretty(&Value::Object(document.clone()))
            .map_err(|e| EditError::Content(e.to_string()))?;
        self.fs.write(path, &text).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConfigurationEditor for JsonFileEditor {
    async fn write_setting(
        &self,
        location: &SettingsLocation,
        key: &SettingKey,
        value: Option<Value>,
    ) -> Result<(), EditError> {
        let (path, mut document) = self.read_document(&location.resource).await?;

        let mut target = &mut document;
        if location.workspace_settings {
            target = ensure_object(target, "settings")?;
        }
        if let Some(identifier) = &key.override_identifier {
            target = ensure_object(target, &format!("[{identifier}]"))?;
        }
        match value {
            Some(value) => {
                target.insert(key.key.clone(), value);
            }
            None => {
                target.remove(&key.key);
            }
        }

        self.write_document(&path, &document).await
    }

    async fn write_folders(&self, resource: &Url, folders: &[Value]) -> Result<(), EditError> {
        let (path, mut document) = self.read_document(resource).await?;
        document.insert("folders".to_string(), Value::Array(folders.to_vec()));
        self.write_document(&path, &document).await
    }
}

fn ensure_object<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, EditError> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    entry
        .as_object_mut()
        .ok_or_else(|| EditError::Content(format!("'{key}' is not a JSON object")))
}
