//! The workspace service orchestrator.
//!
//! Owns the [`Workspace`] entity and the [`Configuration`] aggregator, reacts
//! to folder, user and workspace change signals, serializes folder-membership
//! edits through a single-concurrency queue and derives write targets for
//! value updates. All layer mutation funnels through the aggregator's typed
//! compare-and-update entry points; no event handler touches layers directly.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};
use url::Url;

use wcs_config::{
    parse_settings, Configuration, ConfigurationData, ConfigurationKeys, ConfigurationModel,
    ConfigurationOverrides, ConfigurationTarget, Inspect, SchemaRegistry, SettingsTarget,
};
use wcs_worker::{Task, Worker};
use wcs_workspace::paths::{path_to_url, url_to_path};
use wcs_workspace::{
    compare_folders, folder_workspace_id, resources_equal, workspace_file_id, StoredWorkspaceFolder,
    WorkbenchState, Workspace, WorkspaceFolder, WorkspaceIdentifier, DEFAULT_CONFIG_DIR_NAME,
    SETTINGS_FILE_NAME,
};

use crate::editing::{ConfigurationEditor, EditError, SettingKey, SettingsLocation};
use crate::events::{
    ConfigurationChangeEvent, WorkbenchStateChangeEvent, WorkspaceFoldersChangeEvent,
    WorkspaceNameChangeEvent,
};
use crate::folder::FolderConfigurationLoader;
use crate::fs::{FileChangeEvent, FileSystem};
use crate::workspace_file::WorkspaceConfigurationLoader;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("workspace service is not initialized")]
    NotInitialized,
    #[error("folders can only be added or removed in a multi-folder workspace")]
    NotAWorkspace,
    #[error("no configuration editor is registered")]
    EditorNotRegistered,
    #[error("invalid configuration target: {0}")]
    InvalidTarget(&'static str),
    #[error("resource is not inside the workspace: {0}")]
    NotInWorkspace(Url),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Construction options for [`WorkspaceService`].
pub struct ServiceOptions {
    /// Name of the per-folder configuration subdirectory.
    pub config_dir_name: String,
    /// Location of the user settings file, if the embedder has one.
    pub user_settings_path: Option<PathBuf>,
    /// Editing collaborator for persisted writes. Without one, only MEMORY
    /// writes succeed.
    pub editor: Option<Arc<dyn ConfigurationEditor>>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        ServiceOptions {
            config_dir_name: DEFAULT_CONFIG_DIR_NAME.to_string(),
            user_settings_path: None,
            editor: None,
        }
    }
}

/// A folder requested via `add_folders`.
#[derive(Clone, Debug)]
pub struct FolderToAdd {
    pub uri: Url,
    pub name: Option<String>,
}

struct ServiceState {
    workspace: Option<Workspace>,
    configuration: Configuration,
    workspace_loader: Option<Arc<WorkspaceConfigurationLoader>>,
    user_content: Option<String>,
}

struct ServiceInner {
    fs: Arc<dyn FileSystem>,
    registry: Arc<dyn SchemaRegistry>,
    editor: Option<Arc<dyn ConfigurationEditor>>,
    config_dir_name: String,
    user_settings_path: Option<PathBuf>,
    folder_loaders: DashMap<Url, Arc<FolderConfigurationLoader>>,
    state: Mutex<ServiceState>,
    queue: Worker,
    config_tx: broadcast::Sender<ConfigurationChangeEvent>,
    folders_tx: broadcast::Sender<WorkspaceFoldersChangeEvent>,
    name_tx: broadcast::Sender<WorkspaceNameChangeEvent>,
    workbench_tx: broadcast::Sender<WorkbenchStateChangeEvent>,
}

/// The workspace configuration service. Clones share one instance.
#[derive(Clone)]
pub struct WorkspaceService {
    inner: Arc<ServiceInner>,
}

impl WorkspaceService {
    /// Must be called within a tokio runtime; the edit queue spawns its
    /// worker task immediately.
    #[must_use]
    pub fn new(
        fs: Arc<dyn FileSystem>,
        registry: Arc<dyn SchemaRegistry>,
        options: ServiceOptions,
    ) -> Self {
        let (config_tx, _) = broadcast::channel(64);
        let (folders_tx, _) = broadcast::channel(16);
        let (name_tx, _) = broadcast::channel(16);
        let (workbench_tx, _) = broadcast::channel(16);
        WorkspaceService {
            inner: Arc::new(ServiceInner {
                fs,
                registry,
                editor: options.editor,
                config_dir_name: options.config_dir_name,
                user_settings_path: options.user_settings_path,
                folder_loaders: DashMap::new(),
                state: Mutex::new(ServiceState {
                    workspace: None,
                    configuration: Configuration::default(),
                    workspace_loader: None,
                    user_content: None,
                }),
                queue: Worker::new(),
                config_tx,
                folders_tx,
                name_tx,
                workbench_tx,
            }),
        }
    }

    pub fn on_did_change_configuration(&self) -> broadcast::Receiver<ConfigurationChangeEvent> {
        self.inner.config_tx.subscribe()
    }

    pub fn on_did_change_workspace_folders(
        &self,
    ) -> broadcast::Receiver<WorkspaceFoldersChangeEvent> {
        self.inner.folders_tx.subscribe()
    }

    pub fn on_did_change_workspace_name(&self) -> broadcast::Receiver<WorkspaceNameChangeEvent> {
        self.inner.name_tx.subscribe()
    }

    pub fn on_did_change_workbench_state(&self) -> broadcast::Receiver<WorkbenchStateChangeEvent> {
        self.inner.workbench_tx.subscribe()
    }

    /// Open (or re-open) a workspace from an identifier, loading every layer.
    ///
    /// On re-initialization the workspace entity is refreshed in place and
    /// the kind-change, name-change and folders-change signals fire — always
    /// after configuration has been fully reloaded, so subscribers reacting
    /// to folder changes never observe stale configuration.
    #[instrument(skip(self))]
    pub async fn initialize(&self, identifier: WorkspaceIdentifier) -> Result<(), ServiceError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;

        let (new_workspace, workspace_loader) = self.build_workspace(&identifier).await?;

        let defaults = inner.registry.defaults();
        let user_content = self.read_user_settings().await;
        let user = user_content
            .as_deref()
            .map(|c| parse_settings(c, SettingsTarget::User, inner.registry.as_ref()))
            .unwrap_or_default();

        // Single-folder workspaces have no definition file; the folder's own
        // settings act as the workspace layer and are filtered accordingly.
        let folder_target = if new_workspace.configuration().is_some() {
            SettingsTarget::Folder
        } else {
            SettingsTarget::Workspace
        };

        // Folder loads are issued together and joined.
        let mut loaders = Vec::new();
        let mut join_set = tokio::task::JoinSet::new();
        for folder in new_workspace.folders() {
            let loader = Arc::new(FolderConfigurationLoader::new(
                folder.uri.clone(),
                &inner.config_dir_name,
                folder_target,
                inner.fs.clone(),
                inner.registry.clone(),
            ));
            loaders.push(loader.clone());
            join_set.spawn(async move {
                let uri = loader.folder().clone();
                let model = loader.load().await;
                (uri, model)
            });
        }
        let mut folder_models = FxHashMap::default();
        while let Some(joined) = join_set.join_next().await {
            if let Ok((uri, model)) = joined {
                folder_models.insert(uri, model);
            }
        }

        let workspace_model = match (&workspace_loader, new_workspace.folders().first()) {
            (Some(loader), _) => loader.configuration(),
            (None, Some(folder)) => folder_models.get(&folder.uri).cloned().unwrap_or_default(),
            (None, None) => ConfigurationModel::default(),
        };

        let new_configuration = Configuration::new(defaults, user, workspace_model, folder_models);

        let previous = state.workspace.as_ref().map(|ws| {
            (
                workbench_state_of(ws),
                ws.name().to_string(),
                ws.folders().to_vec(),
            )
        });
        let folder_diff = compare_folders(
            previous
                .as_ref()
                .map_or(&[][..], |(_, _, folders)| folders.as_slice()),
            new_workspace.folders(),
        );
        let configuration_changes = if previous.is_some() {
            state.configuration.compare_effective(&new_configuration)
        } else {
            BTreeSet::new()
        };

        inner.folder_loaders.clear();
        for loader in loaders {
            inner.folder_loaders.insert(loader.folder().clone(), loader);
        }
        let new_name = new_workspace.name().to_string();
        match &mut state.workspace {
            Some(workspace) => workspace.update(new_workspace),
            None => state.workspace = Some(new_workspace),
        }
        state.configuration = new_configuration;
        state.workspace_loader = workspace_loader;
        state.user_content = user_content;

        info!(
            folders = state.workspace.as_ref().map_or(0, |ws| ws.folders().len()),
            "workspace initialized"
        );

        self.emit_configuration_change(
            configuration_changes,
            ConfigurationTarget::Workspace,
            None,
            None,
        );
        if let Some((old_state, old_name, _)) = previous {
            let current = state.workspace.as_ref().map_or(WorkbenchState::Empty, workbench_state_of);
            if old_state != current {
                let _ = inner.workbench_tx.send(WorkbenchStateChangeEvent { state: current });
            }
            if old_name != new_name {
                let _ = inner.name_tx.send(WorkspaceNameChangeEvent { name: new_name });
            }
            if !folder_diff.is_empty() {
                let _ = inner.folders_tx.send(folder_diff);
            }
        }
        Ok(())
    }

    /// Snapshot of the current workspace entity.
    pub async fn get_workspace(&self) -> Option<Workspace> {
        self.inner.state.lock().await.workspace.clone()
    }

    pub async fn workbench_state(&self) -> WorkbenchState {
        self.inner
            .state
            .lock()
            .await
            .workspace
            .as_ref()
            .map_or(WorkbenchState::Empty, workbench_state_of)
    }

    pub async fn get_workspace_folder(&self, resource: &Url) -> Option<WorkspaceFolder> {
        self.inner
            .state
            .lock()
            .await
            .workspace
            .as_ref()
            .and_then(|ws| ws.get_folder(resource))
            .cloned()
    }

    pub async fn is_inside_workspace(&self, resource: &Url) -> bool {
        self.get_workspace_folder(resource).await.is_some()
    }

    /// Whether `identifier` denotes the workspace currently open.
    pub async fn is_current_workspace(&self, identifier: &WorkspaceIdentifier) -> bool {
        let state = self.inner.state.lock().await;
        let Some(workspace) = &state.workspace else {
            return false;
        };
        match identifier {
            WorkspaceIdentifier::Workspace { config_path } => {
                match (path_to_url(config_path), workspace.configuration()) {
                    (Some(resource), Some(current)) => resources_equal(&resource, current),
                    _ => false,
                }
            }
            WorkspaceIdentifier::Folder { path } => {
                workspace.configuration().is_none()
                    && workspace.folders().len() == 1
                    && path_to_url(path)
                        .is_some_and(|uri| resources_equal(&uri, &workspace.folders()[0].uri))
            }
            WorkspaceIdentifier::Empty { id } => {
                workspace.configuration().is_none()
                    && workspace.folders().is_empty()
                    && workspace.id() == id
            }
        }
    }

    pub async fn get_value(
        &self,
        section: Option<&str>,
        overrides: &ConfigurationOverrides,
    ) -> Option<Value> {
        self.inner
            .state
            .lock()
            .await
            .configuration
            .get_value(section, overrides)
    }

    pub async fn inspect(&self, key: &str, overrides: &ConfigurationOverrides) -> Inspect {
        self.inner.state.lock().await.configuration.inspect(key, overrides)
    }

    pub async fn keys(&self) -> ConfigurationKeys {
        self.inner.state.lock().await.configuration.keys()
    }

    pub async fn configuration_data(&self) -> ConfigurationData {
        self.inner.state.lock().await.configuration.to_data()
    }

    /// Unsupported keys across the workspace definition and every folder's
    /// settings. Recomputed from the live layers on every call.
    pub async fn unsupported_workspace_keys(&self) -> Vec<String> {
        self.inner.state.lock().await.configuration.unsupported_keys()
    }

    /// Add folders to a multi-folder workspace.
    ///
    /// Queued: concurrent add/remove calls never interleave their
    /// read-modify-write of the definition file. Folders already present are
    /// skipped; when nothing remains, nothing is persisted and no event fires.
    pub async fn add_folders(&self, folders: Vec<FolderToAdd>) -> Result<(), ServiceError> {
        self.run_folder_edit(FolderEdit::Add(folders)).await
    }

    /// Remove folders from a multi-folder workspace.
    ///
    /// Entries that do not resolve to a requested resource — including
    /// malformed entries — are left untouched; nothing is persisted unless
    /// the folder count actually changes.
    pub async fn remove_folders(&self, folders: Vec<Url>) -> Result<(), ServiceError> {
        self.run_folder_edit(FolderEdit::Remove(folders)).await
    }

    /// Write a configuration value.
    ///
    /// With no explicit target the narrowest already-defined scope wins:
    /// folder, then workspace, then user. Writing `None` without a target is
    /// a no-op, as is writing the already-effective value. DEFAULT is always
    /// rejected. MEMORY bypasses the editing collaborator entirely; persisted
    /// targets delegate to it and then reload exactly the affected layer.
    #[instrument(skip(self, value, overrides))]
    pub async fn update_value(
        &self,
        key: &str,
        value: Option<Value>,
        overrides: &ConfigurationOverrides,
        target: Option<ConfigurationTarget>,
    ) -> Result<(), ServiceError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.workspace.is_none() {
            return Err(ServiceError::NotInitialized);
        }

        let target = match target {
            Some(ConfigurationTarget::Default) => {
                return Err(ServiceError::InvalidTarget("defaults are read-only"))
            }
            Some(target) => target,
            None => {
                // An undefined value with no target is explicitly not
                // "delete everywhere".
                let Some(new_value) = value.as_ref() else {
                    return Ok(());
                };
                let current = state.configuration.get_value(Some(key), overrides);
                if current.as_ref() == Some(new_value) {
                    debug!(key, "value already effective, skipping write");
                    return Ok(());
                }
                let inspected = state.configuration.inspect(key, overrides);
                if inspected.workspace_folder_value.is_some() {
                    ConfigurationTarget::WorkspaceFolder
                } else if inspected.workspace_value.is_some() {
                    ConfigurationTarget::Workspace
                } else {
                    ConfigurationTarget::User
                }
            }
        };

        match target {
            ConfigurationTarget::Default => Err(ServiceError::InvalidTarget("defaults are read-only")),
            ConfigurationTarget::Memory => {
                let changed = state.configuration.update_value(key, value, overrides);
                self.emit_configuration_change(
                    changed,
                    ConfigurationTarget::Memory,
                    overrides.resource.clone(),
                    None,
                );
                Ok(())
            }
            ConfigurationTarget::User => {
                let editor = self.editor()?;
                let path = inner
                    .user_settings_path
                    .as_ref()
                    .ok_or(ServiceError::InvalidTarget("no user settings file configured"))?;
                let resource = path_to_url(path)
                    .ok_or_else(|| anyhow::anyhow!("user settings path is not a file resource"))?;
                editor
                    .write_setting(
                        &SettingsLocation {
                            resource,
                            workspace_settings: false,
                        },
                        &SettingKey::new(key, overrides.override_identifier.as_deref()),
                        value,
                    )
                    .await?;
                let content = self.read_user_settings().await;
                let model = content
                    .as_deref()
                    .map(|c| parse_settings(c, SettingsTarget::User, inner.registry.as_ref()))
                    .unwrap_or_default();
                state.user_content = content;
                let raw = Value::Object(model.contents().clone());
                let changed = state.configuration.compare_and_update_user_configuration(model);
                self.emit_configuration_change(changed, ConfigurationTarget::User, None, Some(raw));
                Ok(())
            }
            ConfigurationTarget::Workspace => {
                let editor = self.editor()?;
                if let Some(loader) = state.workspace_loader.clone() {
                    editor
                        .write_setting(
                            &SettingsLocation {
                                resource: loader.resource().clone(),
                                workspace_settings: true,
                            },
                            &SettingKey::new(key, overrides.override_identifier.as_deref()),
                            value,
                        )
                        .await?;
                    loader.load().await;
                    let model = loader.configuration();
                    let raw = Value::Object(model.contents().clone());
                    let changed =
                        state.configuration.compare_and_update_workspace_configuration(model);
                    self.emit_configuration_change(
                        changed,
                        ConfigurationTarget::Workspace,
                        None,
                        Some(raw),
                    );
                    Ok(())
                } else {
                    // Single-folder workspace: the root folder's settings file
                    // is the workspace settings file.
                    let folder_uri = state
                        .workspace
                        .as_ref()
                        .and_then(|ws| ws.folders().first())
                        .map(|folder| folder.uri.clone())
                        .ok_or(ServiceError::InvalidTarget("empty workspace has no settings"))?;
                    self.write_folder_setting(&mut state, &folder_uri, key, value, overrides, true)
                        .await
                }
            }
            ConfigurationTarget::WorkspaceFolder => {
                let resource = overrides
                    .resource
                    .clone()
                    .ok_or(ServiceError::InvalidTarget("folder target requires a resource"))?;
                let folder_uri = state
                    .workspace
                    .as_ref()
                    .and_then(|ws| ws.get_folder(&resource))
                    .map(|folder| folder.uri.clone())
                    .ok_or(ServiceError::NotInWorkspace(resource))?;
                let is_single_folder = state
                    .workspace
                    .as_ref()
                    .is_some_and(|ws| ws.configuration().is_none());
                self.write_folder_setting(
                    &mut state,
                    &folder_uri,
                    key,
                    value,
                    overrides,
                    is_single_folder,
                )
                .await
            }
        }
    }

    /// Route externally observed file changes to the affected layers.
    pub async fn handle_file_events(&self, events: &[FileChangeEvent]) {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.workspace.is_none() {
            return;
        }

        if let Some(user_path) = &inner.user_settings_path {
            if events.iter().any(|event| &event.path == user_path) {
                let content = self.read_user_settings().await;
                let model = content
                    .as_deref()
                    .map(|c| parse_settings(c, SettingsTarget::User, inner.registry.as_ref()))
                    .unwrap_or_default();
                state.user_content = content;
                let raw = Value::Object(model.contents().clone());
                let changed = state.configuration.compare_and_update_user_configuration(model);
                self.emit_configuration_change(changed, ConfigurationTarget::User, None, Some(raw));
            }
        }

        if let Some(loader) = state.workspace_loader.clone() {
            let touches_workspace_file = url_to_path(loader.resource())
                .is_some_and(|path| events.iter().any(|event| event.path == path));
            if touches_workspace_file {
                loader.load().await;
                self.resync_workspace_file(&mut state, &loader).await;
            }
        }

        let loaders: Vec<Arc<FolderConfigurationLoader>> = inner
            .folder_loaders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let single_folder = state
            .workspace
            .as_ref()
            .is_some_and(|ws| ws.configuration().is_none());
        for loader in loaders {
            if let Some(model) = loader.handle_file_change_event(events).await {
                let folder = loader.folder().clone();
                let raw = Value::Object(model.contents().clone());
                let mut changed = state
                    .configuration
                    .compare_and_update_folder_configuration(&folder, model.clone());
                if single_folder {
                    // The folder's settings double as the workspace layer.
                    changed.extend(
                        state
                            .configuration
                            .compare_and_update_workspace_configuration(model),
                    );
                }
                self.emit_configuration_change(
                    changed,
                    ConfigurationTarget::WorkspaceFolder,
                    Some(folder),
                    Some(raw),
                );
            }
        }
    }

    /// React to the schema registry's "defaults changed" signal.
    pub async fn handle_defaults_change(&self) {
        let mut state = self.inner.state.lock().await;
        if state.workspace.is_none() {
            return;
        }
        let changed = state
            .configuration
            .compare_and_update_defaults(self.inner.registry.defaults());
        self.emit_configuration_change(changed, ConfigurationTarget::Default, None, None);
    }

    /// React to the schema registry's "schema changed" signal: every layer is
    /// re-filtered from cached raw content, diffed and notified like a file
    /// change — without touching the files.
    pub async fn handle_schema_change(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.workspace.is_none() {
            return;
        }

        let user = state
            .user_content
            .as_deref()
            .map(|c| parse_settings(c, SettingsTarget::User, inner.registry.as_ref()))
            .unwrap_or_default();
        let changed = state.configuration.compare_and_update_user_configuration(user);
        self.emit_configuration_change(changed, ConfigurationTarget::User, None, None);

        if let Some(loader) = state.workspace_loader.clone() {
            let model = loader.reprocess_workspace_settings();
            let changed = state
                .configuration
                .compare_and_update_workspace_configuration(model);
            self.emit_configuration_change(changed, ConfigurationTarget::Workspace, None, None);
        }

        let single_folder = state
            .workspace
            .as_ref()
            .is_some_and(|ws| ws.configuration().is_none());
        let loaders: Vec<Arc<FolderConfigurationLoader>> = inner
            .folder_loaders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for loader in loaders {
            let model = loader.reprocess();
            let folder = loader.folder().clone();
            let mut changed = state
                .configuration
                .compare_and_update_folder_configuration(&folder, model.clone());
            if single_folder {
                changed.extend(
                    state
                        .configuration
                        .compare_and_update_workspace_configuration(model),
                );
            }
            self.emit_configuration_change(
                changed,
                ConfigurationTarget::WorkspaceFolder,
                Some(folder),
                None,
            );
        }
    }

    fn editor(&self) -> Result<Arc<dyn ConfigurationEditor>, ServiceError> {
        self.inner
            .editor
            .clone()
            .ok_or(ServiceError::EditorNotRegistered)
    }

    async fn read_user_settings(&self) -> Option<String> {
        let path = self.inner.user_settings_path.as_ref()?;
        if self.inner.fs.is_file(path).await {
            self.inner.fs.read_to_string(path).await.ok()
        } else {
            None
        }
    }

    async fn build_workspace(
        &self,
        identifier: &WorkspaceIdentifier,
    ) -> Result<(Workspace, Option<Arc<WorkspaceConfigurationLoader>>), ServiceError> {
        let inner = &self.inner;
        match identifier {
            WorkspaceIdentifier::Workspace { config_path } => {
                let resource = path_to_url(config_path).ok_or_else(|| {
                    anyhow::anyhow!("workspace path is not a file resource: {}", config_path.display())
                })?;
                let loader = WorkspaceConfigurationLoader::new(
                    resource.clone(),
                    inner.fs.clone(),
                    inner.registry.clone(),
                )
                .ok_or_else(|| anyhow::anyhow!("workspace resource has no file path"))?;
                let loader = Arc::new(loader);
                loader.load().await;
                let base = loader.base_dir();
                let folders = resolve_folders(&loader.folders(), base.as_deref());
                let name = config_path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "workspace".to_string());
                let workspace = Workspace::new(
                    workspace_file_id(config_path),
                    name,
                    folders,
                    Some(resource),
                    None,
                );
                Ok((workspace, Some(loader)))
            }
            WorkspaceIdentifier::Folder { path } => {
                let uri = path_to_url(path).ok_or_else(|| {
                    anyhow::anyhow!("folder path is not a file resource: {}", path.display())
                })?;
                let ctime = inner
                    .fs
                    .metadata(path)
                    .await
                    .ok()
                    .and_then(|metadata| metadata.created)
                    .and_then(|created| created.duration_since(UNIX_EPOCH).ok())
                    .map(|duration| duration.as_secs());
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned());
                let folder = WorkspaceFolder {
                    uri,
                    name: name.clone(),
                    index: 0,
                    raw: StoredWorkspaceFolder::Path {
                        path: path.to_string_lossy().into_owned(),
                        name: None,
                    },
                };
                let workspace = Workspace::new(
                    folder_workspace_id(path, ctime),
                    name,
                    vec![folder],
                    None,
                    ctime,
                );
                Ok((workspace, None))
            }
            WorkspaceIdentifier::Empty { id } => Ok((
                Workspace::new(id.clone(), String::new(), Vec::new(), None, None),
                None,
            )),
        }
    }

    async fn run_folder_edit(&self, edit: FolderEdit) -> Result<(), ServiceError> {
        let task = FolderEditTask {
            service: self.clone(),
            edit,
        };
        match self.inner.queue.wait_for(task).await {
            Ok(result) => result,
            Err(error) => Err(ServiceError::Internal(error)),
        }
    }

    async fn apply_folder_edit(&self, edit: FolderEdit) -> Result<(), ServiceError> {
        let inner = &self.inner;
        let editor = self.editor()?;
        let mut state = inner.state.lock().await;
        let workspace = state.workspace.as_ref().ok_or(ServiceError::NotInitialized)?;
        if workspace.configuration().is_none() {
            return Err(ServiceError::NotAWorkspace);
        }
        let loader = state
            .workspace_loader
            .clone()
            .ok_or(ServiceError::NotAWorkspace)?;
        let base = loader.base_dir();
        let entries = loader.raw_entries();

        let new_entries = match edit {
            FolderEdit::Add(to_add) => {
                let current: Vec<Url> = workspace.folders().iter().map(|f| f.uri.clone()).collect();
                let mut added: Vec<Url> = Vec::new();
                let mut entries = entries;
                let before = entries.len();
                for folder in to_add {
                    let already_present = current
                        .iter()
                        .chain(added.iter())
                        .any(|existing| resources_equal(existing, &folder.uri));
                    if already_present {
                        debug!(folder = %folder.uri, "folder already in workspace, skipping");
                        continue;
                    }
                    entries.push(stored_entry_for(&folder.uri, folder.name, base.as_deref()));
                    added.push(folder.uri);
                }
                if entries.len() == before {
                    return Ok(());
                }
                entries
            }
            FolderEdit::Remove(to_remove) => {
                let retained: Vec<Value> = entries
                    .iter()
                    .filter(|entry| {
                        let resolved = serde_json::from_value::<StoredWorkspaceFolder>((*entry).clone())
                            .ok()
                            .and_then(|stored| stored.resolve(base.as_deref()));
                        // Keep entries we cannot resolve; only drop confirmed matches.
                        !resolved.is_some_and(|uri| {
                            to_remove.iter().any(|removal| resources_equal(removal, &uri))
                        })
                    })
                    .cloned()
                    .collect();
                if retained.len() == entries.len() {
                    return Ok(());
                }
                retained
            }
        };

        // Write failure leaves every in-memory layer untouched; the resync
        // below only runs after the editor reports success.
        loader.set_folders(new_entries, editor.as_ref()).await?;
        self.resync_workspace_file(&mut state, &loader).await;
        Ok(())
    }

    /// Bring workspace entity, folder layers and workspace layer in line with
    /// a freshly loaded definition file, then notify. The consolidated
    /// configuration event precedes the folders event: listeners reacting to
    /// folder changes must already see updated configuration.
    async fn resync_workspace_file(
        &self,
        state: &mut ServiceState,
        loader: &Arc<WorkspaceConfigurationLoader>,
    ) {
        let inner = &self.inner;
        let base = loader.base_dir();
        let new_folders = resolve_folders(&loader.folders(), base.as_deref());
        let Some(workspace) = state.workspace.as_mut() else {
            return;
        };
        let diff = compare_folders(workspace.folders(), &new_folders);

        let mut affected = BTreeSet::new();
        for removed in &diff.removed {
            inner.folder_loaders.remove(&removed.uri);
            affected.extend(
                state
                    .configuration
                    .compare_and_delete_folder_configuration(&removed.uri),
            );
        }
        for added in &diff.added {
            let folder_loader = Arc::new(FolderConfigurationLoader::new(
                added.uri.clone(),
                &inner.config_dir_name,
                SettingsTarget::Folder,
                inner.fs.clone(),
                inner.registry.clone(),
            ));
            let model = folder_loader.load().await;
            inner
                .folder_loaders
                .insert(added.uri.clone(), folder_loader);
            affected.extend(
                state
                    .configuration
                    .compare_and_update_folder_configuration(&added.uri, model),
            );
        }
        workspace.set_folders(new_folders);

        let workspace_model = loader.configuration();
        let raw = Value::Object(workspace_model.contents().clone());
        affected.extend(
            state
                .configuration
                .compare_and_update_workspace_configuration(workspace_model),
        );

        self.emit_configuration_change(affected, ConfigurationTarget::Workspace, None, Some(raw));
        if !diff.is_empty() {
            let _ = inner.folders_tx.send(diff);
        }
    }

    async fn write_folder_setting(
        &self,
        state: &mut ServiceState,
        folder_uri: &Url,
        key: &str,
        value: Option<Value>,
        overrides: &ConfigurationOverrides,
        also_workspace_layer: bool,
    ) -> Result<(), ServiceError> {
        let editor = self.editor()?;
        let settings_path = url_to_path(folder_uri)
            .ok_or_else(|| anyhow::anyhow!("folder is not a file resource: {folder_uri}"))?
            .join(&self.inner.config_dir_name)
            .join(SETTINGS_FILE_NAME);
        let resource = path_to_url(&settings_path)
            .ok_or_else(|| anyhow::anyhow!("cannot address folder settings file"))?;
        editor
            .write_setting(
                &SettingsLocation {
                    resource,
                    workspace_settings: false,
                },
                &SettingKey::new(key, overrides.override_identifier.as_deref()),
                value,
            )
            .await?;

        // Reload exactly the affected folder, nothing else.
        let loader = self
            .inner
            .folder_loaders
            .get(folder_uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow::anyhow!("no loader for folder {folder_uri}"))?;
        let model = loader.load().await;
        let raw = Value::Object(model.contents().clone());
        let mut changed = state
            .configuration
            .compare_and_update_folder_configuration(folder_uri, model.clone());
        let target = if also_workspace_layer {
            changed.extend(
                state
                    .configuration
                    .compare_and_update_workspace_configuration(model),
            );
            ConfigurationTarget::Workspace
        } else {
            ConfigurationTarget::WorkspaceFolder
        };
        self.emit_configuration_change(changed, target, Some(folder_uri.clone()), Some(raw));
        Ok(())
    }

    fn emit_configuration_change(
        &self,
        changed: BTreeSet<String>,
        target: ConfigurationTarget,
        resource: Option<Url>,
        raw: Option<Value>,
    ) {
        if changed.is_empty() {
            return;
        }
        let event = ConfigurationChangeEvent {
            affected_keys: changed.into_iter().collect(),
            resource,
            target,
            raw,
        };
        debug!(keys = event.affected_keys.len(), ?target, "configuration changed");
        let _ = self.inner.config_tx.send(event);
    }
}

enum FolderEdit {
    Add(Vec<FolderToAdd>),
    Remove(Vec<Url>),
}

struct FolderEditTask {
    service: WorkspaceService,
    edit: FolderEdit,
}

#[async_trait::async_trait]
impl Task for FolderEditTask {
    type Output = Result<(), ServiceError>;

    async fn run(self: Box<Self>) -> anyhow::Result<Self::Output> {
        Ok(self.service.apply_folder_edit(self.edit).await)
    }
}

fn workbench_state_of(workspace: &Workspace) -> WorkbenchState {
    if workspace.configuration().is_some() {
        WorkbenchState::Workspace
    } else if workspace.folders().is_empty() {
        WorkbenchState::Empty
    } else {
        WorkbenchState::Folder
    }
}

fn resolve_folders(stored: &[StoredWorkspaceFolder], base: Option<&Path>) -> Vec<WorkspaceFolder> {
    let mut folders: Vec<WorkspaceFolder> = Vec::new();
    for raw in stored {
        let Some(folder) = WorkspaceFolder::from_stored(raw.clone(), folders.len(), base) else {
            warn!(?raw, "skipping unresolvable folder entry");
            continue;
        };
        if folders
            .iter()
            .any(|existing| resources_equal(&existing.uri, &folder.uri))
        {
            continue;
        }
        folders.push(folder);
    }
    folders
}

/// The stored form for a folder being added: a path relative to the
/// definition file's directory when the folder lives beneath it, an absolute
/// path otherwise, and a raw URI for non-file resources.
fn stored_entry_for(uri: &Url, name: Option<String>, base: Option<&Path>) -> Value {
    let mut entry = serde_json::Map::new();
    match url_to_path(uri) {
        Some(path) => {
            let stored = base
                .and_then(|b| path.strip_prefix(b).ok())
                .filter(|relative| !relative.as_os_str().is_empty())
                .map_or_else(
                    || path.to_string_lossy().into_owned(),
                    |relative| relative.to_string_lossy().into_owned(),
                );
            entry.insert("path".to_string(), Value::String(stored));
        }
        None => {
            entry.insert("uri".to_string(), Value::String(uri.to_string()));
        }
    }
    if let Some(name) = name {
        entry.insert("name".to_string(), Value::String(name));
    }
    Value::Object(entry)
}
