//! Workspace configuration service.
//!
//! Composes the configuration layers of [`wcs_config`] with the workspace
//! entities of [`wcs_workspace`] into a single orchestrator: it loads user,
//! workspace and per-folder settings through a pluggable [`FileSystem`],
//! keeps them coherent as files and schemas change, serializes structural
//! edits and notifies subscribers with minimal change sets.

mod editing;
mod events;
mod folder;
mod fs;
mod service;
mod workspace_file;

pub use editing::{ConfigurationEditor, EditError, JsonFileEditor, SettingKey, SettingsLocation};
pub use events::{
    ConfigurationChangeEvent, WorkbenchStateChangeEvent, WorkspaceFoldersChangeEvent,
    WorkspaceNameChangeEvent,
};
pub use folder::FolderConfigurationLoader;
pub use fs::{FileChangeEvent, FileChangeKind, FileMetadata, FileSystem, InMemoryFileSystem, OsFileSystem};
pub use service::{FolderToAdd, ServiceError, ServiceOptions, WorkspaceService};
pub use workspace_file::WorkspaceConfigurationLoader;
