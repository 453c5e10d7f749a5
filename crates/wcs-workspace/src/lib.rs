mod diff;
mod identifier;
pub mod paths;
mod workspace;

pub use diff::{compare_folders, WorkspaceFoldersChange};
pub use identifier::{folder_workspace_id, workspace_file_id, WorkspaceIdentifier};
pub use workspace::{StoredWorkspaceFolder, Workspace, WorkspaceFolder};

/// Name of the per-folder configuration subdirectory.
///
/// Embedders can override this on the service; everything else in the
/// workspace layer treats the directory name as opaque.
pub const DEFAULT_CONFIG_DIR_NAME: &str = ".wcs";

/// File name of a folder's settings file inside the configuration subdirectory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Extension identifying a multi-folder workspace definition file.
pub const WORKSPACE_FILE_EXTENSION: &str = "wcs-workspace";

/// Compare two resources for identity.
///
/// Case-insensitive on platforms whose default file systems are
/// case-insensitive, exact everywhere else.
#[must_use]
pub fn resources_equal(a: &url::Url, b: &url::Url) -> bool {
    if cfg!(any(windows, target_os = "macos")) {
        a.as_str().eq_ignore_ascii_case(b.as_str())
    } else {
        a == b
    }
}

/// Whether `resource` lives under `root`, or is `root` itself.
///
/// Applies the same platform case rule as [`resources_equal`].
#[must_use]
pub fn resource_contains(root: &url::Url, resource: &url::Url) -> bool {
    if resources_equal(root, resource) {
        return true;
    }
    if root.scheme() != resource.scheme() {
        return false;
    }
    let root_path = root.path().trim_end_matches('/');
    if cfg!(any(windows, target_os = "macos")) {
        resource
            .path()
            .to_ascii_lowercase()
            .strip_prefix(&root_path.to_ascii_lowercase())
            .is_some_and(|rest| rest.starts_with('/'))
    } else {
        resource
            .path()
            .strip_prefix(root_path)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Workspace kind as observed by the workbench.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum WorkbenchState {
    /// No folders and no workspace definition file.
    Empty,
    /// A single root folder without a definition file.
    Folder,
    /// A multi-folder workspace backed by a definition file.
    Workspace,
}
