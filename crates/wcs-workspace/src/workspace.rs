//! Workspace and folder entities.
//!
//! A [`Workspace`] owns an ordered list of [`WorkspaceFolder`]s. The entity is
//! mutated in place via [`Workspace::update`] rather than replaced, so anything
//! holding on to the service's workspace keeps observing the current state.

use serde::{Deserialize, Serialize};
use url::Url;


/// The form a folder entry takes inside the workspace definition file.
///
/// Entries round-trip through edits without normalization: a folder stored as
/// a relative path stays a relative path when an unrelated folder is added or
/// removed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredWorkspaceFolder {
    Path {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Uri {
        uri: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl StoredWorkspaceFolder {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            StoredWorkspaceFolder::Path { name, .. } | StoredWorkspaceFolder::Uri { name, .. } => {
                name.as_deref()
            }
        }
    }

    /// Resolve the stored form to a concrete resource.
    ///
    /// Relative paths are resolved against `base`, the directory containing
    /// the workspace definition file. Entries that resolve to nothing (for
    /// example a malformed URI) yield `None` and are skipped by callers,
    /// never rewritten.
    #[must_use]
    pub fn resolve(&self, base: Option<&std::path::Path>) -> Option<Url> {
        match self {
            StoredWorkspaceFolder::Path { path, .. } => {
                let p = std::path::Path::new(path);
                if p.is_absolute() {
                    crate::paths::path_to_url(p)
                } else {
                    crate::paths::path_to_url(&base?.join(p))
                }
            }
            StoredWorkspaceFolder::Uri { uri, .. } => Url::parse(uri).ok(),
        }
    }
}

/// A single root folder of a workspace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkspaceFolder {
    /// Resource identifying the folder; the ownership key for configuration.
    pub uri: Url,
    /// Display name, defaulting to the last path segment.
    pub name: String,
    /// Position in the ordered folder list.
    pub index: usize,
    /// The stored representation this folder was resolved from.
    pub raw: StoredWorkspaceFolder,
}

impl WorkspaceFolder {
    /// Build a folder from its stored form at the given list position.
    #[must_use]
    pub fn from_stored(
        raw: StoredWorkspaceFolder,
        index: usize,
        base: Option<&std::path::Path>,
    ) -> Option<Self> {
        let uri = raw.resolve(base)?;
        let name = raw
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| default_folder_name(&uri));
        Some(WorkspaceFolder {
            uri,
            name,
            index,
            raw,
        })
    }

    /// Whether `resource` lives inside this folder (or is the folder itself).
    #[must_use]
    pub fn contains(&self, resource: &Url) -> bool {
        crate::resource_contains(&self.uri, resource)
    }
}

fn default_folder_name(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uri.to_string())
}

/// The workspace entity: identity, display name and the ordered folder list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Workspace {
    id: String,
    name: String,
    folders: Vec<WorkspaceFolder>,
    /// The workspace definition resource; present only for multi-folder
    /// workspaces.
    configuration: Option<Url>,
    /// Creation-time disambiguator carried by single-folder workspaces.
    ctime: Option<u64>,
}

impl Workspace {
    #[must_use]
    pub fn new(
        id: String,
        name: String,
        folders: Vec<WorkspaceFolder>,
        configuration: Option<Url>,
        ctime: Option<u64>,
    ) -> Self {
        Workspace {
            id,
            name,
            folders,
            configuration,
            ctime,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn folders(&self) -> &[WorkspaceFolder] {
        &self.folders
    }

    #[must_use]
    pub fn configuration(&self) -> Option<&Url> {
        self.configuration.as_ref()
    }

    #[must_use]
    pub fn ctime(&self) -> Option<u64> {
        self.ctime
    }

    /// Refresh this workspace's contents from another instance.
    ///
    /// The entity is never swapped out wholesale; callers holding it across
    /// a re-initialization keep seeing the refreshed state.
    pub fn update(&mut self, other: Workspace) {
        self.id = other.id;
        self.name = other.name;
        self.folders = other.folders;
        self.configuration = other.configuration;
        self.ctime = other.ctime;
    }

    pub fn set_folders(&mut self, folders: Vec<WorkspaceFolder>) {
        self.folders = folders;
    }

    /// The folder owning `resource`, preferring the deepest root when roots
    /// are nested.
    #[must_use]
    pub fn get_folder(&self, resource: &Url) -> Option<&WorkspaceFolder> {
        self.folders
            .iter()
            .filter(|folder| folder.contains(resource))
            .max_by_key(|folder| folder.uri.path().len())
    }

    #[must_use]
    pub fn is_inside(&self, resource: &Url) -> bool {
        self.get_folder(resource).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(uri: &str, name: &str, index: usize) -> WorkspaceFolder {
        let url = Url::parse(uri).unwrap();
        WorkspaceFolder {
            uri: url.clone(),
            name: name.to_string(),
            index,
            raw: StoredWorkspaceFolder::Uri {
                uri: url.to_string(),
                name: None,
            },
        }
    }

    mod stored_form {
        use super::*;

        #[test]
        fn relative_path_resolves_against_base() {
            let raw = StoredWorkspaceFolder::Path {
                path: "lib".to_string(),
                name: None,
            };
            let uri = raw.resolve(Some(std::path::Path::new("/work"))).unwrap();
            assert_eq!(uri.path(), "/work/lib");
        }

        #[test]
        fn absolute_path_ignores_base() {
            let raw = StoredWorkspaceFolder::Path {
                path: "/srv/app".to_string(),
                name: None,
            };
            let uri = raw.resolve(Some(std::path::Path::new("/work"))).unwrap();
            assert_eq!(uri.path(), "/srv/app");
        }

        #[test]
        fn uri_form_round_trips_serde() {
            let raw = StoredWorkspaceFolder::Uri {
                uri: "file:///srv/app".to_string(),
                name: Some("app".to_string()),
            };
            let json = serde_json::to_string(&raw).unwrap();
            let back: StoredWorkspaceFolder = serde_json::from_str(&json).unwrap();
            assert_eq!(raw, back);
        }

        #[test]
        fn path_form_serializes_without_name_key_when_absent() {
            let raw = StoredWorkspaceFolder::Path {
                path: "lib".to_string(),
                name: None,
            };
            let json = serde_json::to_string(&raw).unwrap();
            assert_eq!(json, r#"{"path":"lib"}"#);
        }
    }

    mod ownership {
        use super::*;

        #[test]
        fn folder_contains_nested_resource() {
            let f = folder("file:///work/app", "app", 0);
            assert!(f.contains(&Url::parse("file:///work/app/src/main.rs").unwrap()));
            assert!(f.contains(&Url::parse("file:///work/app").unwrap()));
            assert!(!f.contains(&Url::parse("file:///work/application").unwrap()));
            assert!(!f.contains(&Url::parse("file:///work").unwrap()));
        }

        #[cfg(any(windows, target_os = "macos"))]
        #[test]
        fn containment_ignores_case_on_case_insensitive_platforms() {
            let f = folder("file:///Work/App", "app", 0);
            assert!(f.contains(&Url::parse("file:///work/app/src/main.rs").unwrap()));
            assert!(f.contains(&Url::parse("file:///WORK/APP").unwrap()));
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        #[test]
        fn containment_is_case_sensitive_elsewhere() {
            let f = folder("file:///work/app", "app", 0);
            assert!(!f.contains(&Url::parse("file:///work/App/src/main.rs").unwrap()));
        }

        #[test]
        fn deepest_root_wins_for_nested_roots() {
            let ws = Workspace::new(
                "id".to_string(),
                "ws".to_string(),
                vec![
                    folder("file:///work", "outer", 0),
                    folder("file:///work/app", "inner", 1),
                ],
                None,
                None,
            );
            let owner = ws
                .get_folder(&Url::parse("file:///work/app/src").unwrap())
                .unwrap();
            assert_eq!(owner.name, "inner");
        }
    }

    #[test]
    fn update_refreshes_in_place() {
        let mut ws = Workspace::new("a".to_string(), "one".to_string(), vec![], None, None);
        ws.update(Workspace::new(
            "b".to_string(),
            "two".to_string(),
            vec![folder("file:///x", "x", 0)],
            None,
            Some(7),
        ));
        assert_eq!(ws.id(), "b");
        assert_eq!(ws.name(), "two");
        assert_eq!(ws.folders().len(), 1);
        assert_eq!(ws.ctime(), Some(7));
    }
}
