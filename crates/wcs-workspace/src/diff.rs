//! Folder-list diffing.
//!
//! Identity is always by resource, never by list index, so a reorder or a
//! rename shows up as `changed` rather than a removal plus an addition.

use crate::resources_equal;
use crate::workspace::WorkspaceFolder;

/// The result of diffing two ordered folder lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceFoldersChange {
    /// Folders present only in the new list.
    pub added: Vec<WorkspaceFolder>,
    /// Folders present only in the current list.
    pub removed: Vec<WorkspaceFolder>,
    /// Folders present in both but moved or renamed; carries the *current*
    /// (pre-change) folder.
    pub changed: Vec<WorkspaceFolder>,
}

impl WorkspaceFoldersChange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Diff `current` against `new` folder lists.
#[must_use]
pub fn compare_folders(
    current: &[WorkspaceFolder],
    new: &[WorkspaceFolder],
) -> WorkspaceFoldersChange {
    let added = new
        .iter()
        .filter(|n| !current.iter().any(|c| resources_equal(&c.uri, &n.uri)))
        .cloned()
        .collect();

    let mut removed = Vec::new();
    let mut changed = Vec::new();
    for folder in current {
        match new.iter().find(|n| resources_equal(&n.uri, &folder.uri)) {
            None => removed.push(folder.clone()),
            Some(counterpart) => {
                if counterpart.index != folder.index || counterpart.name != folder.name {
                    changed.push(folder.clone());
                }
            }
        }
    }

    WorkspaceFoldersChange {
        added,
        removed,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::StoredWorkspaceFolder;
    use url::Url;

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

    #[test]
    fn identical_lists_diff_empty() {
        let folders = vec![folder("file:///a", "a", 0), folder("file:///b", "b", 1)];
        assert!(compare_folders(&folders, &folders).is_empty());
    }

    #[test]
    fn addition_and_removal() {
        let current = vec![folder("file:///a", "a", 0)];
        let new = vec![folder("file:///b", "b", 0)];
        let change = compare_folders(&current, &new);
        assert_eq!(change.added, vec![folder("file:///b", "b", 0)]);
        assert_eq!(change.removed, vec![folder("file:///a", "a", 0)]);
        assert!(change.changed.is_empty());
    }

    #[test]
    fn rename_is_changed_not_remove_add() {
        let current = vec![folder("file:///a", "a", 0)];
        let new = vec![folder("file:///a", "b", 0)];
        let change = compare_folders(&current, &new);
        assert!(change.added.is_empty());
        assert!(change.removed.is_empty());
        assert_eq!(change.changed, vec![folder("file:///a", "a", 0)]);
    }

    #[test]
    fn reorder_is_changed() {
        let current = vec![folder("file:///a", "a", 0), folder("file:///b", "b", 1)];
        let new = vec![folder("file:///b", "b", 0), folder("file:///a", "a", 1)];
        let change = compare_folders(&current, &new);
        assert!(change.added.is_empty());
        assert!(change.removed.is_empty());
        assert_eq!(change.changed.len(), 2);
    }
}
