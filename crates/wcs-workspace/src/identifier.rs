//! Workspace identifier classification and identity hashing.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::WORKSPACE_FILE_EXTENSION;

/// What the service was asked to open.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WorkspaceIdentifier {
    /// A multi-folder workspace backed by a definition file.
    Workspace { config_path: PathBuf },
    /// A single root folder.
    Folder { path: PathBuf },
    /// No folder at all; `id` is supplied by the embedder (e.g. per window).
    Empty { id: String },
}

impl WorkspaceIdentifier {
    /// Classify a path as a workspace definition file or a plain folder.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|ext| ext == WORKSPACE_FILE_EXTENSION)
        {
            WorkspaceIdentifier::Workspace {
                config_path: path.to_path_buf(),
            }
        } else {
            WorkspaceIdentifier::Folder {
                path: path.to_path_buf(),
            }
        }
    }
}

/// Stable identity for a single-folder workspace.
///
/// The hash covers the canonical path *and* a creation-time proxy: a folder
/// deleted and recreated at the same path must not inherit the previous
/// workspace's persisted state.
#[must_use]
pub fn folder_workspace_id(path: &Path, ctime: Option<u64>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_path_bytes(path));
    if let Some(ctime) = ctime {
        hasher.update(ctime.to_le_bytes());
    }
    hex_digest(&hasher.finalize())
}

/// Stable identity for a multi-folder workspace: the definition file's path.
#[must_use]
pub fn workspace_file_id(config_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_path_bytes(config_path));
    hex_digest(&hasher.finalize())
}

fn canonical_path_bytes(path: &Path) -> Vec<u8> {
    let canonical = dunce_canonicalize(path);
    let text = canonical.to_string_lossy();
    if cfg!(any(windows, target_os = "macos")) {
        text.to_lowercase().into_bytes()
    } else {
        text.into_owned().into_bytes()
    }
}

// Canonicalize when the path exists; identity must still be computable for
// paths that are gone (e.g. while diffing against a removed folder).
fn dunce_canonicalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn hex_digest(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
