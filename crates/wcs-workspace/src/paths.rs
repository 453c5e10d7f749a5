//! Conversions between file paths and resource URLs.
//!
//! Folder identity and configuration ownership are both keyed by URL, while
//! everything touching disk works with paths; these two functions are the
//! only crossing point.

use std::path::{Path, PathBuf};

use url::Url;

/// Convert a `file://` URL to a [`PathBuf`], decoding percent-encoding.
///
/// Non-file resources have no local path and yield `None`.
#[must_use]
pub fn url_to_path(url: &Url) -> Option<PathBuf> {
    if url.scheme() != "file" {
        return None;
    }

    let path = percent_encoding::percent_decode_str(url.path())
        .decode_utf8()
        .ok()?;

    // Drive-letter paths arrive as "/C:/..."
    #[cfg(windows)]
    let path = path.strip_prefix('/').unwrap_or(&path);

    Some(PathBuf::from(path.as_ref()))
}

/// Convert a [`Path`] to a `file://` URL.
///
/// Relative paths are canonicalized first; when that fails (the path may not
/// exist yet) the conversion is attempted as-is.
#[must_use]
pub fn path_to_url(path: &Path) -> Option<Url> {
    if path.is_absolute() {
        return Url::from_file_path(path).ok();
    }
    if let Ok(absolute) = std::fs::canonicalize(path) {
        return Url::from_file_path(absolute).ok();
    }
    Url::from_file_path(path).ok()
}
