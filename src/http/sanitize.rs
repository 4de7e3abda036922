//! Keeps client-supplied paths and filenames inside their configured roots.

use std::path::{Path, PathBuf};

use crate::http::multipart::MAX_FILENAME_LEN;

/// File served for a request to `/`.
pub const INDEX_FILE: &str = "index.html";

/// Maps a request path onto a file under `root`.
///
/// Query strings and fragments are dropped. Returns `None` for anything
/// that could escape the root: parent-directory segments, backslashes, NUL
/// bytes, or a target that does not start with `/`.
pub fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let path = request_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    if !path.starts_with('/') {
        return None;
    }

    let mut resolved = root.to_path_buf();
    let mut segments = 0;

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains(['\\', '\0']) => return None,
            s => {
                resolved.push(s);
                segments += 1;
            }
        }
    }

    if segments == 0 {
        resolved.push(INDEX_FILE);
    }

    Some(resolved)
}

/// Validates an uploaded filename for use as a single path component.
pub fn sanitize_filename(name: &str) -> Option<&str> {
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return None;
    }

    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return None;
    }

    Some(name)
}
