use std::fs::File;
use std::path::Path;

use crate::error::RequestError;
use crate::http::mime;
use crate::http::response::Response;
use crate::http::sanitize;

/// Serves the file at `path` under `web_root`, with `/` meaning `index.html`.
///
/// Paths that try to leave the root are answered exactly like missing
/// files.
pub fn serve_get(web_root: &Path, path: &str) -> Result<Response, RequestError> {
    let full_path = sanitize::resolve_request_path(web_root, path)
        .ok_or_else(|| RequestError::NotFound(path.to_string()))?;

    let file = File::open(&full_path).map_err(|_| RequestError::NotFound(path.to_string()))?;
    let metadata = file
        .metadata()
        .map_err(|_| RequestError::NotFound(path.to_string()))?;

    if !metadata.is_file() {
        return Err(RequestError::NotFound(path.to_string()));
    }

    tracing::debug!(path, file = %full_path.display(), size = metadata.len(), "Serving file");

    Ok(Response::file(
        file,
        metadata.len(),
        mime::content_type_for(&full_path),
    ))
}
