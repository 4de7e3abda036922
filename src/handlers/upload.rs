use std::fs;
use std::path::Path;

use crate::error::RequestError;
use crate::http::multipart;
use crate::http::request::ParsedRequest;
use crate::http::response::Response;
use crate::http::sanitize;

pub const UPLOAD_OK_BODY: &str = "Upload Successful\n";

/// Stores the first file part of a multipart POST under `upload_root`.
///
/// An existing file with the same name is overwritten; concurrent uploads
/// of one name race and the last write wins.
pub fn serve_post(upload_root: &Path, request: &ParsedRequest) -> Result<Response, RequestError> {
    let declared: usize = request
        .header("Content-Length")
        .ok_or_else(|| RequestError::Malformed("missing Content-Length".to_string()))?
        .parse()
        .map_err(|_| RequestError::Malformed("invalid Content-Length".to_string()))?;

    if declared == 0 {
        return Err(RequestError::EmptyUpload);
    }

    let content_type = request
        .header("Content-Type")
        .ok_or_else(|| RequestError::Malformed("missing Content-Type".to_string()))?;
    let boundary = multipart::parse_boundary(content_type)?;

    let body = request.body();
    let part = multipart::extract_file_part(body, &boundary)?;

    let filename = sanitize::sanitize_filename(&part.filename).ok_or_else(|| {
        RequestError::Malformed(format!("rejected upload filename {:?}", part.filename))
    })?;

    let destination = upload_root.join(filename);
    fs::write(&destination, part.data(body)).map_err(RequestError::Storage)?;

    tracing::info!(
        filename,
        bytes = part.len(),
        path = %destination.display(),
        "Upload stored"
    );

    Ok(Response::ok(UPLOAD_OK_BODY))
}
