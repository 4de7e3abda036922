//! Request dispatch: GET serves static files, POST stores uploads, every
//! other method gets 404.

pub mod static_files;
pub mod upload;

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::http::request::{Method, ParsedRequest};
use crate::http::response::Response;

/// Turns assembled requests into responses.
#[derive(Debug, Clone)]
pub struct Handlers {
    web_root: PathBuf,
    upload_root: PathBuf,
}

impl Handlers {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            web_root: storage.web_root.clone(),
            upload_root: storage.upload_root.clone(),
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Produces exactly one response for `request`; failures become 404/500.
    pub fn dispatch(&self, request: &ParsedRequest) -> Response {
        let result = match request.method {
            Method::GET => static_files::serve_get(&self.web_root, &request.path),
            Method::POST => upload::serve_post(&self.upload_root, request),
            Method::OTHER => {
                tracing::debug!(path = %request.path, "Unsupported method");
                return Response::not_found();
            }
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(
                method = request.method.as_str(),
                path = %request.path,
                error = %e,
                "Request rejected"
            );
            e.to_response().unwrap_or_else(Response::internal_error)
        })
    }
}
