//! Failure taxonomy for a single connection's request.
//!
//! Every variant is caught at the dispatch boundary and turned into at most
//! one HTTP response; none of them reach the event loop itself.

use std::fmt;
use std::io;

use crate::http::multipart::MultipartError;
use crate::http::parser::ParseError;
use crate::http::response::{Response, StatusCode};

#[derive(Debug)]
pub enum RequestError {
    /// Accept, read or write failed; nothing can be sent back.
    Connection(io::Error),
    /// The request or its upload body could not be interpreted.
    Malformed(String),
    /// The requested static file does not exist or may not be served.
    NotFound(String),
    /// The request exceeds the assembly buffer limit.
    Oversized { limit: usize },
    /// A POST declared a zero-length body.
    EmptyUpload,
    /// The uploaded file could not be written.
    Storage(io::Error),
}

impl RequestError {
    /// Status to answer with, or `None` when the peer is unreachable.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Connection(_) => None,
            RequestError::NotFound(_) => Some(StatusCode::NotFound),
            RequestError::Malformed(_)
            | RequestError::Oversized { .. }
            | RequestError::EmptyUpload
            | RequestError::Storage(_) => Some(StatusCode::InternalServerError),
        }
    }

    pub fn to_response(&self) -> Option<Response> {
        self.status().map(|status| match status {
            StatusCode::NotFound => Response::not_found(),
            _ => Response::internal_error(),
        })
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Connection(e) => write!(f, "connection error: {}", e),
            RequestError::Malformed(reason) => write!(f, "malformed request: {}", reason),
            RequestError::NotFound(path) => write!(f, "not found: {}", path),
            RequestError::Oversized { limit } => {
                write!(f, "request exceeds {} bytes", limit)
            }
            RequestError::EmptyUpload => write!(f, "upload has an empty body"),
            RequestError::Storage(e) => write!(f, "failed to store upload: {}", e),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Connection(e) | RequestError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RequestError {
    fn from(e: io::Error) -> Self {
        RequestError::Connection(e)
    }
}

impl From<ParseError> for RequestError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Malformed(reason) => RequestError::Malformed(reason.to_string()),
            ParseError::Oversized { limit } => RequestError::Oversized { limit },
        }
    }
}

impl From<MultipartError> for RequestError {
    fn from(e: MultipartError) -> Self {
        RequestError::Malformed(e.to_string())
    }
}
