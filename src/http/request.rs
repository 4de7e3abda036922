use crate::http::parser;

/// Longest request path kept from the request line, in bytes.
pub const MAX_PATH_LEN: usize = 255;

/// HTTP request methods.
///
/// Only GET and POST are served. Anything else parses as `OTHER` and is
/// answered with 404 Not Found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a static file
    GET,
    /// POST - Upload a file as multipart/form-data
    POST,
    /// Any other token in the method position
    OTHER,
}

impl Method {
    /// Parses an HTTP method from the first request-line token.
    ///
    /// Matching is case-sensitive, as on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use courier::http::request::Method;
    /// assert_eq!(Method::from_bytes(b"GET"), Method::GET);
    /// assert_eq!(Method::from_bytes(b"get"), Method::OTHER);
    /// ```
    pub fn from_bytes(token: &[u8]) -> Self {
        match token {
            b"GET" => Method::GET,
            b"POST" => Method::POST,
            _ => Method::OTHER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::OTHER => "OTHER",
        }
    }
}

/// The parsed head of a request: request line plus the offsets needed to
/// decide when the whole request has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    /// Request target, truncated to [`MAX_PATH_LEN`] bytes.
    pub path: String,
    /// Offset of the first body byte (just past the header terminator).
    pub header_end: usize,
    /// Declared `Content-Length`, 0 when absent or unparsable.
    pub content_length: usize,
}

impl RequestHead {
    /// Total number of bytes the request occupies on the wire.
    pub fn total_len(&self) -> usize {
        self.header_end.saturating_add(self.content_length)
    }

    /// Returns true once `bytes_read` covers the headers and the declared body.
    pub fn is_complete(&self, bytes_read: usize) -> bool {
        bytes_read >= self.total_len()
    }

    /// Attaches the raw bytes the head was parsed from.
    pub fn into_request(self, raw: Vec<u8>) -> ParsedRequest {
        ParsedRequest {
            method: self.method,
            path: self.path,
            header_end: self.header_end,
            content_length: self.content_length,
            raw,
        }
    }
}

/// A fully assembled request.
///
/// Owns the bytes read from the connection; header values and the body
/// are views into `raw`.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: Method,
    pub path: String,
    header_end: usize,
    content_length: usize,
    raw: Vec<u8>,
}

impl ParsedRequest {
    /// Retrieves a header value by name, case-insensitively.
    ///
    /// Returns `None` if the header is absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        parser::header_value(self.head_bytes(), name)
    }

    /// The header section, request line included, without the terminator.
    pub fn head_bytes(&self) -> &[u8] {
        let end = self.header_end.saturating_sub(parser::HEADER_TERMINATOR.len());
        &self.raw[..end]
    }

    /// The body, limited to the declared `Content-Length`.
    pub fn body(&self) -> &[u8] {
        let end = self.header_end + self.content_length;
        &self.raw[self.header_end..end.min(self.raw.len())]
    }

    /// Content length used for assembly (lenient, 0 when unparsable).
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}
