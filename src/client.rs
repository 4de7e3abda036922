//! Minimal client used to exercise a running server.
//!
//! Builds the same raw GET and multipart POST requests a browser form
//! would send, writes them over a fresh TCP connection and returns the
//! server's bytes untouched.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Boundary token used for every upload.
pub const BOUNDARY: &str = "CusBoundary123";

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

const BUFFER_SIZE: usize = 8192;

pub struct Client {
    addr: String,
    host: String,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl Client {
    /// Creates a client for the server at `server` (e.g. `http://127.0.0.1:8080`).
    pub fn new(server: &url::Url) -> Result<Self> {
        let host = server.host_str().context("Server URL missing host")?;
        let port = server.port_or_known_default().unwrap_or(80);

        Ok(Self {
            addr: format!("{}:{}", host, port),
            host: host.to_string(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Requests `path` and returns the raw response.
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.send(&build_get_request(path, &self.host)).await
    }

    /// Uploads the file at `file` and returns the raw response.
    pub async fn post_file(&self, file: &Path) -> Result<Vec<u8>> {
        let contents = tokio::fs::read(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        let filename = file
            .file_name()
            .and_then(|n| n.to_str())
            .context("upload path has no usable file name")?;

        self.send(&build_post_request(filename, &contents, &self.host))
            .await
    }

    /// Sends `request` over a new connection and reads until the server closes it.
    pub async fn send(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to {}", self.addr))?;

        stream.write_all(request).await?;
        stream.flush().await?;

        timeout(self.response_timeout, read_to_close(&mut stream))
            .await
            .context("Response timeout")?
    }
}

async fn read_to_close(stream: &mut TcpStream) -> Result<Vec<u8>> {
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            return Ok(buffer.to_vec());
        }
    }
}

pub fn build_get_request(path: &str, host: &str) -> Vec<u8> {
    format!("GET {} HTTP/1.0\r\nHost: {}\r\n\r\n", path, host).into_bytes()
}

/// Builds a multipart POST to `/upload` carrying `contents` as `filename`.
pub fn build_post_request(filename: &str, contents: &[u8], host: &str) -> Vec<u8> {
    let body_start = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\
         \r\n"
    );
    let body_end = format!("\r\n--{BOUNDARY}--\r\n");
    let content_length = body_start.len() + contents.len() + body_end.len();

    let mut buffer = format!(
        "POST /upload HTTP/1.0\r\n\
         Host: {host}\r\n\
         Content-Type: multipart/form-data; boundary={BOUNDARY}\r\n\
         Content-Length: {content_length}\r\n\
         \r\n"
    )
    .into_bytes();

    buffer.reserve(content_length);
    buffer.extend_from_slice(body_start.as_bytes());
    buffer.extend_from_slice(contents);
    buffer.extend_from_slice(body_end.as_bytes());
    buffer
}

/// A response split into its parts, for inspecting what the server sent.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.parse().ok()
    }
}

/// Splits raw response bytes into status, headers and body.
pub fn parse_response(raw: &[u8]) -> Result<RawResponse> {
    let headers_end = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .context("Response has no header terminator")?;

    let headers_str = std::str::from_utf8(&raw[..headers_end])
        .context("Invalid UTF-8 in response headers")?;

    let mut lines = headers_str.lines();

    let status_line = lines.next().context("Empty response")?;
    let parts: Vec<&str> = status_line.splitn(3, ' ').collect();

    if parts.len() < 2 {
        anyhow::bail!("Invalid status line: {}", status_line);
    }

    let status: u16 = parts[1].parse().context("Invalid status code")?;

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(RawResponse {
        status,
        headers,
        body: raw[headers_end + 4..].to_vec(),
    })
}
