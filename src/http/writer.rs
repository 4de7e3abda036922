use std::fs::File;
use std::io::{self, Read, Write};

use crate::http::response::{Body, Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.0";

/// Size of each slice of a file body read into memory before sending.
pub const FILE_CHUNK_SIZE: usize = 16 * 1024;

/// Serializes the status line and headers, including the blank line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");

    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteProgress {
    /// Every byte of the response has been written.
    Done,
    /// The socket stopped accepting bytes; resume on the next writable event.
    Pending,
}

/// Writes one response to a non-blocking socket, resuming where it left off.
///
/// In-memory bodies go out together with the header. File bodies follow
/// the header in [`FILE_CHUNK_SIZE`] pieces, never more than the declared
/// length.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    buffer: Vec<u8>,
    written: usize,
    file: Option<File>,
    remaining: u64,
    sent: u64,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        let mut buffer = serialize_head(&response);
        let status = response.status;

        let (file, remaining) = match response.body {
            Body::Bytes(bytes) => {
                buffer.extend_from_slice(&bytes);
                (None, 0)
            }
            Body::File { file, len } => (Some(file), len),
        };

        Self {
            status,
            buffer,
            written: 0,
            file,
            remaining,
            sent: 0,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Total bytes handed to the socket so far, header included.
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Writes as much as `out` accepts without blocking.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> io::Result<WriteProgress> {
        loop {
            while self.written < self.buffer.len() {
                match out.write(&self.buffer[self.written..]) {
                    Ok(0) => {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "connection closed while writing",
                        ));
                    }
                    Ok(n) => {
                        self.written += n;
                        self.sent += n as u64;
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        return Ok(WriteProgress::Pending);
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }

            if !self.refill()? {
                return Ok(WriteProgress::Done);
            }
        }
    }

    /// Loads the next file chunk into the buffer. Returns false when the
    /// body is exhausted.
    fn refill(&mut self) -> io::Result<bool> {
        let Some(file) = self.file.as_mut() else {
            return Ok(false);
        };
        if self.remaining == 0 {
            return Ok(false);
        }

        let want = (FILE_CHUNK_SIZE as u64).min(self.remaining) as usize;
        self.buffer.resize(want, 0);

        let n = loop {
            match file.read(&mut self.buffer[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file shrank while sending",
            ));
        }

        self.buffer.truncate(n);
        self.written = 0;
        self.remaining -= n as u64;
        Ok(true)
    }
}
