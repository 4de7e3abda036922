use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::TcpStream;

use crate::error::RequestError;
use crate::http::parser::{self, Assembly, HEADER_TERMINATOR};
use crate::http::request::{ParsedRequest, RequestHead};
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, WriteProgress};

/// Bytes pulled from the socket per read call.
const READ_CHUNK: usize = 4096;

/// Most unread input drained from a socket before it is closed.
const DISCARD_LIMIT: usize = 1024 * 1024;

/// One client socket and the state of its single request/response exchange.
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: Option<SocketAddr>,
    buffer: Vec<u8>,
    /// How far the terminator search has already looked.
    scanned: usize,
    head: Option<RequestHead>,
    max_request_bytes: usize,
    state: ConnectionState,
    last_activity: Instant,
}

pub enum ConnectionState {
    Reading,
    Writing(ResponseWriter),
    Closed,
}

/// Outcome of draining a readable socket.
#[derive(Debug)]
pub enum ReadProgress {
    /// The socket has no more bytes for now.
    Pending,
    /// A full request is buffered.
    Complete(ParsedRequest),
    /// The peer closed before sending a complete request.
    PeerClosed,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S, peer: Option<SocketAddr>, max_request_bytes: usize) -> Self {
        Self {
            stream,
            peer,
            buffer: Vec::with_capacity(READ_CHUNK.min(max_request_bytes)),
            scanned: 0,
            head: None,
            max_request_bytes,
            state: ConnectionState::Reading,
            last_activity: Instant::now(),
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn bytes_read(&self) -> usize {
        self.buffer.len()
    }

    /// Offset just past the header terminator, once it has arrived.
    pub fn header_end(&self) -> Option<usize> {
        self.head.as_ref().map(|h| h.header_end)
    }

    /// Body length declared by the buffered headers.
    pub fn declared_body_length(&self) -> usize {
        self.head.as_ref().map_or(0, |h| h.content_length)
    }

    pub fn is_reading(&self) -> bool {
        matches!(self.state, ConnectionState::Reading)
    }

    pub fn is_writing(&self) -> bool {
        matches!(self.state, ConnectionState::Writing(_))
    }

    /// Returns true when nothing has happened for longer than `timeout`.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) >= timeout
    }

    pub fn deadline(&self, timeout: Duration) -> Instant {
        self.last_activity + timeout
    }

    /// Reads everything the socket has to offer without blocking and
    /// re-checks the buffer for a complete request.
    pub fn read_ready(&mut self) -> Result<ReadProgress, RequestError> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let room = self.max_request_bytes.saturating_sub(self.buffer.len());
            if room == 0 {
                return Err(RequestError::Oversized {
                    limit: self.max_request_bytes,
                });
            }

            let want = room.min(READ_CHUNK);
            let n = match self.stream.read(&mut chunk[..want]) {
                Ok(0) => {
                    self.state = ConnectionState::Closed;
                    return Ok(ReadProgress::PeerClosed);
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadProgress::Pending);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RequestError::Connection(e)),
            };

            self.buffer.extend_from_slice(&chunk[..n]);
            self.last_activity = Instant::now();

            tracing::trace!(
                peer = ?self.peer,
                bytes = n,
                buffered = self.buffer.len(),
                "Read request bytes"
            );

            if let Some(request) = self.try_assemble()? {
                return Ok(ReadProgress::Complete(request));
            }
        }
    }

    /// Resumes assembly from where the previous read left off.
    fn try_assemble(&mut self) -> Result<Option<ParsedRequest>, RequestError> {
        let head = match self.head.take() {
            Some(head) => head,
            None => {
                let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
                match parser::find_headers_end(&self.buffer, from) {
                    Some(header_end) => parser::parse_head(&self.buffer, header_end)?,
                    None => {
                        self.scanned = self.buffer.len();
                        return Ok(None);
                    }
                }
            }
        };

        match parser::check_assembly(head.clone(), self.buffer.len(), self.max_request_bytes)? {
            Assembly::Complete(head) => {
                let raw = std::mem::take(&mut self.buffer);
                Ok(Some(head.into_request(raw)))
            }
            Assembly::Incomplete => {
                self.head = Some(head);
                Ok(None)
            }
        }
    }

    /// Queues `response` as the connection's only response.
    pub fn respond(&mut self, response: Response) {
        self.state = ConnectionState::Writing(ResponseWriter::new(response));
        self.last_activity = Instant::now();
    }

    /// Continues writing the queued response.
    pub fn write_ready(&mut self) -> io::Result<WriteProgress> {
        let ConnectionState::Writing(writer) = &mut self.state else {
            return Ok(WriteProgress::Done);
        };

        let before = writer.bytes_sent();
        let progress = writer.write_to(&mut self.stream)?;
        if writer.bytes_sent() != before {
            self.last_activity = Instant::now();
        }

        if progress == WriteProgress::Done {
            tracing::info!(
                peer = ?self.peer,
                status = writer.status().as_u16(),
                bytes = writer.bytes_sent(),
                "Response sent"
            );
            self.state = ConnectionState::Closed;
            self.discard_unread();
        }

        Ok(progress)
    }

    /// Drops request bytes still queued on the socket so closing it sends a
    /// FIN rather than a reset that could destroy the response in flight.
    fn discard_unread(&mut self) {
        let mut scratch = [0u8; READ_CHUNK];
        let mut budget = DISCARD_LIMIT;

        while budget > 0 {
            match self.stream.read(&mut scratch) {
                Ok(0) => break,
                Ok(n) => budget = budget.saturating_sub(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Hands out queued chunks one per read, then blocks or reports EOF.
    struct ScriptedStream {
        chunks: VecDeque<Vec<u8>>,
        eof: bool,
        written: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(chunks: &[&[u8]], eof: bool) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                eof,
                written: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.front_mut() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    chunk.drain(..n);
                    if chunk.is_empty() {
                        self.chunks.pop_front();
                    }
                    Ok(n)
                }
                None if self.eof => Ok(0),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const POST: &[u8] = b"POST /upload HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello";

    #[test]
    fn assembles_across_notifications() {
        let mut conn = Connection::new(ScriptedStream::new(&[&b"P"[..]], false), None, 1024);
        assert!(matches!(conn.read_ready().unwrap(), ReadProgress::Pending));
        assert_eq!(conn.header_end(), None);

        // Stops between the two CRLFs of the terminator.
        conn.stream_mut().chunks.push_back(POST[1..43].to_vec());
        assert!(matches!(conn.read_ready().unwrap(), ReadProgress::Pending));
        assert_eq!(conn.header_end(), None);

        conn.stream_mut().chunks.push_back(POST[43..46].to_vec());
        assert!(matches!(conn.read_ready().unwrap(), ReadProgress::Pending));
        assert_eq!(conn.header_end(), Some(44));
        assert_eq!(conn.declared_body_length(), 5);

        conn.stream_mut().chunks.push_back(POST[46..].to_vec());
        let ReadProgress::Complete(request) = conn.read_ready().unwrap() else {
            panic!("expected a complete request");
        };
        assert_eq!(request.raw(), POST);
        assert_eq!(request.body(), b"hello");
    }

    #[test]
    fn peer_close_before_completion() {
        let mut conn = Connection::new(ScriptedStream::new(&[&b"GET / HT"[..]], true), None, 1024);
        assert!(matches!(conn.read_ready().unwrap(), ReadProgress::PeerClosed));
        assert!(!conn.is_reading());
    }

    #[test]
    fn rejects_requests_beyond_the_limit() {
        let mut conn = Connection::new(ScriptedStream::new(&[&[b'a'; 64][..]], false), None, 32);
        assert!(matches!(
            conn.read_ready(),
            Err(RequestError::Oversized { limit: 32 })
        ));

        let declared = b"POST / HTTP/1.0\r\nContent-Length: 1000\r\n\r\n";
        let mut conn = Connection::new(ScriptedStream::new(&[&declared[..]], false), None, 128);
        assert!(matches!(
            conn.read_ready(),
            Err(RequestError::Oversized { limit: 128 })
        ));
    }

    #[test]
    fn writes_queued_response_then_closes() {
        let mut conn = Connection::new(ScriptedStream::new(&[], false), None, 1024);
        conn.respond(Response::not_found());
        assert!(conn.is_writing());

        assert_eq!(conn.write_ready().unwrap(), WriteProgress::Done);
        assert!(conn.stream_mut().written.starts_with(b"HTTP/1.0 404 Not Found\r\n"));
        assert!(!conn.is_writing());
    }
}
