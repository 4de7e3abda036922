//! HTTP/1.0 wire handling.
//!
//! One request per connection, no keep-alive, no chunked encoding.
//!
//! # Architecture
//!
//! - **`connection`**: Per-socket buffer and the read/write state machine
//! - **`parser`**: Request line, header lookup and request assembly
//! - **`multipart`**: Locates an uploaded file inside a multipart body
//! - **`sanitize`**: Keeps request paths and filenames inside their roots
//! - **`request`**: Parsed request types
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes responses and streams file bodies
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← One non-blocking drain per readable event
//!        └──────┬──────┘
//!               │ Request assembled, rejected, or peer closed
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Header, then body, as the socket accepts it
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Deregistered and dropped
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod mime;
pub mod multipart;
pub mod parser;
pub mod request;
pub mod response;
pub mod sanitize;
pub mod writer;
