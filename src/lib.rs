//! Courier - readiness-driven static file and upload server
//!
//! Serves files from a web root over HTTP/1.0 and stores files posted as
//! `multipart/form-data` in an upload root, multiplexing every connection
//! on a single thread.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod server;
