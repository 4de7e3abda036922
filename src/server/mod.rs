//! Connection multiplexing.
//!
//! [`listener::EventLoop`] waits on one readiness poller for the listening
//! socket and all client sockets, assembling each request across as many
//! readable notifications as it takes and writing the response as the
//! socket drains.

pub mod listener;

pub use listener::{EventLoop, ShutdownHandle};
