use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::handlers::Handlers;
use crate::http::connection::{Connection, ReadProgress};
use crate::http::writer::WriteProgress;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CLIENT: usize = 2;

/// Single-threaded readiness loop owning the listening socket and every
/// live connection.
pub struct EventLoop {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    handlers: Handlers,
    max_request_bytes: usize,
    idle_timeout: Option<Duration>,
    max_events: usize,
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

/// Stops a running [`EventLoop`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) -> io::Result<()> {
        self.flag.store(true, Ordering::Release);
        self.waker.wake()
    }
}

impl EventLoop {
    /// Binds the listening socket and prepares the storage roots.
    pub fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let addr = cfg
            .server
            .listen_addr
            .to_socket_addrs()
            .with_context(|| format!("invalid listen address {}", cfg.server.listen_addr))?
            .next()
            .with_context(|| format!("listen address {} did not resolve", cfg.server.listen_addr))?;

        anyhow::ensure!(
            cfg.storage.web_root.is_dir(),
            "web root {} is not a directory",
            cfg.storage.web_root.display()
        );
        std::fs::create_dir_all(&cfg.storage.upload_root).with_context(|| {
            format!(
                "failed to create upload root {}",
                cfg.storage.upload_root.display()
            )
        })?;

        let mut listener =
            TcpListener::bind(addr).with_context(|| format!("failed to bind {}", addr))?;
        let poll = Poll::new().context("failed to create poll instance")?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        Ok(Self {
            poll,
            listener,
            connections: HashMap::new(),
            next_token: FIRST_CLIENT,
            handlers: Handlers::new(&cfg.storage),
            max_request_bytes: cfg.server.max_request_bytes,
            idle_timeout: cfg.idle_timeout(),
            max_events: cfg.server.max_events.max(1),
            shutdown: Arc::new(AtomicBool::new(false)),
            waker,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: self.shutdown.clone(),
            waker: self.waker.clone(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Runs until a [`ShutdownHandle`] fires or polling itself fails.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut events = Events::with_capacity(self.max_events);
        info!(addr = %self.local_addr()?, "Listening");

        while !self.shutdown.load(Ordering::Acquire) {
            let timeout = self.poll_timeout(Instant::now());
            if let Err(e) = self.poll.poll(&mut events, timeout) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                error!(error = %e, "Poll failed");
                return Err(e).context("poll failed");
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_all(),
                    WAKER => {}
                    token => self.handle_client_event(token, event),
                }
            }

            self.close_idle(Instant::now());
        }

        info!(open = self.connections.len(), "Event loop shutting down");
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.close(token);
        }

        Ok(())
    }

    /// Blocks indefinitely while no connection can time out.
    fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        let idle = self.idle_timeout?;
        self.connections
            .values()
            .map(|conn| conn.deadline(idle))
            .min()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    fn accept_all(&mut self) {
        loop {
            // mio hands back sockets already in non-blocking mode.
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(e) =
                        self.poll
                            .registry()
                            .register(&mut stream, token, Interest::READABLE)
                    {
                        error!(%peer, error = %e, "Failed to register connection");
                        continue;
                    }

                    debug!(%peer, token = token.0, "Accepted connection");
                    self.connections.insert(
                        token,
                        Connection::new(stream, Some(peer), self.max_request_bytes),
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "Error accepting connection");
                    break;
                }
            }
        }
    }

    fn handle_client_event(&mut self, token: Token, event: &Event) {
        if event.is_error() {
            debug!(token = token.0, "Socket error reported");
            self.close(token);
            return;
        }

        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        let peer = conn.peer();
        let mut finished = false;

        if event.is_readable() && conn.is_reading() {
            match conn.read_ready() {
                Ok(ReadProgress::Pending) => {}
                Ok(ReadProgress::Complete(request)) => {
                    info!(
                        ?peer,
                        method = request.method.as_str(),
                        path = %request.path,
                        bytes = request.raw().len(),
                        "Request received"
                    );
                    let response = self.handlers.dispatch(&request);
                    conn.respond(response);
                }
                Ok(ReadProgress::PeerClosed) => {
                    debug!(?peer, buffered = conn.bytes_read(), "Peer closed before completing request");
                    finished = true;
                }
                Err(e) => match e.to_response() {
                    Some(response) => {
                        warn!(?peer, error = %e, "Rejecting request");
                        conn.respond(response);
                    }
                    None => {
                        debug!(?peer, error = %e, "Connection failed");
                        finished = true;
                    }
                },
            }
        }

        if !finished && conn.is_writing() {
            match conn.write_ready() {
                Ok(WriteProgress::Done) => finished = true,
                Ok(WriteProgress::Pending) => {
                    if let Err(e) = self.poll.registry().reregister(
                        conn.stream_mut(),
                        token,
                        Interest::WRITABLE,
                    ) {
                        error!(?peer, error = %e, "Failed to wait for writability");
                        finished = true;
                    }
                }
                Err(e) => {
                    debug!(?peer, error = %e, "Write failed");
                    finished = true;
                }
            }
        }

        if finished {
            self.close(token);
        }
    }

    fn close_idle(&mut self, now: Instant) {
        let Some(idle) = self.idle_timeout else {
            return;
        };

        let expired: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_idle(now, idle))
            .map(|(token, _)| *token)
            .collect();

        for token in expired {
            if let Some(conn) = self.connections.get(&token) {
                warn!(
                    peer = ?conn.peer(),
                    buffered = conn.bytes_read(),
                    timeout_secs = idle.as_secs(),
                    "Closing idle connection"
                );
            }
            self.close(token);
        }
    }

    /// Deregisters and drops a connection, closing its socket.
    fn close(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            if let Err(e) = self.poll.registry().deregister(conn.stream_mut()) {
                debug!(token = token.0, error = %e, "Deregister failed");
            }
        }
    }
}
