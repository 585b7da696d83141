//! mio event loop implementation.
//!
//! Readiness-based model: poll tells us when sockets are ready,
//! then we perform non-blocking read/write syscalls.
//! Uses epoll on Linux, kqueue on macOS.
//!
//! mio notifications are edge-triggered, so every readiness callback keeps
//! reading or writing until the socket reports `WouldBlock`.

use crate::config::Config;
use crate::runtime::connection::{Connection, ConnectionRegistry, Phase, Progress};
use crate::storage::ResourceStore;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const LISTENER_TOKEN: Token = Token(usize::MAX);

/// Listen backlog for each reactor's socket.
const LISTEN_BACKLOG: i32 = 1024;

/// Per-reactor limits derived from the configuration.
#[derive(Debug, Clone)]
pub struct ReactorSettings {
    pub max_connections: usize,
    pub batch_size: usize,
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    /// `None` disables idle reaping.
    pub idle_timeout: Option<Duration>,
}

impl From<&Config> for ReactorSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_connections: config.max_connections,
            batch_size: config.batch_size,
            read_buffer_size: config.read_buffer_size,
            write_buffer_size: config.write_buffer_size,
            idle_timeout: match config.idle_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

/// Run the mio-based server.
///
/// Listeners are bound before any worker starts so that a bind failure
/// aborts startup instead of killing a single worker.
pub fn run(config: Config, store: Arc<ResourceStore>) -> io::Result<()> {
    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let settings = ReactorSettings::from(&config);
    let num_workers = config.workers.max(1);

    info!(
        workers = num_workers,
        addr = %addr,
        resource = %config.resource_path.display(),
        "Starting mio runtime"
    );

    let mut reactors = Vec::with_capacity(num_workers);
    for worker_id in 0..num_workers {
        let listener = create_listener(addr, num_workers > 1)?;
        reactors.push(Reactor::new(
            worker_id,
            listener,
            settings.clone(),
            Arc::clone(&store),
        )?);
    }

    let mut handles = Vec::with_capacity(num_workers);
    for mut reactor in reactors {
        let worker_id = reactor.worker_id;
        let handle = thread::Builder::new()
            .name(format!("worker-{worker_id}"))
            .spawn(move || {
                if let Err(e) = reactor.run() {
                    error!(worker = worker_id, error = %e, "Worker failed");
                }
            })?;
        handles.push(handle);
    }

    // Wait for all workers
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// One readiness loop: a listener plus every connection it accepted.
pub struct Reactor {
    worker_id: usize,
    poll: Poll,
    listener: TcpListener,
    connections: ConnectionRegistry<TcpStream>,
    store: Arc<ResourceStore>,
    settings: ReactorSettings,
    accepted: u64,
    last_sweep: Instant,
}

impl Reactor {
    /// Wrap a bound listener and register it for read readiness.
    pub fn new(
        worker_id: usize,
        listener: std::net::TcpListener,
        settings: ReactorSettings,
        store: Arc<ResourceStore>,
    ) -> io::Result<Self> {
        listener.set_nonblocking(true)?;
        let mut listener = TcpListener::from_std(listener);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        Ok(Self {
            worker_id,
            poll,
            listener,
            connections: ConnectionRegistry::new(settings.max_connections),
            store,
            settings,
            accepted: 0,
            last_sweep: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of registered connections.
    #[cfg(test)]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Total connections accepted since start.
    #[cfg(test)]
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Loop forever, dispatching readiness events.
    pub fn run(&mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(self.settings.batch_size);
        let timeout = self.sweep_interval();

        let addr = self.local_addr()?;
        info!(worker = self.worker_id, addr = %addr, "Worker started");

        loop {
            self.run_once(&mut events, timeout)?;
        }
    }

    /// Wait for readiness at most `timeout`, dispatch what arrived, then
    /// reap idle connections.
    pub fn run_once(&mut self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        match self.poll.poll(events, timeout) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }

        for event in events.iter() {
            match event.token() {
                LISTENER_TOKEN => self.accept_connections(),
                Token(conn_id) => {
                    if let Err(e) = self.handle_connection_event(conn_id) {
                        debug!(worker = self.worker_id, conn_id, error = %e, "Connection error");
                        self.close_connection(conn_id);
                    }
                }
            }
        }

        self.reap_idle();
        Ok(())
    }

    /// Accept every pending connection. Failures end this round only.
    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    if !self.connections.has_room() {
                        warn!(worker = self.worker_id, peer = %peer_addr, "Connection limit reached");
                        drop(stream);
                        continue;
                    }

                    let conn = Connection::new(
                        stream,
                        self.settings.read_buffer_size,
                        self.settings.write_buffer_size,
                    );
                    let conn_id = match self.connections.insert(conn) {
                        Some(id) => id,
                        None => continue,
                    };

                    let registered = match self.connections.get_mut(conn_id) {
                        Some(conn) => self.poll.registry().register(
                            &mut conn.stream,
                            Token(conn_id),
                            Interest::READABLE,
                        ),
                        None => continue,
                    };
                    if let Err(e) = registered {
                        warn!(worker = self.worker_id, error = %e, "Failed to register connection");
                        self.connections.remove(conn_id);
                        continue;
                    }

                    self.accepted += 1;
                    debug!(
                        worker = self.worker_id,
                        conn_id,
                        peer = %peer_addr,
                        accepted = self.accepted,
                        "Accepted connection"
                    );
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(worker = self.worker_id, error = %e, "Accept error");
                    break;
                }
            }
        }
    }

    /// Drive one connection according to its phase.
    ///
    /// A connection is registered for exactly one interest at a time, so
    /// the phase alone decides whether to read or write.
    fn handle_connection_event(&mut self, conn_id: usize) -> io::Result<()> {
        let conn = match self.connections.get_mut(conn_id) {
            Some(conn) => conn,
            // Closed earlier in this batch
            None => return Ok(()),
        };

        let progress = match conn.phase() {
            Phase::Reading => conn.on_readable(&self.store)?,
            Phase::Writing => conn.on_writable()?,
            Phase::Draining => conn.on_drainable()?,
        };

        match progress {
            Progress::Pending => {}
            Progress::Respond => {
                self.poll.registry().reregister(
                    &mut conn.stream,
                    Token(conn_id),
                    Interest::WRITABLE,
                )?;
            }
            Progress::Linger => {
                conn.stream.shutdown(Shutdown::Write)?;
                self.poll.registry().reregister(
                    &mut conn.stream,
                    Token(conn_id),
                    Interest::READABLE,
                )?;
            }
            Progress::Done => self.close_connection(conn_id),
        }

        Ok(())
    }

    fn close_connection(&mut self, conn_id: usize) {
        if let Some(mut conn) = self.connections.remove(conn_id) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
            debug!(
                worker = self.worker_id,
                conn_id,
                received = conn.inbound().len(),
                sent = conn.outbound().offset(),
                total = conn.outbound().total(),
                open = self.connections.len(),
                "Connection closed"
            );
        }
    }

    fn sweep_interval(&self) -> Option<Duration> {
        self.settings
            .idle_timeout
            .map(|timeout| (timeout / 2).max(Duration::from_millis(1)))
    }

    fn reap_idle(&mut self) {
        let (timeout, interval) = match (self.settings.idle_timeout, self.sweep_interval()) {
            (Some(timeout), Some(interval)) => (timeout, interval),
            _ => return,
        };

        let now = Instant::now();
        if now.saturating_duration_since(self.last_sweep) < interval {
            return;
        }
        self.last_sweep = now;

        for conn_id in self.connections.idle(now, timeout) {
            debug!(worker = self.worker_id, conn_id, "Closing idle connection");
            self.close_connection(conn_id);
        }
    }
}

/// Create a non-blocking TCP listener, sharing the port between reactors
/// with SO_REUSEPORT when there is more than one.
fn create_listener(addr: SocketAddr, reuse_port: bool) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    if reuse_port {
        socket.set_reuse_port(true)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}
