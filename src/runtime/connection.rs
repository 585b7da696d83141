//! Connection state machine for managing client connections.
//!
//! Each connection tracks its phase (reading the request or writing the
//! response) together with its bounded inbound and outbound buffers.
//! The event loop calls [`Connection::on_readable`] and
//! [`Connection::on_writable`] when the socket reports readiness; both
//! consume all the progress the socket allows and stop at `WouldBlock`.
//!
//! ```text
//! Reading --(delimiter seen / inbound full)--> Writing --(drained)--> Done
//!    |                                            |
//!    |                                  (request overflowed)
//!    |                                            v
//!    |                                        Draining --(peer EOF)--> Done
//!    +--(EOF before delimiter, I/O error)--> closed by the event loop
//! ```

use crate::runtime::buffer::{InboundBuffer, OutboundBuffer};
use crate::runtime::protocol::{process_http, ProcessResult};
use crate::storage::ResourceStore;
use slab::Slab;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::trace;

/// Most input discarded after rejecting an oversized request.
const MAX_DISCARD: usize = 1024 * 1024;

/// Current phase of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accumulating request bytes.
    Reading,
    /// Sending the response.
    Writing,
    /// Response sent; discarding the rest of an oversized request.
    Draining,
}

/// What the event loop has to do after a readiness callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Keep the current registration and wait.
    Pending,
    /// A response is ready; switch the registration to writable.
    Respond,
    /// Response sent but unread input remains; shut down the write side
    /// and switch the registration back to readable.
    Linger,
    /// The response is fully sent; close the connection.
    Done,
}

/// A single client connection.
#[derive(Debug)]
pub struct Connection<S> {
    /// Non-blocking socket (or any stream in tests).
    pub stream: S,
    phase: Phase,
    inbound: InboundBuffer,
    outbound: OutboundBuffer,
    discarded: usize,
    last_active: Instant,
}

impl<S: Read + Write> Connection<S> {
    /// Create a new connection in the reading phase with empty buffers.
    pub fn new(stream: S, read_capacity: usize, write_capacity: usize) -> Self {
        Self {
            stream,
            phase: Phase::Reading,
            inbound: InboundBuffer::new(read_capacity),
            outbound: OutboundBuffer::new(write_capacity),
            discarded: 0,
            last_active: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Handle read readiness.
    ///
    /// Reads until the socket would block, the inbound buffer is full, or
    /// the peer closes. EOF is fatal unless a complete header block already
    /// arrived, in which case the peer only half-closed and still gets its
    /// response.
    ///
    /// The request runs as soon as the delimiter is present. Body bytes the
    /// peer has not sent yet are not waited for: a PUT whose body arrives
    /// after its header block replaces the resource with whatever was read,
    /// possibly nothing. A request that does not fit the inbound buffer is
    /// answered with 400 and never reaches the store.
    pub fn on_readable(&mut self, store: &ResourceStore) -> io::Result<Progress> {
        if self.phase != Phase::Reading {
            return Ok(Progress::Pending);
        }

        let mut eof = false;
        loop {
            if self.inbound.is_full() {
                // One byte past capacity tells an exact fit from an oversized request
                let mut extra = [0u8; 1];
                match self.stream.read(&mut extra) {
                    Ok(0) => eof = true,
                    Ok(_) => self.inbound.mark_overflowed(),
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
                break;
            }

            match self.stream.read(self.inbound.spare_mut()) {
                Ok(0) => {
                    eof = true;
                    break;
                }
                Ok(n) => {
                    self.inbound.advance(n);
                    self.last_active = Instant::now();
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        match process_http(&self.inbound, &mut self.outbound, store) {
            ProcessResult::NeedData if eof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed before request was complete",
            )),
            ProcessResult::NeedData => Ok(Progress::Pending),
            ProcessResult::Response { response_len } => {
                trace!(
                    response_len,
                    overflowed = self.inbound.overflowed(),
                    "Response ready"
                );
                self.phase = Phase::Writing;
                Ok(Progress::Respond)
            }
        }
    }

    /// Handle write readiness.
    ///
    /// Writes until the response is drained or the socket would block.
    pub fn on_writable(&mut self) -> io::Result<Progress> {
        if self.phase != Phase::Writing {
            return Ok(Progress::Pending);
        }

        while !self.outbound.is_drained() {
            match self.stream.write(self.outbound.pending()) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
                }
                Ok(n) => {
                    self.outbound.advance(n);
                    self.last_active = Instant::now();
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Progress::Pending)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if self.inbound.overflowed() {
            self.phase = Phase::Draining;
            return Ok(Progress::Linger);
        }
        Ok(Progress::Done)
    }

    /// Handle read readiness after an oversized request was rejected.
    ///
    /// Discards input until the peer closes, so that closing the socket
    /// with unread data does not reset the connection before the peer has
    /// read the response. Gives up after [`MAX_DISCARD`] bytes.
    pub fn on_drainable(&mut self) -> io::Result<Progress> {
        if self.phase != Phase::Draining {
            return Ok(Progress::Pending);
        }

        let mut scratch = [0u8; 4096];
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => return Ok(Progress::Done),
                Ok(n) => {
                    self.discarded += n;
                    self.last_active = Instant::now();
                    if self.discarded >= MAX_DISCARD {
                        return Ok(Progress::Done);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Progress::Pending)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether the connection made no progress for at least `timeout`.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active) >= timeout
    }

    pub fn inbound(&self) -> &InboundBuffer {
        &self.inbound
    }

    pub fn outbound(&self) -> &OutboundBuffer {
        &self.outbound
    }
}

/// Registry of active connections using slab allocation.
///
/// Provides O(1) insert, lookup, and remove operations. Slab keys double
/// as poll tokens, so a removed connection can never be reached through a
/// stale event.
pub struct ConnectionRegistry<S> {
    connections: Slab<Connection<S>>,
    max_connections: usize,
}

impl<S> ConnectionRegistry<S> {
    /// Create a new registry with specified maximum capacity.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Slab::with_capacity(max_connections),
            max_connections,
        }
    }

    /// Whether another connection can be inserted.
    pub fn has_room(&self) -> bool {
        self.connections.len() < self.max_connections
    }

    /// Insert a new connection into the registry.
    ///
    /// Returns `None` if the registry is at capacity.
    pub fn insert(&mut self, conn: Connection<S>) -> Option<usize> {
        if !self.has_room() {
            return None;
        }
        Some(self.connections.insert(conn))
    }

    /// Get a mutable reference to a connection.
    pub fn get_mut(&mut self, id: usize) -> Option<&mut Connection<S>> {
        self.connections.get_mut(id)
    }

    /// Remove a connection from the registry.
    pub fn remove(&mut self, id: usize) -> Option<Connection<S>> {
        self.connections.try_remove(id)
    }

    /// Number of active connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Identifiers of connections idle for at least `timeout`.
    pub fn idle(&self, now: Instant, timeout: Duration) -> Vec<usize>
    where
        S: Read + Write,
    {
        self.connections
            .iter()
            .filter(|(_, conn)| conn.is_idle(now, timeout))
            .map(|(id, _)| id)
            .collect()
    }
}
