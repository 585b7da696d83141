//! Per-connection request and response buffers.
//!
//! Both buffers are bounded and allocated once when the connection is
//! accepted. The inbound buffer accumulates request bytes until the header
//! delimiter shows up; the outbound buffer holds one serialized response and
//! tracks how much of it has reached the socket.

use crate::protocols::http::Response;
use bytes::BytesMut;

/// Bounded accumulator for request bytes.
///
/// Invariant: `len <= capacity`.
#[derive(Debug)]
pub struct InboundBuffer {
    data: Box<[u8]>,
    len: usize,
    overflowed: bool,
}

impl InboundBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            overflowed: false,
        }
    }

    /// Valid prefix received so far.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Unused tail for the next read.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mark `n` more bytes of the tail as received.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.len + n <= self.data.len(), "inbound overflow");
        self.len = (self.len + n).min(self.data.len());
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    /// Record that the peer sent more than the buffer can hold.
    pub fn mark_overflowed(&mut self) {
        self.overflowed = true;
    }

    /// Whether request bytes were left unread because the buffer was full.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

/// Bounded holder for one serialized response.
///
/// Invariant: `offset <= total <= capacity`.
#[derive(Debug)]
pub struct OutboundBuffer {
    data: BytesMut,
    offset: usize,
    capacity: usize,
}

impl OutboundBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            offset: 0,
            capacity,
        }
    }

    /// Serialize `response`, replacing any previous content.
    ///
    /// A response longer than the capacity is cut at the capacity.
    /// Returns the total number of bytes to send.
    pub fn load(&mut self, response: &Response) -> usize {
        self.data.clear();
        response.encode_into(&mut self.data);
        self.data.truncate(self.capacity);
        self.offset = 0;
        self.data.len()
    }

    /// Bytes not yet sent.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    /// Mark `n` more bytes as sent.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.offset + n <= self.data.len(), "outbound overrun");
        self.offset = (self.offset + n).min(self.data.len());
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total(&self) -> usize {
        self.data.len()
    }

    pub fn is_drained(&self) -> bool {
        self.offset == self.data.len()
    }
}
