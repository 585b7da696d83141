//! Protocol processing for the runtime.
//!
//! Turns the bytes accumulated on a connection into a serialized response.
//! Synchronous and socket-free: the event loop owns all I/O.

use crate::protocols::http::{handle_request, parse, ParseResult, Response, Status};
use crate::runtime::buffer::{InboundBuffer, OutboundBuffer};
use crate::storage::ResourceStore;
use tracing::warn;

/// Result of processing the inbound buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Need more data to complete the header block.
    NeedData,
    /// Response written to the output buffer.
    Response { response_len: usize },
}

/// Process the request accumulated in `input`.
///
/// Once the header delimiter is present the request is executed against
/// `store` and its response loaded into `output`. A full inbound buffer
/// without a delimiter can never complete and is answered with 400, and so
/// is a request whose body did not fit: executing it would commit a
/// truncated body.
pub fn process_http(
    input: &InboundBuffer,
    output: &mut OutboundBuffer,
    store: &ResourceStore,
) -> ProcessResult {
    let response = match parse(input.filled()) {
        ParseResult::Complete(_) if input.overflowed() => {
            warn!(capacity = input.capacity(), "Request exceeds inbound buffer");
            Response::new(Status::BadRequest, "Request too large.")
        }
        ParseResult::Complete(request) => handle_request(&request, store),
        ParseResult::Incomplete if input.is_full() => {
            warn!(
                capacity = input.capacity(),
                "Request header block exceeds inbound buffer"
            );
            Response::new(Status::BadRequest, "Request header too large.")
        }
        ParseResult::Incomplete => return ProcessResult::NeedData,
    };

    ProcessResult::Response {
        response_len: output.load(&response),
    }
}
