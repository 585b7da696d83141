//! Protocol implementations.
//!
//! Each protocol has a parser module used by the runtime event loop.
//!
//! - `http`: minimal HTTP/1.1 request line parsing and the single-resource
//!   request handler

pub mod http;
