//! Minimal HTTP/1.1 protocol implementation.
//!
//! One request per connection, one resource per server:
//!
//! ```text
//! Request:  <METHOD> <TARGET> <VERSION>\r\n[headers]\r\n\r\n[body]
//! Response: HTTP/1.1 <code> <text>\r\nServer: Paladino\r\n\r\n[body]
//!
//! Example:
//! Request:  PUT / HTTP/1.1\r\nHost: localhost:8080\r\n\r\n<h1>hi</h1>
//! Response: HTTP/1.1 201 Created\r\nServer: Paladino\r\n\r\nResource updated.
//! ```
//!
//! Headers are never interpreted; only the blank line that ends them is
//! located. The response carries no length header: the server closes the
//! connection once it is sent, and the close marks the end of the body.
//!
//! Supported methods:
//! - `GET` - return the resource content
//! - `PUT` - replace the resource content with the body
//! - `POST` - append the body to the resource content
//! - `DELETE` - remove the resource

pub mod handler;
pub mod parser;
pub mod response;

pub use handler::handle_request;
pub use parser::{parse, ParseResult};
pub use response::{Response, Status};
