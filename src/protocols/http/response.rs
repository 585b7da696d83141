//! HTTP response representation and serialization.

use bytes::{Bytes, BytesMut};

/// Header identifying this server on every response.
pub const SERVER_HEADER: &[u8] = b"Server: Paladino";

/// Response status codes produced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    BadRequest,
    NotFound,
    InternalServerError,
    NotImplemented,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
            Status::NotImplemented => 501,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::NoContent => "No Content",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
        }
    }
    /// Length of the status line and headers that precede the body.
    pub fn head_len(self) -> usize {
        // "HTTP/1.1 " + code + " " + text + CRLF + header + CRLF CRLF
        9 + 3 + 1 + self.text().len() + 2 + SERVER_HEADER.len() + 4
    }
}

/// A response ready to be serialized into a connection's outbound buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Option<Bytes>,
}

impl Response {
    /// Create a response with a body
    pub fn new<B: Into<Bytes>>(status: Status, body: B) -> Self {
        Response {
            status,
            body: Some(body.into()),
        }
    }

    /// Create a response without a body
    pub fn empty(status: Status) -> Self {
        Response { status, body: None }
    }

    /// Encode the response into an existing buffer.
    ///
    /// No length header is emitted: the body ends where the connection does.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(b"HTTP/1.1 ");
        buf.extend_from_slice(self.status.code().to_string().as_bytes());
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(self.status.text().as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(SERVER_HEADER);
        buf.extend_from_slice(b"\r\n\r\n");
        if let Some(body) = &self.body {
            buf.extend_from_slice(body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(response: &Response) -> BytesMut {
        let mut buf = BytesMut::new();
        response.encode_into(&mut buf);
        buf
    }

    #[test]
    fn test_encode_with_body() {
        let response = Response::new(Status::Ok, "hello");
        assert_eq!(
            &encode(&response)[..],
            b"HTTP/1.1 200 OK\r\nServer: Paladino\r\n\r\nhello"
        );
    }

    #[test]
    fn test_encode_without_body() {
        let response = Response::empty(Status::NoContent);
        assert_eq!(
            &encode(&response)[..],
            b"HTTP/1.1 204 No Content\r\nServer: Paladino\r\n\r\n"
        );
    }

    #[test]
    fn test_status_lines() {
        let expected = [
            (Status::Created, 201, "Created"),
            (Status::BadRequest, 400, "Bad Request"),
            (Status::NotFound, 404, "Not Found"),
            (Status::InternalServerError, 500, "Internal Server Error"),
            (Status::NotImplemented, 501, "Not Implemented"),
        ];
        for (status, code, text) in expected {
            assert_eq!(status.code(), code);
            assert_eq!(status.text(), text);
        }
    }

    #[test]
    fn test_head_len_matches_encoding() {
        for status in [Status::Ok, Status::NoContent, Status::InternalServerError] {
            assert_eq!(status.head_len(), encode(&Response::empty(status)).len());
        }
    }

    #[test]
    fn test_binary_body_is_verbatim() {
        let response = Response::new(Status::Ok, vec![0u8, 159, 146, 150]);
        assert!(encode(&response).ends_with(&[0u8, 159, 146, 150]));
    }
}
