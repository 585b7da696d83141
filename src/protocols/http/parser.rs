//! HTTP request parser.

/// Blank line separating the header block from the body.
pub const DELIMITER: &[u8] = b"\r\n\r\n";

/// Longest method token kept from the request line.
pub const MAX_METHOD_LEN: usize = 15;
/// Longest target token kept from the request line.
pub const MAX_TARGET_LEN: usize = 255;
/// Longest version token kept from the request line.
pub const MAX_VERSION_LEN: usize = 15;

/// Request method. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    /// Any other token, including an empty one.
    Other(String),
}

impl Method {
    fn from_token(token: &[u8]) -> Self {
        match token {
            b"GET" => Method::Get,
            b"PUT" => Method::Put,
            b"POST" => Method::Post,
            b"DELETE" => Method::Delete,
            other => Method::Other(bounded_token(other, MAX_METHOD_LEN)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Other(token) => token,
        }
    }
}

/// A parsed request, borrowing its body from the inbound buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    pub target: String,
    pub version: String,
    /// Bytes following the delimiter. `None` means no body section at all,
    /// which a parsed request never has but a handler must still reject.
    pub body: Option<&'a [u8]>,
}

/// Parse result.
#[derive(Debug)]
pub enum ParseResult<'a> {
    /// Delimiter found, request materialized.
    Complete(Request<'a>),
    /// Need more data for the header block.
    Incomplete,
}

/// Parse a request from the valid prefix of the inbound buffer.
///
/// A request only exists once the delimiter has been seen. Everything
/// after it is the body, however much of it has arrived.
pub fn parse(input: &[u8]) -> ParseResult<'_> {
    let header_end = match find_delimiter(input) {
        Some(pos) => pos,
        None => return ParseResult::Incomplete,
    };

    let head = &input[..header_end];
    let line_end = head
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(head.len());

    let mut tokens = head[..line_end]
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());

    let method = Method::from_token(tokens.next().unwrap_or_default());
    let target = bounded_token(tokens.next().unwrap_or_default(), MAX_TARGET_LEN);
    let version = bounded_token(tokens.next().unwrap_or_default(), MAX_VERSION_LEN);

    ParseResult::Complete(Request {
        method,
        target,
        version,
        body: Some(&input[header_end + DELIMITER.len()..]),
    })
}

/// Find the header delimiter, returning the position of its first byte.
pub fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

fn bounded_token(token: &[u8], max: usize) -> String {
    String::from_utf8_lossy(&token[..token.len().min(max)]).into_owned()
}
