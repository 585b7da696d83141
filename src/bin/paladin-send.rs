//! paladin-send: one-shot request tool for the paladin server.
//!
//! Sends exactly one request on one connection, prints the raw request and
//! the raw response, then exits. The exit status only reflects socket
//! failures, never the HTTP status.
//!
//! ```text
//! paladin-send 127.0.0.1 8080 GET
//! paladin-send 127.0.0.1 8080 PUT '<h1>New Content</h1>'
//! ```

use clap::Parser;
use std::io;
use std::process::ExitCode;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the sending tool
#[derive(Parser, Debug)]
#[command(name = "paladin-send")]
#[command(version = "0.1.0")]
#[command(about = "Send one request to a paladin server", long_about = None)]
struct Args {
    /// Server host
    host: String,

    /// Server port
    port: u16,

    /// Request method (GET, POST, PUT, DELETE, ...)
    method: String,

    /// Request body
    content: Option<String>,
}

/// Build the raw request bytes.
fn build_request(method: &str, host: &str, port: u16, content: &str) -> Vec<u8> {
    format!("{method} / HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n{content}").into_bytes()
}

/// Write the whole request, then read until the server closes.
async fn exchange<S>(stream: &mut S, request: &[u8]) -> io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    debug!(sent = request.len(), received = response.len(), "Exchange complete");
    Ok(response)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let content = args.content.as_deref().unwrap_or("");
    let request = build_request(&args.method, &args.host, args.port, content);

    let mut stream = match TcpStream::connect((args.host.as_str(), args.port)).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(host = %args.host, port = args.port, error = %e, "Connection failed");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "--- Sending Request ---\n{}\n-----------------------\n",
        String::from_utf8_lossy(&request)
    );

    match exchange(&mut stream, &request).await {
        Ok(response) => {
            println!("--- Server Response ---");
            print!("{}", String::from_utf8_lossy(&response));
            println!("\n-----------------------");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Request failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_with_content() {
        let request = build_request("PUT", "127.0.0.1", 8080, "<h1>New Content</h1>");
        assert_eq!(
            request,
            b"PUT / HTTP/1.1\r\nHost: 127.0.0.1:8080\r\n\r\n<h1>New Content</h1>"
        );
    }

    #[test]
    fn test_build_request_without_content() {
        let request = build_request("GET", "localhost", 9000, "");
        assert_eq!(request, b"GET / HTTP/1.1\r\nHost: localhost:9000\r\n\r\n");
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["paladin-send", "127.0.0.1", "8080", "POST", "more"]);
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert_eq!(args.method, "POST");
        assert_eq!(args.content.as_deref(), Some("more"));

        let args = Args::parse_from(["paladin-send", "127.0.0.1", "8080", "DELETE"]);
        assert_eq!(args.content, None);

        assert!(Args::try_parse_from(["paladin-send", "127.0.0.1"]).is_err());
        assert!(Args::try_parse_from(["paladin-send", "h", "notaport", "GET"]).is_err());
    }

    #[tokio::test]
    async fn test_exchange_reads_until_close() {
        let request = build_request("GET", "127.0.0.1", 8080, "");
        let mut stream = tokio_test::io::Builder::new()
            .write(&request)
            .read(b"HTTP/1.1 200 OK\r\nServer: Paladino\r\n\r\n")
            .read(b"<h1>hi</h1>")
            .build();

        let response = exchange(&mut stream, &request).await.unwrap();
        assert_eq!(
            response,
            b"HTTP/1.1 200 OK\r\nServer: Paladino\r\n\r\n<h1>hi</h1>"
        );
    }

    #[tokio::test]
    async fn test_exchange_propagates_read_error() {
        let request = build_request("GET", "127.0.0.1", 8080, "");
        let mut stream = tokio_test::io::Builder::new()
            .write(&request)
            .read_error(io::Error::from(io::ErrorKind::ConnectionReset))
            .build();

        let err = exchange(&mut stream, &request).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
