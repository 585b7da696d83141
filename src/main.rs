//! paladin: a single-resource HTTP/1.1 server
//!
//! Serves one file over a minimal subset of HTTP/1.1:
//! - GET returns the resource
//! - PUT replaces it, POST appends to it
//! - DELETE removes it
//!
//! Features:
//! - Readiness-driven event loop (epoll/kqueue via mio)
//! - One request per connection, closed after the response
//! - All resource access serialized by a single lock
//! - Configuration via CLI arguments or TOML file

mod config;
mod protocols;
mod runtime;
mod storage;

use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        workers = config.workers,
        resource = %config.resource_path.display(),
        max_connections = config.max_connections,
        idle_timeout_ms = config.idle_timeout_ms,
        "Starting paladin server"
    );

    runtime::run(config)?;
    Ok(())
}
