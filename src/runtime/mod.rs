//! Runtime for the single-resource HTTP server.
//!
//! One or more reactors, each a single thread multiplexing its connections
//! through readiness notifications. Shared abstractions:
//! - `InboundBuffer` / `OutboundBuffer`: bounded per-connection buffers
//! - `Connection`: Reading/Writing state machine over a non-blocking stream
//! - `ConnectionRegistry`: slab of connections keyed by poll token
//! - `process_http`: turns accumulated request bytes into a response

mod buffer;
mod connection;
mod protocol;

#[cfg(unix)]
mod mio;

use crate::config::Config;
use crate::storage::ResourceStore;

/// Run the server with platform-appropriate backend.
pub fn run(config: Config) -> std::io::Result<()> {
    // The one store every reactor shares (ResourceStore::new returns Arc)
    let store = ResourceStore::new(config.resource_path.clone(), config.max_read_size);

    #[cfg(unix)]
    {
        mio::run(config, store)
    }

    #[cfg(not(unix))]
    {
        let _ = store; // suppress unused warnings
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Unsupported platform: only Unix-like systems are supported",
        ))
    }
}
