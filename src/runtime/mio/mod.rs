//! mio-based event loop implementation.
//!
//! Readiness-based I/O using mio (epoll on Linux, kqueue on macOS).

mod event_loop;

use crate::config::Config;
use crate::storage::ResourceStore;
use std::sync::Arc;

/// Run the server using mio backend.
pub fn run(config: Config, store: Arc<ResourceStore>) -> std::io::Result<()> {
    event_loop::run(config, store)
}
