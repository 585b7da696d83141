//! Resource storage module.
//!
//! The server exposes exactly one resource: a flat byte blob kept in a file.
//! Every operation on it goes through a single process-wide lock, so reads,
//! replacements, appends and removals are linearized across all reactors.
//!
//! The file handle is never shared; the lock guards the [`Resource`] itself
//! and its operations are only reachable through the guard returned by
//! [`ResourceStore::lock`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// The single named resource.
#[derive(Debug)]
pub struct Resource {
    /// Location of the blob on disk
    path: PathBuf,
    /// Upper bound on bytes returned by `read`
    max_read_size: usize,
}

impl Resource {
    /// Read the resource content, bounded to `max_read_size` bytes.
    ///
    /// Returns `Ok(None)` when the resource does not exist.
    pub fn read(&self) -> io::Result<Option<Vec<u8>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Resource absent");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let mut content = Vec::new();
        file.take(self.max_read_size as u64)
            .read_to_end(&mut content)?;

        trace!(path = %self.path.display(), bytes = content.len(), "Resource read");
        Ok(Some(content))
    }

    /// Replace the whole content, creating the resource if needed.
    pub fn replace(&self, content: &[u8]) -> io::Result<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(content)?;
        file.flush()?;

        debug!(path = %self.path.display(), bytes = content.len(), "Resource replaced");
        Ok(())
    }

    /// Append to the content, creating the resource if needed.
    pub fn append(&self, content: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(content)?;
        file.flush()?;

        debug!(path = %self.path.display(), bytes = content.len(), "Resource appended");
        Ok(())
    }

    /// Remove the resource.
    ///
    /// Returns `Ok(false)` when there was nothing to remove.
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Resource removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Thread-safe handle to the resource, shared by all reactors.
#[derive(Debug)]
pub struct ResourceStore {
    resource: Mutex<Resource>,
}

impl ResourceStore {
    /// Create a new store for the resource at `path`.
    pub fn new(path: impl Into<PathBuf>, max_read_size: usize) -> Arc<Self> {
        Arc::new(Self {
            resource: Mutex::new(Resource {
                path: path.into(),
                max_read_size,
            }),
        })
    }

    /// Enter the critical section.
    ///
    /// The lock only guards a path, so a guard poisoned by a panicking
    /// holder leaves nothing inconsistent and is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Resource> {
        self.resource
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
