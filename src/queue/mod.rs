//! The queue capability shared by every backend.
//!
//! A caller picks a backend once, at construction, and then talks to it only
//! through [`Queue`]. Both backends agree on ordering and on removal: an item
//! handed out by `pop` or `pull` is gone from storage and is never handed out
//! again.

pub mod durable;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::config::QueueConfig;
use crate::error::{Error, Result};

/// Number of items `pull_batch` takes when the caller does not choose.
pub const DEFAULT_BATCH_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Retrieval order relative to insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordering {
    /// Oldest pushed item comes out first.
    #[default]
    Fifo,
    /// Most recently pushed item comes out first.
    Lifo,
}

impl std::fmt::Display for Ordering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Ordering::Fifo => "fifo",
            Ordering::Lifo => "lifo",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Ordering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Ordering::Fifo),
            "lifo" => Ok(Ordering::Lifo),
            _ => Err(Error::Config(format!("unknown ordering: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Which storage substrate backs a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local, nothing survives the process.
    #[default]
    Memory,
    /// SQLite file; unconsumed items survive close and restart.
    #[serde(alias = "sqlite")]
    Durable,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Backend::Memory => "memory",
            Backend::Durable => "durable",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "durable" | "sqlite" => Ok(Backend::Durable),
            _ => Err(Error::Config(format!("unknown backend: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Ordered store of opaque byte items.
///
/// Every call runs to completion on the calling thread. Once [`Queue::close`]
/// has returned, every further call fails with [`Error::Closed`].
pub trait Queue {
    /// Append an item.
    fn push(&mut self, item: &[u8]) -> Result<()>;

    /// Remove and return the next item, or `None` when the queue is empty.
    fn pop(&mut self) -> Result<Option<Vec<u8>>>;

    /// Remove and return up to `limit` items, in retrieval order.
    fn pull(&mut self, limit: usize) -> Result<Vec<Vec<u8>>>;

    /// Number of items currently held.
    fn size(&self) -> Result<usize>;

    /// Release the underlying storage. Durable items are left in place.
    fn close(&mut self) -> Result<()>;

    /// Retrieval order this queue was built with.
    fn ordering(&self) -> Ordering;

    /// Storage substrate behind this queue.
    fn backend(&self) -> Backend;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// [`Queue::pull`] with [`DEFAULT_BATCH_SIZE`].
    fn pull_batch(&mut self) -> Result<Vec<Vec<u8>>> {
        self.pull(DEFAULT_BATCH_SIZE)
    }
}

/// Construct the queue described by `config`.
pub fn open(config: &QueueConfig) -> Result<Box<dyn Queue>> {
    config.validate()?;
    match config.backend {
        Backend::Memory => Ok(Box::new(memory::MemoryQueue::new(config.ordering))),
        Backend::Durable => {
            let path = config.path.as_ref().ok_or_else(|| {
                Error::Config("durable backend requires a storage path".to_string())
            })?;
            Ok(Box::new(durable::DurableQueue::open(path, config.ordering)?))
        }
    }
}
