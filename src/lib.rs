//! # workq
//!
//! Ordered work-item queues for decoupling producers from consumers.
//!
//! Items are opaque byte payloads. Two interchangeable backends share the
//! [`Queue`] capability: an in-process [`MemoryQueue`] and a [`DurableQueue`]
//! persisted to SQLite that survives restarts. Both honor FIFO or LIFO
//! ordering and remove items atomically as they are handed out.

pub mod config;
pub mod error;
pub mod queue;
pub mod telemetry;

pub use error::{Error, Result};
pub use queue::durable::DurableQueue;
pub use queue::memory::MemoryQueue;
pub use queue::{Backend, DEFAULT_BATCH_SIZE, Ordering, Queue, open};
