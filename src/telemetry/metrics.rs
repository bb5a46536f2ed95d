//! Metric instrument factories for workq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"workq"` meter. Without a
//! registered provider they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for workq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("workq")
}

/// Counter: queue-level operations (open, push, pop, pull, size, close).
/// Labels: `backend`, `ordering`, `operation`, `result` ("ok" | "empty" | "error").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("workq.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: items moved into or out of a queue.
/// Labels: `backend`, `operation` ("push" | "pop" | "pull").
pub fn queue_items() -> Counter<u64> {
    meter()
        .u64_counter("workq.queue.items")
        .with_description("Number of items pushed to or removed from queues")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `backend`, `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("workq.operation.duration_ms")
        .with_description("Queue operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
