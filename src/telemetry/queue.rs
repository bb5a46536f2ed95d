//! Queue operation span and metric helpers.
//!
//! Backends wrap each call in an [`OpRecorder`] so both substrates report
//! through the same span shape and instruments.

use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Span;

use super::metrics;
use crate::queue::{Backend, Ordering};

/// Start a span for a single queue operation.
///
/// The `queue.items` field is declared empty and filled when the operation
/// finishes.
pub fn start_queue_span(backend: Backend, ordering: Ordering, operation: &'static str) -> Span {
    tracing::debug_span!(
        "queue.operation",
        "queue.backend" = %backend,
        "queue.ordering" = %ordering,
        "queue.operation" = operation,
        "queue.items" = tracing::field::Empty,
    )
}

/// Outcome of a queue operation as reported to metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpResult {
    Ok,
    /// Succeeded but found nothing to return.
    Empty,
    Error,
}

impl OpResult {
    fn as_str(self) -> &'static str {
        match self {
            OpResult::Ok => "ok",
            OpResult::Empty => "empty",
            OpResult::Error => "error",
        }
    }
}

/// Times one queue operation and reports it on completion.
pub struct OpRecorder {
    span: Span,
    backend: Backend,
    ordering: Ordering,
    operation: &'static str,
    started: Instant,
}

impl OpRecorder {
    pub fn start(backend: Backend, ordering: Ordering, operation: &'static str) -> Self {
        Self {
            span: start_queue_span(backend, ordering, operation),
            backend,
            ordering,
            operation,
            started: Instant::now(),
        }
    }

    /// Record the outcome on the span and the metric instruments.
    pub fn finish(self, items: usize, result: OpResult) {
        self.span.record("queue.items", items as u64);
        self.span.in_scope(|| {
            tracing::debug!(items, result = result.as_str(), "queue_operation");
        });

        let backend = self.backend.to_string();
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("backend", backend.clone()),
                KeyValue::new("ordering", self.ordering.to_string()),
                KeyValue::new("operation", self.operation),
                KeyValue::new("result", result.as_str()),
            ],
        );
        if items > 0 {
            metrics::queue_items().add(
                items as u64,
                &[
                    KeyValue::new("backend", backend.clone()),
                    KeyValue::new("operation", self.operation),
                ],
            );
        }
        metrics::operation_duration_ms().record(
            self.started.elapsed().as_secs_f64() * 1000.0,
            &[
                KeyValue::new("backend", backend),
                KeyValue::new("operation", self.operation),
            ],
        );
    }

    /// Finish with the result derived from `outcome`.
    ///
    /// `moved` reports how many items the call moved, or `None` for calls
    /// that never move items (size, close).
    pub fn finish_with<T>(
        self,
        outcome: &crate::error::Result<T>,
        moved: impl FnOnce(&T) -> Option<usize>,
    ) {
        match outcome {
            Ok(value) => match moved(value) {
                Some(0) => self.finish(0, OpResult::Empty),
                Some(items) => self.finish(items, OpResult::Ok),
                None => self.finish(0, OpResult::Ok),
            },
            Err(e) => {
                self.span.in_scope(|| {
                    tracing::warn!(error = %e, operation = self.operation, "queue operation failed");
                });
                self.finish(0, OpResult::Error);
            }
        }
    }
}
