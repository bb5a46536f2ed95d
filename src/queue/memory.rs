//! In-process queue backend.
//!
//! Holds items in a `VecDeque`; nothing survives the process. Pop and pull
//! are destructive and follow the configured [`Ordering`], so this backend
//! can stand in for [`DurableQueue`](super::durable::DurableQueue) in tests
//! and short-lived jobs.

use std::collections::VecDeque;

use super::{Backend, Ordering, Queue};
use crate::error::{Error, Result};
use crate::telemetry::queue::OpRecorder;

/// Queue held entirely in memory.
#[derive(Debug)]
pub struct MemoryQueue {
    ordering: Ordering,
    /// `None` once closed.
    items: Option<VecDeque<Vec<u8>>>,
}

impl MemoryQueue {
    pub fn new(ordering: Ordering) -> Self {
        Self {
            ordering,
            items: Some(VecDeque::new()),
        }
    }

    pub fn fifo() -> Self {
        Self::new(Ordering::Fifo)
    }

    pub fn lifo() -> Self {
        Self::new(Ordering::Lifo)
    }

    pub fn is_closed(&self) -> bool {
        self.items.is_none()
    }

    fn items(&self) -> Result<&VecDeque<Vec<u8>>> {
        self.items.as_ref().ok_or(Error::Closed)
    }

    fn items_mut(&mut self) -> Result<&mut VecDeque<Vec<u8>>> {
        self.items.as_mut().ok_or(Error::Closed)
    }

    fn take_next(ordering: Ordering, items: &mut VecDeque<Vec<u8>>) -> Option<Vec<u8>> {
        match ordering {
            Ordering::Fifo => items.pop_front(),
            Ordering::Lifo => items.pop_back(),
        }
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::fifo()
    }
}

impl Queue for MemoryQueue {
    fn push(&mut self, item: &[u8]) -> Result<()> {
        let op = OpRecorder::start(Backend::Memory, self.ordering, "push");
        let result = self.items_mut().map(|items| items.push_back(item.to_vec()));
        op.finish_with(&result, |_| Some(1));
        result
    }

    fn pop(&mut self) -> Result<Option<Vec<u8>>> {
        let op = OpRecorder::start(Backend::Memory, self.ordering, "pop");
        let ordering = self.ordering;
        let result = self
            .items_mut()
            .map(|items| Self::take_next(ordering, items));
        op.finish_with(&result, |item| Some(usize::from(item.is_some())));
        result
    }

    fn pull(&mut self, limit: usize) -> Result<Vec<Vec<u8>>> {
        let op = OpRecorder::start(Backend::Memory, self.ordering, "pull");
        let ordering = self.ordering;
        let result = self.items_mut().map(|items| {
            let n = limit.min(items.len());
            std::iter::from_fn(|| Self::take_next(ordering, items))
                .take(n)
                .collect::<Vec<_>>()
        });
        op.finish_with(&result, |batch| Some(batch.len()));
        result
    }

    fn size(&self) -> Result<usize> {
        let op = OpRecorder::start(Backend::Memory, self.ordering, "size");
        let result = self.items().map(VecDeque::len);
        op.finish_with(&result, |_| None);
        result
    }

    fn close(&mut self) -> Result<()> {
        let op = OpRecorder::start(Backend::Memory, self.ordering, "close");
        let result = match self.items.take() {
            Some(items) => {
                if !items.is_empty() {
                    tracing::debug!(discarded = items.len(), "closing memory queue with items");
                }
                Ok(())
            }
            None => Err(Error::Closed),
        };
        op.finish_with(&result, |_| None);
        result
    }

    fn ordering(&self) -> Ordering {
        self.ordering
    }

    fn backend(&self) -> Backend {
        Backend::Memory
    }
}
