//! Integration tests for the in-process queue.

use workq::{Backend, MemoryQueue, Ordering, Queue};

#[test]
fn default_queue_is_fifo_memory() {
    let queue = MemoryQueue::default();
    assert_eq!(queue.ordering(), Ordering::Fifo);
    assert_eq!(queue.backend(), Backend::Memory);
    assert!(queue.is_empty().unwrap());
}

#[test]
fn pull_removes_what_it_returns() {
    let mut queue = MemoryQueue::fifo();
    for item in [b"a", b"b", b"c"] {
        queue.push(item).unwrap();
    }

    assert_eq!(queue.pull(2).unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(queue.pull(2).unwrap(), vec![b"c".to_vec()]);
    assert!(queue.pull(2).unwrap().is_empty());
}

#[test]
fn pop_follows_ordering_not_stack_order() {
    let mut fifo = MemoryQueue::fifo();
    let mut lifo = MemoryQueue::lifo();
    for item in [b"first", b"secnd"] {
        fifo.push(item).unwrap();
        lifo.push(item).unwrap();
    }

    assert_eq!(fifo.pop().unwrap(), Some(b"first".to_vec()));
    assert_eq!(lifo.pop().unwrap(), Some(b"secnd".to_vec()));
}

#[test]
fn close_discards_items() {
    let mut queue = MemoryQueue::lifo();
    queue.push(b"a").unwrap();
    queue.push(b"b").unwrap();
    queue.close().unwrap();
    assert!(queue.is_closed());

    // A fresh instance starts empty; nothing carried over.
    let fresh = MemoryQueue::lifo();
    assert_eq!(fresh.size().unwrap(), 0);
}

#[test]
fn items_are_copied_on_push() {
    let mut queue = MemoryQueue::fifo();
    let mut buf = b"original".to_vec();
    queue.push(&buf).unwrap();
    buf.clear();
    buf.extend_from_slice(b"mutated");

    assert_eq!(queue.pop().unwrap(), Some(b"original".to_vec()));
}
