//! Integration tests for the SQLite-backed queue.

use std::path::PathBuf;

use tempfile::TempDir;
use workq::{DurableQueue, Error, Ordering, Queue};

fn scratch() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("q1");
    (dir, path)
}

#[test]
fn fifo_scenario_pull_then_pop() {
    let (_dir, path) = scratch();
    let mut queue = DurableQueue::fifo(&path).unwrap();
    queue.push(b"a").unwrap();
    queue.push(b"b").unwrap();
    queue.push(b"c").unwrap();

    assert_eq!(queue.pull(2).unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(queue.size().unwrap(), 1);
    assert_eq!(queue.pop().unwrap(), Some(b"c".to_vec()));
    assert_eq!(queue.size().unwrap(), 0);
    queue.close().unwrap();
}

#[test]
fn lifo_scenario_pop_then_pull() {
    let (_dir, path) = scratch();
    let mut queue = DurableQueue::lifo(&path).unwrap();
    queue.push(b"a").unwrap();
    queue.push(b"b").unwrap();
    queue.push(b"c").unwrap();

    assert_eq!(queue.pop().unwrap(), Some(b"c".to_vec()));
    assert_eq!(queue.pull(2).unwrap(), vec![b"b".to_vec(), b"a".to_vec()]);
    assert_eq!(queue.size().unwrap(), 0);
    queue.close().unwrap();
}

// ---------------------------------------------------------------------------
// Durability across close and reopen
// ---------------------------------------------------------------------------

#[test]
fn reopen_resumes_with_rows_left_behind() {
    let (_dir, path) = scratch();

    let mut queue = DurableQueue::fifo(&path).unwrap();
    for item in [b"1", b"2", b"3", b"4"] {
        queue.push(item).unwrap();
    }
    assert_eq!(queue.pop().unwrap(), Some(b"1".to_vec()));
    queue.close().unwrap();
    assert!(path.exists(), "close must not remove the database file");

    let mut reopened = DurableQueue::fifo(&path).unwrap();
    assert_eq!(reopened.size().unwrap(), 3);
    assert_eq!(
        reopened.pull(10).unwrap(),
        vec![b"2".to_vec(), b"3".to_vec(), b"4".to_vec()]
    );
    reopened.close().unwrap();
}

#[test]
fn closing_an_empty_queue_keeps_the_file() {
    let (_dir, path) = scratch();
    let mut queue = DurableQueue::lifo(&path).unwrap();
    queue.push(b"x").unwrap();
    queue.pop().unwrap();
    queue.close().unwrap();

    assert!(path.exists());
    let reopened = DurableQueue::lifo(&path).unwrap();
    assert_eq!(reopened.size().unwrap(), 0);
}

#[test]
fn dropping_without_close_keeps_rows() {
    let (_dir, path) = scratch();
    {
        let mut queue = DurableQueue::lifo(&path).unwrap();
        queue.push(b"a").unwrap();
        queue.push(b"b").unwrap();
    }

    let mut reopened = DurableQueue::lifo(&path).unwrap();
    assert_eq!(reopened.pop().unwrap(), Some(b"b".to_vec()));
    assert_eq!(reopened.pop().unwrap(), Some(b"a".to_vec()));
}

#[test]
fn pushes_after_reopen_sort_after_existing_rows() {
    let (_dir, path) = scratch();

    let mut queue = DurableQueue::fifo(&path).unwrap();
    queue.push(b"old-1").unwrap();
    queue.push(b"old-2").unwrap();
    // Drain and refill so reused ids would show up as misordering.
    queue.pull(10).unwrap();
    queue.push(b"old-3").unwrap();
    queue.close().unwrap();

    let mut queue = DurableQueue::fifo(&path).unwrap();
    queue.push(b"new-1").unwrap();
    assert_eq!(
        queue.pull(10).unwrap(),
        vec![b"old-3".to_vec(), b"new-1".to_vec()]
    );
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[test]
fn fifo_and_lifo_tables_share_a_file_independently() {
    let (_dir, path) = scratch();
    let mut fifo = DurableQueue::fifo(&path).unwrap();
    let mut lifo = DurableQueue::lifo(&path).unwrap();

    fifo.push(b"f").unwrap();
    lifo.push(b"l1").unwrap();
    lifo.push(b"l2").unwrap();

    assert_eq!(fifo.size().unwrap(), 1);
    assert_eq!(lifo.size().unwrap(), 2);
    assert_eq!(fifo.pop().unwrap(), Some(b"f".to_vec()));
    assert_eq!(lifo.pop().unwrap(), Some(b"l2".to_vec()));
}

#[test]
fn second_instance_sees_committed_rows() {
    let (_dir, path) = scratch();
    let mut producer = DurableQueue::fifo(&path).unwrap();
    let mut consumer = DurableQueue::fifo(&path).unwrap();

    producer.push(b"job").unwrap();
    assert_eq!(consumer.pop().unwrap(), Some(b"job".to_vec()));
    assert_eq!(producer.pop().unwrap(), None);
}

#[test]
fn competing_consumers_never_share_an_item() {
    const ITEMS: usize = 400;
    const CONSUMERS: usize = 4;

    let (_dir, path) = scratch();
    let mut producer = DurableQueue::fifo(&path).unwrap();
    for i in 0..ITEMS {
        producer.push(format!("job-{i}").as_bytes()).unwrap();
    }

    // Open every consumer up front so the contention is all on pop/pull.
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| DurableQueue::fifo(&path).unwrap())
        .collect();

    let handles: Vec<_> = consumers
        .into_iter()
        .enumerate()
        .map(|(n, mut queue)| {
            std::thread::spawn(move || {
                let mut taken = Vec::new();
                loop {
                    // Even consumers pop single items, odd ones pull batches.
                    let batch: Vec<Vec<u8>> = if n % 2 == 0 {
                        queue.pop().expect("pop failed under contention").into_iter().collect()
                    } else {
                        queue.pull(3).expect("pull failed under contention")
                    };
                    if batch.is_empty() {
                        break;
                    }
                    taken.extend(batch);
                }
                queue.close().unwrap();
                taken
            })
        })
        .collect();

    let mut taken: Vec<Vec<u8>> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("consumer thread panicked"))
        .collect();

    assert_eq!(taken.len(), ITEMS, "every item delivered exactly once");
    taken.sort();
    taken.dedup();
    assert_eq!(taken.len(), ITEMS, "no item delivered twice");
    assert_eq!(producer.size().unwrap(), 0);
}

#[test]
fn path_is_absolute() {
    let (_dir, path) = scratch();
    let queue = DurableQueue::open(&path, Ordering::Fifo).unwrap();
    let stored = queue.path().expect("file-backed queue has a path");
    assert!(stored.is_absolute());
    assert_eq!(stored, path.as_path());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn open_in_missing_directory_is_a_storage_error() {
    let (dir, _) = scratch();
    let path = dir.path().join("no-such-dir").join("queue.db");
    let result = DurableQueue::fifo(&path);
    assert!(matches!(result, Err(Error::Storage(_))), "got {result:?}");
}

#[test]
fn open_on_non_database_file_is_a_storage_error() {
    let (_dir, path) = scratch();
    std::fs::write(&path, b"this is not a sqlite database, just some bytes padding it out")
        .unwrap();
    let result = DurableQueue::fifo(&path);
    assert!(matches!(result, Err(Error::Storage(_))), "got {result:?}");
}
