//! SQLite-backed queue backend.
//!
//! Items live in a single table keyed by an autoincrement id. FIFO and LIFO
//! differ only in sort direction, so both are served by one parameterized
//! statement set. Every push, pop and pull runs in its own short
//! transaction; nothing is held open between calls. Transactions begin
//! IMMEDIATE so the write lock is taken before the select: competing
//! instances on one file then wait in SQLite's busy handler instead of
//! failing the read-to-write upgrade.
//!
//! Closing releases the connection and leaves unconsumed rows in place, so a
//! queue reopened at the same path resumes where the last one stopped. The
//! backing file is never removed, even when the queue is empty: emptiness
//! cannot be checked and acted on atomically against other writers.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::{Backend, Ordering, Queue};
use crate::error::{Error, Result};
use crate::telemetry::queue::OpRecorder;

/// SQL for one ordering. Table names are fixed per ordering so a FIFO and a
/// LIFO queue can share a database file.
#[derive(Debug)]
struct Statements {
    create: String,
    size: String,
    push: String,
    pop: String,
    pull: String,
    delete: String,
}

impl Statements {
    fn for_ordering(ordering: Ordering) -> Self {
        let (table, direction) = match ordering {
            Ordering::Fifo => ("fifoqueue", "ASC"),
            Ordering::Lifo => ("lifoqueue", "DESC"),
        };
        Self {
            create: format!(
                "CREATE TABLE IF NOT EXISTS {table} \
                 (id INTEGER PRIMARY KEY AUTOINCREMENT, item BLOB)"
            ),
            size: format!("SELECT COUNT(*) FROM {table}"),
            push: format!("INSERT INTO {table} (item) VALUES (?1)"),
            pop: format!("SELECT id, item FROM {table} ORDER BY id {direction} LIMIT 1"),
            pull: format!("SELECT id, item FROM {table} ORDER BY id {direction} LIMIT ?1"),
            delete: format!("DELETE FROM {table} WHERE id = ?1"),
        }
    }
}

/// Queue persisted to a SQLite database.
#[derive(Debug)]
pub struct DurableQueue {
    ordering: Ordering,
    statements: Statements,
    /// Absolute database path, `None` for an in-memory database.
    path: Option<PathBuf>,
    /// `None` once closed.
    conn: Option<Connection>,
}

impl DurableQueue {
    /// Open or create a queue at the given path.
    pub fn open(path: impl AsRef<Path>, ordering: Ordering) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let conn = Connection::open(&path)?;
        let queue = Self::init(conn, Some(path), ordering)?;
        if let Some(ref path) = queue.path {
            tracing::info!(path = %path.display(), ordering = %ordering, "opened durable queue");
        }
        Ok(queue)
    }

    /// Create a queue over a private in-memory database (for testing).
    pub fn in_memory(ordering: Ordering) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None, ordering)
    }

    pub fn fifo(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, Ordering::Fifo)
    }

    pub fn lifo(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, Ordering::Lifo)
    }

    fn init(conn: Connection, path: Option<PathBuf>, ordering: Ordering) -> Result<Self> {
        let op = OpRecorder::start(Backend::Durable, ordering, "open");
        let statements = Statements::for_ordering(ordering);
        let result = conn
            .execute_batch("PRAGMA journal_mode=WAL;")
            .and_then(|()| conn.execute_batch(&statements.create))
            .map_err(Error::from);
        op.finish_with(&result, |_| None);
        result?;

        Ok(Self {
            ordering,
            statements,
            path,
            conn: Some(conn),
        })
    }

    /// Absolute path of the backing database, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::Closed)
    }

    fn push_inner(&mut self, item: &[u8]) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.prepare_cached(&self.statements.push)?
            .execute(params![item])?;
        tx.commit()?;
        Ok(())
    }

    fn pop_inner(&mut self) -> Result<Option<Vec<u8>>> {
        let statements = &self.statements;
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let row = tx
            .prepare_cached(&statements.pop)?
            .query_row([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))
            .optional()?;

        let Some((id, item)) = row else {
            // Nothing selected, nothing written; dropping the transaction rolls back.
            return Ok(None);
        };
        delete_row_on(&tx, &statements.delete, id)?;
        tx.commit()?;
        Ok(Some(item))
    }

    fn pull_inner(&mut self, limit: usize) -> Result<Vec<Vec<u8>>> {
        let statements = &self.statements;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let rows = tx
            .prepare_cached(&statements.pull)?
            .query_map(params![limit], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (id, item) in rows {
            delete_row_on(&tx, &statements.delete, id)?;
            items.push(item);
        }
        tx.commit()?;
        Ok(items)
    }

    fn size_inner(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .prepare_cached(&self.statements.size)?
            .query_row([], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| Error::Other(format!("invalid row count: {count}")))
    }

    fn close_inner(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or(Error::Closed)?;
        // On failure rusqlite hands the connection back; it is dropped here,
        // which closes it without reporting.
        conn.close().map_err(|(_, e)| Error::Storage(e))?;
        if let Some(ref path) = self.path {
            tracing::info!(path = %path.display(), ordering = %self.ordering, "closed durable queue");
        }
        Ok(())
    }
}

impl Queue for DurableQueue {
    fn push(&mut self, item: &[u8]) -> Result<()> {
        let op = OpRecorder::start(Backend::Durable, self.ordering, "push");
        let result = self.push_inner(item);
        op.finish_with(&result, |_| Some(1));
        result
    }

    fn pop(&mut self) -> Result<Option<Vec<u8>>> {
        let op = OpRecorder::start(Backend::Durable, self.ordering, "pop");
        let result = self.pop_inner();
        op.finish_with(&result, |item| Some(usize::from(item.is_some())));
        result
    }

    fn pull(&mut self, limit: usize) -> Result<Vec<Vec<u8>>> {
        let op = OpRecorder::start(Backend::Durable, self.ordering, "pull");
        let result = self.pull_inner(limit);
        op.finish_with(&result, |items| Some(items.len()));
        result
    }

    fn size(&self) -> Result<usize> {
        let op = OpRecorder::start(Backend::Durable, self.ordering, "size");
        let result = self.size_inner();
        op.finish_with(&result, |_| None);
        result
    }

    fn close(&mut self) -> Result<()> {
        let op = OpRecorder::start(Backend::Durable, self.ordering, "close");
        let result = self.close_inner();
        op.finish_with(&result, |_| None);
        result
    }

    fn ordering(&self) -> Ordering {
        self.ordering
    }

    fn backend(&self) -> Backend {
        Backend::Durable
    }
}

// ---------------------------------------------------------------------------
// Inner functions: accept &Connection so they run inside a Transaction
// (which derefs to Connection).
// ---------------------------------------------------------------------------

fn delete_row_on(conn: &Connection, sql: &str, id: i64) -> Result<()> {
    let deleted = conn.prepare_cached(sql)?.execute(params![id])?;
    if deleted != 1 {
        return Err(Error::Other(format!("expected to delete row {id}, deleted {deleted}")));
    }
    Ok(())
}
