//! Scoped write transaction: acquires the queue's writer lock and resets
//! its pending batch on entry, and guarantees rollback on every exit
//! path (normal return, early return, or panic unwind) via `Drop`.
//! Commit remains an explicit call so the implicit (`Drop`) exit is
//! always a rollback.
//!
//! Grounded on `original_source/src/ssdb/binlog.h`'s `Transaction`
//! class, which locks + `begin()`s in its constructor and
//! `rollback()` + unlocks in its destructor; re-expressed here as Rust
//! RAII instead of C++ ctor/dtor.

use std::sync::MutexGuard;

use crate::error::Result;
use crate::queue::QueueState;

/// A single open write transaction. Borrows the queue for the duration
/// of one write; never outlives the store. Nested transactions are
/// forbidden by construction: opening a second one blocks on the same
/// mutex.
pub struct Transaction<'a> {
    guard: Option<MutexGuard<'a, QueueState>>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(mut guard: MutexGuard<'a, QueueState>) -> Self {
        guard.begin();
        Transaction { guard: Some(guard) }
    }

    /// Stages a put into the pending batch. Does not touch the engine.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.guard_mut().put(key, value);
    }

    /// Stages a delete into the pending batch. Does not touch the engine.
    pub fn delete(&mut self, key: &[u8]) {
        self.guard_mut().delete(key);
    }

    /// Appends one binlog entry to the pending batch. No-op if the
    /// queue was opened with `binlog_enabled = false`.
    pub fn add_log(
        &mut self,
        typ: crate::binlog::BinlogType,
        cmd: crate::binlog::Command,
        key: &[u8],
    ) {
        self.guard_mut().add_log(typ, cmd, key);
    }

    /// Commits the staged batch atomically and releases the writer
    /// lock. On failure, `last_seq` is rolled back to its pre-transaction
    /// value so the next writer reuses the same seq space.
    pub fn commit(mut self) -> Result<()> {
        let mut guard = self.guard.take().expect("transaction already consumed");
        guard.commit()
    }

    fn guard_mut(&mut self) -> &mut QueueState {
        self.guard.as_mut().expect("transaction already consumed")
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        // Safe to call after a successful commit: commit clears the
        // batch and `tran_seq`, so rollback on the already-committed
        // guard is a no-op. `self.guard` is `None` after `commit`
        // consumed it, so this only runs for an uncommitted exit.
        if let Some(guard) = self.guard.as_mut() {
            guard.rollback();
        }
    }
}
