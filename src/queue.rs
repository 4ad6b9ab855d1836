//! `BinlogQueue`: sequence allocation, batch composition, commit/rollback,
//! lookup by seq, and the background trimmer. Single-writer by design —
//! exactly one transaction proceeds at a time, serialized by `state`'s
//! mutex. Grounded on `original_source/src/ssdb/binlog.h`'s
//! `BinlogQueue`/`Transaction` classes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use rocksdb::{Direction, IteratorMode, WriteBatch, DB};

use crate::binlog::{Binlog, BinlogType, Command};
use crate::error::{Error, Result};
use crate::keys::{decode_binlog_key, encode_binlog_key, DataType};
use crate::transaction::Transaction;

/// How often the trimmer thread wakes to check retention (§4.D.5: "order
/// of seconds").
const TRIM_TICK: Duration = Duration::from_secs(2);

/// Maximum number of binlog keys deleted in a single engine batch, so
/// the trimmer never holds the writer mutex for unbounded work.
const TRIM_CHUNK: u64 = 10_000;

/// The mutable, mutex-guarded half of the queue: the pending write
/// batch and the seq-allocation scalars. Exclusively owned by whichever
/// writer holds the mutex. `min_seq` lives only in [`Shared`]: only the
/// trimmer ever advances it, and it does so outside a transaction.
pub(crate) struct QueueState {
    db: Arc<DB>,
    batch: WriteBatch,
    last_seq: u64,
    tran_seq: u64,
    enabled: bool,
    /// Mirrors `last_seq`, but only published here after a successful
    /// commit, so lock-free readers (`find_last`, `stats`) never
    /// observe a speculative, uncommitted seq.
    committed_last_seq: Arc<AtomicU64>,
    /// Published alongside `committed_last_seq`: bumped from 0 to 1 on
    /// the first commit that actually advances `last_seq`, so a fresh
    /// queue's retained interval is `[1, last_seq]` rather than a
    /// phantom `[0, last_seq]`. Otherwise left alone here; the trimmer
    /// and `flush` are the only other writers of it.
    committed_min_seq: Arc<AtomicU64>,
}

impl QueueState {
    pub(crate) fn begin(&mut self) {
        self.batch = WriteBatch::default();
        self.tran_seq = 0;
    }

    pub(crate) fn put(&mut self, key: &[u8], value: &[u8]) {
        self.batch.put(key, value);
    }

    pub(crate) fn delete(&mut self, key: &[u8]) {
        self.batch.delete(key);
    }

    pub(crate) fn add_log(&mut self, typ: BinlogType, cmd: Command, key: &[u8]) {
        if !self.enabled {
            return;
        }
        if self.tran_seq == 0 {
            self.tran_seq = self.last_seq + 1;
            self.last_seq = self.tran_seq;
        } else {
            self.last_seq += 1;
        }
        let record = Binlog::make(self.last_seq, typ, cmd, key);
        self.batch
            .put(encode_binlog_key(self.last_seq), record.as_bytes());
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        match self.db.write(batch) {
            Ok(()) => {
                self.tran_seq = 0;
                self.committed_last_seq.fetch_max(self.last_seq, Ordering::SeqCst);
                if self.last_seq > 0 {
                    // First record ever committed: the lowest seq present
                    // is 1, not the initial sentinel 0.
                    let _ = self.committed_min_seq.compare_exchange(
                        0,
                        1,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    );
                }
                Ok(())
            }
            Err(e) => {
                log::error!("binlog queue commit failed: {e}");
                self.rollback_seq();
                Err(Error::Engine(e))
            }
        }
    }

    pub(crate) fn rollback(&mut self) {
        self.rollback_seq();
        self.batch = WriteBatch::default();
    }

    fn rollback_seq(&mut self) {
        if self.tran_seq != 0 {
            self.last_seq = self.tran_seq - 1;
            self.tran_seq = 0;
        }
    }
}

/// Shared, lock-free-readable state plus the mutex that serializes
/// writers. Cloned (by `Arc`) into the trimmer thread.
struct Shared {
    db: Arc<DB>,
    state: Mutex<QueueState>,
    committed_last_seq: Arc<AtomicU64>,
    committed_min_seq: Arc<AtomicU64>,
    capacity: u64,
    thread_quit: AtomicBool,
}

/// The transactional binlog queue. Created alongside the store's engine
/// handle and torn down with it; owns the pending write batch and the
/// writer mutex (§3.4).
pub struct BinlogQueue {
    shared: Arc<Shared>,
    trimmer: Option<JoinHandle<()>>,
}

impl BinlogQueue {
    /// Opens the queue over an already-open engine handle, recovering
    /// `last_seq`/`min_seq` by scanning the `B`-prefixed keyspace
    /// (§4.D.6), then starts the background trimmer.
    pub fn open(db: Arc<DB>, capacity: u64, enabled: bool) -> Result<Self> {
        let last_seq = Self::recover_last_seq(&db)?;
        let min_seq = Self::recover_min_seq(&db)?;

        let committed_last_seq = Arc::new(AtomicU64::new(last_seq));
        let committed_min_seq = Arc::new(AtomicU64::new(min_seq));

        let state = QueueState {
            db: db.clone(),
            batch: WriteBatch::default(),
            last_seq,
            tran_seq: 0,
            enabled,
            committed_last_seq: committed_last_seq.clone(),
            committed_min_seq: committed_min_seq.clone(),
        };

        let shared = Arc::new(Shared {
            db,
            state: Mutex::new(state),
            committed_last_seq,
            committed_min_seq,
            capacity,
            thread_quit: AtomicBool::new(false),
        });

        let trimmer = {
            let shared = shared.clone();
            std::thread::Builder::new()
                .name("binlogdb-trimmer".into())
                .spawn(move || trimmer_loop(shared))
                .map_err(|e| Error::Internal(format!("failed to spawn trimmer thread: {e}")))?
        };

        Ok(BinlogQueue {
            shared,
            trimmer: Some(trimmer),
        })
    }

    fn recover_last_seq(db: &DB) -> Result<u64> {
        // Reverse-seek from just past the BINLOG tag's range: the
        // largest possible key with that tag directly precedes, in sort
        // order, the smallest key of the next tag.
        let upper = [DataType::Binlog.tag() + 1];
        let mut iter = db.iterator(IteratorMode::From(&upper, Direction::Reverse));
        match iter.next() {
            Some(Ok((key, _))) if key.first() == Some(&DataType::Binlog.tag()) => {
                decode_binlog_key(&key)
            }
            Some(Ok(_)) | None => Ok(0),
            Some(Err(e)) => Err(Error::Engine(e)),
        }
    }

    fn recover_min_seq(db: &DB) -> Result<u64> {
        let prefix = [DataType::Binlog.tag()];
        let mut iter = db.iterator(IteratorMode::From(&prefix, Direction::Forward));
        match iter.next() {
            Some(Ok((key, _))) if key.first() == Some(&DataType::Binlog.tag()) => {
                decode_binlog_key(&key)
            }
            Some(Ok(_)) | None => Ok(0),
            Some(Err(e)) => Err(Error::Engine(e)),
        }
    }

    /// Begins a scoped write transaction, blocking until the writer
    /// mutex is available. Nested transactions are forbidden: a second
    /// call from the same thread before the first is dropped/committed
    /// deadlocks, matching the single-writer discipline (§4.D.1).
    pub fn transaction(&self) -> Transaction<'_> {
        let guard = self
            .shared
            .state
            .lock()
            .expect("binlog queue mutex poisoned");
        Transaction::begin(guard)
    }

    /// Exact lookup by seq. Bypasses the writer mutex; may only observe
    /// committed state.
    pub fn get(&self, seq: u64) -> Result<Option<Binlog>> {
        let key = encode_binlog_key(seq);
        match self.shared.db.get(&key)? {
            Some(bytes) => Ok(Some(Binlog::parse(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns the record with the smallest seq `>= seq`, or `None` if
    /// no such entry exists. The replication tail entrypoint.
    pub fn find_next(&self, seq: u64) -> Result<Option<Binlog>> {
        let key = encode_binlog_key(seq);
        let mut iter = self
            .shared
            .db
            .iterator(IteratorMode::From(&key, Direction::Forward));
        match iter.next() {
            Some(Ok((k, v))) if k.first() == Some(&DataType::Binlog.tag()) => {
                let _ = k;
                Ok(Some(Binlog::parse(&v)?))
            }
            Some(Ok(_)) | None => Ok(None),
            Some(Err(e)) => Err(Error::Engine(e)),
        }
    }

    /// Returns the record at the current `last_seq`, used for
    /// replication handshake.
    pub fn find_last(&self) -> Result<Option<Binlog>> {
        let seq = self.last_seq();
        if seq == 0 {
            return Ok(None);
        }
        self.get(seq)
    }

    pub fn last_seq(&self) -> u64 {
        self.shared.committed_last_seq.load(Ordering::SeqCst)
    }

    pub fn min_seq(&self) -> u64 {
        self.shared.committed_min_seq.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> u64 {
        self.shared.capacity
    }

    /// Human-readable diagnostic summary (§6.4): at least `capacity`,
    /// `min_seq`, `last_seq`, and the current queue length.
    pub fn stats(&self) -> String {
        let last = self.last_seq();
        let min = self.min_seq();
        let len = if last == 0 { 0 } else { last - min + 1 };
        format!(
            "capacity: {}\nmin_seq: {}\nlast_seq: {}\nlength: {}\n",
            self.shared.capacity, min, last, len
        )
    }

    /// Runs one trimming pass synchronously, bypassing the tick
    /// schedule. Used by tests and the admin CLI so callers don't have
    /// to wait out the background thread's cadence.
    pub fn force_trim(&self) -> Result<()> {
        trim_pass(&self.shared)
    }

    /// Deletes every retained binlog record and resets the queue to
    /// empty. Called by `Store::flushdb` after its own bulk delete
    /// pass (`original_source`'s `binlogs->flush()`).
    pub fn flush(&self) -> Result<()> {
        let _guard = self
            .shared
            .state
            .lock()
            .expect("binlog queue mutex poisoned");
        let last = self.shared.committed_last_seq.load(Ordering::SeqCst);
        let min = self.shared.committed_min_seq.load(Ordering::SeqCst);
        if last >= min {
            let mut batch = WriteBatch::default();
            for seq in min..=last {
                batch.delete(encode_binlog_key(seq));
            }
            self.shared.db.write(batch).map_err(Error::Engine)?;
        }
        self.shared.committed_last_seq.store(0, Ordering::SeqCst);
        self.shared.committed_min_seq.store(0, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for BinlogQueue {
    fn drop(&mut self) {
        self.shared.thread_quit.store(true, Ordering::SeqCst);
        if let Some(handle) = self.trimmer.take() {
            let _ = handle.join();
        }
    }
}

fn trimmer_loop(shared: Arc<Shared>) {
    while !shared.thread_quit.load(Ordering::SeqCst) {
        std::thread::sleep(TRIM_TICK);
        if shared.thread_quit.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = trim_pass(&shared) {
            log::warn!("binlog trimmer pass failed, backing off: {e}");
        }
    }
}

/// One trimming pass: deletes complete `TRIM_CHUNK`-sized ranges from
/// the front of the queue until it is back at or under capacity,
/// yielding the writer mutex between chunks (§4.D.5).
fn trim_pass(shared: &Shared) -> Result<()> {
    loop {
        if shared.thread_quit.load(Ordering::SeqCst) {
            return Ok(());
        }

        let last = shared.committed_last_seq.load(Ordering::SeqCst);
        let min = shared.committed_min_seq.load(Ordering::SeqCst);
        if last == 0 || last < min {
            return Ok(());
        }
        let len = last - min + 1;
        if len <= shared.capacity {
            return Ok(());
        }

        let excess = len - shared.capacity;
        let chunk = excess.min(TRIM_CHUNK);
        let chunk_end = min + chunk - 1;

        {
            // Trimming is also "a writer": it must serialize with user
            // transactions through the same mutex (§4.D.5).
            let _guard = shared.state.lock().expect("binlog queue mutex poisoned");
            let mut batch = WriteBatch::default();
            for seq in min..=chunk_end {
                batch.delete(encode_binlog_key(seq));
            }
            if let Err(e) = shared.db.write(batch) {
                return Err(Error::Engine(e));
            }
        }

        shared
            .committed_min_seq
            .store(chunk_end + 1, Ordering::SeqCst);
    }
}
