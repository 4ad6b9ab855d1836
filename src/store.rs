//! Store façade: opens the embedded engine and the binlog queue
//! together, and exposes the raw maintenance surface (get/put/del,
//! iteration, flushdb, size/info/compact/key_range) that sits below the
//! (out-of-scope) typed command dispatcher.
//!
//! Grounded on `original_source/src/ssdb/ssdb_impl.cpp`'s `SSDBImpl`.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BlockBasedOptions, Cache, DBCompressionType, Range, ReadOptions, DB};

use crate::binlog::{BinlogType, Command};
use crate::config::{Compression, Options};
use crate::error::{Error, Result};
use crate::keys::{
    decode_hsize_key, decode_kv_key, decode_qsize_key, decode_zsize_key, encode_hsize_key,
    encode_kv_key, encode_qsize_key, encode_zsize_key, DataType,
};
use crate::queue::BinlogQueue;

/// Upper bound used to probe the last key of a typed prefix by reverse
/// iteration (the source's `encode_x("\xff")` convention).
const PREFIX_UPPER: &[u8] = &[0xff];

/// Number of keys deleted per scan pass in [`Store::flushdb`], matching
/// the source's inner loop bound.
const FLUSHDB_CHUNK: usize = 10_000;

/// The opened store: one engine handle plus its binlog queue.
pub struct Store {
    db: Arc<DB>,
    binlogs: BinlogQueue,
}

impl Store {
    /// Opens (creating if absent) the engine at `dir` with the given
    /// tuning, then opens the binlog queue over it. Mirrors
    /// `SSDB::open`'s option wiring (§6.3): bloom filter at 10
    /// bits/key, an LRU block cache, background compaction/flush
    /// parallelism of 8, 32 MiB target SST size, and a 5-file engine
    /// log retention cap.
    pub fn open(options: &Options, dir: impl AsRef<Path>) -> Result<Self> {
        let mut db_opts = rocksdb::Options::default();
        db_opts.create_if_missing(true);
        db_opts.set_max_open_files(options.max_open_files);

        let mut table_opts = BlockBasedOptions::default();
        table_opts.set_bloom_filter(10.0, false);
        let cache = Cache::new_lru_cache(options.cache_size_mb * 1024 * 1024);
        table_opts.set_block_cache(&cache);
        table_opts.set_block_size(options.block_size_kb * 1024);
        db_opts.set_block_based_table_factory(&table_opts);

        db_opts.set_target_file_size_base(32 * 1024 * 1024);
        db_opts.set_write_buffer_size(options.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_compression_type(match options.compression {
            Compression::Yes => DBCompressionType::Snappy,
            Compression::No => DBCompressionType::None,
        });

        db_opts.set_max_background_jobs(16); // 8 compaction + 8 flush threads, source's split
        db_opts.set_keep_log_file_num(5);

        let db = DB::open(&db_opts, dir.as_ref()).map_err(|e| {
            log::error!("open db failed: {e}");
            Error::Engine(e)
        })?;
        let db = Arc::new(db);

        let binlogs = BinlogQueue::open(db.clone(), options.binlog_capacity, options.binlog_enabled)?;

        Ok(Store { db, binlogs })
    }

    /// Exposes the binlog queue for tailing/replication callers.
    pub fn binlogs(&self) -> &BinlogQueue {
        &self.binlogs
    }

    /// Opens a new write transaction.
    pub fn transaction(&self) -> crate::transaction::Transaction<'_> {
        self.binlogs.transaction()
    }

    /// Deletes every key in the store in bounded chunks, then flushes
    /// the binlog's retained history. An administrative operation: it
    /// does not emit per-key binlog entries, matching source behavior
    /// (spec.md's noted open question — preserved as-is here, see
    /// DESIGN.md).
    pub fn flushdb(&self) -> Result<()> {
        loop {
            let mut txn = self.transaction();
            let mut read_opts = ReadOptions::default();
            read_opts.fill_cache(false);
            let mut iter = self.db.raw_iterator_opt(read_opts);
            iter.seek_to_first();

            let mut n = 0;
            let mut any = false;
            while n < FLUSHDB_CHUNK {
                if !iter.valid() {
                    break;
                }
                if let Some(key) = iter.key() {
                    txn.delete(key);
                    any = true;
                }
                iter.next();
                n += 1;
            }
            txn.commit()?;
            if !any {
                break;
            }
        }
        self.flush_binlog()
    }

    /// Drops all retained binlog history, resetting the queue to empty
    /// (the source's `binlogs->flush()`, called at the end of
    /// `flushdb`).
    fn flush_binlog(&self) -> Result<()> {
        self.binlogs.flush()
    }

    /// Escape hatch for maintenance code: bypasses the binlog queue
    /// entirely (no transaction, no `B`-prefixed entry).
    pub fn raw_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut opts = ReadOptions::default();
        opts.fill_cache(false);
        Ok(self.db.get_opt(key, &opts)?)
    }

    pub fn raw_put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value).map_err(|e| {
            log::error!("raw put failed: {e}");
            Error::Engine(e)
        })
    }

    pub fn raw_del(&self, key: &[u8]) -> Result<()> {
        self.db.delete(key).map_err(|e| {
            log::error!("raw del failed: {e}");
            Error::Engine(e)
        })
    }

    /// Forward iterator over `[start, end)`, skipping `start` itself if
    /// present, stopping once the next key would equal or cross `end`
    /// (an empty `end` means unbounded), or after `limit` steps.
    /// Matches the source's `iterator`, which `Seek`s onto `start` and
    /// calls `Next()` once if that lands on an exact match.
    pub fn iterator(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut opts = ReadOptions::default();
        opts.fill_cache(false);
        let mut iter = self.db.raw_iterator_opt(opts);
        iter.seek(start);
        if iter.valid() && iter.key() == Some(start) {
            iter.next();
        }
        let mut out = Vec::new();
        while out.len() < limit && iter.valid() {
            let (Some(k), Some(v)) = (iter.key(), iter.value()) else {
                break;
            };
            if !end.is_empty() && k >= end {
                break;
            }
            out.push((k.to_vec(), v.to_vec()));
            iter.next();
        }
        Ok(out)
    }

    /// Reverse iterator starting at or before `start`, stopping once the
    /// next key would equal or cross `end` (empty means unbounded), or
    /// after `limit` steps. If `start` sorts past every key in the
    /// engine, seeks to the last key (matches the source's
    /// `Seek`-then-fallback-to-`SeekToLast` behavior).
    pub fn rev_iterator(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut opts = ReadOptions::default();
        opts.fill_cache(false);
        let mut iter = self.db.raw_iterator_opt(opts);
        iter.seek(start);
        if !iter.valid() {
            iter.seek_to_last();
        } else {
            iter.prev();
        }
        let mut out = Vec::new();
        while out.len() < limit && iter.valid() {
            let (Some(k), Some(v)) = (iter.key(), iter.value()) else {
                break;
            };
            if !end.is_empty() && k <= end {
                break;
            }
            out.push((k.to_vec(), v.to_vec()));
            iter.prev();
        }
        Ok(out)
    }

    /// Approximate size in bytes of the `[A, {)` key range (the source's
    /// `GetApproximateSizes` probe: `'{'` is `'z' + 1`, so the range
    /// covers every ASCII-lowercase-or-below key, i.e. the whole typed
    /// keyspace in practice).
    pub fn size(&self) -> Result<u64> {
        let range = Range::new(b"A", b"{");
        let sizes = self.db.get_approximate_sizes(&[range]);
        Ok(sizes.into_iter().next().unwrap_or(0))
    }

    /// Engine statistics as alternating `[key, value, key, value, ...]`
    /// pairs (§6.3).
    pub fn info(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Ok(Some(stats)) = self.db.property_value("rocksdb.stats") {
            out.push("rocksdb.stats".to_string());
            out.push(stats);
        }
        out
    }

    pub fn compact(&self) {
        self.db.compact_range::<&[u8], &[u8]>(None, None);
    }

    /// Returns `[kstart, kend, hstart, hend, zstart, zend, qstart,
    /// qend]`: smallest and largest user name within each typed
    /// prefix, empty string if that type has no entries.
    pub fn key_range(&self) -> Result<[String; 8]> {
        let kv = self.probe_prefix(DataType::Kv, &encode_kv_key(b""), decode_kv_key)?;
        let h = self.probe_prefix(DataType::HSize, &encode_hsize_key(b""), decode_hsize_key)?;
        let z = self.probe_prefix(DataType::ZSize, &encode_zsize_key(b""), decode_zsize_key)?;
        let q = self.probe_prefix(DataType::QSize, &encode_qsize_key(b""), decode_qsize_key)?;
        Ok([kv.0, kv.1, h.0, h.1, z.0, z.1, q.0, q.1])
    }

    fn probe_prefix(
        &self,
        want: DataType,
        lower: &[u8],
        decode: impl Fn(&[u8]) -> Result<Vec<u8>>,
    ) -> Result<(String, String)> {
        let mut upper = vec![want.tag()];
        upper.extend_from_slice(PREFIX_UPPER);

        let start = self
            .iterator(lower, b"", 1)?
            .into_iter()
            .next()
            .filter(|(k, _)| k.first() == Some(&want.tag()));
        let end = self
            .rev_iterator(&upper, b"", 1)?
            .into_iter()
            .next()
            .filter(|(k, _)| k.first() == Some(&want.tag()));

        let start = match start {
            Some((k, _)) => String::from_utf8_lossy(&decode(&k)?).into_owned(),
            None => String::new(),
        };
        let end = match end {
            Some((k, _)) => String::from_utf8_lossy(&decode(&k)?).into_owned(),
            None => String::new(),
        };
        Ok((start, end))
    }
}
