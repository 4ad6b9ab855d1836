//! Engine tuning ([`Options`]) and the admin binary's CLI surface
//! ([`AdminConfig`]), matching the recognized options of spec.md §6.3.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Number of binlog records retained before the trimmer starts deleting
/// the oldest entries. 20M in release, 10k in debug, per spec.md §3.3.
#[cfg(not(debug_assertions))]
pub const DEFAULT_BINLOG_CAPACITY: u64 = 20_000_000;
#[cfg(debug_assertions)]
pub const DEFAULT_BINLOG_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Compression {
    Yes,
    No,
}

/// Engine tuning recognized at [`crate::store::Store::open`].
#[derive(Debug, Clone)]
pub struct Options {
    /// LRU block cache size, in MiB.
    pub cache_size_mb: usize,
    /// Per-SST block size, in KiB.
    pub block_size_kb: usize,
    /// Per-memtable write buffer size, in MiB.
    pub write_buffer_size_mb: usize,
    /// Engine file-handle cap.
    pub max_open_files: i32,
    pub compression: Compression,
    /// If false, `add_log` is a no-op: writes still batch, but no binlog
    /// entries are produced.
    pub binlog_enabled: bool,
    /// Target maximum number of retained binlog records.
    pub binlog_capacity: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            cache_size_mb: 8,
            block_size_kb: 4,
            write_buffer_size_mb: 64,
            max_open_files: 1000,
            compression: Compression::Yes,
            binlog_enabled: true,
            binlog_capacity: DEFAULT_BINLOG_CAPACITY,
        }
    }
}

/// CLI configuration for `binlogdb-admin`.
#[derive(Parser, Debug)]
#[command(about = "Maintenance CLI for a binlogdb store directory")]
pub struct AdminConfig {
    /// Path to the store's data directory.
    #[arg(long = "dir")]
    pub dir: PathBuf,

    /// Print `info()`.
    #[arg(long)]
    pub info: bool,

    /// Print `stats()` for the binlog queue.
    #[arg(long)]
    pub stats: bool,

    /// Print the per-type key range (`key_range()`).
    #[arg(long = "key-range")]
    pub key_range: bool,

    /// Run a full-range compaction.
    #[arg(long)]
    pub compact: bool,

    /// Delete all keys in the store (administrative; does not binlog).
    #[arg(long)]
    pub flushdb: bool,

    #[arg(long, default_value = "no", value_enum)]
    pub compression: Compression,
}

impl AdminConfig {
    pub fn to_options(&self) -> Options {
        Options {
            compression: self.compression,
            ..Options::default()
        }
    }
}
