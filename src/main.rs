//! `binlogdb-admin`: small maintenance CLI exercising the store's
//! diagnostic surface (`info`, `stats`, `key_range`, `compact`, `flushdb`).
//! Grounded on the teacher's `main.rs` (parse a `clap::Parser` config, open
//! something, print a derived summary).

use anyhow::Context;
use clap::Parser;

use binlogdb::config::AdminConfig;
use binlogdb::Store;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = AdminConfig::parse();
    let options = config.to_options();

    let store = Store::open(&options, &config.dir)
        .with_context(|| format!("failed to open store at {}", config.dir.display()))?;

    if config.stats {
        print!("{}", store.binlogs().stats());
    }

    if config.info {
        for pair in store.info().chunks(2) {
            if let [key, value] = pair {
                println!("{key}: {value}");
            }
        }
    }

    if config.key_range {
        let range = store.key_range()?;
        let labels = [
            "kv_start", "kv_end", "hash_start", "hash_end", "zset_start", "zset_end",
            "queue_start", "queue_end",
        ];
        for (label, value) in labels.iter().zip(range.iter()) {
            println!("{label}: {value}");
        }
    }

    if config.compact {
        store.compact();
        println!("compaction requested");
    }

    if config.flushdb {
        store.flushdb().context("flushdb failed")?;
        println!("store flushed");
    }

    Ok(())
}
