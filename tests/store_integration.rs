//! End-to-end scenarios from spec.md §8, run against a real temp-directory
//! `Store`. Grounded on the teacher's `tests/file_checkpoint_test/main.rs`
//! (a separate-binary integration test driving the crate's public API
//! against a real file/engine, using `tempfile` for isolation).

use binlogdb::binlog::{BinlogType, Command};
use binlogdb::config::Options;
use binlogdb::keys::{encode_hash_key, encode_hsize_key, encode_kv_key};
use binlogdb::Store;

fn open_store(capacity: u64) -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = Options::default();
    opts.binlog_capacity = capacity;
    let store = Store::open(&opts, dir.path()).unwrap();
    (dir, store)
}

// Scenario 1: empty store, commit a SET.
#[test]
fn scenario_commit_set_is_visible_and_binlogged() {
    let (_dir, store) = open_store(1000);
    let key = encode_kv_key(b"foo");

    let mut txn = store.transaction();
    txn.put(&key, b"bar");
    txn.add_log(BinlogType::Sync, Command::Set, &key);
    txn.commit().unwrap();

    assert_eq!(store.raw_get(&key).unwrap(), Some(b"bar".to_vec()));
    let last = store.binlogs().find_last().unwrap().unwrap();
    assert_eq!(last.seq(), 1);
    assert_eq!(last.cmd(), Command::Set);
    assert_eq!(last.key(), key.as_slice());
}

// Scenario 2: rollback leaves the store and last_seq unchanged.
#[test]
fn scenario_rollback_leaves_committed_state_untouched() {
    let (_dir, store) = open_store(1000);
    let key = encode_kv_key(b"foo");

    let mut txn = store.transaction();
    txn.put(&key, b"bar");
    txn.add_log(BinlogType::Sync, Command::Set, &key);
    txn.commit().unwrap();

    {
        let mut txn = store.transaction();
        txn.delete(&key);
        txn.add_log(BinlogType::Sync, Command::Del, &key);
        // dropped without commit: rollback runs in Drop.
    }

    assert_eq!(store.raw_get(&key).unwrap(), Some(b"bar".to_vec()));
    assert_eq!(store.binlogs().last_seq(), 1);
}

// Scenario 3: trimmer keeps the queue near a small capacity.
#[test]
fn scenario_trim_converges_to_capacity_and_find_next_tracks_min_seq() {
    let (_dir, store) = open_store(10);

    for i in 0..25 {
        let key = encode_kv_key(format!("k{i}").as_bytes());
        let mut txn = store.transaction();
        txn.put(&key, b"v");
        txn.add_log(BinlogType::Sync, Command::Set, &key);
        txn.commit().unwrap();
    }
    assert_eq!(store.binlogs().last_seq(), 25);

    store.binlogs().force_trim().unwrap();

    assert!(store.binlogs().min_seq() >= 16);
    let next = store.binlogs().find_next(1).unwrap().unwrap();
    assert_eq!(next.seq(), store.binlogs().min_seq());
}

// Scenario 4: hash mutations keep HSIZE reconciled, binlog records the
// three mutating commands in commit order.
#[test]
fn scenario_hash_mutations_reconcile_hsize_and_binlog_order() {
    let (_dir, store) = open_store(1000);
    let hsize_key = encode_hsize_key(b"H");

    let f1 = encode_hash_key(b"H", b"f1").unwrap();
    let mut txn = store.transaction();
    txn.put(&f1, b"v1");
    txn.put(&hsize_key, b"1");
    txn.add_log(BinlogType::Sync, Command::HSet, &f1);
    txn.commit().unwrap();

    let f2 = encode_hash_key(b"H", b"f2").unwrap();
    let mut txn = store.transaction();
    txn.put(&f2, b"v2");
    txn.put(&hsize_key, b"2");
    txn.add_log(BinlogType::Sync, Command::HSet, &f2);
    txn.commit().unwrap();

    let mut txn = store.transaction();
    txn.delete(&f1);
    txn.put(&hsize_key, b"1");
    txn.add_log(BinlogType::Sync, Command::HDel, &f1);
    txn.commit().unwrap();

    assert_eq!(store.raw_get(&hsize_key).unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.raw_get(&f1).unwrap(), None);
    assert_eq!(store.raw_get(&f2).unwrap(), Some(b"v2".to_vec()));

    let cmds: Vec<Command> = (1..=3)
        .map(|seq| store.binlogs().get(seq).unwrap().unwrap().cmd())
        .collect();
    assert_eq!(cmds, [Command::HSet, Command::HSet, Command::HDel]);
}

// Scenario 5: key_range reports the smallest/largest user name per type.
#[test]
fn scenario_key_range_reports_smallest_and_largest_per_type() {
    let (_dir, store) = open_store(1000);

    for name in ["alice", "bob", "carol"] {
        let key = encode_kv_key(name.as_bytes());
        let mut txn = store.transaction();
        txn.put(&key, b"1");
        txn.add_log(BinlogType::Sync, Command::Set, &key);
        txn.commit().unwrap();
    }
    let h1 = encode_hash_key(b"myhash", b"f").unwrap();
    store.raw_put(&h1, b"v").unwrap();

    let range = store.key_range().unwrap();
    assert_eq!(range[0], "alice");
    assert_eq!(range[1], "carol");
    // key_range only probes HSIZE, not HASH directly, so it's empty here
    // since no HSIZE entry was written.
    assert_eq!(range[2], "");
    assert_eq!(range[3], "");
}

// Scenario 6: a reader observes either the pre-commit or post-commit
// value, never a partially staged one (single-writer, so this exercises
// sequencing rather than true concurrency).
#[test]
fn scenario_reader_never_observes_uncommitted_writes() {
    let (_dir, store) = open_store(1000);
    let key = encode_kv_key(b"foo");

    let mut txn = store.transaction();
    txn.put(&key, b"staged");
    assert_eq!(
        store.raw_get(&key).unwrap(),
        None,
        "reader must not see data staged in an open transaction"
    );
    txn.add_log(BinlogType::Sync, Command::Set, &key);
    txn.commit().unwrap();

    assert_eq!(store.raw_get(&key).unwrap(), Some(b"staged".to_vec()));
}

#[test]
fn scenario_disabled_binlog_still_commits_user_writes() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = Options::default();
    opts.binlog_enabled = false;
    let store = Store::open(&opts, dir.path()).unwrap();

    let key = encode_kv_key(b"foo");
    let mut txn = store.transaction();
    txn.put(&key, b"bar");
    txn.add_log(BinlogType::Sync, Command::Set, &key);
    txn.commit().unwrap();

    assert_eq!(store.raw_get(&key).unwrap(), Some(b"bar".to_vec()));
    assert_eq!(store.binlogs().last_seq(), 0, "add_log must be a no-op");
}
