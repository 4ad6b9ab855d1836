//! Typed key codec. Every key stored in the engine begins with a
//! one-byte data-type tag that partitions the flat keyspace so a
//! seek-to-prefix scan stays within one logical datatype.
//!
//! `encode_*("")` always yields just the tag byte, the lower bound of
//! the type's range; `encode_*("\xff")` is the conventional upper bound
//! used by reverse scans. Decoders never allocate beyond the output they
//! produce and validate that framing is consumed exactly.

use crate::bytes::{score_from_sortable, score_to_sortable, u64_be_get, u64_be_put, varlen_get, varlen_put};
use crate::error::{Error, Result};

/// One-byte data-type tag. The set and ordering are part of the on-disk
/// contract: never renumber or reorder these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Kv = b'k',
    HSize = b'H',
    Hash = b'h',
    ZSize = b'Z',
    ZSetByName = b'z',
    ZSetByScore = b's',
    QSize = b'Q',
    Queue = b'q',
    Binlog = b'B',
    Meta = b'M',
}

impl DataType {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'k' => Some(DataType::Kv),
            b'H' => Some(DataType::HSize),
            b'h' => Some(DataType::Hash),
            b'Z' => Some(DataType::ZSize),
            b'z' => Some(DataType::ZSetByName),
            b's' => Some(DataType::ZSetByScore),
            b'Q' => Some(DataType::QSize),
            b'q' => Some(DataType::Queue),
            b'B' => Some(DataType::Binlog),
            b'M' => Some(DataType::Meta),
            _ => None,
        }
    }
}

fn expect_tag(buf: &[u8], want: DataType) -> Result<&[u8]> {
    let (&tag, rest) = buf
        .split_first()
        .ok_or_else(|| Error::Decode("empty key".into()))?;
    if tag != want.tag() {
        return Err(Error::Decode(format!(
            "expected tag {:?} ({:#x}), found {:#x}",
            want,
            want.tag(),
            tag
        )));
    }
    Ok(rest)
}

fn expect_exhausted(rest: &[u8], what: &str) -> Result<()> {
    if !rest.is_empty() {
        return Err(Error::Decode(format!("trailing bytes after {what}")));
    }
    Ok(())
}

/// Returns the `DataType` tag a raw engine key begins with, if any.
pub fn tag_of(key: &[u8]) -> Option<DataType> {
    key.first().copied().and_then(DataType::from_tag)
}

// -- KV ----------------------------------------------------------------

pub fn encode_kv_key(name: &[u8]) -> Vec<u8> {
    let mut out = vec![DataType::Kv.tag()];
    out.extend_from_slice(name);
    out
}

pub fn decode_kv_key(key: &[u8]) -> Result<Vec<u8>> {
    Ok(expect_tag(key, DataType::Kv)?.to_vec())
}

// -- HSIZE ---------------------------------------------------------------

pub fn encode_hsize_key(name: &[u8]) -> Vec<u8> {
    let mut out = vec![DataType::HSize.tag()];
    out.extend_from_slice(name);
    out
}

pub fn decode_hsize_key(key: &[u8]) -> Result<Vec<u8>> {
    Ok(expect_tag(key, DataType::HSize)?.to_vec())
}

// -- HASH ------------------------------------------------------------------

pub fn encode_hash_key(name: &[u8], field: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![DataType::Hash.tag()];
    varlen_put(&mut out, name)?;
    out.extend_from_slice(field);
    Ok(out)
}

/// Returns `(name, field)`.
pub fn decode_hash_key(key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let rest = expect_tag(key, DataType::Hash)?;
    let (name, field) = varlen_get(rest)?;
    Ok((name.to_vec(), field.to_vec()))
}

// -- ZSIZE -------------------------------------------------------------------

pub fn encode_zsize_key(name: &[u8]) -> Vec<u8> {
    let mut out = vec![DataType::ZSize.tag()];
    out.extend_from_slice(name);
    out
}

pub fn decode_zsize_key(key: &[u8]) -> Result<Vec<u8>> {
    Ok(expect_tag(key, DataType::ZSize)?.to_vec())
}

// -- ZSET-by-name -------------------------------------------------------------

pub fn encode_zset_key(name: &[u8], member: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![DataType::ZSetByName.tag()];
    varlen_put(&mut out, name)?;
    out.extend_from_slice(member);
    Ok(out)
}

/// Returns `(name, member)`.
pub fn decode_zset_key(key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let rest = expect_tag(key, DataType::ZSetByName)?;
    let (name, member) = varlen_get(rest)?;
    Ok((name.to_vec(), member.to_vec()))
}

// -- ZSET-by-score ------------------------------------------------------------

pub fn encode_zscore_key(name: &[u8], score: i64, member: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![DataType::ZSetByScore.tag()];
    varlen_put(&mut out, name)?;
    out.extend_from_slice(&score_to_sortable(score));
    out.extend_from_slice(member);
    Ok(out)
}

/// Returns `(name, score, member)`.
pub fn decode_zscore_key(key: &[u8]) -> Result<(Vec<u8>, i64, Vec<u8>)> {
    let rest = expect_tag(key, DataType::ZSetByScore)?;
    let (name, rest) = varlen_get(rest)?;
    let score = score_from_sortable(rest)?;
    let member = &rest[8..];
    Ok((name.to_vec(), score, member.to_vec()))
}

// -- QSIZE --------------------------------------------------------------------

pub fn encode_qsize_key(name: &[u8]) -> Vec<u8> {
    let mut out = vec![DataType::QSize.tag()];
    out.extend_from_slice(name);
    out
}

pub fn decode_qsize_key(key: &[u8]) -> Result<Vec<u8>> {
    Ok(expect_tag(key, DataType::QSize)?.to_vec())
}

// -- QUEUE item -----------------------------------------------------------------

pub fn encode_queue_key(name: &[u8], seq: u64) -> Result<Vec<u8>> {
    let mut out = vec![DataType::Queue.tag()];
    varlen_put(&mut out, name)?;
    u64_be_put(&mut out, seq);
    Ok(out)
}

/// Returns `(name, seq)`.
pub fn decode_queue_key(key: &[u8]) -> Result<(Vec<u8>, u64)> {
    let rest = expect_tag(key, DataType::Queue)?;
    let (name, rest) = varlen_get(rest)?;
    let (seq, rest) = u64_be_get(rest)?;
    expect_exhausted(rest, "queue key")?;
    Ok((name.to_vec(), seq))
}

// -- BINLOG -----------------------------------------------------------------

pub fn encode_binlog_key(seq: u64) -> Vec<u8> {
    let mut out = vec![DataType::Binlog.tag()];
    u64_be_put(&mut out, seq);
    out
}

pub fn decode_binlog_key(key: &[u8]) -> Result<u64> {
    let rest = expect_tag(key, DataType::Binlog)?;
    let (seq, rest) = u64_be_get(rest)?;
    expect_exhausted(rest, "binlog key")?;
    Ok(seq)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tag_is_lower_bound() {
        assert_eq!(encode_kv_key(b""), vec![DataType::Kv.tag()]);
        assert_eq!(encode_hsize_key(b""), vec![DataType::HSize.tag()]);
        assert_eq!(encode_qsize_key(b""), vec![DataType::QSize.tag()]);
        assert_eq!(encode_zsize_key(b""), vec![DataType::ZSize.tag()]);
    }

    #[test]
    fn test_kv_roundtrip() {
        let k = encode_kv_key(b"foo");
        assert_eq!(decode_kv_key(&k).unwrap(), b"foo");
        assert_eq!(tag_of(&k), Some(DataType::Kv));
    }

    #[test]
    fn test_hash_roundtrip() {
        let k = encode_hash_key(b"myhash", b"field1").unwrap();
        let (name, field) = decode_hash_key(&k).unwrap();
        assert_eq!(name, b"myhash");
        assert_eq!(field, b"field1");
    }

    #[test]
    fn test_zset_roundtrip() {
        let k = encode_zset_key(b"z1", b"member1").unwrap();
        let (name, member) = decode_zset_key(&k).unwrap();
        assert_eq!(name, b"z1");
        assert_eq!(member, b"member1");
    }

    #[test]
    fn test_zscore_roundtrip_and_order() {
        let k1 = encode_zscore_key(b"z1", -5, b"alice").unwrap();
        let k2 = encode_zscore_key(b"z1", 10, b"bob").unwrap();
        assert!(k1 < k2, "lower score must sort first");

        let (name, score, member) = decode_zscore_key(&k1).unwrap();
        assert_eq!(name, b"z1");
        assert_eq!(score, -5);
        assert_eq!(member, b"alice");
    }

    #[test]
    fn test_queue_roundtrip() {
        let k = encode_queue_key(b"q1", 42).unwrap();
        let (name, seq) = decode_queue_key(&k).unwrap();
        assert_eq!(name, b"q1");
        assert_eq!(seq, 42);
    }

    #[test]
    fn test_binlog_roundtrip() {
        let k = encode_binlog_key(7);
        assert_eq!(decode_binlog_key(&k).unwrap(), 7);
    }

    #[test]
    fn test_binlog_keys_sort_numerically() {
        let k1 = encode_binlog_key(1);
        let k2 = encode_binlog_key(2);
        let k256 = encode_binlog_key(256);
        assert!(k1 < k2);
        assert!(k2 < k256);
    }

    #[test]
    fn test_wrong_tag_fails_cleanly() {
        let k = encode_kv_key(b"foo");
        assert!(decode_hsize_key(&k).is_err());
        assert!(decode_hash_key(&k).is_err());
    }

    #[test]
    fn test_truncated_varlen_fails_cleanly() {
        let bad = vec![DataType::Hash.tag(), 10, b'a', b'b'];
        assert!(decode_hash_key(&bad).is_err());
    }

    #[test]
    fn test_queue_key_rejects_trailing_bytes() {
        let mut k = encode_queue_key(b"q1", 1).unwrap();
        k.push(0xff);
        assert!(decode_queue_key(&k).is_err());
    }

    #[test]
    fn test_no_tag_collision_with_user_keys() {
        // A user KV name that happens to start with another tag byte
        // still decodes correctly because the KV tag precedes it.
        let k = encode_kv_key(b"Hsomething");
        assert_eq!(tag_of(&k), Some(DataType::Kv));
        assert_eq!(decode_kv_key(&k).unwrap(), b"Hsomething");
    }
}
