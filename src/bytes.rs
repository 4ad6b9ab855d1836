//! Total byte encoding helpers shared by the typed key codec and the
//! binlog record format. None of these functions panic on malformed
//! input; failure is always a `Result`.

use byteorder::{BigEndian, ByteOrder};

/// Maximum length of a `varlen`-framed slice (one length byte).
pub const VARLEN_MAX: usize = u8::MAX as usize;

/// Appends `bytes` to `buf` as one length byte followed by the bytes
/// themselves. Returns an error if `bytes` is longer than [`VARLEN_MAX`].
pub fn varlen_put(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), VarlenError> {
    if bytes.len() > VARLEN_MAX {
        return Err(VarlenError::TooLong(bytes.len()));
    }
    buf.push(bytes.len() as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Reads a `varlen`-framed slice from the front of `buf`, returning the
/// decoded bytes and the remainder of `buf` after them.
///
/// Fails if `buf` is empty or the declared length exceeds what remains.
pub fn varlen_get(buf: &[u8]) -> Result<(&[u8], &[u8]), VarlenError> {
    let (&len, rest) = buf.split_first().ok_or(VarlenError::Truncated)?;
    let len = len as usize;
    if rest.len() < len {
        return Err(VarlenError::Truncated);
    }
    Ok(rest.split_at(len))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarlenError {
    TooLong(usize),
    Truncated,
}

impl std::fmt::Display for VarlenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarlenError::TooLong(n) => write!(f, "varlen payload too long: {n} bytes"),
            VarlenError::Truncated => write!(f, "varlen framing truncated"),
        }
    }
}

impl std::error::Error for VarlenError {}

/// Appends `v` to `buf` as 8 big-endian bytes.
pub fn u64_be_put(buf: &mut Vec<u8>, v: u64) {
    let mut tmp = [0u8; 8];
    BigEndian::write_u64(&mut tmp, v);
    buf.extend_from_slice(&tmp);
}

/// Reads 8 big-endian bytes from the front of `buf`, returning the value
/// and the remainder.
pub fn u64_be_get(buf: &[u8]) -> Result<(u64, &[u8]), VarlenError> {
    if buf.len() < 8 {
        return Err(VarlenError::Truncated);
    }
    let (head, rest) = buf.split_at(8);
    Ok((BigEndian::read_u64(head), rest))
}

/// Transforms a signed 64-bit score into a big-endian unsigned value such
/// that lexicographic byte order over the result equals numeric order
/// over the input. Achieved by flipping the sign bit: this maps the
/// signed range onto the unsigned range while preserving ordering.
pub fn score_to_sortable(score: i64) -> [u8; 8] {
    let flipped = (score as u64) ^ (1u64 << 63);
    let mut out = [0u8; 8];
    BigEndian::write_u64(&mut out, flipped);
    out
}

/// Inverse of [`score_to_sortable`].
pub fn score_from_sortable(buf: &[u8]) -> Result<i64, VarlenError> {
    if buf.len() < 8 {
        return Err(VarlenError::Truncated);
    }
    let flipped = BigEndian::read_u64(&buf[..8]);
    Ok((flipped ^ (1u64 << 63)) as i64)
}

/// Renders `bytes` as a lowercase hex string, for diagnostics (binlog
/// `dumps()`, store `info()`).
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_varlen_roundtrip() {
        let mut buf = Vec::new();
        varlen_put(&mut buf, b"hello").unwrap();
        varlen_put(&mut buf, b"").unwrap();
        let (a, rest) = varlen_get(&buf).unwrap();
        assert_eq!(a, b"hello");
        let (b, rest) = varlen_get(rest).unwrap();
        assert_eq!(b, b"");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_varlen_truncated() {
        assert!(varlen_get(&[]).is_err());
        assert!(varlen_get(&[5, 1, 2]).is_err());
    }

    #[test]
    fn test_varlen_too_long() {
        let bytes = vec![0u8; VARLEN_MAX + 1];
        let mut buf = Vec::new();
        assert!(varlen_put(&mut buf, &bytes).is_err());
    }

    #[test]
    fn test_u64_be_roundtrip() {
        let mut buf = Vec::new();
        u64_be_put(&mut buf, 0x0102030405060708);
        let (v, rest) = u64_be_get(&buf).unwrap();
        assert_eq!(v, 0x0102030405060708);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_score_sortable_roundtrip() {
        for x in [i64::MIN, -1, 0, 1, i64::MAX] {
            let enc = score_to_sortable(x);
            assert_eq!(score_from_sortable(&enc).unwrap(), x);
        }
    }

    #[test]
    fn test_score_sortable_order() {
        let pairs = [(-5i64, 3i64), (i64::MIN, i64::MIN + 1), (-1, 0), (0, 1)];
        for (x, y) in pairs {
            assert!(x < y);
            assert!(score_to_sortable(x) < score_to_sortable(y));
        }
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0xff, 0x1a]), "00ff1a");
    }
}
