//! Error types for the store, typed key codec, and binlog queue.
//!
//! `NotFound` is deliberately not a variant here: per the source's "not
//! found" success-coded convention, typed reads return `Ok(None)` rather
//! than an error. `Error` is reserved for the remaining three kinds named
//! in the design: malformed encodings, engine failures, and invariant
//! violations.

use crate::bytes::VarlenError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed key or record: {0}")]
    Decode(String),

    #[error("engine error: {0}")]
    Engine(#[from] rocksdb::Error),

    /// Invariant violation (e.g. `tran_seq > last_seq`). Callers should
    /// treat this as fatal; the crate itself never aborts the process on
    /// their behalf.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<VarlenError> for Error {
    fn from(e: VarlenError) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
