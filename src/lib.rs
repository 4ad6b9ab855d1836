//! `binlogdb`: typed-key encoding and a transactional binlog queue layered
//! over an embedded ordered key-value store. See `SPEC_FULL.md`/`DESIGN.md`
//! for the module-by-module grounding.

pub mod binlog;
pub mod bytes;
pub mod config;
pub mod error;
pub mod keys;
pub mod queue;
pub mod store;
pub mod transaction;

pub use error::{Error, Result};
pub use store::Store;
