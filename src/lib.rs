//! Bulk index build engine: scans a source clustered index, sorts and
//! converts its rows into a target index's key order, and bulk-loads the
//! result into a fresh B-tree, without going through the row-at-a-time
//! insert path (`spec.md` §1 OVERVIEW).

pub mod builder;
pub mod collab;
pub mod config;
pub mod convert;
pub mod error;
pub mod pageload;
pub mod row;
pub mod scan;
pub mod sort;
pub mod taskqueue;

pub use builder::{Builder, Progress};
pub use config::BuilderConfig;
pub use error::{IxError, IxResult};
