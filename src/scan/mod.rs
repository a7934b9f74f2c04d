//! Parallel scan subsystem (`spec.md` §4.6).

pub mod cursor;
pub mod partition;
pub mod source_page;
pub mod worker;

pub use cursor::{Cursor, Savepoint};
pub use partition::{partition_source, PartitionRange};
pub use source_page::SourcePage;
pub use worker::{default_savepoint_cycle, effective_worker_count, scan_range, FallbackInputs};
