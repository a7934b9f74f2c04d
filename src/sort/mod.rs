//! External sort subsystem (`spec.md` §4.1-§4.3, §4.10).

pub mod buffer;
pub mod file_reader;
pub mod merge_cursor;
pub mod merge_sort;
pub mod record;
pub mod spill;
pub mod varint;

pub use buffer::{DuplicatePair, DuplicateSink, PushOutcome, SortBuffer};
pub use file_reader::FileReader;
pub use merge_cursor::MergeCursor;
pub use merge_sort::{merge_until_single_run, RunSet};
pub use spill::{RunRange, SpillWriter};
