//! Builder orchestration (`spec.md` §4.9, §4.8, §4.5-§4.10).

pub mod builder;
pub mod dup;
pub mod state;

pub use builder::{Builder, Progress};
pub use dup::{check_duplicates, AdjacentDupChecker};
pub use state::{BuildState, StateMachine};
