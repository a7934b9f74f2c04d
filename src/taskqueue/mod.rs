//! Loader/task queue (`spec.md` §5).

pub mod queue;

pub use queue::{ErrorRegister, TaskQueue};
