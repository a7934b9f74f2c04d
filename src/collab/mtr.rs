//! Mini-transaction / redo collaborator (`spec.md` §6).
//!
//! Out of scope per §1 ("the buffer pool and mini-transaction (redo)
//! manager"). The core only needs to start/commit a batch and toggle
//! `NO_REDO` logging for bulk-loaded pages (§6: "Pages modified under
//! `NO_REDO` are not logged but are flushed synchronously by the observer at
//! the end").

use crate::collab::flush_observer::FlushObserver;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    NoRedo,
    Normal,
}

pub trait MiniTransaction: Send {
    fn start(&mut self);
    fn commit(&mut self);
    fn set_log_mode(&mut self, mode: LogMode);
    fn set_flush_observer(&mut self, observer: Arc<dyn FlushObserver>);
}

/// A mini-transaction that does nothing but track its log mode; sufficient
/// for this crate's own tests, which drive `FlushObserver` directly instead
/// of a real redo log.
pub struct NoopMtr {
    pub log_mode: LogMode,
    pub observer: Option<Arc<dyn FlushObserver>>,
}

impl NoopMtr {
    pub fn new() -> Self {
        Self {
            log_mode: LogMode::Normal,
            observer: None,
        }
    }
}

impl Default for NoopMtr {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniTransaction for NoopMtr {
    fn start(&mut self) {}

    fn commit(&mut self) {}

    fn set_log_mode(&mut self, mode: LogMode) {
        self.log_mode = mode;
    }

    fn set_flush_observer(&mut self, observer: Arc<dyn FlushObserver>) {
        self.observer = Some(observer);
    }
}
