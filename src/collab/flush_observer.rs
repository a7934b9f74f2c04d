//! Flush observer collaborator (`spec.md` §6).
//!
//! "The core calls `flush` exactly once per builder on success." Also
//! exposes the cooperative-cancellation poll used by §4.10's per-pass
//! `interrupted()` check and §4.5's log-free-check yield.

use std::sync::atomic::{AtomicBool, Ordering};

pub trait FlushObserver: Send + Sync {
    /// Barrier: block until every page handed to this observer under
    /// `NO_REDO` has been durably flushed.
    fn flush(&self);

    /// Cooperative cancellation signal (§5 "Cancellation semantics").
    fn interrupted(&self) -> bool;

    fn check_interrupted(&self) -> bool {
        self.interrupted()
    }
}

/// A flush observer that just counts calls and honors a cancellation flag;
/// used by this crate's own tests (S6 "Interrupt").
pub struct CountingFlushObserver {
    flush_calls: std::sync::atomic::AtomicUsize,
    interrupted: AtomicBool,
}

impl CountingFlushObserver {
    pub fn new() -> Self {
        Self {
            flush_calls: std::sync::atomic::AtomicUsize::new(0),
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn flush_call_count(&self) -> usize {
        self.flush_calls.load(Ordering::Acquire)
    }

    pub fn signal_interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }
}

impl Default for CountingFlushObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushObserver for CountingFlushObserver {
    fn flush(&self) {
        self.flush_calls.fetch_add(1, Ordering::AcqRel);
    }

    fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }
}
