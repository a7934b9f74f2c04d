//! Loader/task queue (`spec.md` §5).
//!
//! A bounded queue of closures served to *W* OS worker threads, each
//! executing one task to completion before taking the next (§5 "exactly
//! one task at a time executes on a given context ... there is no
//! preemption"). Cancellation is cooperative: a shared, write-once
//! `ErrorRegister` plus `signal()` waking every idle worker so it can
//! re-check the register and exit (§5 "Cancellation semantics").
//!
//! Queue/condvar shape grounded on the bounded wait-queue pattern in
//! `examples/harborgrid-justin-rusty-db/src/pool/connection_pool.rs`,
//! adapted from its async tokio waiters to blocking `std::sync::Condvar`
//! waits, since §5 describes OS threads blocking on a condition variable
//! with timeout, not async tasks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::IxError;

type Job = Box<dyn FnOnce() + Send>;

/// Write-once shared error slot (§7: "the first non-success `dberr_t`
/// written wins; later writers are no-ops").
#[derive(Default)]
pub struct ErrorRegister {
    slot: Mutex<Option<Arc<IxError>>>,
}

impl ErrorRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `err` iff the register is still empty. Returns `true` if this
    /// call won the race.
    pub fn try_set(&self, err: IxError) -> bool {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::new(err));
        true
    }

    pub fn get(&self) -> Option<Arc<IxError>> {
        self.slot.lock().unwrap().clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

struct Shared {
    jobs: Mutex<VecDeque<Job>>,
    cond: Condvar,
    shutdown: AtomicBool,
}

/// §5's *W* thread contexts serving a single shared queue.
pub struct TaskQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskQueue {
    pub fn new(worker_count: usize) -> Self {
        let shared = Arc::new(Shared {
            jobs: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let workers = (0..worker_count.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || Self::worker_loop(shared))
            })
            .collect();

        Self { shared, workers }
    }

    fn worker_loop(shared: Arc<Shared>) {
        loop {
            let job = {
                let mut jobs = shared.jobs.lock().unwrap();
                loop {
                    if let Some(job) = jobs.pop_front() {
                        break Some(job);
                    }
                    if shared.shutdown.load(Ordering::Acquire) {
                        break None;
                    }
                    // Bounded wait (§5 suspension point (i)): re-check the
                    // queue and the shutdown flag every 200ms even absent a
                    // notify, so a missed wakeup can't wedge a worker.
                    let (guard, _timeout) = shared
                        .cond
                        .wait_timeout(jobs, Duration::from_millis(200))
                        .unwrap();
                    jobs = guard;
                }
            };
            match job {
                Some(job) => job(),
                None => return,
            }
        }
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        self.shared.jobs.lock().unwrap().push_back(Box::new(job));
        self.shared.cond.notify_one();
    }

    /// §5 "The task queue's `signal()` wakes all idle workers so they can
    /// re-check and exit" — call after writing to the shared
    /// `ErrorRegister` so workers waiting on an empty queue notice the
    /// cancellation immediately rather than after their next timeout.
    pub fn signal(&self) {
        self.shared.cond.notify_all();
    }

    pub fn pending(&self) -> usize {
        self.shared.jobs.lock().unwrap().len()
    }

    /// Stops accepting new work implicitly (workers exit once the queue
    /// drains), wakes every worker, and blocks until they've all exited.
    pub fn shutdown_and_join(mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.cond.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
