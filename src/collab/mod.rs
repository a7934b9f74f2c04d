//! External collaborators (`spec.md` §6).
//!
//! Everything in this module is a trait seam: SQL/DDL parsing, catalog
//! transactions, lock-manager acquisition, row-log capture, the FTS
//! tokenizer, the real buffer pool/mini-transaction manager, LOB storage,
//! R-tree MBR computation and tablespace extent reservation are all out of
//! scope per `spec.md` §1. The core is generic over these traits; the
//! `InMemory*`/`Noop*`/`Counting*` types are test doubles this crate's own
//! integration tests use to exercise the core end to end, not product
//! features.

pub mod blob_store;
pub mod catalog;
pub mod flush_observer;
pub mod fts;
pub mod log_free_check;
pub mod mtr;
pub mod mvcc;
pub mod page_manager;
pub mod virtual_column;

pub use blob_store::{BlobPointer, BlobStore, InMemoryBlobStore};
pub use catalog::{Catalog, InMemoryCatalog};
pub use flush_observer::{CountingFlushObserver, FlushObserver};
pub use fts::{DocItem, FtsCollector, NoopFts};
pub use log_free_check::{LogFreeCheck, NoopLogFreeCheck, PeriodicLogFreeCheck};
pub use mtr::{LogMode, MiniTransaction, NoopMtr};
pub use mvcc::{AlwaysVisibleView, ReadView, SnapshotView};
pub use page_manager::{BlockHandle, InMemoryPageManager, LatchMode, PageId, PageManager};
pub use virtual_column::{NoVirtualColumns, VirtualColumnEvaluator};
