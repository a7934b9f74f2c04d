//! Buffer pool / page manager collaborator (`spec.md` §6).
//!
//! This is an external capability per §1 ("the buffer pool and
//! mini-transaction (redo) manager" are out of scope, interfaces only). The
//! trait below is the seam the core needs; `InMemoryPageManager` is a test
//! double used by this crate's own integration tests, not a product
//! feature.
//!
//! `BlockHandle` follows the §9 design note verbatim: "model a scanned row
//! as `struct Row { block: BlockHandle, ... }` where `BlockHandle` is an
//! RAII handle that decrements the fix count on drop."

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::IxResult;

pub type PageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    Shared,
    Exclusive,
}

struct BlockInner {
    page_id: PageId,
    data: RwLock<Vec<u8>>,
    modify_clock: AtomicU64,
    fix_count: AtomicUsize,
}

/// RAII handle over one buffer-pool block. `buf_fix_inc`/`buf_fix_dec` are
/// modeled as `Clone`/`Drop`: cloning increments the fix count, dropping a
/// handle decrements it. §8 property 7 ("`buf_fix_count(block) > 0` for
/// every block held across a `release/latch` pair") holds structurally as
/// long as at least one clone is retained across the pair.
pub struct BlockHandle {
    inner: Arc<BlockInner>,
}

impl BlockHandle {
    fn new(page_id: PageId, data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(BlockInner {
                page_id,
                data: RwLock::new(data),
                modify_clock: AtomicU64::new(0),
                fix_count: AtomicUsize::new(1),
            }),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    pub fn modify_clock(&self) -> u64 {
        self.inner.modify_clock.load(Ordering::Acquire)
    }

    pub fn bump_modify_clock(&self) {
        self.inner.modify_clock.fetch_add(1, Ordering::AcqRel);
    }

    pub fn fix_count(&self) -> usize {
        self.inner.fix_count.load(Ordering::Acquire)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.inner.data.read().unwrap()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.inner.data.write().unwrap()
    }
}

impl Clone for BlockHandle {
    fn clone(&self) -> Self {
        self.inner.fix_count.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for BlockHandle {
    fn drop(&mut self) {
        self.inner.fix_count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// §6: `page_get`, `page_alloc`, `page_free`, `block_modify_clock`,
/// `optimistic_get`, `buf_fix_inc/dec`. The last pair is folded into
/// `BlockHandle`'s `Clone`/`Drop`.
pub trait PageManager: Send + Sync {
    fn page_get(&self, page_id: PageId, latch: LatchMode) -> IxResult<BlockHandle>;
    fn page_alloc(&self, page_size: usize) -> IxResult<BlockHandle>;
    fn page_free(&self, page_id: PageId) -> IxResult<()>;
    fn optimistic_get(&self, page_id: PageId, clock: u64, latch: LatchMode) -> Option<BlockHandle>;
}

/// In-memory test double: a flat arena of pages keyed by sequential id.
/// Good enough to exercise the release/latch protocol and the bulk
/// loader's root-splice step end to end without a real storage engine.
pub struct InMemoryPageManager {
    pages: Mutex<HashMap<PageId, BlockHandle>>,
    next_id: AtomicU64,
}

impl InMemoryPageManager {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryPageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager for InMemoryPageManager {
    fn page_get(&self, page_id: PageId, _latch: LatchMode) -> IxResult<BlockHandle> {
        let pages = self.pages.lock().unwrap();
        pages
            .get(&page_id)
            .cloned()
            .ok_or_else(|| crate::error::IxError::Corruption(format!("no such page {}", page_id)))
    }

    fn page_alloc(&self, page_size: usize) -> IxResult<BlockHandle> {
        let page_id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let block = BlockHandle::new(page_id, vec![0u8; page_size]);
        self.pages.lock().unwrap().insert(page_id, block.clone());
        Ok(block)
    }

    fn page_free(&self, page_id: PageId) -> IxResult<()> {
        self.pages.lock().unwrap().remove(&page_id);
        Ok(())
    }

    fn optimistic_get(&self, page_id: PageId, clock: u64, latch: LatchMode) -> Option<BlockHandle> {
        let block = self.page_get(page_id, latch).ok()?;
        if block.modify_clock() == clock {
            Some(block)
        } else {
            None
        }
    }
}
