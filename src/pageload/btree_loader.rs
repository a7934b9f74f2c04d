//! B-tree loader (`spec.md` §4.5).
//!
//! Owns a stack of page loaders indexed by level (0 = leaf) and drives the
//! bottom-up insert recursion: when a leaf page fills, it commits, links to
//! a fresh sibling, and promotes a node pointer one level up — repeating
//! until the insert fits somewhere. `finish()` splices the final top-level
//! page into the catalog root.

use crate::collab::{BlobStore, Catalog, FlushObserver, LatchMode, LogFreeCheck, MiniTransaction, PageId, PageManager};
use crate::config::BuilderConfig;
use crate::error::IxResult;
use crate::pageload::page_loader::{PageLoader, SpaceOutcome};

/// Appended to a node-pointer record to mark the leftmost pointer at a
/// level (§4.5 step 1's `is_min_rec`), since the leftmost child has no
/// separator key of its own.
const MIN_REC_FLAG: u8 = 0xFF;

pub struct BTreeLoader {
    pub page_loaders: Vec<PageLoader>,
    pub root_level: usize,
    config: BuilderConfig,
    compressed: bool,
    leaf_commits_since_yield: u64,
}

impl BTreeLoader {
    pub fn new(config: BuilderConfig, compressed: bool) -> Self {
        Self {
            page_loaders: Vec::new(),
            root_level: 0,
            config,
            compressed,
            leaf_commits_since_yield: 0,
        }
    }

    fn node_pointer_record(child_first_record: &[u8], child_page: PageId) -> Vec<u8> {
        let mut rec = Vec::with_capacity(child_first_record.len() + 8);
        rec.extend_from_slice(&child_page.to_be_bytes());
        rec.extend_from_slice(child_first_record);
        rec
    }

    /// §4.5 `insert(tuple, level)`: the central recursion.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        record: Vec<u8>,
        level: usize,
        record_len: usize,
        page_manager: &dyn PageManager,
        mtr: &mut dyn MiniTransaction,
        flush_observer: &dyn FlushObserver,
        log_free_check: &dyn LogFreeCheck,
        blob_store: Option<(&dyn BlobStore, bool)>,
    ) -> IxResult<()> {
        if level + 1 > self.page_loaders.len() {
            self.page_loaders
                .push(PageLoader::new(&self.config, level, self.compressed));
            self.root_level = self.root_level.max(level);
        }

        let needs_new_page = {
            let loader = &self.page_loaders[level];
            loader.space_check(record_len, self.config.max_owned) == SpaceOutcome::NeedsNewPage
        };

        if needs_new_page {
            self.prepare_space(level, page_manager, mtr, flush_observer, log_free_check)?;
        }

        let record = if let Some((store, need_ext)) = blob_store {
            if need_ext && level == 0 {
                store.store_big_rec(&record)?
            } else {
                record
            }
        } else {
            record
        };

        self.page_loaders[level].insert(record);
        Ok(())
    }

    /// `prepare_space`: finish the current page, allocate a sibling,
    /// commit, and recurse with the promoted node pointer.
    fn prepare_space(
        &mut self,
        level: usize,
        page_manager: &dyn PageManager,
        mtr: &mut dyn MiniTransaction,
        flush_observer: &dyn FlushObserver,
        log_free_check: &dyn LogFreeCheck,
    ) -> IxResult<()> {
        self.page_loaders[level].finish(self.config.max_owned);

        // Swap the filled page out; the loader left at `level` is the fresh
        // one that keeps receiving records (the "sibling" of §4.4).
        let mut old_page = PageLoader::new(&self.config, level, self.compressed);
        std::mem::swap(&mut old_page, &mut self.page_loaders[level]);

        if !old_page.try_compress() {
            let right = old_page.split(&self.config);
            self.page_loaders[level] = right;
        }

        let alloc = page_manager.page_alloc(self.config.page_size)?;
        old_page.page.page_id = Some(alloc.page_id());
        old_page.page.right_sibling = self.page_loaders[level].page.page_id;
        self.page_loaders[level].page.left_sibling = old_page.page.page_id;

        let is_leftmost = old_page.page.left_sibling.is_none();
        let committed_first_record = old_page.page.records.first().cloned().unwrap_or_default();
        let committed_page_id = old_page.page.page_id.expect("just allocated above");

        old_page.commit(mtr, flush_observer)?;

        let mut node_ptr = Self::node_pointer_record(&committed_first_record, committed_page_id);
        if is_leftmost {
            node_ptr.push(MIN_REC_FLAG);
        }
        let node_ptr_len = node_ptr.len();
        self.insert(
            node_ptr,
            level + 1,
            node_ptr_len,
            page_manager,
            mtr,
            flush_observer,
            log_free_check,
            None,
        )?;

        if level == 0 {
            self.leaf_commits_since_yield += 1;
            if log_free_check.required() {
                self.page_loaders[0].release(self.config.max_owned, page_manager, mtr)?;
                log_free_check.check();
                self.page_loaders[0].latch(page_manager, mtr)?;
            }
        }

        Ok(())
    }

    /// §4.5 `finish(err)`: commit every level bottom-up, then splice the
    /// top level's last page into the catalog root.
    pub fn finish(
        &mut self,
        page_manager: &dyn PageManager,
        mtr: &mut dyn MiniTransaction,
        flush_observer: &dyn FlushObserver,
        catalog: &dyn Catalog,
    ) -> IxResult<PageId> {
        for level in 0..=self.root_level {
            if level > 0 {
                self.page_loaders[level].latch(page_manager, mtr)?;
            }
            self.page_loaders[level].finish(self.config.max_owned);
            if self.page_loaders[level].page.page_id.is_none() {
                let alloc = page_manager.page_alloc(self.config.page_size)?;
                self.page_loaders[level].page.page_id = Some(alloc.page_id());
            }
            self.page_loaders[level].commit(mtr, flush_observer)?;
        }

        let top = self
            .page_loaders
            .last()
            .expect("at least one level after insert");
        let last_page_no = top.page.page_id.expect("allocated above");
        let root_page_no = self.load_root_page(last_page_no, page_manager, mtr, catalog)?;

        flush_observer.flush();
        Ok(root_page_no)
    }

    /// `load_root_page(last_page_no)`: allocates a fresh page loader at the
    /// catalog root page number, `copy_all` from the top level's last page
    /// into the root page, frees the temporary top page, commits. The index
    /// is now discoverable via its catalog root.
    fn load_root_page(
        &self,
        last_page_no: PageId,
        page_manager: &dyn PageManager,
        mtr: &mut dyn MiniTransaction,
        catalog: &dyn Catalog,
    ) -> IxResult<PageId> {
        let root_page_no = catalog.root_page_no();
        let root_block = page_manager.page_get(root_page_no, LatchMode::Exclusive)?;
        let last_block = page_manager.page_get(last_page_no, LatchMode::Exclusive)?;
        *root_block.write() = last_block.read().clone();
        drop(last_block);
        page_manager.page_free(last_page_no)?;
        mtr.commit();
        Ok(root_page_no)
    }

    /// §4.5 failure semantics: roll back every loader's uncommitted page,
    /// freeing the underlying allocation if one was taken.
    pub fn rollback(&mut self, page_manager: &dyn PageManager) -> IxResult<()> {
        for loader in &mut self.page_loaders {
            if let Some(page_id) = loader.page.page_id {
                page_manager.page_free(page_id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{InMemoryBlobStore, InMemoryCatalog, InMemoryPageManager, NoopLogFreeCheck, NoopMtr};
    use crate::collab::flush_observer::CountingFlushObserver;

    #[test]
    fn single_leaf_insert_then_finish_produces_a_root() {
        let config = BuilderConfig::default();
        let mut loader = BTreeLoader::new(config.clone(), false);
        let manager = InMemoryPageManager::new();
        let catalog = InMemoryCatalog::reserve(&manager, config.page_size).unwrap();
        let mut mtr = NoopMtr::new();
        let flush_observer = CountingFlushObserver::default();
        let log_free_check = NoopLogFreeCheck;

        for i in 0..5u8 {
            loader
                .insert(
                    vec![i],
                    0,
                    1,
                    &manager,
                    &mut mtr,
                    &flush_observer,
                    &log_free_check,
                    None,
                )
                .unwrap();
        }

        let root = loader.finish(&manager, &mut mtr, &flush_observer, &catalog).unwrap();
        assert_eq!(root, catalog.root_page_no());
        assert_eq!(flush_observer.flush_call_count(), 1);
    }

    #[test]
    fn many_inserts_promote_a_second_level() {
        let mut config = BuilderConfig::default();
        config.page_size = 64; // force frequent splits/commits
        let mut loader = BTreeLoader::new(config.clone(), false);
        let manager = InMemoryPageManager::new();
        let mut mtr = NoopMtr::new();
        let flush_observer = CountingFlushObserver::default();
        let log_free_check = NoopLogFreeCheck;

        for i in 0..200u32 {
            let record = i.to_be_bytes().to_vec();
            loader
                .insert(
                    record.clone(),
                    0,
                    record.len(),
                    &manager,
                    &mut mtr,
                    &flush_observer,
                    &log_free_check,
                    None,
                )
                .unwrap();
        }

        assert!(loader.root_level >= 1);
    }

    #[test]
    fn blob_store_is_consulted_for_external_leaf_records() {
        let config = BuilderConfig::default();
        let mut loader = BTreeLoader::new(config, false);
        let manager = InMemoryPageManager::new();
        let mut mtr = NoopMtr::new();
        let flush_observer = CountingFlushObserver::default();
        let log_free_check = NoopLogFreeCheck;
        let blob_store = InMemoryBlobStore::default();

        loader
            .insert(
                vec![1, 2, 3, 4],
                0,
                4,
                &manager,
                &mut mtr,
                &flush_observer,
                &log_free_check,
                Some((&blob_store, true)),
            )
            .unwrap();

        assert_eq!(loader.page_loaders[0].page.rec_count(), 1);
    }
}
