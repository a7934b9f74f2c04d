//! Page loader (`spec.md` §4.4).
//!
//! Owns one page under construction and the release/latch handoff that lets
//! a long bulk-insert cooperate with the host's checkpoint throttle without
//! losing the page to eviction.

use crate::collab::{BlockHandle, FlushObserver, LatchMode, MiniTransaction, PageManager};
use crate::config::BuilderConfig;
use crate::error::IxResult;
use crate::pageload::page::Page;

/// Outcome of the §4.4 space check, kept separate from `IxError` for the
/// same reason as `sort::buffer::PushOutcome`: it is a routine "try the
/// next page" signal, not a build failure.
#[derive(Debug, PartialEq, Eq)]
pub enum SpaceOutcome {
    Fits,
    NeedsNewPage,
}

/// Moving estimate of compression overhead (§9/SPEC_FULL.md §B): the page
/// loader tracks `padding_for_compression` as an exponential moving
/// average of observed slack, `padding = padding*7/8 + observed_slack/8`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressionPadding {
    pub bytes: usize,
}

impl CompressionPadding {
    pub fn observe(&mut self, observed_slack: usize) {
        self.bytes = self.bytes * 7 / 8 + observed_slack / 8;
    }
}

pub struct PageLoader {
    pub page: Page,
    pub reserved_for_fillfactor: usize,
    pub padding_for_compression: CompressionPadding,
    pub compressed: bool,
    pub cur_rec: Option<usize>,
    pub slotted_rec_count: usize,
    fix: Option<BlockHandle>,
    modify_clock_at_release: u64,
}

impl PageLoader {
    pub fn new(config: &BuilderConfig, level: usize, compressed: bool) -> Self {
        let usable = config.page_size;
        let page = Page::new(usable, level);
        Self {
            reserved_for_fillfactor: config.reserved_for_fillfactor(usable),
            page,
            padding_for_compression: CompressionPadding::default(),
            compressed,
            cur_rec: None,
            slotted_rec_count: 0,
            fix: None,
            modify_clock_at_release: 0,
        }
    }

    /// §4.4 "Space check".
    pub fn space_check(&self, record_len: usize, max_owned: usize) -> SpaceOutcome {
        let rec_count = self.page.rec_count();
        let slot_delta = Page::dir_reserved(rec_count + 1, max_owned)
            .saturating_sub(Page::dir_reserved(rec_count, max_owned));
        let required = record_len + slot_delta;

        let floor_met = rec_count < 2;
        let fits = if self.compressed {
            floor_met || self.page.free_space >= required + self.padding_for_compression.bytes
        } else {
            floor_met || self.page.free_space.saturating_sub(required) >= self.reserved_for_fillfactor
        };

        if fits && self.page.free_space >= required {
            SpaceOutcome::Fits
        } else {
            SpaceOutcome::NeedsNewPage
        }
    }

    /// §4.4 "Insert": copy into the heap, advance bookkeeping.
    pub fn insert(&mut self, record: Vec<u8>) {
        self.page.append_record(record);
        self.cur_rec = self.page.last_insert;
    }

    /// §4.4 "Finish": idempotent directory rebuild plus header fields.
    pub fn finish(&mut self, max_owned: usize) {
        self.page.rebuild_directory(max_owned);
        self.slotted_rec_count = self.page.rec_count();
    }

    /// §4.4 "Commit": requires a prior `finish()` (`!modified`).
    pub fn commit(
        &mut self,
        mtr: &mut dyn MiniTransaction,
        flush_observer: &dyn FlushObserver,
    ) -> IxResult<()> {
        debug_assert!(!self.page.modified, "commit called before finish");
        mtr.commit();
        let _ = flush_observer; // observer is consulted by the B-tree loader, not here.
        Ok(())
    }

    /// §4.4 "Compress": attempt compression; `Ok(false)` signals the
    /// caller to invoke `split`.
    pub fn try_compress(&mut self) -> bool {
        if !self.compressed {
            return true;
        }
        let used = self.page.used_bytes();
        let slack = self.page.capacity_bytes.saturating_sub(used);
        self.padding_for_compression.observe(slack);
        // A real compressor either succeeds or not; modeled here as
        // "fits within capacity minus the updated padding estimate".
        used + self.padding_for_compression.bytes <= self.page.capacity_bytes
    }

    /// §4.4 "Split" / `get_split_rec`: walk from the first user record
    /// accumulating sizes until at least half the used bytes are covered;
    /// advance one more if that would leave the left page empty.
    pub fn split_point(&self) -> usize {
        let used = self.page.used_bytes();
        let half = used / 2;
        let mut acc = 0usize;
        let mut split_at = 0usize;
        for (i, rec) in self.page.records.iter().enumerate() {
            acc += rec.len();
            if acc >= half {
                split_at = i;
                break;
            }
        }
        if split_at == 0 && self.page.records.len() > 1 {
            split_at = 1;
        }
        split_at
    }

    /// `copy_records(split_rec)`: deep-copies records from `split_rec`
    /// onward into a fresh right-sibling page loader at the same level.
    pub fn split(&mut self, config: &BuilderConfig) -> PageLoader {
        let split_at = self.split_point();
        let mut right = PageLoader::new(config, self.page.level, self.compressed);
        for rec in self.page.records.split_off(split_at) {
            right.page.append_record(rec);
        }
        self.split_trim();
        right
    }

    /// `split_trim`: truncates the left page after records have been moved
    /// out, resetting the directory to just the infimum/supremum slots
    /// (§9 open question: treat the intermediate zeroed-slot state as
    /// transient and inaccessible until the next `finish()`).
    fn split_trim(&mut self) {
        self.page.heap_top = self.page.records.iter().map(|r| r.len()).sum();
        self.page.free_space = self.page.capacity_bytes - self.page.heap_top;
        self.page.directory.clear();
        self.page.modified = true;
    }

    /// `release()`: finish, buffer-fix the page, snapshot the modify
    /// clock, commit the mini-transaction (§4.4 "Release/latch handoff").
    pub fn release(
        &mut self,
        max_owned: usize,
        page_manager: &dyn PageManager,
        mtr: &mut dyn MiniTransaction,
    ) -> IxResult<()> {
        self.finish(max_owned);
        let handle = match &self.fix {
            Some(h) => h.clone(),
            None => page_manager.page_alloc(self.page.capacity_bytes)?,
        };
        self.modify_clock_at_release = handle.modify_clock();
        self.fix = Some(handle);
        mtr.commit();
        Ok(())
    }

    /// `latch()`: restart a mini-transaction and optimistically re-acquire
    /// the page via the modify-clock check, falling back to a keyed
    /// lookup. Invariant: fix count stays positive across the pair.
    pub fn latch(&mut self, page_manager: &dyn PageManager, mtr: &mut dyn MiniTransaction) -> IxResult<()> {
        mtr.start();
        let page_id = self
            .fix
            .as_ref()
            .expect("latch called without a prior release")
            .page_id();
        let optimistic = page_manager.optimistic_get(page_id, self.modify_clock_at_release, LatchMode::Exclusive);
        self.fix = Some(match optimistic {
            Some(handle) => handle,
            None => page_manager.page_get(page_id, LatchMode::Exclusive)?,
        });
        debug_assert!(self.fix.as_ref().unwrap().fix_count() > 0);
        Ok(())
    }
}
