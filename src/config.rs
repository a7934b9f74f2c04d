//! Environment knobs (`spec.md` §6 "Environment").
//!
//! Threaded explicitly through `Builder::new` rather than kept as module
//! statics, per the "Global mutable state" design note in §9: the teacher's
//! module-level `fill_factor` and process-wide temp-file counter are exactly
//! the pattern that note tells us to avoid.

use std::path::PathBuf;

/// `TRX_INTERRUPTED_CHECK` default from §4.10.
pub const DEFAULT_INTERRUPT_CHECK_PAGES: u64 = 64;

/// Default row-count interrupt poll period (§6 `interrupt_check_period`).
pub const DEFAULT_INTERRUPT_CHECK_RECORDS: u64 = 25_000;

/// Default page size a page loader targets, matching the teacher's
/// `BufferPool::get_page_size()` notion of a host-fixed page size.
pub const DEFAULT_PAGE_SIZE: usize = 16 * 1024;

/// `MAX_OWNED` default (§3 "Page").
pub const DEFAULT_MAX_OWNED: usize = 8;

/// Ceiling referenced by §4.1/§4.2 ("straddles a block boundary").
pub const MAX_RECORD_LEN: usize = 1 << 16;

/// I/O block size spill writers pad runs to (§3 "the writer pads the tail
/// to an I/O block boundary").
pub const IO_BLOCK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Target page occupancy after build, in `[10, 100]` (§3 GLOSSARY).
    pub fill_factor: u8,

    /// Number of OS worker threads a builder owns (§5).
    pub worker_count: usize,

    /// Per-worker sort buffer byte budget `B` (§3 "Sort buffer").
    pub scan_buffer_bytes: usize,

    /// I/O buffer size used by spill writers/readers and merge output (§4.2).
    pub merge_io_buffer_bytes: usize,

    /// `N` in the N-way merge (§4.10), default 2.
    pub n_way_merge: usize,

    /// Row-count interrupt poll period.
    pub interrupt_check_period_records: u64,

    /// Page-count interrupt poll period, `TRX_INTERRUPTED_CHECK` (§4.10).
    pub interrupt_check_period_pages: u64,

    /// Directory spill files are created under.
    pub tmpdir: PathBuf,

    /// Host page size; page loaders target this capacity per page.
    pub page_size: usize,

    /// `MAX_OWNED`: maximum records a single directory slot may own (§3).
    pub max_owned: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            fill_factor: 100,
            worker_count: num_cpus::get().max(1),
            scan_buffer_bytes: 8 * 1024 * 1024,
            merge_io_buffer_bytes: 1024 * 1024,
            n_way_merge: 2,
            interrupt_check_period_records: DEFAULT_INTERRUPT_CHECK_RECORDS,
            interrupt_check_period_pages: DEFAULT_INTERRUPT_CHECK_PAGES,
            tmpdir: std::env::temp_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            max_owned: DEFAULT_MAX_OWNED,
        }
    }
}

impl BuilderConfig {
    /// Clamp `fill_factor` into its documented `[10, 100]` range.
    pub fn with_fill_factor(mut self, fill_factor: u8) -> Self {
        self.fill_factor = fill_factor.clamp(10, 100);
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn with_n_way_merge(mut self, n: usize) -> Self {
        self.n_way_merge = n.max(2);
        self
    }

    /// Bytes of a page reserved so fill-factor is honored (§4.4 "Space
    /// check"), recovered from `original_source/` per SPEC_FULL.md §B.
    pub fn reserved_for_fillfactor(&self, page_usable_space: usize) -> usize {
        page_usable_space * (100 - self.fill_factor as usize) / 100
    }
}
